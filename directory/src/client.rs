//! The directory capability consumed by the verification engine.

use std::future::Future;

use likewatch_types::{AccountId, AttestationRef, Handle, Liker, PostUri, Profile, Timestamp};

use crate::DirectoryError;

/// Operations the engine needs from the remote network.
///
/// Every call may block for as long as the implementation allows;
/// implementations are expected to bound each request with a timeout.
pub trait Directory {
    /// Accounts that currently like `post`, in the order the remote returns them.
    fn list_likers(
        &self,
        post: &PostUri,
    ) -> impl Future<Output = Result<Vec<Liker>, DirectoryError>>;

    /// Current handle and display name of `account`.
    ///
    /// Fails with [`DirectoryError::AccountDeactivated`] when the account is
    /// suspended or removed.
    fn resolve_profile(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Profile, DirectoryError>>;

    /// Publish an attestation for `account` on behalf of the operator.
    fn issue_attestation(
        &self,
        account: &AccountId,
        handle: &Handle,
        display_name: &str,
        issued_at: Timestamp,
    ) -> impl Future<Output = Result<AttestationRef, DirectoryError>>;
}
