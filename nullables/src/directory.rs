//! Nullable directory: scripted likers and profiles, recorded attestations.

use likewatch_directory::{Directory, DirectoryError};
use likewatch_types::{AccountId, AttestationRef, Handle, Liker, PostUri, Profile, Timestamp};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// An attestation the engine asked the directory to publish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedAttestation {
    pub account_id: AccountId,
    pub handle: Handle,
    pub display_name: String,
    pub issued_at: Timestamp,
}

#[derive(Clone)]
enum ProfileScript {
    Found(Profile),
    Deactivated,
    Unavailable,
}

/// A test directory that serves scripted responses and records every call.
pub struct NullDirectory {
    likers: Mutex<Vec<Liker>>,
    listing_fails: Mutex<bool>,
    profiles: Mutex<HashMap<AccountId, ProfileScript>>,
    failing_issuance: Mutex<HashSet<AccountId>>,
    issued: Mutex<Vec<IssuedAttestation>>,
    resolve_calls: Mutex<Vec<AccountId>>,
}

impl NullDirectory {
    pub fn new() -> Self {
        Self {
            likers: Mutex::new(Vec::new()),
            listing_fails: Mutex::new(false),
            profiles: Mutex::new(HashMap::new()),
            failing_issuance: Mutex::new(HashSet::new()),
            issued: Mutex::new(Vec::new()),
            resolve_calls: Mutex::new(Vec::new()),
        }
    }

    /// Replace the liker list returned by `list_likers`.
    pub fn set_likers(&self, likers: Vec<Liker>) {
        *self.likers.lock().unwrap() = likers;
    }

    /// Make `list_likers` fail with `RemoteUnavailable`.
    pub fn fail_listing(&self, fail: bool) {
        *self.listing_fails.lock().unwrap() = fail;
    }

    pub fn set_profile(&self, account: &AccountId, profile: Profile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(account.clone(), ProfileScript::Found(profile));
    }

    /// Make `resolve_profile(account)` report the account as deactivated.
    pub fn deactivate(&self, account: &AccountId) {
        self.profiles
            .lock()
            .unwrap()
            .insert(account.clone(), ProfileScript::Deactivated);
    }

    /// Make `resolve_profile(account)` fail with `RemoteUnavailable`.
    pub fn fail_profile(&self, account: &AccountId) {
        self.profiles
            .lock()
            .unwrap()
            .insert(account.clone(), ProfileScript::Unavailable);
    }

    /// Toggle issuance failure for `account`.
    pub fn fail_issuance_for(&self, account: &AccountId, fail: bool) {
        let mut failing = self.failing_issuance.lock().unwrap();
        if fail {
            failing.insert(account.clone());
        } else {
            failing.remove(account);
        }
    }

    /// Every successful issuance, in call order.
    pub fn issued(&self) -> Vec<IssuedAttestation> {
        self.issued.lock().unwrap().clone()
    }

    pub fn issued_for(&self, account: &AccountId) -> Vec<IssuedAttestation> {
        self.issued()
            .into_iter()
            .filter(|a| &a.account_id == account)
            .collect()
    }

    /// Every `resolve_profile` call, in call order.
    pub fn resolve_calls(&self) -> Vec<AccountId> {
        self.resolve_calls.lock().unwrap().clone()
    }

    /// Clear recorded calls, keeping the scripted responses.
    pub fn reset_calls(&self) {
        self.issued.lock().unwrap().clear();
        self.resolve_calls.lock().unwrap().clear();
    }
}

impl Default for NullDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl Directory for NullDirectory {
    async fn list_likers(&self, _post: &PostUri) -> Result<Vec<Liker>, DirectoryError> {
        if *self.listing_fails.lock().unwrap() {
            return Err(DirectoryError::RemoteUnavailable("null listing failure".into()));
        }
        Ok(self.likers.lock().unwrap().clone())
    }

    async fn resolve_profile(&self, account: &AccountId) -> Result<Profile, DirectoryError> {
        self.resolve_calls.lock().unwrap().push(account.clone());
        let script = self.profiles.lock().unwrap().get(account).cloned();
        match script {
            Some(ProfileScript::Found(profile)) => Ok(profile),
            Some(ProfileScript::Deactivated) => {
                Err(DirectoryError::AccountDeactivated(account.clone()))
            }
            Some(ProfileScript::Unavailable) => Err(DirectoryError::RemoteUnavailable(format!(
                "null profile failure for {account}"
            ))),
            None => Err(DirectoryError::RemoteUnavailable(format!(
                "no scripted profile for {account}"
            ))),
        }
    }

    async fn issue_attestation(
        &self,
        account: &AccountId,
        handle: &Handle,
        display_name: &str,
        issued_at: Timestamp,
    ) -> Result<AttestationRef, DirectoryError> {
        if self.failing_issuance.lock().unwrap().contains(account) {
            return Err(DirectoryError::RemoteUnavailable(format!(
                "null issuance failure for {account}"
            )));
        }
        let mut issued = self.issued.lock().unwrap();
        issued.push(IssuedAttestation {
            account_id: account.clone(),
            handle: handle.clone(),
            display_name: display_name.to_string(),
            issued_at,
        });
        Ok(AttestationRef {
            uri: format!("at://null/app.bsky.graph.verification/{}", issued.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_issued_attestations() {
        let dir = NullDirectory::new();
        let alice = AccountId::new("did:plc:alice");
        let r = dir
            .issue_attestation(&alice, &Handle::new("alice"), "Alice", Timestamp::new(5))
            .await
            .unwrap();
        assert!(r.uri.ends_with("/1"));
        assert_eq!(dir.issued_for(&alice).len(), 1);
    }

    #[tokio::test]
    async fn test_deactivated_profile() {
        let dir = NullDirectory::new();
        let gone = AccountId::new("did:plc:gone");
        dir.deactivate(&gone);
        let err = dir.resolve_profile(&gone).await.unwrap_err();
        assert!(matches!(err, DirectoryError::AccountDeactivated(_)));
        assert_eq!(dir.resolve_calls(), vec![gone]);
    }
}
