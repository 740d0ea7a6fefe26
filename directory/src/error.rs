use likewatch_types::AccountId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Transport or API failure. Retried implicitly by the next poll.
    #[error("remote directory unavailable: {0}")]
    RemoteUnavailable(String),

    /// The account is deactivated, suspended or taken down.
    #[error("account {0} is deactivated")]
    AccountDeactivated(AccountId),

    /// Login or session refresh was rejected.
    #[error("authentication failed: {0}")]
    Auth(String),
}
