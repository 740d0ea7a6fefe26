//! Maps per-account failures to the action the engine takes.
//!
//! Nothing in here is fatal: every per-account error is isolated and the
//! batch carries on. Only startup failures (login, opening the store)
//! terminate the process, and those never reach the classifier.

use likewatch_directory::DirectoryError;
use likewatch_store::StoreError;

use crate::NodeError;

/// How long an account is exempt from reconciliation after the directory
/// reports it deactivated.
pub const PAUSE_DURATION_SECS: u64 = 24 * 60 * 60;

/// What to do after a per-account failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorAction {
    /// Expected condition; log quietly and move on.
    IgnoreAndContinue,
    /// Set `paused_until = now + 24h` on the account and move on.
    PauseAccount24h,
    /// Log a warning and move on. The next scheduled pass retries.
    IgnoreAndContinueWithWarning,
}

/// Classify a remote directory failure.
pub fn classify(error: &DirectoryError) -> ErrorAction {
    match error {
        DirectoryError::AccountDeactivated(_) => ErrorAction::PauseAccount24h,
        DirectoryError::RemoteUnavailable(_) | DirectoryError::Auth(_) => {
            ErrorAction::IgnoreAndContinueWithWarning
        }
    }
}

/// Classify any failure raised while processing one account.
pub fn classify_failure(error: &NodeError) -> ErrorAction {
    match error {
        NodeError::Directory(e) => classify(e),
        // The record vanished between listing and update; nothing to retry.
        NodeError::Store(StoreError::NotFound(_)) => ErrorAction::IgnoreAndContinue,
        _ => ErrorAction::IgnoreAndContinueWithWarning,
    }
}
