//! Per-account verification record.

use likewatch_types::{AccountId, Handle, Timestamp};
use serde::{Deserialize, Serialize};

/// Everything persisted about one account that has liked the watched post.
///
/// Created on the first observed like, mutated on every re-issuance and
/// every pause set/clear, never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub account_id: AccountId,
    pub handle: Handle,
    /// Falls back to the handle when the account has no display name.
    pub display_name: String,
    /// When the most recent attestation was issued. Non-decreasing.
    pub issued_at: Timestamp,
    /// True once at least one attestation has been issued.
    pub verified: bool,
    /// While `now < paused_until` the account is exempt from reconciliation.
    #[serde(default)]
    pub paused_until: Option<Timestamp>,
}

impl AccountRecord {
    /// A freshly verified record with no pause.
    pub fn verified(
        account_id: AccountId,
        handle: Handle,
        display_name: String,
        issued_at: Timestamp,
    ) -> Self {
        Self {
            account_id,
            handle,
            display_name,
            issued_at,
            verified: true,
            paused_until: None,
        }
    }

    /// Whether the pause is set and still in the future relative to `now`.
    pub fn is_paused(&self, now: Timestamp) -> bool {
        self.paused_until.is_some_and(|until| now < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AccountRecord {
        AccountRecord::verified(
            AccountId::new("did:plc:alice"),
            Handle::new("alice"),
            "Alice".into(),
            Timestamp::new(1_000),
        )
    }

    #[test]
    fn new_record_is_verified_and_unpaused() {
        let r = record();
        assert!(r.verified);
        assert!(!r.is_paused(Timestamp::new(0)));
    }

    #[test]
    fn pause_expires_at_boundary() {
        let mut r = record();
        r.paused_until = Some(Timestamp::new(2_000));
        assert!(r.is_paused(Timestamp::new(1_999)));
        assert!(!r.is_paused(Timestamp::new(2_000)));
    }
}
