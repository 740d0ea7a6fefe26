//! Verified-set and account-record storage trait.

use crate::{AccountRecord, StoreError};
use likewatch_types::{AccountId, Timestamp};

/// Durable state for the verification engine.
///
/// The verified set is the sole source of truth for "has this account ever
/// been processed". Implementations must offer read-your-writes consistency
/// within one process.
pub trait VerificationStore {
    /// Whether `account` is a member of the verified set.
    fn set_contains(&self, account: &AccountId) -> Result<bool, StoreError>;

    /// Add `account` to the verified set.
    fn set_add(&self, account: &AccountId) -> Result<(), StoreError>;

    /// All members of the verified set.
    fn verified_ids(&self) -> Result<Vec<AccountId>, StoreError>;

    fn get_record(&self, account: &AccountId) -> Result<Option<AccountRecord>, StoreError>;

    fn put_record(&self, record: &AccountRecord) -> Result<(), StoreError>;

    /// Persist the record and add its account to the verified set.
    ///
    /// Backends with transactions override this to commit both writes
    /// together. The default writes the record first so that set membership
    /// never points at a missing record.
    fn mark_verified(&self, record: &AccountRecord) -> Result<(), StoreError> {
        self.put_record(record)?;
        self.set_add(&record.account_id)
    }

    fn get_pause_until(&self, account: &AccountId) -> Result<Option<Timestamp>, StoreError> {
        Ok(self.get_record(account)?.and_then(|r| r.paused_until))
    }

    fn set_pause_until(&self, account: &AccountId, until: Timestamp) -> Result<(), StoreError> {
        let mut record = self
            .get_record(account)?
            .ok_or_else(|| StoreError::NotFound(account.to_string()))?;
        record.paused_until = Some(until);
        self.put_record(&record)
    }

    fn clear_pause(&self, account: &AccountId) -> Result<(), StoreError> {
        let Some(mut record) = self.get_record(account)? else {
            return Ok(());
        };
        if record.paused_until.take().is_some() {
            self.put_record(&record)?;
        }
        Ok(())
    }
}
