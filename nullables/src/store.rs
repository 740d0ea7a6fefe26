//! Nullable store: in-memory verification storage for testing.

use likewatch_store::{AccountRecord, StoreError, VerificationStore};
use likewatch_types::AccountId;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

/// An in-memory verified set + record store.
///
/// Writes can be made to fail, either globally or for a number of attempts
/// on a specific account, to exercise the engine's failure paths.
pub struct NullStore {
    verified: Mutex<BTreeSet<AccountId>>,
    records: Mutex<HashMap<AccountId, AccountRecord>>,
    write_failures: Mutex<HashMap<AccountId, u32>>,
    unavailable: Mutex<bool>,
    writes: Mutex<u64>,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            verified: Mutex::new(BTreeSet::new()),
            records: Mutex::new(HashMap::new()),
            write_failures: Mutex::new(HashMap::new()),
            unavailable: Mutex::new(false),
            writes: Mutex::new(0),
        }
    }

    /// Seed a verified record directly, bypassing failure injection.
    pub fn seed(&self, record: AccountRecord) {
        self.verified
            .lock()
            .unwrap()
            .insert(record.account_id.clone());
        self.records
            .lock()
            .unwrap()
            .insert(record.account_id.clone(), record);
    }

    /// Fail the next `times` writes touching `account`.
    pub fn fail_writes_for(&self, account: &AccountId, times: u32) {
        self.write_failures
            .lock()
            .unwrap()
            .insert(account.clone(), times);
    }

    /// Make every operation fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    /// Snapshot of a stored record, bypassing failure injection.
    pub fn record(&self, account: &AccountId) -> Option<AccountRecord> {
        self.records.lock().unwrap().get(account).cloned()
    }

    pub fn is_verified(&self, account: &AccountId) -> bool {
        self.verified.lock().unwrap().contains(account)
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> u64 {
        *self.writes.lock().unwrap()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if *self.unavailable.lock().unwrap() {
            return Err(StoreError::Unavailable("null store offline".into()));
        }
        Ok(())
    }

    fn check_write(&self, account: &AccountId) -> Result<(), StoreError> {
        self.check_available()?;
        let mut failures = self.write_failures.lock().unwrap();
        if let Some(remaining) = failures.get_mut(account) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::Backend(format!("injected write failure for {account}")));
            }
        }
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VerificationStore for NullStore {
    fn set_contains(&self, account: &AccountId) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.verified.lock().unwrap().contains(account))
    }

    fn set_add(&self, account: &AccountId) -> Result<(), StoreError> {
        self.check_write(account)?;
        self.verified.lock().unwrap().insert(account.clone());
        Ok(())
    }

    fn verified_ids(&self) -> Result<Vec<AccountId>, StoreError> {
        self.check_available()?;
        Ok(self.verified.lock().unwrap().iter().cloned().collect())
    }

    fn get_record(&self, account: &AccountId) -> Result<Option<AccountRecord>, StoreError> {
        self.check_available()?;
        Ok(self.records.lock().unwrap().get(account).cloned())
    }

    fn put_record(&self, record: &AccountRecord) -> Result<(), StoreError> {
        self.check_write(&record.account_id)?;
        self.records
            .lock()
            .unwrap()
            .insert(record.account_id.clone(), record.clone());
        Ok(())
    }

    fn mark_verified(&self, record: &AccountRecord) -> Result<(), StoreError> {
        self.check_write(&record.account_id)?;
        self.records
            .lock()
            .unwrap()
            .insert(record.account_id.clone(), record.clone());
        self.verified
            .lock()
            .unwrap()
            .insert(record.account_id.clone());
        Ok(())
    }
}
