//! LMDB implementation of VerificationStore.
//!
//! The verified set is a database keyed by account id with empty values.
//! Account records live in a second database as bincode-encoded values.

use heed::types::{Bytes, Str};
use heed::{Database, Env, RwTxn};

use likewatch_store::{AccountRecord, StoreError, VerificationStore};
use likewatch_types::{AccountId, Timestamp};

use crate::LmdbError;

/// Value stored against every verified-set key.
const MEMBER: &[u8] = &[];

pub struct LmdbVerificationStore {
    pub(crate) env: Env,
    pub(crate) verified_set_db: Database<Str, Bytes>,
    pub(crate) account_records_db: Database<Str, Bytes>,
}

impl LmdbVerificationStore {
    fn write_record(&self, wtxn: &mut RwTxn, record: &AccountRecord) -> Result<(), LmdbError> {
        let bytes = bincode::serialize(record)?;
        self.account_records_db
            .put(wtxn, record.account_id.as_str(), &bytes)?;
        Ok(())
    }

    fn read_record(&self, account: &AccountId) -> Result<Option<AccountRecord>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        match self.account_records_db.get(&rtxn, account.as_str())? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    /// Read-modify-write of one record inside a single write transaction.
    fn update_record<F>(&self, account: &AccountId, f: F) -> Result<(), LmdbError>
    where
        F: FnOnce(&mut AccountRecord) -> bool,
    {
        let mut wtxn = self.env.write_txn()?;
        let mut record: AccountRecord = match self.account_records_db.get(&wtxn, account.as_str())? {
            Some(bytes) => bincode::deserialize(bytes)?,
            None => return Err(LmdbError::NotFound(account.to_string())),
        };
        if f(&mut record) {
            self.write_record(&mut wtxn, &record)?;
            wtxn.commit()?;
        }
        Ok(())
    }
}

impl VerificationStore for LmdbVerificationStore {
    fn set_contains(&self, account: &AccountId) -> Result<bool, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let found = self
            .verified_set_db
            .get(&rtxn, account.as_str())
            .map_err(LmdbError::from)?
            .is_some();
        Ok(found)
    }

    fn set_add(&self, account: &AccountId) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.verified_set_db
            .put(&mut wtxn, account.as_str(), MEMBER)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn verified_ids(&self) -> Result<Vec<AccountId>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut ids = Vec::new();
        for entry in self.verified_set_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (key, _) = entry.map_err(LmdbError::from)?;
            ids.push(AccountId::new(key));
        }
        Ok(ids)
    }

    fn get_record(&self, account: &AccountId) -> Result<Option<AccountRecord>, StoreError> {
        Ok(self.read_record(account)?)
    }

    fn put_record(&self, record: &AccountRecord) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.write_record(&mut wtxn, record)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn mark_verified(&self, record: &AccountRecord) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.write_record(&mut wtxn, record)?;
        self.verified_set_db
            .put(&mut wtxn, record.account_id.as_str(), MEMBER)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn set_pause_until(&self, account: &AccountId, until: Timestamp) -> Result<(), StoreError> {
        self.update_record(account, |record| {
            record.paused_until = Some(until);
            true
        })?;
        Ok(())
    }

    fn clear_pause(&self, account: &AccountId) -> Result<(), StoreError> {
        match self.update_record(account, |record| record.paused_until.take().is_some()) {
            Err(LmdbError::NotFound(_)) => Ok(()),
            other => Ok(other?),
        }
    }
}
