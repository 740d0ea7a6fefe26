//! In-memory mirror of the store's verified set.
//!
//! Loaded once at engine construction and kept in sync incrementally. It is
//! never re-read from the store afterwards; a single engine instance is
//! assumed to be the only writer.

use likewatch_store::{StoreError, VerificationStore};
use likewatch_types::AccountId;
use std::collections::BTreeSet;

#[derive(Debug, Default)]
pub struct VerifiedSet {
    ids: BTreeSet<AccountId>,
}

impl VerifiedSet {
    /// Read every verified account id from `store`.
    pub fn load<S: VerificationStore>(store: &S) -> Result<Self, StoreError> {
        let ids = store.verified_ids()?.into_iter().collect();
        Ok(Self { ids })
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.ids.contains(account)
    }

    /// Returns false if the account was already present.
    pub fn add(&mut self, account: AccountId) -> bool {
        self.ids.insert(account)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Sorted snapshot, safe to iterate while the set is mutated.
    pub fn ids(&self) -> Vec<AccountId> {
        self.ids.iter().cloned().collect()
    }
}
