//! LMDB environment setup.

use std::path::{Path, PathBuf};

use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};

use likewatch_store::StoreError;

use crate::{LmdbError, LmdbVerificationStore};

const VERIFIED_SET_DB: &str = "verified_set";
const ACCOUNT_RECORDS_DB: &str = "account_records";
const MAX_DBS: u32 = 4;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Env,
    path: PathBuf,
    verified_set_db: Database<Str, Bytes>,
    account_records_db: Database<Str, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// Any failure here means the durable store is unreachable, which the
    /// daemon treats as fatal.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, StoreError> {
        Self::open_inner(path, map_size).map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn open_inner(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per process and the same
        // path is never opened twice concurrently by this crate.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let verified_set_db = env.create_database(&mut wtxn, Some(VERIFIED_SET_DB))?;
        let account_records_db = env.create_database(&mut wtxn, Some(ACCOUNT_RECORDS_DB))?;
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env,
            path: path.to_path_buf(),
            verified_set_db,
            account_records_db,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Handle onto the verified set and account records.
    pub fn verification_store(&self) -> LmdbVerificationStore {
        LmdbVerificationStore {
            env: self.env.clone(),
            verified_set_db: self.verified_set_db,
            account_records_db: self.account_records_db,
        }
    }
}
