//! Abstract storage traits for likewatch.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.

pub mod error;
pub mod record;
pub mod verification;

pub use error::StoreError;
pub use record::AccountRecord;
pub use verification::VerificationStore;
