//! LMDB storage backend for likewatch.
//!
//! Implements the storage traits from `likewatch-store` using the `heed`
//! LMDB bindings. Each logical store maps to one or more LMDB databases
//! within a single environment.

pub mod environment;
pub mod error;
pub mod verification;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use verification::LmdbVerificationStore;
