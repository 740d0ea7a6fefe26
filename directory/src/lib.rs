//! Remote directory access.
//!
//! The verification engine talks to the social network through the
//! [`Directory`] capability only: list who liked a post, resolve an
//! account's current profile, and issue an attestation record. The
//! [`XrpcDirectory`] implementation speaks AT Protocol XRPC over HTTP.

pub mod client;
pub mod error;
pub mod wire;
pub mod xrpc;

pub use client::Directory;
pub use error::DirectoryError;
pub use xrpc::{Credentials, XrpcDirectory};
