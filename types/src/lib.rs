//! Fundamental types for likewatch.
//!
//! This crate defines the value types shared across every other crate in the
//! workspace: account identifiers, handles, post URIs, timestamps, liker and
//! profile snapshots, and the clock capability.

pub mod account;
pub mod post;
pub mod profile;
pub mod time;

pub use account::{AccountId, Handle};
pub use post::PostUri;
pub use profile::{AttestationRef, Liker, Profile};
pub use time::{Clock, SystemClock, Timestamp};
