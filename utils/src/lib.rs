//! Shared utilities for likewatch.

pub mod time;

pub use time::format_duration;
