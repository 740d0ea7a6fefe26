//! Snapshots of remote account identity as returned by the directory.

use crate::{AccountId, Handle};
use serde::{Deserialize, Serialize};

/// An account that liked the watched post, as observed at listing time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liker {
    pub account_id: AccountId,
    pub handle: Handle,
    pub display_name: Option<String>,
}

impl Liker {
    /// The display name, falling back to the handle when absent or empty.
    /// A whitespace-only name is kept as is.
    pub fn effective_display_name(&self) -> String {
        effective_display_name(&self.handle, self.display_name.as_deref())
    }
}

/// Current identity of an account, as resolved from the directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub handle: Handle,
    pub display_name: Option<String>,
}

impl Profile {
    /// The display name, falling back to the handle when absent or empty.
    /// A whitespace-only name is kept as is.
    pub fn effective_display_name(&self) -> String {
        effective_display_name(&self.handle, self.display_name.as_deref())
    }
}

/// Reference to an issued attestation record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationRef {
    pub uri: String,
}

fn effective_display_name(handle: &Handle, display_name: Option<&str>) -> String {
    match display_name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => handle.as_str().to_string(),
    }
}
