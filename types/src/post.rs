//! Identifier of the watched post.

use serde::{Deserialize, Serialize};
use std::fmt;

/// URI of the post whose likes are watched, e.g.
/// `at://did:plc:abc/app.bsky.feed.post/3k2a`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostUri(String);

impl PostUri {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this looks like an `at://` URI with a non-empty path.
    pub fn is_valid(&self) -> bool {
        self.0
            .strip_prefix("at://")
            .is_some_and(|rest| rest.contains('/') && !rest.starts_with('/'))
    }
}

impl fmt::Display for PostUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
