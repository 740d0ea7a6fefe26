//! When identity drift triggers a new attestation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Re-issuance trigger used by reconciliation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReissuePolicy {
    /// Re-issue when the handle or the display name differs from the record.
    #[default]
    HandleOrDisplayName,
    /// Re-issue on handle change only. A display-name-only change is
    /// persisted without a new attestation.
    HandleOnly,
}

impl ReissuePolicy {
    pub fn should_reissue(&self, handle_changed: bool, display_name_changed: bool) -> bool {
        match self {
            ReissuePolicy::HandleOrDisplayName => handle_changed || display_name_changed,
            ReissuePolicy::HandleOnly => handle_changed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReissuePolicy::HandleOrDisplayName => "handle_or_display_name",
            ReissuePolicy::HandleOnly => "handle_only",
        }
    }
}

impl fmt::Display for ReissuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReissuePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "handle_or_display_name" => Ok(ReissuePolicy::HandleOrDisplayName),
            "handle_only" => Ok(ReissuePolicy::HandleOnly),
            other => Err(format!(
                "unknown reissue policy {other:?} (expected handle_or_display_name or handle_only)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_known_names() {
        assert_eq!(
            "handle_only".parse::<ReissuePolicy>().unwrap(),
            ReissuePolicy::HandleOnly
        );
        assert_eq!(
            " Handle_Or_Display_Name ".parse::<ReissuePolicy>().unwrap(),
            ReissuePolicy::HandleOrDisplayName
        );
        assert!("always".parse::<ReissuePolicy>().is_err());
    }

    #[test]
    fn display_only_change_depends_on_policy() {
        assert!(ReissuePolicy::HandleOrDisplayName.should_reissue(false, true));
        assert!(!ReissuePolicy::HandleOnly.should_reissue(false, true));
    }

    proptest! {
        #[test]
        fn handle_change_always_reissues(name_changed in any::<bool>()) {
            for policy in [ReissuePolicy::HandleOrDisplayName, ReissuePolicy::HandleOnly] {
                prop_assert!(policy.should_reissue(true, name_changed));
                prop_assert!(!policy.should_reissue(false, false));
            }
        }
    }
}
