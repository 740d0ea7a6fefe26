//! Bot configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use likewatch_types::PostUri;

use crate::policy::ReissuePolicy;
use crate::scheduler::SchedulerConfig;
use crate::NodeError;

/// Configuration for a likewatch bot.
///
/// Can be loaded from a TOML file via [`BotConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// PDS base URL used for login and every XRPC call.
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// Operator handle (or DID) to log in as.
    #[serde(default)]
    pub handle: String,

    /// Operator app password.
    #[serde(default)]
    pub app_password: String,

    /// URI of the post whose likers are verified.
    #[serde(default)]
    pub post_uri: String,

    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// Seconds between likes scans.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Seconds between full consistency checks.
    #[serde(default = "default_consistency_check_interval_secs")]
    pub consistency_check_interval_secs: u64,

    /// Timeout applied to every remote request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Which identity changes trigger a new attestation.
    #[serde(default)]
    pub reissue_policy: ReissuePolicy,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_service_url() -> String {
    "https://bsky.social".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./likewatch_data")
}

fn default_map_size_mb() -> usize {
    64
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_consistency_check_interval_secs() -> u64 {
    3600
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl BotConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(format!("{path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject configurations the bot cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.handle.trim().is_empty() {
            return Err(NodeError::Config("operator handle is required".into()));
        }
        if self.app_password.is_empty() {
            return Err(NodeError::Config("app password is required".into()));
        }
        if !self.post_uri().is_valid() {
            return Err(NodeError::Config(format!(
                "post URI {:?} is not an at:// URI",
                self.post_uri
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(NodeError::Config("poll interval must be positive".into()));
        }
        if self.consistency_check_interval_secs == 0 {
            return Err(NodeError::Config(
                "consistency check interval must be positive".into(),
            ));
        }
        if self.map_size_mb == 0 {
            return Err(NodeError::Config("LMDB map size must be positive".into()));
        }
        Ok(())
    }

    pub fn post_uri(&self) -> PostUri {
        PostUri::new(self.post_uri.trim())
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            consistency_check_interval_secs: self.consistency_check_interval_secs,
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            handle: String::new(),
            app_password: String::new(),
            post_uri: String::new(),
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            poll_interval_secs: default_poll_interval_secs(),
            consistency_check_interval_secs: default_consistency_check_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            reissue_policy: ReissuePolicy::default(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("service_url", &self.service_url)
            .field("handle", &self.handle)
            .field("app_password", &"<redacted>")
            .field("post_uri", &self.post_uri)
            .field("data_dir", &self.data_dir)
            .field("map_size_mb", &self.map_size_mb)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field(
                "consistency_check_interval_secs",
                &self.consistency_check_interval_secs,
            )
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("reissue_policy", &self.reissue_policy)
            .field("log_format", &self.log_format)
            .field("log_level", &self.log_level)
            .finish()
    }
}
