//! likewatch core: verifies everyone who likes a post.
//!
//! The node crate owns the reconciliation state machine:
//! - Issues one attestation per newly discovered liker, exactly once per
//!   successful persistence
//! - Periodically re-resolves verified accounts and re-issues on identity drift
//! - Pauses accounts the directory reports as deactivated
//! - Drives both passes from a single cooperative poll loop

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod policy;
pub mod scheduler;
pub mod shutdown;
pub mod verified_set;

pub use classifier::{classify, classify_failure, ErrorAction, PAUSE_DURATION_SECS};
pub use config::BotConfig;
pub use engine::{ReconcileReport, ScanReport, VerificationEngine};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use policy::ReissuePolicy;
pub use scheduler::{PollScheduler, ReconcileCadence, SchedulerConfig, TickReport};
pub use shutdown::ShutdownController;
pub use verified_set::VerifiedSet;
