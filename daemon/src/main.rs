//! likewatch daemon: watches a post and verifies everyone who likes it.

use anyhow::Context;
use clap::Parser;
use likewatch_directory::{Credentials, XrpcDirectory};
use likewatch_node::{
    init_logging, BotConfig, LogFormat, PollScheduler, ReissuePolicy, ShutdownController,
    VerificationEngine,
};
use likewatch_store_lmdb::LmdbEnvironment;
use likewatch_types::SystemClock;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "likewatch", about = "Verify every account that likes a post")]
struct Cli {
    /// Operator handle (or DID) to log in as.
    #[arg(long, env = "BSKY_HANDLE")]
    handle: Option<String>,

    /// Operator app password.
    #[arg(long, env = "BSKY_APP_PASSWORD", hide_env_values = true)]
    app_password: Option<String>,

    /// at:// URI of the post to watch.
    #[arg(long, env = "POST_URI")]
    post_uri: Option<String>,

    /// PDS base URL.
    #[arg(long, env = "LIKEWATCH_SERVICE_URL")]
    service_url: Option<String>,

    /// Data directory for the LMDB store.
    #[arg(long, env = "LIKEWATCH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Seconds between likes scans.
    #[arg(long, env = "LIKEWATCH_POLL_INTERVAL")]
    poll_interval: Option<u64>,

    /// Seconds between full handle/display name consistency checks.
    #[arg(long, env = "CONSISTENCY_CHECK_INTERVAL")]
    consistency_check_interval: Option<u64>,

    /// Timeout in seconds for each remote request.
    #[arg(long, env = "LIKEWATCH_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,

    /// Re-issue trigger: "handle_or_display_name" or "handle_only".
    #[arg(long, env = "LIKEWATCH_REISSUE_POLICY")]
    reissue_policy: Option<ReissuePolicy>,

    /// Log format: "human" or "json".
    #[arg(long, env = "LIKEWATCH_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "LIKEWATCH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "LIKEWATCH_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<BotConfig> {
        let mut config = match &self.config {
            Some(path) => BotConfig::from_toml_file(&path.to_string_lossy())?,
            None => BotConfig::default(),
        };

        if let Some(v) = self.handle {
            config.handle = v;
        }
        if let Some(v) = self.app_password {
            config.app_password = v;
        }
        if let Some(v) = self.post_uri {
            config.post_uri = v;
        }
        if let Some(v) = self.service_url {
            config.service_url = v;
        }
        if let Some(v) = self.data_dir {
            config.data_dir = v;
        }
        if let Some(v) = self.poll_interval {
            config.poll_interval_secs = v;
        }
        if let Some(v) = self.consistency_check_interval {
            config.consistency_check_interval_secs = v;
        }
        if let Some(v) = self.request_timeout {
            config.request_timeout_secs = v;
        }
        if let Some(v) = self.reissue_policy {
            config.reissue_policy = v;
        }
        if let Some(v) = self.log_format {
            config.log_format = v;
        }
        if let Some(v) = self.log_level {
            config.log_level = v;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone();
    let config = cli.into_config()?;

    let format: LogFormat = config
        .log_format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    init_logging(format, &config.log_level)?;

    if let Some(path) = config_path {
        tracing::info!("Loaded config from {}", path.display());
    }
    config.validate()?;

    tracing::info!(
        "Starting likewatch (policy: {}, consistency check every {}s)",
        config.reissue_policy,
        config.consistency_check_interval_secs,
    );

    tracing::info!("Logging in as '{}'...", config.handle);
    let credentials = Credentials {
        service_url: config.service_url.clone(),
        identifier: config.handle.clone(),
        app_password: config.app_password.clone(),
    };
    let directory = XrpcDirectory::login(&credentials, config.request_timeout())
        .await
        .with_context(|| format!("login as {} failed", config.handle))?;
    tracing::info!(
        "Successfully logged in as '{}' ({})",
        config.handle,
        directory.operator_did().await
    );

    let env = LmdbEnvironment::open(&config.data_dir, config.map_size_bytes())
        .with_context(|| format!("opening store at {}", config.data_dir.display()))?;

    let engine = VerificationEngine::new(
        env.verification_store(),
        directory,
        SystemClock,
        config.post_uri(),
        config.reissue_policy,
    )?;
    tracing::info!(
        "Loaded {} previously verified accounts from {}",
        engine.verified().len(),
        env.path().display()
    );

    let shutdown = ShutdownController::new();
    let mut scheduler = PollScheduler::new(engine, config.scheduler());
    let rx = shutdown.subscribe();

    let signals = async {
        let res = shutdown.wait_for_signal().await;
        if res.is_err() {
            shutdown.shutdown();
        }
        res
    };
    let (_, signal) = tokio::join!(scheduler.run(rx), signals);
    signal.context("installing signal handlers")?;

    tracing::info!("likewatch exited cleanly");
    Ok(())
}
