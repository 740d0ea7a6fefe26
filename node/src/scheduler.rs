//! Poll scheduler: drives the engine on two cadences.
//!
//! One cooperative loop ticks every `poll_interval`. Each tick scans for new
//! likers; when the consistency-check interval has elapsed since the last
//! sweep, the same tick then runs a full reconciliation. Nothing runs
//! concurrently: a sweep finishes before the next tick's scan starts.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use likewatch_directory::Directory;
use likewatch_store::VerificationStore;
use likewatch_types::{Clock, Timestamp};
use likewatch_utils::format_duration;

use crate::engine::{ReconcileReport, ScanReport, VerificationEngine};

/// Tracks when the last reconciliation sweep ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcileCadence {
    interval_secs: u64,
    last_run: Timestamp,
}

impl ReconcileCadence {
    /// The first sweep becomes due one full interval after `started_at`.
    pub fn new(interval_secs: u64, started_at: Timestamp) -> Self {
        Self {
            interval_secs,
            last_run: started_at,
        }
    }

    pub fn is_due(&self, now: Timestamp) -> bool {
        self.last_run.elapsed_since(now) >= self.interval_secs
    }

    pub fn mark_ran(&mut self, at: Timestamp) {
        self.last_run = at;
    }

    pub fn last_run(&self) -> Timestamp {
        self.last_run
    }

    pub fn next_due(&self) -> Timestamp {
        self.last_run.saturating_add(self.interval_secs)
    }
}

/// Scheduler timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub poll_interval: Duration,
    pub consistency_check_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            consistency_check_interval_secs: 3600,
        }
    }
}

/// What one tick did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub scan: ScanReport,
    pub reconcile: Option<ReconcileReport>,
}

pub struct PollScheduler<S, D, C> {
    engine: VerificationEngine<S, D, C>,
    cadence: ReconcileCadence,
    poll_interval: Duration,
}

impl<S, D, C> PollScheduler<S, D, C>
where
    S: VerificationStore,
    D: Directory,
    C: Clock,
{
    pub fn new(engine: VerificationEngine<S, D, C>, config: SchedulerConfig) -> Self {
        let cadence = ReconcileCadence::new(
            config.consistency_check_interval_secs,
            engine.clock().now(),
        );
        Self {
            engine,
            cadence,
            poll_interval: config.poll_interval,
        }
    }

    pub fn engine(&self) -> &VerificationEngine<S, D, C> {
        &self.engine
    }

    pub fn cadence(&self) -> ReconcileCadence {
        self.cadence
    }

    /// One iteration of the loop: scan, then reconcile if due.
    pub async fn tick_once(&mut self) -> TickReport {
        let scan = self.engine.scan_new_likers().await;

        let now = self.engine.clock().now();
        let reconcile = if self.cadence.is_due(now) {
            let report = self.engine.reconcile_all().await;
            // Measured from the start of the sweep so sweep duration
            // does not push the cadence back.
            self.cadence.mark_ran(now);
            tracing::debug!(
                next_in = %format_duration(self.cadence.next_due().secs_until(now)),
                "next consistency check scheduled"
            );
            Some(report)
        } else {
            None
        };

        TickReport { scan, reconcile }
    }

    /// Tick until a shutdown signal arrives. An in-flight tick always
    /// runs to completion first.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            post = %self.engine.post(),
            poll = %format_duration(self.poll_interval.as_secs()),
            consistency_check = %format_duration(self.cadence.interval_secs),
            "watching for likes"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("poll scheduler shutting down");
                    break;
                }
                _ = interval.tick() => {
                    self.tick_once().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ReissuePolicy;
    use crate::ShutdownController;
    use likewatch_nullables::{NullClock, NullDirectory, NullStore};
    use likewatch_store::AccountRecord;
    use likewatch_types::{AccountId, Handle, Liker, PostUri, Profile};

    const START: u64 = 1_700_000_000;

    fn scheduler(
        store: NullStore,
        interval_secs: u64,
    ) -> PollScheduler<NullStore, NullDirectory, NullClock> {
        let engine = VerificationEngine::new(
            store,
            NullDirectory::new(),
            NullClock::new(START),
            PostUri::new("at://did:plc:op/app.bsky.feed.post/1"),
            ReissuePolicy::default(),
        )
        .unwrap();
        PollScheduler::new(
            engine,
            SchedulerConfig {
                poll_interval: Duration::from_millis(10),
                consistency_check_interval_secs: interval_secs,
            },
        )
    }

    fn liker(id: &str) -> Liker {
        Liker {
            account_id: AccountId::new(id),
            handle: Handle::new(id),
            display_name: None,
        }
    }

    #[test]
    fn test_cadence_due_after_full_interval() {
        let mut cadence = ReconcileCadence::new(3600, Timestamp::new(1_000));
        assert!(!cadence.is_due(Timestamp::new(1_000)));
        assert!(!cadence.is_due(Timestamp::new(4_599)));
        assert!(cadence.is_due(Timestamp::new(4_600)));
        cadence.mark_ran(Timestamp::new(4_600));
        assert!(!cadence.is_due(Timestamp::new(4_601)));
        assert_eq!(cadence.next_due(), Timestamp::new(8_200));
    }

    #[test]
    fn test_cadence_tolerates_clock_going_backwards() {
        let cadence = ReconcileCadence::new(60, Timestamp::new(1_000));
        assert!(!cadence.is_due(Timestamp::new(10)));
    }

    #[tokio::test]
    async fn test_every_tick_scans_but_reconcile_waits_for_interval() {
        let mut scheduler = scheduler(NullStore::new(), 3600);
        scheduler.engine().directory().set_likers(vec![liker("did:plc:a")]);

        let first = scheduler.tick_once().await;
        assert_eq!(first.scan.issued, 1);
        assert!(first.reconcile.is_none());

        scheduler.engine().clock().advance(60);
        scheduler
            .engine()
            .directory()
            .set_likers(vec![liker("did:plc:a"), liker("did:plc:b")]);
        let second = scheduler.tick_once().await;
        assert_eq!(second.scan.issued, 1);
        assert!(second.reconcile.is_none());
    }

    #[tokio::test]
    async fn test_reconcile_runs_once_per_interval() {
        let store = NullStore::new();
        store.seed(AccountRecord::verified(
            AccountId::new("did:plc:a"),
            Handle::new("a"),
            "a".into(),
            Timestamp::new(START - 10),
        ));
        let mut scheduler = scheduler(store, 3600);
        let a = AccountId::new("did:plc:a");
        scheduler.engine().directory().set_profile(
            &a,
            Profile {
                handle: Handle::new("a"),
                display_name: None,
            },
        );

        scheduler.engine().clock().advance(3600);
        let tick = scheduler.tick_once().await;
        assert_eq!(tick.reconcile.map(|r| r.checked), Some(1));
        assert_eq!(scheduler.cadence().last_run(), Timestamp::new(START + 3600));

        scheduler.engine().clock().advance(60);
        assert!(scheduler.tick_once().await.reconcile.is_none());
        assert_eq!(scheduler.engine().directory().resolve_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_run_returns_immediately_on_pending_shutdown() {
        let mut scheduler = scheduler(NullStore::new(), 3600);
        scheduler.engine().directory().set_likers(vec![liker("did:plc:a")]);
        let controller = ShutdownController::new();
        let rx = controller.subscribe();
        controller.shutdown();

        scheduler.run(rx).await;
        assert!(scheduler.engine().directory().issued().is_empty());
    }

    #[tokio::test]
    async fn test_run_ticks_until_shutdown() {
        let mut scheduler = scheduler(NullStore::new(), 3600);
        scheduler.engine().directory().set_likers(vec![liker("did:plc:a")]);
        let controller = ShutdownController::new();
        let rx = controller.subscribe();

        let stop = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            controller.shutdown();
        };
        tokio::join!(scheduler.run(rx), stop);

        assert_eq!(scheduler.engine().directory().issued().len(), 1);
        assert!(scheduler.engine().verified().contains(&AccountId::new("did:plc:a")));
    }
}
