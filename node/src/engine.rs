//! Verification engine: per-account attestation lifecycle.
//!
//! Two operations drive everything:
//! - [`VerificationEngine::scan_new_likers`] issues one attestation for every
//!   liker not yet in the verified set.
//! - [`VerificationEngine::reconcile_all`] re-resolves every verified account
//!   and re-issues when its identity drifted, honouring per-account pauses.
//!
//! Failures are isolated per account: they are logged, counted in the
//! returned report, and retried by the next scheduled pass. Issuance happens
//! before persistence, so a crash or store failure in between leads to a
//! duplicate attestation later, never to a silently skipped account.

use likewatch_directory::Directory;
use likewatch_store::{AccountRecord, VerificationStore};
use likewatch_types::{AccountId, Clock, Liker, PostUri, Timestamp};
use likewatch_utils::format_duration;

use crate::classifier::{classify_failure, ErrorAction, PAUSE_DURATION_SECS};
use crate::policy::ReissuePolicy;
use crate::verified_set::VerifiedSet;
use crate::NodeError;

/// Outcome of one likes scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Likers returned by the directory.
    pub seen: usize,
    /// New accounts attested and persisted.
    pub issued: usize,
    /// New accounts whose issuance or persistence failed.
    pub failed: usize,
    /// Likers already in the verified set.
    pub skipped: usize,
}

/// Outcome of one reconciliation sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Accounts whose profile was resolved.
    pub checked: usize,
    pub unchanged: usize,
    pub reissued: usize,
    /// Display name persisted without a new attestation.
    pub display_name_updated: usize,
    /// Accounts newly paused by this sweep.
    pub paused: usize,
    /// Accounts skipped because their pause is still running.
    pub skipped_paused: usize,
    /// Expired pauses cleared by this sweep.
    pub unpaused: usize,
    pub failed: usize,
}

/// Owns the verified-set cache and drives store and directory calls.
pub struct VerificationEngine<S, D, C> {
    store: S,
    directory: D,
    clock: C,
    post: PostUri,
    policy: ReissuePolicy,
    verified: VerifiedSet,
}

impl<S, D, C> VerificationEngine<S, D, C>
where
    S: VerificationStore,
    D: Directory,
    C: Clock,
{
    /// Build an engine and load the verified set from `store`.
    ///
    /// A store failure here is a startup failure and is returned to the caller.
    pub fn new(
        store: S,
        directory: D,
        clock: C,
        post: PostUri,
        policy: ReissuePolicy,
    ) -> Result<Self, NodeError> {
        let verified = VerifiedSet::load(&store)?;
        Ok(Self {
            store,
            directory,
            clock,
            post,
            policy,
            verified,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn post(&self) -> &PostUri {
        &self.post
    }

    pub fn policy(&self) -> ReissuePolicy {
        self.policy
    }

    pub fn verified(&self) -> &VerifiedSet {
        &self.verified
    }

    /// List the post's likers and attest every account not seen before.
    ///
    /// A listing failure yields an empty report; the next tick retries.
    pub async fn scan_new_likers(&mut self) -> ScanReport {
        match self.directory.list_likers(&self.post).await {
            Ok(likers) => self.process_likers(&likers).await,
            Err(e) => {
                tracing::warn!(post = %self.post, "failed to list likers: {e}");
                ScanReport::default()
            }
        }
    }

    /// Attest every liker in `likers` that is not in the verified set, in order.
    pub async fn process_likers(&mut self, likers: &[Liker]) -> ScanReport {
        let mut report = ScanReport {
            seen: likers.len(),
            ..ScanReport::default()
        };

        for liker in likers {
            if self.verified.contains(&liker.account_id) {
                report.skipped += 1;
                continue;
            }
            match self.verify_new(liker).await {
                Ok(()) => report.issued += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        account = %liker.account_id,
                        handle = %liker.handle,
                        "failed to verify new liker: {e}"
                    );
                }
            }
        }

        if report.issued > 0 || report.failed > 0 {
            tracing::info!(
                seen = report.seen,
                issued = report.issued,
                failed = report.failed,
                "likes scan complete"
            );
        }
        report
    }

    async fn verify_new(&mut self, liker: &Liker) -> Result<(), NodeError> {
        let display_name = liker.effective_display_name();
        let issued_at = self.clock.now();

        let attestation = self
            .directory
            .issue_attestation(&liker.account_id, &liker.handle, &display_name, issued_at)
            .await?;

        let record = AccountRecord::verified(
            liker.account_id.clone(),
            liker.handle.clone(),
            display_name,
            issued_at,
        );
        // Membership only advances once the write lands; otherwise the
        // next scan issues again.
        self.store.mark_verified(&record)?;
        self.verified.add(liker.account_id.clone());

        tracing::info!(
            account = %liker.account_id,
            handle = %liker.handle,
            attestation = %attestation.uri,
            issued_at = %issued_at.to_rfc3339(),
            "verified new liker"
        );
        Ok(())
    }

    /// Re-check every verified account for handle or display-name drift.
    pub async fn reconcile_all(&mut self) -> ReconcileReport {
        let accounts = self.verified.ids();
        tracing::info!(accounts = accounts.len(), "starting consistency check");

        let mut report = ReconcileReport::default();
        for account in &accounts {
            if let Err(e) = self.reconcile_account(account, &mut report).await {
                self.handle_reconcile_failure(account, e, &mut report);
            }
        }

        tracing::info!(
            checked = report.checked,
            reissued = report.reissued,
            display_name_updated = report.display_name_updated,
            paused = report.paused,
            skipped_paused = report.skipped_paused,
            failed = report.failed,
            "consistency check complete"
        );
        report
    }

    async fn reconcile_account(
        &self,
        account: &AccountId,
        report: &mut ReconcileReport,
    ) -> Result<(), NodeError> {
        let mut record = self.store.get_record(account)?;

        let now = self.clock.now();
        if let Some(r) = record.as_mut().filter(|r| r.paused_until.is_some()) {
            if r.is_paused(now) {
                let remaining = r.paused_until.map_or(0, |until| until.secs_until(now));
                report.skipped_paused += 1;
                tracing::info!(
                    account = %account,
                    remaining = %format_duration(remaining),
                    "account paused, skipping consistency check"
                );
                return Ok(());
            }
            self.store.clear_pause(account)?;
            r.paused_until = None;
            report.unpaused += 1;
            tracing::info!(account = %account, "pause expired, resuming checks");
        }

        let profile = self.directory.resolve_profile(account).await?;
        report.checked += 1;
        let new_handle = profile.handle.clone();
        let new_display_name = profile.effective_display_name();

        let Some(mut record) = record else {
            // In the verified set without a record: rebuild it from scratch.
            tracing::warn!(account = %account, "verified account has no record, re-issuing");
            let issued_at = self.next_issued_at(None);
            self.directory
                .issue_attestation(account, &new_handle, &new_display_name, issued_at)
                .await?;
            self.store.put_record(&AccountRecord::verified(
                account.clone(),
                new_handle,
                new_display_name,
                issued_at,
            ))?;
            report.reissued += 1;
            return Ok(());
        };

        let handle_changed = record.handle != new_handle;
        let display_name_changed = record.display_name != new_display_name;
        if !handle_changed && !display_name_changed {
            report.unchanged += 1;
            return Ok(());
        }

        if self.policy.should_reissue(handle_changed, display_name_changed) {
            let issued_at = self.next_issued_at(Some(record.issued_at));
            let attestation = self
                .directory
                .issue_attestation(account, &new_handle, &new_display_name, issued_at)
                .await?;
            let previous_handle = std::mem::replace(&mut record.handle, new_handle);
            record.display_name = new_display_name;
            record.issued_at = issued_at;
            record.verified = true;
            self.store.put_record(&record)?;
            report.reissued += 1;
            tracing::info!(
                account = %account,
                previous_handle = %previous_handle,
                handle = %record.handle,
                display_name = %record.display_name,
                attestation = %attestation.uri,
                "identity changed, re-verified"
            );
        } else {
            record.display_name = new_display_name;
            self.store.put_record(&record)?;
            report.display_name_updated += 1;
            tracing::info!(
                account = %account,
                display_name = %record.display_name,
                "updated display name"
            );
        }
        Ok(())
    }

    fn handle_reconcile_failure(
        &self,
        account: &AccountId,
        error: NodeError,
        report: &mut ReconcileReport,
    ) {
        match classify_failure(&error) {
            ErrorAction::PauseAccount24h => {
                let until = self.clock.now().saturating_add(PAUSE_DURATION_SECS);
                match self.store.set_pause_until(account, until) {
                    Ok(()) => {
                        report.paused += 1;
                        tracing::warn!(
                            account = %account,
                            paused_for = %format_duration(PAUSE_DURATION_SECS),
                            "account deactivated, pausing checks"
                        );
                    }
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(account = %account, "failed to record pause: {e}");
                    }
                }
            }
            ErrorAction::IgnoreAndContinue => {
                report.failed += 1;
                tracing::debug!(account = %account, "skipping consistency check: {error}");
            }
            ErrorAction::IgnoreAndContinueWithWarning => {
                report.failed += 1;
                tracing::warn!(
                    account = %account,
                    "failed to check/update handle/display name: {error}"
                );
            }
        }
    }

    /// Issuance time that never goes backwards for one account.
    fn next_issued_at(&self, previous: Option<Timestamp>) -> Timestamp {
        let now = self.clock.now();
        previous.map_or(now, |prev| now.max(prev))
    }
}
