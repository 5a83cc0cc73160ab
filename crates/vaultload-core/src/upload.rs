//! Upload orchestration.
//!
//! [`UploadOrchestrator`] owns the per-secret results for one batch of parsed
//! records and drives a [`SecretsGateway`] over every group, strictly one
//! write at a time. After each write it publishes a full copy of the result
//! list on a `watch` channel so a UI can render progress without sharing
//! mutable state with the run.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::Session;
use crate::gateway::{SecretWrite, SecretsGateway};
use crate::group::{GroupedSecrets, group_records};
use crate::parser::SecretRecord;

/// Message recorded for a secret that was stored.
pub const SUCCESS_MESSAGE: &str = "Successfully stored";

/// Pause between consecutive writes.
pub const DEFAULT_PACE: Duration = Duration::from_millis(200);

/// State of one secret within a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// Not attempted yet in this pass.
    #[default]
    Pending,
    /// Stored.
    Success,
    /// The write failed; the result message says why.
    Error,
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Success => f.write_str("success"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Where and when a write was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptAudit {
    /// Base path (no trailing slash) + `/` + secret name.
    pub full_path: String,
    /// When the write settled.
    pub timestamp: DateTime<Utc>,
    /// Namespace used, if any.
    pub namespace: Option<String>,
    /// Backend URL used.
    pub backend_url: String,
    /// Base path as configured.
    pub base_path: String,
}

/// Outcome for one secret (one group).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    /// Group name, used as the secret name.
    pub secret_name: String,
    /// Current state for this pass.
    pub status: UploadStatus,
    /// Success text or the backend's error message.
    pub message: Option<String>,
    /// Audit data, present once the secret was attempted.
    pub attempt: Option<AttemptAudit>,
}

impl UploadResult {
    fn pending(secret_name: &str) -> Self {
        Self {
            secret_name: secret_name.to_owned(),
            status: UploadStatus::Pending,
            message: None,
            attempt: None,
        }
    }

    fn clear(&mut self) {
        self.status = UploadStatus::Pending;
        self.message = None;
        self.attempt = None;
    }
}

/// Copy of the run state published after every step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadSnapshot {
    /// Every result, in first-seen group order.
    pub results: Vec<UploadResult>,
    /// Secrets settled so far in this pass.
    pub completed: usize,
    /// Secrets in the batch.
    pub total: usize,
    /// Percentage in `0.0..=100.0`.
    pub progress: f64,
}

impl UploadSnapshot {
    /// Progress rounded for display.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        // Clamped to 0..=100 before the cast.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pct = self.progress.round().clamp(0.0, 100.0) as u8;
        pct
    }
}

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every secret was stored.
    AllSucceeded,
    /// Some secrets were stored and some failed.
    Partial,
    /// No secret was stored.
    AllFailed,
    /// Stopped early; some secrets were never attempted.
    Cancelled,
}

/// Aggregate result of one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    /// Identifier of this pass, as logged.
    pub run_id: Uuid,
    /// Secrets stored.
    pub succeeded: usize,
    /// Secrets the backend rejected.
    pub failed: usize,
    /// Secrets left pending by cancellation.
    pub not_attempted: usize,
    /// Classification of the pass.
    pub outcome: RunOutcome,
    /// Aggregate message shown to the user.
    pub message: String,
}

impl UploadSummary {
    fn new(run_id: Uuid, results: &[UploadResult], cancelled: bool) -> Self {
        let count = |status: UploadStatus| results.iter().filter(|r| r.status == status).count();
        let succeeded = count(UploadStatus::Success);
        let failed = count(UploadStatus::Error);
        let not_attempted = count(UploadStatus::Pending);

        let outcome = if cancelled && not_attempted > 0 {
            RunOutcome::Cancelled
        } else if failed == 0 {
            RunOutcome::AllSucceeded
        } else if succeeded == 0 {
            RunOutcome::AllFailed
        } else {
            RunOutcome::Partial
        };

        let message = match outcome {
            RunOutcome::Cancelled => format!(
                "Upload cancelled. {succeeded} succeeded, {failed} failed, {not_attempted} not attempted."
            ),
            RunOutcome::AllSucceeded => format!("All {succeeded} secrets uploaded successfully!"),
            RunOutcome::Partial | RunOutcome::AllFailed => {
                format!("{failed} secrets failed to upload. {succeeded} succeeded.")
            }
        };

        Self {
            run_id,
            succeeded,
            failed,
            not_attempted,
            outcome,
            message,
        }
    }

    /// `true` when every secret was stored.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::AllSucceeded
    }
}

/// Drives the upload of one batch of records.
#[derive(Debug)]
pub struct UploadOrchestrator {
    grouped: GroupedSecrets,
    results: Vec<UploadResult>,
    completed: usize,
    pace: Duration,
    snapshots: watch::Sender<UploadSnapshot>,
}

impl UploadOrchestrator {
    /// Group `records` and create one pending result per group.
    #[must_use]
    pub fn new(records: &[SecretRecord]) -> Self {
        let grouped = group_records(records);
        let results: Vec<UploadResult> = grouped.names().map(UploadResult::pending).collect();
        let (snapshots, _) = watch::channel(snapshot_of(&results, 0));
        Self {
            grouped,
            results,
            completed: 0,
            pace: DEFAULT_PACE,
            snapshots,
        }
    }

    /// Override the pause between writes. Zero disables pacing.
    #[must_use]
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    /// The grouped data this orchestrator uploads.
    #[must_use]
    pub fn grouped(&self) -> &GroupedSecrets {
        &self.grouped
    }

    /// Current per-secret results, in first-seen group order.
    #[must_use]
    pub fn results(&self) -> &[UploadResult] {
        &self.results
    }

    /// Percentage of secrets settled in the current pass.
    #[must_use]
    pub fn progress(&self) -> f64 {
        progress(self.completed, self.results.len())
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> UploadSnapshot {
        snapshot_of(&self.results, self.completed)
    }

    /// Receive a snapshot after every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<UploadSnapshot> {
        self.snapshots.subscribe()
    }

    /// Put every result back to pending. Grouped data is untouched.
    pub fn reset(&mut self) {
        for result in &mut self.results {
            result.clear();
        }
        self.completed = 0;
        self.snapshots.send_replace(self.snapshot());
    }

    /// Upload every group once, in order, using the session's settings.
    ///
    /// Each pass starts from a clean slate. Failures are recorded on the
    /// affected secret and never stop the loop; only `cancel` does, and it
    /// is honored between writes and during the pacing pause.
    pub async fn run<G>(
        &mut self,
        gateway: &G,
        session: &Session,
        cancel: &CancellationToken,
    ) -> UploadSummary
    where
        G: SecretsGateway + ?Sized,
    {
        self.reset();

        let run_id = Uuid::new_v4();
        let config = session.config();
        let total = self.results.len();
        info!(%run_id, total, base_path = config.base_path(), "upload started");

        let mut cancelled = false;
        for (index, group) in self.grouped.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let write = SecretWrite {
                base_url: config.backend_url(),
                token: session.token(),
                namespace: config.namespace(),
                base_path: config.base_path(),
                secret_name: &group.name,
                data: &group.data,
            };
            let outcome = gateway.write_secret(&write).await;

            let Some(result) = self.results.get_mut(index) else {
                break;
            };
            match outcome {
                Ok(()) => {
                    debug!(%run_id, secret = %group.name, "secret stored");
                    result.status = UploadStatus::Success;
                    result.message = Some(SUCCESS_MESSAGE.to_owned());
                }
                Err(e) => {
                    warn!(%run_id, secret = %group.name, error = %e, "secret upload failed");
                    result.status = UploadStatus::Error;
                    result.message = Some(e.to_string());
                }
            }
            result.attempt = Some(AttemptAudit {
                full_path: format!(
                    "{}/{}",
                    config.base_path().trim_end_matches('/'),
                    group.name
                ),
                timestamp: Utc::now(),
                namespace: config.namespace().map(str::to_owned),
                backend_url: config.backend_url().to_owned(),
                base_path: config.base_path().to_owned(),
            });

            self.completed += 1;
            self.snapshots
                .send_replace(snapshot_of(&self.results, self.completed));

            if index + 1 < total && !self.pace.is_zero() {
                tokio::select! {
                    () = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    () = tokio::time::sleep(self.pace) => {}
                }
            }
        }

        let summary = UploadSummary::new(run_id, &self.results, cancelled);
        info!(
            %run_id,
            succeeded = summary.succeeded,
            failed = summary.failed,
            not_attempted = summary.not_attempted,
            "upload finished"
        );
        summary
    }
}

#[allow(clippy::cast_precision_loss)]
fn progress(completed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    }
}

fn snapshot_of(results: &[UploadResult], completed: usize) -> UploadSnapshot {
    UploadSnapshot {
        results: results.to_vec(),
        completed,
        total: results.len(),
        progress: progress(completed, results.len()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::auth::tests::{ScriptedGateway, token_config};
    use crate::error::GatewayError;

    fn record(group: &str, key: &str, value: &str) -> SecretRecord {
        SecretRecord {
            group_name: group.to_owned(),
            key: key.to_owned(),
            value: value.to_owned(),
        }
    }

    fn session() -> Session {
        Session::new(token_config(), "t1")
    }

    fn orchestrator(records: &[SecretRecord]) -> UploadOrchestrator {
        UploadOrchestrator::new(records).with_pace(Duration::ZERO)
    }

    #[test]
    fn starts_with_one_pending_result_per_group() {
        let orch = orchestrator(&[
            record("b", "k", "1"),
            record("a", "k", "2"),
            record("b", "j", "3"),
        ]);
        let names: Vec<_> = orch.results().iter().map(|r| r.secret_name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert!(orch.results().iter().all(|r| r.status == UploadStatus::Pending));
        assert!(orch.progress().abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn uploads_grouped_secret() {
        let gateway = ScriptedGateway::healthy();
        let mut orch = orchestrator(&[record("svc", "user", "admin"), record("svc", "pass", "x")]);

        let summary = orch
            .run(&gateway, &session(), &CancellationToken::new())
            .await;

        assert_eq!(summary.outcome, RunOutcome::AllSucceeded);
        assert_eq!(summary.message, "All 1 secrets uploaded successfully!");

        let writes = gateway.writes.lock().unwrap().clone();
        assert_eq!(
            writes,
            [(
                "kv/data/app".to_owned(),
                "svc".to_owned(),
                vec![
                    ("user".to_owned(), "admin".to_owned()),
                    ("pass".to_owned(), "x".to_owned())
                ]
            )]
        );

        let result = &orch.results()[0];
        assert_eq!(result.status, UploadStatus::Success);
        assert_eq!(result.message.as_deref(), Some(SUCCESS_MESSAGE));
        let attempt = result.attempt.as_ref().unwrap();
        assert_eq!(attempt.full_path, "kv/data/app/svc");
        assert_eq!(attempt.backend_url, "https://vault.test");
        assert_eq!(attempt.namespace, None);
        assert!((orch.progress() - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn failed_secret_does_not_stop_the_pass() {
        let gateway = ScriptedGateway {
            failing: vec![("b".to_owned(), "permission denied".to_owned())],
            ..ScriptedGateway::healthy()
        };
        let mut orch = orchestrator(&[record("a", "k", "1"), record("b", "k", "2")]);

        let summary = orch
            .run(&gateway, &session(), &CancellationToken::new())
            .await;

        assert_eq!(summary.outcome, RunOutcome::Partial);
        assert_eq!((summary.succeeded, summary.failed), (1, 1));
        assert_eq!(summary.message, "1 secrets failed to upload. 1 succeeded.");

        let b = &orch.results()[1];
        assert_eq!(b.status, UploadStatus::Error);
        assert_eq!(b.message.as_deref(), Some("permission denied"));
    }

    #[tokio::test]
    async fn all_failed_is_classified() {
        let gateway = ScriptedGateway {
            failing: vec![("a".to_owned(), "nope".to_owned())],
            ..ScriptedGateway::healthy()
        };
        let mut orch = orchestrator(&[record("a", "k", "1")]);
        let summary = orch
            .run(&gateway, &session(), &CancellationToken::new())
            .await;
        assert_eq!(summary.outcome, RunOutcome::AllFailed);
        assert!(!summary.is_success());
    }

    #[tokio::test]
    async fn reset_clears_results_but_keeps_groups() {
        let gateway = ScriptedGateway::healthy();
        let mut orch = orchestrator(&[record("a", "k", "1"), record("b", "k", "2")]);
        orch.run(&gateway, &session(), &CancellationToken::new())
            .await;

        orch.reset();

        assert!(orch.results().iter().all(|r| {
            r.status == UploadStatus::Pending && r.message.is_none() && r.attempt.is_none()
        }));
        assert!(orch.progress().abs() < f64::EPSILON);
        assert_eq!(orch.grouped().len(), 2);
        assert_eq!(orch.grouped().get("a").unwrap().get("k"), Some("1"));
    }

    #[tokio::test]
    async fn snapshots_follow_the_run() {
        let gateway = ScriptedGateway::healthy();
        let mut orch = orchestrator(&[record("a", "k", "1"), record("b", "k", "2")]);
        let rx = orch.subscribe();

        orch.run(&gateway, &session(), &CancellationToken::new())
            .await;

        let last = rx.borrow().clone();
        assert_eq!(last.completed, 2);
        assert_eq!(last.total, 2);
        assert_eq!(last.progress_percent(), 100);
        assert_eq!(last.results, orch.results());
    }

    /// Records the published snapshot at the moment of each write.
    struct ObservingGateway {
        snapshots: watch::Receiver<UploadSnapshot>,
        seen: std::sync::Mutex<Vec<UploadSnapshot>>,
    }

    #[async_trait]
    impl SecretsGateway for ObservingGateway {
        async fn test_connection(&self, _: &str, _: &str) -> bool {
            true
        }

        async fn authenticate_token(
            &self,
            _: &str,
            token: &str,
            _: Option<&str>,
        ) -> Result<String, GatewayError> {
            Ok(token.to_owned())
        }

        async fn authenticate_approle(
            &self,
            _: &str,
            _: &str,
            _: &str,
            _: Option<&str>,
        ) -> Result<String, GatewayError> {
            Ok("issued".to_owned())
        }

        async fn write_secret(&self, write: &SecretWrite<'_>) -> Result<(), GatewayError> {
            let current = self.snapshots.borrow().clone();
            self.seen.lock().unwrap().push(current);
            if write.secret_name == "b" {
                return Err(GatewayError::Backend {
                    status: 403,
                    message: "permission denied".to_owned(),
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn snapshot_is_published_after_each_settlement() {
        let mut orch = orchestrator(&[
            record("a", "k", "1"),
            record("b", "k", "2"),
            record("c", "k", "3"),
        ]);
        let gateway = ObservingGateway {
            snapshots: orch.subscribe(),
            seen: std::sync::Mutex::new(Vec::new()),
        };

        orch.run(&gateway, &session(), &CancellationToken::new())
            .await;

        let seen = gateway.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 3);
        let completed: Vec<_> = seen.iter().map(|s| s.completed).collect();
        assert_eq!(completed, [0, 1, 2]);
        assert_eq!(seen[0].progress_percent(), 0);
        assert_eq!(seen[1].progress_percent(), 33);
        assert_eq!(seen[2].progress_percent(), 67);

        let statuses = |snapshot: &UploadSnapshot| -> Vec<UploadStatus> {
            snapshot.results.iter().map(|r| r.status).collect()
        };
        assert_eq!(
            statuses(&seen[0]),
            [UploadStatus::Pending, UploadStatus::Pending, UploadStatus::Pending]
        );
        assert_eq!(
            statuses(&seen[1]),
            [UploadStatus::Success, UploadStatus::Pending, UploadStatus::Pending]
        );
        assert_eq!(
            statuses(&seen[2]),
            [UploadStatus::Success, UploadStatus::Error, UploadStatus::Pending]
        );
        assert_eq!(seen[2].results[1].message.as_deref(), Some("permission denied"));
        assert!(seen[2].results[0].attempt.is_some());
    }

    #[tokio::test]
    async fn cancelled_before_start_attempts_nothing() {
        let gateway = ScriptedGateway::healthy();
        let mut orch = orchestrator(&[record("a", "k", "1")]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = orch.run(&gateway, &session(), &cancel).await;

        assert_eq!(summary.outcome, RunOutcome::Cancelled);
        assert_eq!(summary.not_attempted, 1);
        assert!(gateway.writes.lock().unwrap().is_empty());
    }

    /// Cancels the run from inside the first write.
    struct CancellingGateway {
        cancel: CancellationToken,
    }

    #[async_trait]
    impl SecretsGateway for CancellingGateway {
        async fn test_connection(&self, _: &str, _: &str) -> bool {
            true
        }

        async fn authenticate_token(
            &self,
            _: &str,
            token: &str,
            _: Option<&str>,
        ) -> Result<String, GatewayError> {
            Ok(token.to_owned())
        }

        async fn authenticate_approle(
            &self,
            _: &str,
            _: &str,
            _: &str,
            _: Option<&str>,
        ) -> Result<String, GatewayError> {
            Ok("issued".to_owned())
        }

        async fn write_secret(&self, _: &SecretWrite<'_>) -> Result<(), GatewayError> {
            self.cancel.cancel();
            Ok(())
        }
    }

    #[tokio::test]
    async fn cancellation_interrupts_pacing() {
        let cancel = CancellationToken::new();
        let gateway = CancellingGateway {
            cancel: cancel.clone(),
        };
        let mut orch = UploadOrchestrator::new(&[
            record("a", "k", "1"),
            record("b", "k", "2"),
            record("c", "k", "3"),
        ])
        .with_pace(Duration::from_secs(3600));

        let summary = orch.run(&gateway, &session(), &cancel).await;

        assert_eq!(summary.outcome, RunOutcome::Cancelled);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.not_attempted, 2);
        assert_eq!(
            summary.message,
            "Upload cancelled. 1 succeeded, 0 failed, 2 not attempted."
        );
        assert_eq!(orch.results()[1].status, UploadStatus::Pending);
    }

    #[test]
    fn empty_batch_counts_as_success() {
        let summary = UploadSummary::new(Uuid::new_v4(), &[], false);
        assert_eq!(summary.outcome, RunOutcome::AllSucceeded);
        assert_eq!(summary.message, "All 0 secrets uploaded successfully!");
    }
}
