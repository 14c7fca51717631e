//! Session-owning workflow state machine
//!
//! Holds the single in-flight file and its scan result. Each `submit` starts a
//! new generation; async continuations compare their generation with the
//! session's before touching state, so a late reply for a replaced file is
//! dropped instead of clobbering the newer one.

use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};

use super::state::{IntakeOutcome, Notice, WorkflowSnapshot, WorkflowState};
use crate::config::ClientConfig;
use crate::error::WorkflowError;
use crate::http::Transport;
use crate::intake::{CandidateFile, FileIntake, FileIntakeValidator};
use crate::remediation::{RemediationAction, RemediationExecutor, RemediationReport};
use crate::scan::{ProgressCallback, ScanDispatcher, ScanResult};
use crate::sink::ArtifactSink;

const NOTICE_CAPACITY: usize = 64;

#[derive(Default)]
struct Session {
    generation: u64,
    intake: Option<FileIntake>,
    result: Option<ScanResult>,
}

struct Inner {
    session: Mutex<Session>,
    snapshot: watch::Sender<WorkflowSnapshot>,
    notices: broadcast::Sender<Notice>,
    validator: FileIntakeValidator,
    scanner: ScanDispatcher,
    executor: RemediationExecutor,
}

#[derive(Clone)]
pub struct WorkflowStateMachine {
    inner: Arc<Inner>,
}

impl WorkflowStateMachine {
    pub fn new(config: &ClientConfig, transport: Arc<dyn Transport>, sink: Arc<dyn ArtifactSink>) -> Self {
        let (snapshot, _) = watch::channel(WorkflowSnapshot::idle(0));
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                session: Mutex::new(Session::default()),
                snapshot,
                notices,
                validator: FileIntakeValidator::new(),
                scanner: ScanDispatcher::new(
                    Arc::clone(&transport),
                    config.scan_error_policy,
                    config.progress_tick,
                ),
                executor: RemediationExecutor::new(transport, sink),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowSnapshot> {
        self.inner.snapshot.subscribe()
    }

    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notices.subscribe()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn state(&self) -> WorkflowState {
        self.inner.snapshot.borrow().state.clone()
    }

    /// Validate and scan a newly selected file, replacing whatever was loaded
    pub async fn submit(&self, candidate: CandidateFile) -> IntakeOutcome {
        let (generation, intake) = {
            let mut session = self.inner.session.lock().await;
            session.generation += 1;
            session.intake = None;
            session.result = None;
            let generation = session.generation;

            let name = candidate.name.clone();
            self.publish(|s| {
                *s = WorkflowSnapshot::idle(generation);
                s.state = WorkflowState::Validating;
                s.file_name = Some(name);
            });

            match self.inner.validator.validate(candidate) {
                Ok(intake) => {
                    session.intake = Some(intake.clone());
                    let lane = intake.lane;
                    self.publish(|s| {
                        s.state = WorkflowState::Scanning;
                        s.lane = Some(lane);
                    });
                    (generation, intake)
                }
                Err(rejection) => {
                    tracing::info!("[Workflow] Rejected {}", rejection);
                    self.publish(|s| *s = WorkflowSnapshot::idle(generation));
                    self.notify(Notice::Rejected {
                        rejection: rejection.clone(),
                    });
                    return IntakeOutcome::Rejected(rejection);
                }
            }
        };

        let outcome = self
            .inner
            .scanner
            .scan(&intake, self.progress_callback(generation))
            .await;

        let mut session = self.inner.session.lock().await;
        if session.generation != generation {
            tracing::debug!("[Workflow] Dropping stale scan of {}", intake.name);
            return IntakeOutcome::Superseded;
        }

        match outcome {
            Ok(result) => {
                if let Some(reason) = &result.degraded {
                    self.notify(Notice::ScanDegraded {
                        file_name: intake.name.clone(),
                        reason: reason.clone(),
                    });
                }
                let state = if result.is_safe() {
                    WorkflowState::Safe
                } else {
                    WorkflowState::Reviewing
                };
                session.result = Some(result.clone());
                let published = result.clone();
                self.publish(|s| {
                    s.state = state;
                    s.progress = 100;
                    s.scan_result = Some(published);
                });
                IntakeOutcome::Scanned(result)
            }
            Err(error) => {
                let error = WorkflowError::from(error);
                self.fail(error.to_string());
                IntakeOutcome::Failed(error)
            }
        }
    }

    /// Flip whether a zone is revealed; returns the new reveal state
    pub async fn toggle_zone(&self, index: usize) -> Result<bool, WorkflowError> {
        let session = self.inner.session.lock().await;
        let state = self.state();
        if state != WorkflowState::Reviewing {
            return Err(WorkflowError::InvalidTransition {
                state,
                attempted: "toggle a zone".to_string(),
            });
        }

        let count = session.result.as_ref().map_or(0, |r| r.zones().len());
        if index >= count {
            return Err(WorkflowError::ZoneOutOfRange { index, count });
        }

        let mut revealed = false;
        self.publish(|s| {
            revealed = s.revealed_zones.insert(index);
            if !revealed {
                s.revealed_zones.remove(&index);
            }
        });
        Ok(revealed)
    }

    /// Run a remediation chain on the loaded file
    pub async fn remediate(&self, action: RemediationAction) -> Result<RemediationReport, WorkflowError> {
        let (generation, intake) = {
            let session = self.inner.session.lock().await;
            let state = self.state();
            if !state.accepts_remediation() {
                return Err(WorkflowError::InvalidTransition {
                    state,
                    attempted: action.to_string(),
                });
            }

            let (intake, result) = match (&session.intake, &session.result) {
                (Some(intake), Some(result)) => (intake, result),
                _ => return Err(WorkflowError::NoActiveFile),
            };
            if !action.applies_to(result.is_safe()) {
                return Err(WorkflowError::InvalidTransition {
                    state,
                    attempted: action.to_string(),
                });
            }

            self.publish(|s| s.state = WorkflowState::Remediating { action });
            (session.generation, intake.clone())
        };

        let prepared = self.inner.executor.prepare(&intake, action).await;

        let artifact = {
            let _session = self.current(generation).await?;
            let artifact = match prepared {
                Ok(artifact) => artifact,
                Err(e) => {
                    let error = WorkflowError::from(e);
                    self.fail(error.to_string());
                    return Err(error);
                }
            };

            if let Some(warning) = &artifact.recovery_warning {
                self.notify(Notice::RecoveryMaterialUnavailable {
                    warning: warning.clone(),
                });
            } else if let Some(path) = &artifact.recovery_saved_to {
                self.notify(Notice::RecoveryMaterialSaved { path: path.clone() });
            }
            self.publish(|s| s.state = WorkflowState::Uploading { action });
            artifact
        };

        let delivered = self.inner.executor.deliver(artifact).await;

        let _session = self.current(generation).await?;
        match delivered {
            Ok(report) => {
                tracing::info!("[Workflow] {}: {}", intake.name, report.message);
                let message = report.message.clone();
                self.publish(|s| {
                    s.state = WorkflowState::Completed {
                        message: message.clone(),
                    }
                });
                self.notify(Notice::Completed { message });
                Ok(report)
            }
            Err(e) => {
                let error = WorkflowError::from(e);
                self.fail(error.to_string());
                Err(error)
            }
        }
    }

    /// Drop the loaded file and go back to `Idle`
    pub async fn cancel(&self) -> Result<(), WorkflowError> {
        let mut session = self.inner.session.lock().await;
        let state = self.state();
        if !matches!(state, WorkflowState::Safe | WorkflowState::Reviewing) && !state.is_terminal() {
            return Err(WorkflowError::InvalidTransition {
                state,
                attempted: "cancel".to_string(),
            });
        }
        self.reset(&mut session);
        Ok(())
    }

    /// Dismiss a finished run
    pub async fn acknowledge(&self) -> Result<(), WorkflowError> {
        let mut session = self.inner.session.lock().await;
        let state = self.state();
        if !state.is_terminal() {
            return Err(WorkflowError::InvalidTransition {
                state,
                attempted: "acknowledge".to_string(),
            });
        }
        self.reset(&mut session);
        Ok(())
    }

    fn reset(&self, session: &mut Session) {
        session.generation += 1;
        session.intake = None;
        session.result = None;
        let generation = session.generation;
        self.publish(|s| *s = WorkflowSnapshot::idle(generation));
    }

    /// Lock the session if it still belongs to `generation`
    async fn current(&self, generation: u64) -> Result<tokio::sync::MutexGuard<'_, Session>, WorkflowError> {
        let session = self.inner.session.lock().await;
        if session.generation != generation {
            tracing::debug!("[Workflow] Dropping stale remediation result (generation {})", generation);
            return Err(WorkflowError::Superseded);
        }
        Ok(session)
    }

    fn fail(&self, message: String) {
        tracing::warn!("[Workflow] Failed: {}", message);
        let published = message.clone();
        self.publish(|s| s.state = WorkflowState::Failed { message: published });
        self.notify(Notice::Failed { message });
    }

    fn publish(&self, modify: impl FnOnce(&mut WorkflowSnapshot)) {
        self.inner.snapshot.send_modify(modify);
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is fine
        let _ = self.inner.notices.send(notice);
    }

    fn progress_callback(&self, generation: u64) -> ProgressCallback {
        let inner = Arc::clone(&self.inner);
        Arc::new(move |progress| {
            inner.snapshot.send_if_modified(|s| {
                if s.generation != generation || s.state != WorkflowState::Scanning || s.progress == progress {
                    return false;
                }
                s.progress = progress;
                true
            });
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanErrorPolicy;
    use crate::http::testing::ScriptedTransport;
    use crate::http::HttpReply;
    use crate::intake::Lane;
    use crate::scan::{DEGRADED_CONFIDENCE, NO_FINDINGS_CONFIDENCE};
    use crate::sink::testing::MemorySink;
    use serde_json::json;
    use std::time::Duration;

    fn config(policy: ScanErrorPolicy) -> ClientConfig {
        ClientConfig {
            scan_error_policy: policy,
            progress_tick: Duration::from_millis(5),
            ..ClientConfig::default()
        }
    }

    fn machine(transport: &Arc<ScriptedTransport>) -> WorkflowStateMachine {
        WorkflowStateMachine::new(
            &config(ScanErrorPolicy::FailOpen),
            transport.clone(),
            Arc::new(MemorySink::default()),
        )
    }

    fn document(name: &str) -> CandidateFile {
        CandidateFile::new(name, "application/pdf", b"%PDF-1.7".to_vec())
    }

    fn image(name: &str) -> CandidateFile {
        CandidateFile::new(name, "image/png", vec![0x89, 0x50, 0x4e, 0x47])
    }

    fn two_zones() -> HttpReply {
        HttpReply::json(
            200,
            json!({
                "zones": [
                    {"bbox": [1, 2, 3, 4], "label": "name", "texte": "Jane", "confidence": 0.9},
                    {"bbox": [5, 6, 7, 8], "label": "iban", "texte": "FR76", "confidence": 0.7}
                ],
                "total_zones": 2
            }),
        )
    }

    #[tokio::test]
    async fn test_clean_document_goes_to_safe() {
        let transport = ScriptedTransport::new();
        transport.reply("POST detectfiles", HttpReply::json(200, json!({"detected": {"0": []}})));
        let workflow = machine(&transport);

        let outcome = workflow.submit(document("clean.pdf")).await;

        let IntakeOutcome::Scanned(result) = outcome else {
            panic!("expected a scan result, got {:?}", outcome);
        };
        assert!(result.is_safe());
        assert_eq!(result.confidence_score, NO_FINDINGS_CONFIDENCE);

        let snapshot = workflow.snapshot();
        assert_eq!(snapshot.state, WorkflowState::Safe);
        assert_eq!(snapshot.progress, 100);
        assert_eq!(snapshot.lane, Some(Lane::Document));
    }

    #[tokio::test]
    async fn test_image_with_zones_goes_to_reviewing() {
        let transport = ScriptedTransport::new();
        transport.reply("POST upload", two_zones());
        let workflow = machine(&transport);

        let IntakeOutcome::Scanned(result) = workflow.submit(image("id.png")).await else {
            panic!("expected a scan result");
        };
        assert_eq!(result.confidence_score, 80);
        assert!(!result.is_safe());
        assert_eq!(workflow.state(), WorkflowState::Reviewing);
    }

    #[tokio::test]
    async fn test_rejection_makes_no_call() {
        let transport = ScriptedTransport::new();
        let workflow = machine(&transport);
        let mut notices = workflow.notices();

        let outcome = workflow
            .submit(CandidateFile::new("setup.exe", "application/x-msdownload", vec![0x4d]))
            .await;

        assert!(matches!(outcome, IntakeOutcome::Rejected(ref r) if r.extension == "exe"));
        assert!(transport.calls().is_empty());
        assert_eq!(workflow.state(), WorkflowState::Idle);
        assert!(matches!(notices.recv().await.unwrap(), Notice::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_image_scan_failure_is_safe_under_fail_open() {
        let transport = ScriptedTransport::new();
        transport.fail("POST upload", "connection refused");
        let workflow = machine(&transport);
        let mut notices = workflow.notices();

        let IntakeOutcome::Scanned(result) = workflow.submit(image("car.png")).await else {
            panic!("fail-open must never fail the scan");
        };

        assert!(result.is_safe());
        assert_eq!(result.confidence_score, DEGRADED_CONFIDENCE);
        assert_eq!(workflow.state(), WorkflowState::Safe);
        assert!(matches!(notices.recv().await.unwrap(), Notice::ScanDegraded { .. }));
    }

    #[tokio::test]
    async fn test_scan_failure_fails_under_fail_closed() {
        let transport = ScriptedTransport::new();
        transport.reply("POST detectfiles", HttpReply::json(500, json!({"error": "model offline"})));
        let workflow = WorkflowStateMachine::new(
            &config(ScanErrorPolicy::FailClosed),
            transport.clone(),
            Arc::new(MemorySink::default()),
        );

        let outcome = workflow.submit(document("memo.pdf")).await;

        assert!(matches!(outcome, IntakeOutcome::Failed(WorkflowError::Scan(_))));
        assert!(matches!(workflow.state(), WorkflowState::Failed { .. }));
        assert_eq!(
            workflow.remediate(RemediationAction::SafeUpload).await,
            Err(WorkflowError::NoActiveFile)
        );
    }

    #[tokio::test]
    async fn test_safe_upload_completes() {
        let transport = ScriptedTransport::new();
        transport.reply("POST detectfiles", HttpReply::json(200, json!({"detected": {}})));
        transport.reply("POST auth/save_safe_file", HttpReply::json(200, json!({"safe_file": "s/clean.pdf"})));
        transport.reply("POST auth/upload_single_to_drive", HttpReply::json(200, json!({})));
        let workflow = machine(&transport);
        workflow.submit(document("clean.pdf")).await;

        let report = workflow.remediate(RemediationAction::SafeUpload).await.unwrap();

        assert_eq!(report.message, "Safe file uploaded successfully to Drive!");
        assert_eq!(
            workflow.state(),
            WorkflowState::Completed {
                message: report.message.clone()
            }
        );
    }

    // No deduplication: each request makes its own server-side artifact
    #[tokio::test]
    async fn test_safe_upload_twice_makes_two_artifacts() {
        let transport = ScriptedTransport::new();
        transport.reply("POST detectfiles", HttpReply::json(200, json!({"detected": {}})));
        for n in 0..2 {
            transport.reply(
                "POST auth/save_safe_file",
                HttpReply::json(200, json!({"safe_file": format!("s/clean_{}.pdf", n)})),
            );
            transport.reply("POST auth/upload_single_to_drive", HttpReply::json(200, json!({})));
        }
        let workflow = machine(&transport);
        workflow.submit(document("clean.pdf")).await;

        let first = workflow.remediate(RemediationAction::SafeUpload).await.unwrap();
        let second = workflow.remediate(RemediationAction::SafeUpload).await.unwrap();

        assert_ne!(first.uploaded, second.uploaded);
        assert_eq!(transport.count("POST auth/save_safe_file"), 2);
        assert_eq!(transport.count("POST auth/upload_single_to_drive"), 2);
    }

    #[tokio::test]
    async fn test_action_must_fit_verdict() {
        let transport = ScriptedTransport::new();
        transport.reply("POST upload", two_zones());
        let workflow = machine(&transport);
        workflow.submit(image("id.png")).await;

        let err = workflow.remediate(RemediationAction::SafeUpload).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot upload as safe while reviewing");
        assert_eq!(workflow.state(), WorkflowState::Reviewing);
    }

    #[tokio::test]
    async fn test_remediate_from_idle_is_rejected() {
        let transport = ScriptedTransport::new();
        let workflow = machine(&transport);

        let err = workflow.remediate(RemediationAction::MaskAndUpload).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidTransition {
                state: WorkflowState::Idle,
                ..
            }
        ));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remediation_failure_then_retry() {
        let transport = ScriptedTransport::new();
        transport.reply("POST upload", two_zones());
        transport.reply("POST mask", HttpReply::json(500, json!({"error": "mask model crashed"})));
        transport.reply("POST mask", HttpReply::json(200, json!({"masked_image": "m/id.png"})));
        transport.reply("POST auth/upload_single_to_drive", HttpReply::json(200, json!({})));
        let workflow = machine(&transport);
        workflow.submit(image("id.png")).await;

        let err = workflow.remediate(RemediationAction::MaskAndUpload).await.unwrap_err();
        assert_eq!(err.to_string(), "Masked upload failed: mask model crashed");
        assert_eq!(
            workflow.state(),
            WorkflowState::Failed {
                message: "Masked upload failed: mask model crashed".to_string()
            }
        );

        workflow.remediate(RemediationAction::MaskAndUpload).await.unwrap();
        assert!(matches!(workflow.state(), WorkflowState::Completed { .. }));
    }

    #[tokio::test]
    async fn test_stale_remediation_is_dropped() {
        let transport = ScriptedTransport::new();
        transport.reply("POST upload", two_zones());
        let gate = transport.reply_gated("POST mask", HttpReply::json(200, json!({"masked_image": "m/first.png"})));
        transport.reply("POST detectfiles", HttpReply::json(200, json!({"detected": {}})));
        let workflow = machine(&transport);
        workflow.submit(image("first.png")).await;

        let pending = {
            let workflow = workflow.clone();
            tokio::spawn(async move { workflow.remediate(RemediationAction::MaskAndUpload).await })
        };
        while transport.count("POST mask") == 0 {
            tokio::task::yield_now().await;
        }

        // A second file replaces the session while the mask call is in flight
        workflow.submit(document("second.pdf")).await;
        gate.notify_one();

        assert_eq!(pending.await.unwrap(), Err(WorkflowError::Superseded));
        assert_eq!(transport.count("POST auth/upload_single_to_drive"), 0);

        let snapshot = workflow.snapshot();
        assert_eq!(snapshot.file_name.as_deref(), Some("second.pdf"));
        assert_eq!(snapshot.state, WorkflowState::Safe);
    }

    #[tokio::test]
    async fn test_stale_scan_is_dropped() {
        let transport = ScriptedTransport::new();
        let gate = transport.reply_gated("POST upload", two_zones());
        transport.reply("POST detectfiles", HttpReply::json(200, json!({"detected": {}})));
        let workflow = machine(&transport);

        let pending = {
            let workflow = workflow.clone();
            tokio::spawn(async move { workflow.submit(image("slow.png")).await })
        };
        while transport.count("POST upload") == 0 {
            tokio::task::yield_now().await;
        }

        workflow.submit(document("fast.pdf")).await;
        gate.notify_one();

        assert_eq!(pending.await.unwrap(), IntakeOutcome::Superseded);
        assert_eq!(workflow.snapshot().file_name.as_deref(), Some("fast.pdf"));
        assert_eq!(workflow.state(), WorkflowState::Safe);
    }

    #[tokio::test]
    async fn test_toggle_zone() {
        let transport = ScriptedTransport::new();
        transport.reply("POST upload", two_zones());
        let workflow = machine(&transport);
        workflow.submit(image("id.png")).await;

        assert!(workflow.toggle_zone(1).await.unwrap());
        assert!(workflow.snapshot().revealed_zones.contains(&1));
        assert!(!workflow.toggle_zone(1).await.unwrap());
        assert!(workflow.snapshot().revealed_zones.is_empty());
        assert_eq!(
            workflow.toggle_zone(2).await,
            Err(WorkflowError::ZoneOutOfRange { index: 2, count: 2 })
        );
    }

    #[tokio::test]
    async fn test_toggle_outside_review_is_rejected() {
        let transport = ScriptedTransport::new();
        transport.reply("POST detectfiles", HttpReply::json(200, json!({"detected": {}})));
        let workflow = machine(&transport);
        workflow.submit(document("clean.pdf")).await;

        assert!(matches!(
            workflow.toggle_zone(0).await,
            Err(WorkflowError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_and_acknowledge() {
        let transport = ScriptedTransport::new();
        transport.reply("POST upload", two_zones());
        transport.reply("POST encrypt", HttpReply::json(200, json!({"folder": "id", "zones_ciphered": 2})));
        transport.reply("GET data_storage_keys/id_key.key", HttpReply::binary(200, b"k".to_vec()));
        transport.reply("POST auth/upload_folder_to_drive/id", HttpReply::json(200, json!({})));
        let workflow = machine(&transport);

        assert!(workflow.cancel().await.is_err());
        assert!(workflow.acknowledge().await.is_err());

        workflow.submit(image("id.png")).await;
        assert!(workflow.acknowledge().await.is_err());

        let report = workflow.remediate(RemediationAction::EncryptAndUpload).await.unwrap();
        assert_eq!(report.message, "File encrypted! 2 sensitive zone(s) detected.");

        workflow.acknowledge().await.unwrap();
        let snapshot = workflow.snapshot();
        assert_eq!(snapshot.state, WorkflowState::Idle);
        assert!(snapshot.file_name.is_none());
        assert!(snapshot.scan_result.is_none());
        assert_eq!(
            workflow.remediate(RemediationAction::EncryptAndUpload).await,
            Err(WorkflowError::InvalidTransition {
                state: WorkflowState::Idle,
                attempted: "encrypt and upload".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_recovery_notice_is_published() {
        let transport = ScriptedTransport::new();
        transport.reply("POST detectfiles", HttpReply::json(200, json!({
            "detected": {"0": [{"entity_type": "EMAIL_ADDRESS", "text": "a@b.c", "score": 0.99}]}
        })));
        transport.reply("POST encryptfiles", HttpReply::json(200, json!({
            "encrypted_file": "data_storage/memo/memo.pdf",
            "context_file": "data_storage/memo/memo.ctx",
            "folder": "memo"
        })));
        transport.fail("GET data_storage/memo/memo.ctx", "timed out");
        transport.reply("POST auth/upload_single_to_drive", HttpReply::json(200, json!({})));
        let workflow = machine(&transport);
        let mut notices = workflow.notices();

        workflow.submit(document("memo.pdf")).await;
        workflow.remediate(RemediationAction::EncryptAndUpload).await.unwrap();

        let notice = notices.recv().await.unwrap();
        assert!(matches!(notice, Notice::RecoveryMaterialUnavailable { .. }));
        assert!(matches!(notices.recv().await.unwrap(), Notice::Completed { .. }));
    }

    #[tokio::test]
    async fn test_progress_is_published() {
        let transport = ScriptedTransport::new();
        let gate = transport.reply_gated("POST upload", two_zones());
        let workflow = machine(&transport);
        let mut updates = workflow.subscribe();

        let pending = {
            let workflow = workflow.clone();
            tokio::spawn(async move { workflow.submit(image("id.png")).await })
        };

        let mut saw_partial = false;
        while !saw_partial {
            updates.changed().await.unwrap();
            let snapshot = updates.borrow_and_update().clone();
            let progress = snapshot.progress;
            saw_partial = snapshot.state == WorkflowState::Scanning && progress > 0 && progress <= 90;
        }
        gate.notify_one();
        pending.await.unwrap();
        assert_eq!(workflow.snapshot().progress, 100);
    }
}
