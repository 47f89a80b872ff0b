//! The capture attempt orchestrator.
//!
//! Single entry point driving one receipt through the full workflow:
//! acquisition (camera / picker / test asset) → validation → preparation →
//! optional location-permission sub-flow → routing → dispatch or navigation.
//!
//! All collaborators are boxed traits so the whole engine runs against mocks.
//! One logical thread of control per attempt: a duplicate capture request
//! while one is in flight is ignored at this entry point, guarded by an
//! in-progress flag that resets only on a terminal outcome or failure.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::host::{
    CameraSource, DraftStore, ExpenseGateway, FilePicker, FileSystem, Geolocator, PermissionProbe,
    PermissionStatus, PdfRenderer, PhotoConfig, SoundCue, StagedReceipt,
};
use crate::models::{
    IouType, Participant, PreparedFile, ReceiptCandidate, ReceiptState, ValidatedReceipt,
    WorkflowContext,
};
use crate::workflow::dispatcher::{DispatchRecord, TransactionDispatcher};
use crate::workflow::permission::{needs_location_flow, CameraGate, LocationPermissionState};
use crate::workflow::preprocessor::{needs_long_preparation, prepare};
use crate::workflow::routing::{confirmation_target, decide, Decision, NavTarget};
use crate::workflow::validator::validate;
use crate::workflow::WorkflowError;

/// Where one attempt currently stands. Exposed for observability; the
/// embedder drives rendering off the flags, not this.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttemptPhase {
    Idle,
    Validating,
    Preparing,
    PermissionPending,
    Dispatching,
    Done,
    Failed,
}

/// Fast-path dispatch suspended on the user's location decision. Hand it
/// back to [`CaptureWorkflow::resume_with_location`] with the Grant/Deny
/// answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingDispatch {
    pub receipt: PreparedFile,
    pub participant: Participant,
}

/// Terminal (or suspended) result of one capture entry point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CaptureOutcome {
    /// A transaction operation ran; the attempt is finished.
    Dispatched(DispatchRecord),
    /// The embedder should navigate; dispatch (if any) happens downstream.
    Navigate(NavTarget),
    /// Suspended pending the location permission sub-flow.
    LocationPermissionRequired(PendingDispatch),
    /// A capture was already in flight; this request was dropped.
    Ignored,
    /// The user cancelled the picker.
    Cancelled,
}

/// Host collaborators the workflow runs against.
pub struct HostServices {
    pub camera: Box<dyn CameraSource>,
    pub picker: Box<dyn FilePicker>,
    pub pdf_renderer: Box<dyn PdfRenderer>,
    pub fs: Box<dyn FileSystem>,
    pub camera_permissions: Box<dyn PermissionProbe>,
    pub location_permissions: Box<dyn PermissionProbe>,
    pub geolocator: Box<dyn Geolocator>,
    pub drafts: Box<dyn DraftStore>,
    pub expenses: Box<dyn ExpenseGateway>,
    pub sound: Box<dyn SoundCue>,
}

/// One capture screen's workflow engine.
pub struct CaptureWorkflow {
    host: HostServices,
    upload_dir: PathBuf,
    camera_gate: CameraGate,
    location_state: LocationPermissionState,
    in_progress: AtomicBool,
    loading: AtomicBool,
    phase: AttemptPhase,
}

impl CaptureWorkflow {
    pub fn new(host: HostServices, location_state: LocationPermissionState) -> Self {
        Self {
            host,
            upload_dir: config::receipts_upload_dir(),
            camera_gate: CameraGate::default(),
            location_state,
            in_progress: AtomicBool::new(false),
            loading: AtomicBool::new(false),
            phase: AttemptPhase::Idle,
        }
    }

    /// Override the photo/test-asset output folder (tests, sandboxed hosts).
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    /// A capture is in flight. Exposed so the enclosing UI can reject a
    /// second shutter press.
    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Long preparation (heavy-image resize) is running; show a loading
    /// indicator while this holds.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    pub fn camera_permission(&self) -> Option<PermissionStatus> {
        self.camera_gate.status()
    }

    /// The host regained foreground focus: drop the duplicate-capture guard
    /// and re-probe camera permission instead of trusting the cached value.
    pub async fn on_focus_regained(&mut self) -> PermissionStatus {
        self.in_progress.store(false, Ordering::SeqCst);
        self.camera_gate.refresh(&*self.host.camera_permissions).await
    }

    // -----------------------------------------------------------------------
    // Acquisition entry points
    // -----------------------------------------------------------------------

    /// Capture a photo and run it through the workflow. Fresh camera output
    /// is a known-good JPEG, so it skips format/size validation.
    pub async fn capture_photo(
        &mut self,
        ctx: &WorkflowContext,
        flash: bool,
        shutter_sound: bool,
    ) -> Result<CaptureOutcome, WorkflowError> {
        if !self.begin_attempt() {
            return Ok(CaptureOutcome::Ignored);
        }

        let result = self.capture_photo_inner(ctx, flash, shutter_sound).await;
        self.settle(result)
    }

    async fn capture_photo_inner(
        &mut self,
        ctx: &WorkflowContext,
        flash: bool,
        shutter_sound: bool,
    ) -> Result<CaptureOutcome, WorkflowError> {
        self.camera_gate
            .ensure_access(&*self.host.camera_permissions)
            .await?;

        self.ensure_upload_dir().await;

        let photo = self
            .host
            .camera
            .take_photo(&PhotoConfig {
                flash,
                shutter_sound,
                output_dir: self.upload_dir.clone(),
            })
            .await
            .map_err(|e| WorkflowError::CaptureFailed(format!("take photo: {e}")))?;

        let bytes = self
            .host
            .fs
            .read_bytes(&photo.path)
            .await
            .map_err(|e| WorkflowError::CaptureFailed(format!("read photo: {e}")))?;

        let display_name = photo
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("receipt.jpg")
            .to_string();

        let prepared = PreparedFile {
            path: photo.path,
            display_name,
            size: bytes.len() as u64,
            mime: "image/jpeg".to_string(),
            state: ReceiptState::ScanReady,
        };

        self.route_prepared(ctx, prepared, false).await
    }

    /// Open the host picker and scan the chosen file. `Cancelled` when the
    /// user backs out.
    pub async fn pick_and_scan(
        &mut self,
        ctx: &WorkflowContext,
    ) -> Result<CaptureOutcome, WorkflowError> {
        let picked = self
            .host
            .picker
            .pick()
            .await
            .map_err(|e| WorkflowError::CaptureFailed(format!("picker: {e}")))?;

        let Some(file) = picked.and_then(|files| files.into_iter().next()) else {
            return Ok(CaptureOutcome::Cancelled);
        };

        let mut candidate = ReceiptCandidate::new(file.path, file.name, file.size);
        if let Some(mime) = file.mime {
            candidate = candidate.with_mime_hint(mime);
        }
        self.scan_file(ctx, candidate).await
    }

    /// Run an externally-acquired candidate (picked file, shared file)
    /// through validation, preparation and routing.
    pub async fn scan_file(
        &mut self,
        ctx: &WorkflowContext,
        candidate: ReceiptCandidate,
    ) -> Result<CaptureOutcome, WorkflowError> {
        if !self.begin_attempt() {
            return Ok(CaptureOutcome::Ignored);
        }

        let result = self.scan_file_inner(ctx, candidate).await;
        self.settle(result)
    }

    async fn scan_file_inner(
        &mut self,
        ctx: &WorkflowContext,
        candidate: ReceiptCandidate,
    ) -> Result<CaptureOutcome, WorkflowError> {
        self.phase = AttemptPhase::Validating;
        let validated = validate(candidate)?;

        self.phase = AttemptPhase::Preparing;
        let prepared = self.prepare_with_loading(validated).await?;

        self.route_prepared(ctx, prepared, false).await
    }

    /// Materialize the synthetic test receipt and route it as a test
    /// transaction (fixed participant, straight to confirmation).
    pub async fn use_test_receipt(
        &mut self,
        ctx: &WorkflowContext,
    ) -> Result<CaptureOutcome, WorkflowError> {
        if !self.begin_attempt() {
            return Ok(CaptureOutcome::Ignored);
        }

        let result = self.use_test_receipt_inner(ctx).await;
        self.settle(result)
    }

    async fn use_test_receipt_inner(
        &mut self,
        ctx: &WorkflowContext,
    ) -> Result<CaptureOutcome, WorkflowError> {
        let candidate =
            crate::workflow::test_asset::materialize_test_receipt(&self.upload_dir).await?;
        let validated = ValidatedReceipt {
            candidate,
            state: ReceiptState::ScanReady,
        };
        let prepared = prepare(validated, &*self.host.pdf_renderer).await?;
        self.route_prepared(ctx, prepared, true).await
    }

    /// Resume an attempt suspended on the location sub-flow with the user's
    /// Grant/Deny answer. Deny records the prompt timestamp before the
    /// dispatch proceeds (without GPS). A resume with no attempt suspended
    /// (double-tap on the prompt, stale [`PendingDispatch`]) is ignored, so
    /// one prepared receipt dispatches at most once.
    pub async fn resume_with_location(
        &mut self,
        ctx: &WorkflowContext,
        pending: PendingDispatch,
        granted: bool,
    ) -> Result<CaptureOutcome, WorkflowError> {
        if self.phase != AttemptPhase::PermissionPending {
            tracing::debug!("No attempt suspended on location permission; resume ignored");
            return Ok(CaptureOutcome::Ignored);
        }

        if granted {
            self.location_state.granted_this_session = true;
        } else {
            let now = Utc::now();
            self.location_state.last_prompt = Some(now);
            if let Err(e) = self.host.drafts.record_location_prompt(now).await {
                tracing::warn!(error = %e, "Failed to record location prompt timestamp");
            }
        }

        self.phase = AttemptPhase::Dispatching;
        let result = self
            .dispatcher()
            .create_or_track(ctx, pending.receipt, pending.participant, granted)
            .await
            .map(CaptureOutcome::Dispatched);
        self.settle(result)
    }

    // -----------------------------------------------------------------------
    // Routing & dispatch
    // -----------------------------------------------------------------------

    async fn route_prepared(
        &mut self,
        ctx: &WorkflowContext,
        prepared: PreparedFile,
        is_test_transaction: bool,
    ) -> Result<CaptureOutcome, WorkflowError> {
        // The receipt is staged on the draft before any routing outcome so a
        // later confirmation step (or replace) finds it, with the MIME type
        // pinned for upload.
        self.host
            .drafts
            .stage_receipt(
                ctx.transaction_id,
                &StagedReceipt {
                    source: prepared.path.clone(),
                    display_name: prepared.display_name.clone(),
                    mime: prepared.mime.clone(),
                    remove_drafts_on_replace: !ctx.is_editing,
                },
            )
            .await?;

        match decide(ctx, is_test_transaction) {
            Decision::Replace => {
                self.phase = AttemptPhase::Dispatching;
                let record = self.dispatcher().replace(ctx, prepared).await?;
                Ok(CaptureOutcome::Dispatched(record))
            }
            Decision::GoBack { to } => Ok(CaptureOutcome::Navigate(NavTarget::Back { to })),
            Decision::FastPathSplit => {
                let participants = self.report_participants(ctx)?;
                self.phase = AttemptPhase::Dispatching;
                let record = self.dispatcher().split(ctx, prepared, participants).await?;
                Ok(CaptureOutcome::Dispatched(record))
            }
            Decision::FastPathCreate => {
                let participant = self
                    .report_participants(ctx)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| {
                        WorkflowError::RoutingFailed("report has no participants".into())
                    })?;

                if needs_location_flow(
                    ctx,
                    &self.location_state,
                    &*self.host.location_permissions,
                )
                .await
                {
                    self.phase = AttemptPhase::PermissionPending;
                    return Ok(CaptureOutcome::LocationPermissionRequired(PendingDispatch {
                        receipt: prepared,
                        participant,
                    }));
                }

                self.phase = AttemptPhase::Dispatching;
                let record = self
                    .dispatcher()
                    .create_or_track(ctx, prepared, participant, false)
                    .await?;
                Ok(CaptureOutcome::Dispatched(record))
            }
            Decision::ConfirmFromReport => {
                let report = ctx.report.as_ref().ok_or_else(|| {
                    WorkflowError::RoutingFailed("confirmation requires a report".into())
                })?;
                self.stage_participants(ctx, &report.participants).await?;
                Ok(CaptureOutcome::Navigate(confirmation_target(
                    ctx.iou_type,
                    ctx.transaction_id,
                    Some(report.report_id.clone()),
                )))
            }
            Decision::ConfirmDefaultChat { report_id } => {
                self.stage_participants(ctx, &[Participant::report(report_id.clone())])
                    .await?;
                Ok(CaptureOutcome::Navigate(confirmation_target(
                    ctx.iou_type,
                    ctx.transaction_id,
                    Some(report_id),
                )))
            }
            Decision::ConfirmTestParticipant => {
                let participant = Participant {
                    account_id: None,
                    report_id: None,
                    login: Some(config::TEST_PARTICIPANT_LOGIN.to_string()),
                    selected: true,
                };
                self.stage_participants(ctx, &[participant]).await?;
                Ok(CaptureOutcome::Navigate(confirmation_target(
                    IouType::Submit,
                    ctx.transaction_id,
                    None,
                )))
            }
            Decision::SelectParticipants => {
                Ok(CaptureOutcome::Navigate(NavTarget::ParticipantSelection {
                    iou_type: ctx.iou_type,
                    transaction_id: ctx.transaction_id,
                    report_id: ctx.report.as_ref().map(|r| r.report_id.clone()),
                }))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn dispatcher(&self) -> TransactionDispatcher<'_> {
        TransactionDispatcher::new(
            &*self.host.expenses,
            &*self.host.geolocator,
            &*self.host.sound,
        )
    }

    fn report_participants(
        &self,
        ctx: &WorkflowContext,
    ) -> Result<Vec<Participant>, WorkflowError> {
        let report = ctx
            .report
            .as_ref()
            .ok_or_else(|| WorkflowError::RoutingFailed("fast path requires a report".into()))?;
        if report.participants.is_empty() {
            return Err(WorkflowError::RoutingFailed(
                "report has no participants".into(),
            ));
        }
        Ok(report.participants.clone())
    }

    async fn stage_participants(
        &self,
        ctx: &WorkflowContext,
        participants: &[Participant],
    ) -> Result<(), WorkflowError> {
        self.host
            .drafts
            .stage_participants(ctx.transaction_id, participants)
            .await
            .map_err(|e| WorkflowError::RoutingFailed(format!("stage participants: {e}")))
    }

    async fn prepare_with_loading(
        &mut self,
        validated: ValidatedReceipt,
    ) -> Result<PreparedFile, WorkflowError> {
        let slow = needs_long_preparation(&validated);
        if slow {
            self.loading.store(true, Ordering::SeqCst);
        }
        let result = prepare(validated, &*self.host.pdf_renderer).await;
        if slow {
            self.loading.store(false, Ordering::SeqCst);
        }
        result
    }

    /// Create the upload folder if it is missing. Failure is logged, not
    /// fatal: the camera may still manage to write.
    async fn ensure_upload_dir(&self) {
        match self.host.fs.exists(&self.upload_dir).await {
            Ok(true) => {}
            Ok(false) => {
                if let Err(e) = self.host.fs.mkdir(&self.upload_dir).await {
                    tracing::warn!(error = %e, dir = %self.upload_dir.display(), "Failed to create upload dir");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to check upload dir");
            }
        }
    }

    /// Take the duplicate-capture guard. False when an attempt is already in
    /// flight, in which case the new request is dropped.
    fn begin_attempt(&mut self) -> bool {
        let fresh = !self.in_progress.swap(true, Ordering::SeqCst);
        if fresh {
            self.phase = AttemptPhase::Idle;
        } else {
            tracing::debug!("Capture already in flight; request ignored");
        }
        fresh
    }

    /// Map a step result onto the attempt flag: the guard stays up only
    /// while suspended on the permission sub-flow, and drops on every
    /// terminal outcome or failure.
    fn settle(
        &mut self,
        result: Result<CaptureOutcome, WorkflowError>,
    ) -> Result<CaptureOutcome, WorkflowError> {
        match &result {
            Ok(CaptureOutcome::LocationPermissionRequired(_)) => {}
            Ok(_) => {
                self.phase = AttemptPhase::Done;
                self.in_progress.store(false, Ordering::SeqCst);
            }
            Err(_) => {
                self.phase = AttemptPhase::Failed;
                self.in_progress.store(false, Ordering::SeqCst);
            }
        }
        result
    }
}
