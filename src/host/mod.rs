//! Narrow interfaces to the host platform.
//!
//! Everything the workflow cannot do by itself — camera hardware, file
//! pickers, PDF rendering, permission prompts, geolocation, the draft store
//! and the expense backend — sits behind an object-safe async trait here, so
//! the whole engine runs against mocks in tests.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ExpenseParams, Participant, ReplaceReceiptParams, SplitParams};

/// Failures reported by host collaborators.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Camera error: {0}")]
    Camera(String),

    #[error("File picker error: {0}")]
    Picker(String),

    #[error("Permission probe error: {0}")]
    Permission(String),

    #[error("Draft store error: {0}")]
    Store(String),

    #[error("Expense gateway error: {0}")]
    Gateway(String),
}

// ---------------------------------------------------------------------------
// Acquisition sources
// ---------------------------------------------------------------------------

/// Capture configuration handed to the camera.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoConfig {
    pub flash: bool,
    pub shutter_sound: bool,
    /// Directory the photo file should be written to.
    pub output_dir: PathBuf,
}

/// A photo file freshly written by the camera.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoFile {
    pub path: PathBuf,
    pub size: u64,
}

#[async_trait]
pub trait CameraSource: Send + Sync {
    async fn take_photo(&self, config: &PhotoConfig) -> Result<PhotoFile, HostError>;
}

/// A file chosen through the gallery/document picker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PickedFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub mime: Option<String>,
}

#[async_trait]
pub trait FilePicker: Send + Sync {
    /// `Ok(None)` means the user cancelled the picker.
    async fn pick(&self) -> Result<Option<Vec<PickedFile>>, HostError>;
}

// ---------------------------------------------------------------------------
// Document / filesystem collaborators
// ---------------------------------------------------------------------------

/// Outcome reported by the external PDF renderer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PdfRenderOutcome {
    Rendered,
    PasswordProtected,
    Corrupted,
}

#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, path: &Path) -> Result<PdfRenderOutcome, HostError>;
}

#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn exists(&self, path: &Path) -> Result<bool, HostError>;
    async fn mkdir(&self, path: &Path) -> Result<(), HostError>;
    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, HostError>;
}

/// Real filesystem via tokio. The default for embedders; tests use in-memory
/// fakes instead.
pub struct TokioFileSystem;

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn exists(&self, path: &Path) -> Result<bool, HostError> {
        Ok(tokio::fs::try_exists(path).await?)
    }

    async fn mkdir(&self, path: &Path) -> Result<(), HostError> {
        Ok(tokio::fs::create_dir_all(path).await?)
    }

    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, HostError> {
        Ok(tokio::fs::read(path).await?)
    }
}

// ---------------------------------------------------------------------------
// Permissions & geolocation
// ---------------------------------------------------------------------------

/// Platform permission status, for both camera and location probes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    /// Denied but the platform will prompt again.
    Denied,
    /// Permanently denied; only system settings can change it.
    Blocked,
    NeverAsked,
    Unavailable,
}

#[async_trait]
pub trait PermissionProbe: Send + Sync {
    async fn status(&self) -> Result<PermissionStatus, HostError>;
    async fn request(&self) -> Result<PermissionStatus, HostError>;
}

/// Bounds on a geolocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoOptions {
    pub max_age: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}

#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Resolve the current position. Implementations may take up to
    /// `options.timeout`; the caller enforces the bound regardless.
    async fn current_position(&self, options: &GeoOptions) -> Result<GeoPosition, HostError>;
}

// ---------------------------------------------------------------------------
// Persistence & backend
// ---------------------------------------------------------------------------

/// Receipt attachment staged on the transaction draft before dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StagedReceipt {
    pub source: PathBuf,
    pub display_name: String,
    /// Pinned at staging time: the platform cannot be trusted to re-infer
    /// the type later for awkward filenames.
    pub mime: String,
    pub remove_drafts_on_replace: bool,
}

/// Key-value draft store, write-only from the workflow's perspective.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn stage_receipt(
        &self,
        transaction_id: Uuid,
        receipt: &StagedReceipt,
    ) -> Result<(), HostError>;

    async fn stage_participants(
        &self,
        transaction_id: Uuid,
        participants: &[Participant],
    ) -> Result<(), HostError>;

    /// Record that the user was just shown the location prompt (called on
    /// Deny). Single writer, last write wins.
    async fn record_location_prompt(&self, at: DateTime<Utc>) -> Result<(), HostError>;
}

/// Backend operations that actually move money. Fire-and-forget from the
/// router's perspective; sequencing is the attempt orchestrator's job.
#[async_trait]
pub trait ExpenseGateway: Send + Sync {
    async fn create_expense(&self, params: ExpenseParams) -> Result<(), HostError>;
    async fn track_expense(&self, params: ExpenseParams) -> Result<(), HostError>;
    async fn split_expense(&self, params: SplitParams) -> Result<(), HostError>;
    async fn replace_receipt(&self, params: ReplaceReceiptParams) -> Result<(), HostError>;
}

/// Completion sound cue, fired just before a fast-path dispatch.
pub trait SoundCue: Send + Sync {
    fn play_done(&self);
}

/// Silent cue for embedders (and tests) that do not play audio.
pub struct NoSound;

impl SoundCue for NoSound {
    fn play_done(&self) {}
}
