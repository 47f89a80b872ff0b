//! Scanflow — client-side receipt capture and expense routing.
//!
//! Turns a receipt (camera photo, picked file, PDF, or synthetic test asset)
//! into a validated expense-transaction record, then decides — without extra
//! user interaction when possible — what runs next: a fast-path dispatch
//! (create / track / split / replace) or navigation to the participant or
//! confirmation screen.
//!
//! The engine is pure workflow logic. Camera hardware, file pickers, PDF
//! rendering, permission prompts, geolocation, the draft store and the
//! expense backend are host collaborators behind the traits in [`host`];
//! embedders wire real implementations, tests wire mocks.
//!
//! Typical embedding:
//!
//! ```no_run
//! # async fn demo(host: scanflow::workflow::HostServices,
//! #               ctx: scanflow::models::WorkflowContext,
//! #               candidate: scanflow::models::ReceiptCandidate)
//! #               -> Result<(), scanflow::workflow::WorkflowError> {
//! use scanflow::workflow::{CaptureOutcome, CaptureWorkflow, LocationPermissionState};
//!
//! let mut workflow = CaptureWorkflow::new(host, LocationPermissionState::default());
//! match workflow.scan_file(&ctx, candidate).await? {
//!     CaptureOutcome::Dispatched(record) => { /* done, maybe toast */ }
//!     CaptureOutcome::Navigate(target) => { /* push the route */ }
//!     CaptureOutcome::LocationPermissionRequired(pending) => {
//!         // show the prompt, then:
//!         workflow.resume_with_location(&ctx, pending, true).await?;
//!     }
//!     CaptureOutcome::Ignored | CaptureOutcome::Cancelled => {}
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod host;
pub mod models;
pub mod workflow;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for embedders that have no subscriber of their own.
/// Respects `RUST_LOG`; defaults to info-level output for this crate.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scanflow=info")),
        )
        .init();

    tracing::debug!("Scanflow v{} tracing initialized", config::APP_VERSION);
}
