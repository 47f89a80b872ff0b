//! Permission gating: the location prompt sub-flow on the fast path, and
//! camera permission tracking for the capture entry point.

use chrono::{DateTime, Duration, Utc};

use crate::config::LOCATION_PROMPT_COOLDOWN_DAYS;
use crate::host::{PermissionProbe, PermissionStatus};
use crate::models::{IouType, WorkflowContext};
use crate::workflow::WorkflowError;

/// Location prompt state for the capture screen. `last_prompt` persists
/// between sessions via the draft store; `granted_this_session` lives only
/// as long as the workflow and suppresses re-prompting after a grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocationPermissionState {
    pub last_prompt: Option<DateTime<Utc>>,
    pub granted_this_session: bool,
}

impl LocationPermissionState {
    pub fn with_last_prompt(at: DateTime<Utc>) -> Self {
        Self {
            last_prompt: Some(at),
            granted_this_session: false,
        }
    }

    /// The user was prompted recently enough that asking again would nag.
    fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        match self.last_prompt {
            Some(at) => now - at < Duration::days(LOCATION_PROMPT_COOLDOWN_DAYS),
            None => false,
        }
    }
}

/// Decide whether the location-permission sub-flow must run before the
/// fast-path dispatch.
///
/// True iff skip-confirmation is effective for this attempt, the existing
/// transaction amount is exactly zero, the IOU type is not Split (splits
/// never need GPS), the user granted nothing this session yet, the user was
/// not prompted within the cooldown window, and the platform probe reports
/// the prompt can still succeed (never asked, or denied-but-not-permanently).
/// Probe failures degrade to "no sub-flow".
pub async fn needs_location_flow(
    ctx: &WorkflowContext,
    state: &LocationPermissionState,
    probe: &dyn PermissionProbe,
) -> bool {
    if !ctx.should_skip_confirmation() {
        return false;
    }
    if ctx.existing_amount != 0 || ctx.iou_type == IouType::Split {
        return false;
    }
    if state.granted_this_session || state.in_cooldown(Utc::now()) {
        return false;
    }

    let status = probe.status().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Location permission probe failed");
        PermissionStatus::Unavailable
    });
    matches!(
        status,
        PermissionStatus::NeverAsked | PermissionStatus::Denied
    )
}

/// Camera permission status owned by the capture screen. The cached value is
/// replaced on every foreground focus regain rather than trusted stale.
#[derive(Debug, Default)]
pub struct CameraGate {
    status: Option<PermissionStatus>,
}

impl CameraGate {
    /// Last probed status, if any probe has run yet.
    pub fn status(&self) -> Option<PermissionStatus> {
        self.status
    }

    /// Re-probe and replace the cached status. Called on first render and on
    /// every focus regain.
    pub async fn refresh(&mut self, probe: &dyn PermissionProbe) -> PermissionStatus {
        let status = probe.status().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Camera permission probe failed");
            PermissionStatus::Unavailable
        });
        self.status = Some(status);
        status
    }

    /// Make sure the camera can be used, requesting permission if the
    /// platform will still prompt. A permanently-blocked or unavailable
    /// camera surfaces `PermissionUnavailable` so the embedder can point the
    /// user at system settings.
    pub async fn ensure_access(
        &mut self,
        probe: &dyn PermissionProbe,
    ) -> Result<(), WorkflowError> {
        let current = match self.status {
            Some(status) => status,
            None => self.refresh(probe).await,
        };

        let status = match current {
            PermissionStatus::Granted => return Ok(()),
            PermissionStatus::NeverAsked | PermissionStatus::Denied => {
                probe.request().await.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Camera permission request failed");
                    PermissionStatus::Unavailable
                })
            }
            PermissionStatus::Blocked | PermissionStatus::Unavailable => current,
        };
        self.status = Some(status);

        if status == PermissionStatus::Granted {
            Ok(())
        } else {
            Err(WorkflowError::PermissionUnavailable)
        }
    }
}
