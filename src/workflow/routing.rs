//! The routing decision table.
//!
//! Once a `PreparedFile` exists, exactly one terminal action follows:
//! replace, go-back, a fast-path dispatch, or a navigation target. The
//! decision itself is a pure function over the workflow context so every
//! branch is independently testable; side effects (participant staging,
//! permission gating, dispatch) belong to the attempt driver.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{IouType, WorkflowContext};

/// Symbolic navigation target handed back to the embedder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum NavTarget {
    ParticipantSelection {
        iou_type: IouType,
        transaction_id: Uuid,
        report_id: Option<String>,
    },
    Confirmation {
        iou_type: IouType,
        transaction_id: Uuid,
        report_id: Option<String>,
    },
    /// Return to an explicit route set by the caller (edit flow).
    Back { to: String },
}

impl NavTarget {
    /// Symbolic route string for hosts that key navigation off paths.
    pub fn route(&self) -> String {
        match self {
            Self::ParticipantSelection {
                iou_type,
                transaction_id,
                report_id,
            } => format!(
                "create/{}/participants/{}/{}",
                iou_type.as_str(),
                transaction_id,
                report_id.as_deref().unwrap_or("")
            ),
            Self::Confirmation {
                iou_type,
                transaction_id,
                report_id,
            } => format!(
                "create/{}/confirmation/{}/{}",
                iou_type.as_str(),
                transaction_id,
                report_id.as_deref().unwrap_or("")
            ),
            Self::Back { to } => to.clone(),
        }
    }
}

/// Confirmation route for a context. The combined create intent submits by
/// default once a target is known, so Create is normalized to Submit here.
pub fn confirmation_target(
    iou_type: IouType,
    transaction_id: Uuid,
    report_id: Option<String>,
) -> NavTarget {
    let iou_type = match iou_type {
        IouType::Create => IouType::Submit,
        other => other,
    };
    NavTarget::Confirmation {
        iou_type,
        transaction_id,
        report_id,
    }
}

/// The single terminal action chosen for a prepared receipt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Decision {
    /// Editing an existing transaction: replace its receipt, nothing else.
    Replace,
    /// Explicit return target; the receipt stays staged for later submission.
    GoBack { to: String },
    /// Fast path: split the bill across the report's membership now.
    FastPathSplit,
    /// Fast path: create or track now. The driver still consults the
    /// location gate before dispatching.
    FastPathCreate,
    /// Stage participants from the report, then confirm.
    ConfirmFromReport,
    /// No report, but the active policy's expense chat is an eligible
    /// default target.
    ConfirmDefaultChat { report_id: String },
    /// Synthetic test transaction: fixed participant, straight to confirm.
    ConfirmTestParticipant,
    /// Nothing can be auto-assigned; the user picks participants.
    SelectParticipants,
}

/// Pick the terminal action for this attempt.
pub fn decide(ctx: &WorkflowContext, is_test_transaction: bool) -> Decision {
    if ctx.is_editing {
        return Decision::Replace;
    }

    if let Some(to) = &ctx.back_to {
        return Decision::GoBack { to: to.clone() };
    }

    // A concrete, writable report with a known intent: participants come
    // from its membership and the confirmation step may be skippable.
    if let Some(report) = &ctx.report {
        if !report.is_archived && ctx.iou_type != IouType::Create {
            if ctx.should_skip_confirmation() {
                return if ctx.iou_type == IouType::Split {
                    Decision::FastPathSplit
                } else {
                    Decision::FastPathCreate
                };
            }
            return Decision::ConfirmFromReport;
        }
    }

    // Started from the global create menu: fall back to the workspace
    // default expense chat when one is eligible.
    if ctx.iou_type == IouType::Create {
        if let Some(policy) = ctx.active_policy.as_ref().filter(|p| p.is_eligible_default()) {
            if let Some(report_id) = &policy.expense_chat_report_id {
                return Decision::ConfirmDefaultChat {
                    report_id: report_id.clone(),
                };
            }
        }
    }

    if is_test_transaction {
        return Decision::ConfirmTestParticipant;
    }

    Decision::SelectParticipants
}
