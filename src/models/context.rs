use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transaction::{Participant, PayerIdentity, TransactionDraft};

/// The kind of money movement the user is asking for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IouType {
    /// Submit an expense to a report.
    Submit,
    /// Pay / send money.
    Pay,
    /// Split a bill across participants.
    Split,
    /// Track a personal expense (no approval chain).
    Track,
    /// Combined submit/track entry from the global create menu; the target
    /// is not known yet.
    Create,
}

impl IouType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Pay => "pay",
            Self::Split => "split",
            Self::Track => "track",
            Self::Create => "create",
        }
    }
}

/// Workspace policy flags relevant to routing.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyFlags {
    pub requires_category: bool,
    pub requires_tag: bool,
}

/// Snapshot of the report the capture was started from, when there is one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportHandle {
    pub report_id: String,
    pub is_archived: bool,
    /// Whether this report is a workspace expense chat (submission target
    /// under a group policy).
    pub is_policy_expense_chat: bool,
    /// Membership snapshot; the fast path picks its participant from here.
    pub participants: Vec<Participant>,
}

/// The user's active workspace policy, used to pick a default expense chat
/// when the capture started without a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivePolicy {
    pub is_paid_group: bool,
    pub expense_chat_enabled: bool,
    pub billing_restricted: bool,
    /// Report id of the workspace expense chat, when the policy has one.
    pub expense_chat_report_id: Option<String>,
}

impl ActivePolicy {
    /// Eligible as an automatic submission target.
    pub fn is_eligible_default(&self) -> bool {
        self.is_paid_group
            && self.expense_chat_enabled
            && !self.billing_restricted
            && self.expense_chat_report_id.is_some()
    }
}

/// Read-only snapshot assembled once per capture attempt. Never mutated;
/// a new attempt re-derives it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowContext {
    pub transaction_id: Uuid,
    pub iou_type: IouType,
    pub report: Option<ReportHandle>,
    pub policy: PolicyFlags,
    pub active_policy: Option<ActivePolicy>,
    /// Per-transaction stored preference to skip the confirmation step.
    pub skip_confirmation_preference: bool,
    pub is_editing: bool,
    /// Explicit return target set by the edit flow; routing short-circuits
    /// to it with the receipt staged for later submission.
    pub back_to: Option<String>,
    pub existing_amount: i64,
    pub payer: PayerIdentity,
    pub draft: TransactionDraft,
}

impl WorkflowContext {
    /// Effective skip-confirmation: the stored preference holds only when a
    /// report exists, the report is not archived, and this is not a
    /// workspace expense chat that mandates a category or tag.
    pub fn should_skip_confirmation(&self) -> bool {
        let Some(report) = &self.report else {
            return false;
        };
        if !self.skip_confirmation_preference {
            return false;
        }
        !report.is_archived
            && !(report.is_policy_expense_chat
                && (self.policy.requires_category || self.policy.requires_tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transaction::test_support::context_with_report;

    #[test]
    fn skip_confirmation_requires_a_report() {
        let mut ctx = context_with_report(IouType::Submit);
        ctx.report = None;
        ctx.skip_confirmation_preference = true;
        assert!(!ctx.should_skip_confirmation());
    }

    #[test]
    fn skip_confirmation_blocked_by_archived_report() {
        let mut ctx = context_with_report(IouType::Submit);
        ctx.skip_confirmation_preference = true;
        ctx.report.as_mut().unwrap().is_archived = true;
        assert!(!ctx.should_skip_confirmation());
    }

    #[test]
    fn skip_confirmation_blocked_by_required_category_on_expense_chat() {
        let mut ctx = context_with_report(IouType::Submit);
        ctx.skip_confirmation_preference = true;
        ctx.report.as_mut().unwrap().is_policy_expense_chat = true;
        ctx.policy.requires_category = true;
        assert!(!ctx.should_skip_confirmation());

        // A required tag blocks the same way.
        ctx.policy.requires_category = false;
        ctx.policy.requires_tag = true;
        assert!(!ctx.should_skip_confirmation());
    }

    #[test]
    fn required_category_irrelevant_outside_expense_chat() {
        let mut ctx = context_with_report(IouType::Submit);
        ctx.skip_confirmation_preference = true;
        ctx.policy.requires_category = true;
        assert!(ctx.should_skip_confirmation());
    }

    #[test]
    fn default_policy_eligibility() {
        let policy = ActivePolicy {
            is_paid_group: true,
            expense_chat_enabled: true,
            billing_restricted: false,
            expense_chat_report_id: Some("r42".into()),
        };
        assert!(policy.is_eligible_default());

        let restricted = ActivePolicy {
            billing_restricted: true,
            ..policy.clone()
        };
        assert!(!restricted.is_eligible_default());

        let free = ActivePolicy {
            is_paid_group: false,
            ..policy
        };
        assert!(!free.is_eligible_default());
    }
}
