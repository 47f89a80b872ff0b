use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::receipt::PreparedFile;

/// Identity of the person filing the expense.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PayerIdentity {
    pub login: String,
    pub account_id: i64,
}

/// A money-request participant: either a person (account id) or a report
/// acting as the target chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub account_id: Option<i64>,
    pub report_id: Option<String>,
    pub login: Option<String>,
    pub selected: bool,
}

impl Participant {
    pub fn person(account_id: i64, login: impl Into<String>) -> Self {
        Self {
            account_id: Some(account_id),
            report_id: None,
            login: Some(login.into()),
            selected: true,
        }
    }

    pub fn report(report_id: impl Into<String>) -> Self {
        Self {
            account_id: None,
            report_id: Some(report_id.into()),
            login: None,
            selected: true,
        }
    }
}

/// Metadata inherited from the in-progress transaction draft.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionDraft {
    pub currency: String,
    pub created: Option<DateTime<Utc>>,
    pub tax_code: Option<String>,
    pub tax_amount: i64,
    pub attendees: Vec<String>,
}

impl Default for TransactionDraft {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            created: None,
            tax_code: None,
            tax_amount: 0,
            attendees: Vec::new(),
        }
    }
}

/// A GPS fix attached to a fast-path expense.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GpsPoint {
    pub lat: f64,
    pub long: f64,
}

/// Parameters for creating or tracking a single expense.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpenseParams {
    pub transaction_id: Uuid,
    pub report_id: Option<String>,
    pub payer: PayerIdentity,
    pub participant: Participant,
    pub receipt: PreparedFile,
    pub amount: i64,
    pub draft: TransactionDraft,
    pub gps: Option<GpsPoint>,
}

/// Parameters for splitting a bill across a chat's membership.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplitParams {
    pub transaction_id: Uuid,
    pub existing_chat_report_id: Option<String>,
    pub payer: PayerIdentity,
    pub participants: Vec<Participant>,
    pub receipt: PreparedFile,
    pub draft: TransactionDraft,
}

/// Parameters for replacing the receipt on an existing transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplaceReceiptParams {
    pub transaction_id: Uuid,
    pub receipt: PreparedFile,
}
