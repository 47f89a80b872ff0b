//! Format and size policy for receipt candidates.
//!
//! Pure checks, applied in a fixed order with short-circuit on the first
//! failure. The caller surfaces the rejection to the user; nothing here has
//! side effects.

use crate::config::{ALLOWED_RECEIPT_EXTENSIONS, MAX_NON_IMAGE_SIZE, MIN_RECEIPT_SIZE};
use crate::models::{ReceiptCandidate, ReceiptState, ValidatedReceipt};
use crate::workflow::WorkflowError;

/// Validate a candidate against receipt policy.
///
/// Order matters and is load-bearing for the alert the user sees:
/// 1. extension outside the allowed set → `UnsupportedFormat`
/// 2. non-image above the size cap → `TooLarge`
/// 3. below the minimum plausible size → `TooSmall`
pub fn validate(candidate: ReceiptCandidate) -> Result<ValidatedReceipt, WorkflowError> {
    let extension = candidate.extension().unwrap_or_default();
    if !ALLOWED_RECEIPT_EXTENSIONS.contains(&extension.as_str()) {
        tracing::info!(file = %candidate.display_name, %extension, "Receipt rejected: unsupported format");
        return Err(WorkflowError::UnsupportedFormat { extension });
    }

    if !candidate.is_image() && candidate.declared_size > MAX_NON_IMAGE_SIZE {
        tracing::info!(
            file = %candidate.display_name,
            size = candidate.declared_size,
            "Receipt rejected: too large"
        );
        return Err(WorkflowError::TooLarge {
            size: candidate.declared_size,
            max: MAX_NON_IMAGE_SIZE,
        });
    }

    if candidate.declared_size < MIN_RECEIPT_SIZE {
        tracing::info!(
            file = %candidate.display_name,
            size = candidate.declared_size,
            "Receipt rejected: too small"
        );
        return Err(WorkflowError::TooSmall {
            size: candidate.declared_size,
            min: MIN_RECEIPT_SIZE,
        });
    }

    Ok(ValidatedReceipt {
        candidate,
        state: ReceiptState::ScanReady,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_NON_IMAGE_SIZE;

    fn candidate(name: &str, size: u64) -> ReceiptCandidate {
        ReceiptCandidate::new(format!("/tmp/{name}"), name, size)
    }

    #[test]
    fn unknown_extension_rejected_first() {
        // Size problems are irrelevant once the extension fails.
        let err = validate(candidate("receipt.exe", 0)).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::UnsupportedFormat { extension } if extension == "exe"
        ));
    }

    #[test]
    fn missing_extension_rejected() {
        let err = validate(candidate("receipt", 5000)).unwrap_err();
        assert!(matches!(err, WorkflowError::UnsupportedFormat { .. }));
        assert_eq!(err.to_string(), "Unsupported receipt format: (none)");
    }

    #[test]
    fn unsupported_format_alert_names_the_extension() {
        let err = validate(candidate("receipt.exe", 5000)).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported receipt format: .exe");
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let validated = validate(candidate("Receipt.JPG", 5000)).unwrap();
        assert_eq!(validated.state, ReceiptState::ScanReady);
    }

    #[test]
    fn oversized_pdf_rejected() {
        let err = validate(candidate("receipt.pdf", MAX_NON_IMAGE_SIZE + 1)).unwrap_err();
        assert!(matches!(err, WorkflowError::TooLarge { .. }));
    }

    #[test]
    fn oversized_image_is_not_rejected() {
        // Heavy images are resized by the preprocessor, not rejected here.
        let validated = validate(candidate("huge.jpg", MAX_NON_IMAGE_SIZE + 1)).unwrap();
        assert_eq!(validated.candidate.display_name, "huge.jpg");
    }

    #[test]
    fn tiny_file_rejected_even_as_valid_image() {
        let err = validate(candidate("tiny.png", 10)).unwrap_err();
        assert!(matches!(err, WorkflowError::TooSmall { size: 10, .. }));
    }

    #[test]
    fn pdf_at_size_limit_passes() {
        let validated = validate(candidate("receipt.pdf", MAX_NON_IMAGE_SIZE)).unwrap();
        assert!(validated.candidate.is_pdf());
    }
}
