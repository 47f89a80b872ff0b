use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Scanflow";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extensions accepted as receipt attachments. Lowercase; inference
/// normalizes before matching.
pub const ALLOWED_RECEIPT_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "pdf", "htm", "html", "txt", "rtf", "doc", "docx", "tif",
    "tiff",
];

/// Hard reject threshold for non-image receipts (10 MiB).
pub const MAX_NON_IMAGE_SIZE: u64 = 10 * 1024 * 1024;

/// Images above this are resized before use (24 MiB). Strictly above the
/// non-image reject threshold: oversized images are salvaged, not rejected.
pub const HEAVY_IMAGE_SIZE: u64 = 24 * 1024 * 1024;

/// Anything smaller than this is not a plausible receipt.
pub const MIN_RECEIPT_SIZE: u64 = 240;

/// Longest edge of a resized heavy image, in pixels.
pub const RESIZE_MAX_DIMENSION_PX: u32 = 4096;

/// A cached GPS fix older than this is not acceptable.
pub const GPS_MAX_AGE: Duration = Duration::from_secs(3600);

/// Upper bound on waiting for a GPS fix. Dispatch proceeds without
/// coordinates once this elapses.
pub const GPS_TIMEOUT: Duration = Duration::from_secs(15);

/// Minimum interval between location permission prompts, in days.
pub const LOCATION_PROMPT_COOLDOWN_DAYS: i64 = 7;

/// Filename stem for the synthetic test receipt.
pub const TEST_RECEIPT_FILENAME: &str = "test_receipt";

/// Fixed participant auto-selected for synthetic test transactions.
pub const TEST_PARTICIPANT_LOGIN: &str = "receipts+test@scanflow.app";

/// Folder where captured receipt photos land before staging.
/// `<cache>/Scanflow/receipts/`, falling back to the temp dir when the
/// platform exposes no cache directory.
pub fn receipts_upload_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
        .join("receipts")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heavy_threshold_exceeds_reject_threshold() {
        assert!(HEAVY_IMAGE_SIZE > MAX_NON_IMAGE_SIZE);
    }

    #[test]
    fn min_size_below_reject_thresholds() {
        assert!(MIN_RECEIPT_SIZE < MAX_NON_IMAGE_SIZE);
    }

    #[test]
    fn upload_dir_ends_with_receipts() {
        let dir = receipts_upload_dir();
        assert!(dir.ends_with("receipts"));
    }

    #[test]
    fn allowed_extensions_are_lowercase() {
        assert!(ALLOWED_RECEIPT_EXTENSIONS
            .iter()
            .all(|e| e.chars().all(|c| c.is_ascii_lowercase())));
    }
}
