//! Synthetic test receipt generation.
//!
//! Produces a small PNG receipt in the upload folder so the whole capture →
//! dispatch path can be exercised without camera hardware or a real file.

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};

use crate::config::TEST_RECEIPT_FILENAME;
use crate::models::ReceiptCandidate;
use crate::workflow::WorkflowError;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 480;

/// Write a synthetic receipt PNG into `dir` and return it as a candidate.
/// The filename is timestamped so repeated test captures never collide.
pub async fn materialize_test_receipt(dir: &Path) -> Result<ReceiptCandidate, WorkflowError> {
    let filename = format!(
        "{}_{}.png",
        TEST_RECEIPT_FILENAME,
        chrono::Utc::now().timestamp_millis()
    );
    let path = dir.join(&filename);

    let bytes = render_png().map_err(WorkflowError::ImageProcessing)?;
    let size = bytes.len() as u64;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| WorkflowError::CaptureFailed(format!("upload dir: {e}")))?;
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| WorkflowError::CaptureFailed(format!("write test receipt: {e}")))?;

    tracing::info!(path = %path.display(), "Test receipt materialized");
    Ok(ReceiptCandidate::new(path, filename, size).with_mime_hint("image/png"))
}

/// A white page with a grey ruled block, enough to look like a receipt to
/// the scanning backend.
fn render_png() -> Result<Vec<u8>, String> {
    let img = RgbImage::from_fn(WIDTH, HEIGHT, |_, y| {
        if y > 60 && y % 40 < 6 {
            Rgb([190, 190, 190])
        } else {
            Rgb([252, 252, 250])
        }
    });

    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| format!("encode test receipt: {e}"))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIN_RECEIPT_SIZE;

    #[tokio::test]
    async fn materializes_a_plausible_receipt() {
        let dir = tempfile::tempdir().unwrap();
        let candidate = materialize_test_receipt(dir.path()).await.unwrap();

        assert!(candidate.path.exists());
        assert!(candidate.declared_size >= MIN_RECEIPT_SIZE);
        assert_eq!(candidate.mime_hint.as_deref(), Some("image/png"));
        assert!(candidate.is_image());

        // It decodes as a real PNG at the declared dimensions.
        let img = image::open(&candidate.path).unwrap();
        assert_eq!(img.width(), WIDTH);
        assert_eq!(img.height(), HEIGHT);
    }

    #[tokio::test]
    async fn repeated_captures_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let first = materialize_test_receipt(dir.path()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = materialize_test_receipt(dir.path()).await.unwrap();
        assert_ne!(first.path, second.path);
    }

    #[tokio::test]
    async fn creates_missing_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested").join("receipts");
        let candidate = materialize_test_receipt(&nested).await.unwrap();
        assert!(candidate.path.starts_with(&nested));
    }
}
