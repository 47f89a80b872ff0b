//! Normalizes a validated receipt into a `PreparedFile`.
//!
//! Two jobs: run PDFs through the external renderer (password-protected or
//! corrupted documents are discarded here, with no retry), and resize images
//! above the heavy threshold. Sub-threshold input passes through untouched,
//! so preparing twice is byte-identical.

use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::config::{HEAVY_IMAGE_SIZE, RESIZE_MAX_DIMENSION_PX};
use crate::host::{PdfRenderer, PdfRenderOutcome};
use crate::models::{infer_mime, PreparedFile, ValidatedReceipt};
use crate::workflow::{DocumentFault, WorkflowError};

/// Prepare a validated receipt for attachment.
///
/// May suspend for PDF rendering or the resize step; the caller raises its
/// loading indicator around this call when the input is heavy (see
/// [`needs_long_preparation`]).
pub async fn prepare(
    validated: ValidatedReceipt,
    renderer: &dyn PdfRenderer,
) -> Result<PreparedFile, WorkflowError> {
    let candidate = &validated.candidate;

    if candidate.is_pdf() {
        let outcome = renderer.render(&candidate.path).await.unwrap_or_else(|e| {
            tracing::warn!(file = %candidate.display_name, error = %e, "PDF renderer failed");
            PdfRenderOutcome::Corrupted
        });
        match outcome {
            PdfRenderOutcome::Rendered => {}
            PdfRenderOutcome::PasswordProtected => {
                return Err(WorkflowError::UnreadableDocument(
                    DocumentFault::PasswordProtected,
                ));
            }
            PdfRenderOutcome::Corrupted => {
                return Err(WorkflowError::UnreadableDocument(DocumentFault::Corrupted));
            }
        }
    }

    // The resize step re-encodes on disk as JPEG, so the prepared metadata
    // follows the file that will actually upload, not the original hint.
    let (path, display_name, size, mime) =
        if candidate.is_image() && candidate.declared_size > HEAVY_IMAGE_SIZE {
            let (path, size) = resize_image(&candidate.path).await?;
            let display_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("receipt_resized.jpg")
                .to_string();
            (path, display_name, size, "image/jpeg".to_string())
        } else {
            let mime = candidate
                .mime_hint
                .clone()
                .unwrap_or_else(|| infer_mime(&candidate.display_name).to_string());
            (
                candidate.path.clone(),
                candidate.display_name.clone(),
                candidate.declared_size,
                mime,
            )
        };

    Ok(PreparedFile {
        path,
        display_name,
        size,
        mime,
        state: validated.state,
    })
}

/// Whether preparation will take noticeable wall-clock time (the caller
/// should show a loading indicator for the duration).
pub fn needs_long_preparation(validated: &ValidatedReceipt) -> bool {
    validated.candidate.is_image() && validated.candidate.declared_size > HEAVY_IMAGE_SIZE
}

/// Downscale a heavy image to the configured longest edge, re-encoding as
/// JPEG alongside the original. Runs on the blocking pool; decode and
/// re-encode of a 24MB+ image is CPU-bound.
async fn resize_image(source: &Path) -> Result<(PathBuf, u64), WorkflowError> {
    let source = source.to_path_buf();
    let target = resized_path(&source);

    let out = target.clone();
    tokio::task::spawn_blocking(move || -> Result<(), WorkflowError> {
        let img = image::open(&source)
            .map_err(|e| WorkflowError::ImageProcessing(format!("decode failed: {e}")))?;
        let resized = img.thumbnail(RESIZE_MAX_DIMENSION_PX, RESIZE_MAX_DIMENSION_PX);
        // JPEG carries no alpha channel.
        resized
            .to_rgb8()
            .save_with_format(&out, ImageFormat::Jpeg)
            .map_err(|e| WorkflowError::ImageProcessing(format!("encode failed: {e}")))?;
        Ok(())
    })
    .await
    .map_err(|e| WorkflowError::ImageProcessing(format!("resize task failed: {e}")))??;

    let size = tokio::fs::metadata(&target)
        .await
        .map_err(|e| WorkflowError::ImageProcessing(format!("stat failed: {e}")))?
        .len();

    tracing::info!(target = %target.display(), size, "Heavy image resized");
    Ok((target, size))
}

fn resized_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("receipt");
    source.with_file_name(format!("{stem}_resized.jpg"))
}
