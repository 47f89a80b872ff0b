use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Lifecycle state of a receipt file inside one capture attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReceiptState {
    /// Validated and ready to be scanned by the backend.
    ScanReady,
}

/// A receipt file as delivered by an acquisition source (camera, picker,
/// test asset). Immutable once validated; discarded if validation fails.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReceiptCandidate {
    pub path: PathBuf,
    pub display_name: String,
    /// Byte size as declared by the source. Sources that cannot know the
    /// size (e.g. a just-fetched asset) declare 0.
    pub declared_size: u64,
    /// MIME type reported by the platform, when it managed to infer one.
    pub mime_hint: Option<String>,
}

impl ReceiptCandidate {
    pub fn new(path: impl Into<PathBuf>, display_name: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            display_name: display_name.into(),
            declared_size: size,
            mime_hint: None,
        }
    }

    pub fn with_mime_hint(mut self, mime: impl Into<String>) -> Self {
        self.mime_hint = Some(mime.into());
        self
    }

    /// Normalized lowercase extension of the display name, if any.
    pub fn extension(&self) -> Option<String> {
        split_extension(&self.display_name)
    }

    pub fn is_image(&self) -> bool {
        matches!(
            self.extension().as_deref(),
            Some("jpg" | "jpeg" | "png" | "gif" | "webp" | "tif" | "tiff")
        )
    }

    pub fn is_pdf(&self) -> bool {
        self.extension().as_deref() == Some("pdf")
    }
}

/// A candidate that passed format/size policy. Only the validator produces
/// this; only the preprocessor consumes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidatedReceipt {
    pub candidate: ReceiptCandidate,
    pub state: ReceiptState,
}

/// The finished receipt attached to a transaction: post-resize, with a
/// concrete byte size and MIME type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreparedFile {
    pub path: PathBuf,
    pub display_name: String,
    pub size: u64,
    /// Always concrete. Platforms fail to infer a type for filenames with
    /// spaces or odd casing, so it is pinned here for use at upload time.
    pub mime: String,
    pub state: ReceiptState,
}

/// Lowercase, trimmed extension of a filename. Whitespace around the name
/// and mixed-case extensions must not defeat type inference.
pub fn split_extension(name: &str) -> Option<String> {
    Path::new(name.trim())
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.trim().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
}

/// MIME type for a receipt filename. Unknown extensions fall back to the
/// generic binary type rather than `None`, so every prepared file carries a
/// concrete type.
pub fn infer_mime(name: &str) -> &'static str {
    match split_extension(name).as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("tif" | "tiff") => "image/tiff",
        Some("pdf") => "application/pdf",
        Some("htm" | "html") => "text/html",
        Some("txt") => "text/plain",
        Some("rtf") => "application/rtf",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(split_extension("Receipt.JPG").as_deref(), Some("jpg"));
        assert_eq!(split_extension("scan.Pdf").as_deref(), Some("pdf"));
    }

    #[test]
    fn extension_survives_whitespace() {
        assert_eq!(split_extension(" Receipt.JPG ").as_deref(), Some("jpg"));
        assert_eq!(split_extension("my receipt.png").as_deref(), Some("png"));
    }

    #[test]
    fn extension_absent_for_bare_names() {
        assert_eq!(split_extension("receipt"), None);
        assert_eq!(split_extension(""), None);
    }

    #[test]
    fn mime_is_always_concrete() {
        assert_eq!(infer_mime("a.jpg"), "image/jpeg");
        assert_eq!(infer_mime(" Photo.JPEG "), "image/jpeg");
        assert_eq!(infer_mime("doc.pdf"), "application/pdf");
        assert_eq!(infer_mime("mystery.bin"), "application/octet-stream");
        assert_eq!(infer_mime("noext"), "application/octet-stream");
    }

    #[test]
    fn candidate_image_detection() {
        let c = ReceiptCandidate::new("/tmp/r.PNG", "r.PNG", 1000);
        assert!(c.is_image());
        assert!(!c.is_pdf());

        let p = ReceiptCandidate::new("/tmp/r.pdf", "r.pdf", 1000);
        assert!(p.is_pdf());
        assert!(!p.is_image());
    }
}
