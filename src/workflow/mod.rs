pub mod attempt;
pub mod dispatcher;
pub mod permission;
pub mod preprocessor;
pub mod routing;
pub mod test_asset;
pub mod validator;

pub use attempt::*;
pub use dispatcher::*;
pub use permission::*;
pub use preprocessor::*;
pub use routing::*;
pub use validator::*;

use thiserror::Error;

use crate::host::HostError;

/// Why a PDF could not be used as a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFault {
    PasswordProtected,
    Corrupted,
}

impl std::fmt::Display for DocumentFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PasswordProtected => write!(f, "password-protected"),
            Self::Corrupted => write!(f, "corrupted"),
        }
    }
}

/// Everything that can go wrong during one capture attempt. Validation and
/// preprocessing errors are terminal for the attempt and become a user-facing
/// alert; the user re-initiates capture.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Unsupported receipt format: {}", extension_label(.extension))]
    UnsupportedFormat { extension: String },

    #[error("File too large: {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: u64, max: u64 },

    #[error("File too small: {size} bytes is below the {min} byte minimum")]
    TooSmall { size: u64, min: u64 },

    #[error("Document cannot be read: {0}")]
    UnreadableDocument(DocumentFault),

    #[error("Permission is unavailable on this platform")]
    PermissionUnavailable,

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Routing failed: {0}")]
    RoutingFailed(String),

    #[error("Dispatch failed: {0}")]
    DispatchFailed(#[source] HostError),

    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

/// A name with no extension still needs a readable alert.
fn extension_label(extension: &str) -> String {
    if extension.is_empty() {
        "(none)".to_string()
    } else {
        format!(".{extension}")
    }
}
