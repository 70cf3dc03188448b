//! Per-file ingestion errors.

use portal_common::ImageServerType;
use thiserror::Error;

/// Why one selected file did not become an image block.
///
/// Errors are per file; siblings in the same batch are unaffected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    #[error("{name}: unsupported file type {mime}")]
    UnsupportedFileType { name: String, mime: String },

    #[error("{name}: upload of {size} bytes to {server} failed: {reason}")]
    UploadFailed {
        name: String,
        size: u64,
        server: ImageServerType,
        reason: String,
    },

    /// Re-encoding failed. The pipeline recovers by uploading the original.
    #[error("downsampling failed: {0}")]
    Downsample(String),
}

impl IngestError {
    /// Name of the file the error is about, if any.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::UnsupportedFileType { name, .. } | Self::UploadFailed { name, .. } => Some(name),
            Self::Downsample(_) => None,
        }
    }

    /// Message suitable for showing to the person who picked the file.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedFileType { name, mime } => {
                format!("\"{name}\" is not an image ({mime}). Only image files can be inserted.")
            }
            Self::UploadFailed { name, size, server, .. } => format!(
                "Could not upload \"{name}\" ({}) to the {} image server. Please try again.",
                human_size(*size),
                server.as_str().to_lowercase(),
            ),
            Self::Downsample(reason) => format!("The image could not be resized: {reason}"),
        }
    }
}

/// Byte count in B/KB/MB with one decimal.
pub fn human_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}
