//! Error types for editing and serialization.

use thiserror::Error;

use crate::types::{BlockId, Position};

/// Errors from structural editing commands.
///
/// None of these leave the document modified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EditorError {
    /// A position that does not exist in the current document.
    #[error("invalid position {position}: {reason}")]
    InvalidPosition {
        position: Position,
        reason: &'static str,
    },

    /// A block index past the end of the document.
    #[error("no block {0}")]
    InvalidBlock(BlockId),

    /// The command needs a paragraph but the block is an image.
    #[error("block {0} is not a paragraph")]
    NotAParagraph(BlockId),

    /// The host has torn the editor down.
    #[error("editor is unmounted")]
    Unmounted,
}

impl EditorError {
    pub(crate) fn position(position: Position, reason: &'static str) -> Self {
        Self::InvalidPosition { position, reason }
    }
}

/// Errors from strict HTML parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HtmlError {
    #[error("malformed markup at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: String },
}
