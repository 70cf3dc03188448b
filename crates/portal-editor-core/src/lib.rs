//! portal-editor-core: rich-text editing core without framework dependencies.
//!
//! This crate provides:
//! - `Document` - block/inline tree with marks, plus atomic editing commands
//! - `UndoableDocument` - snapshot undo history
//! - `MarkController` - active formatting, sticky marks, change settling
//! - `HtmlSerializer` - tree and regex strategies for normalized HTML
//! - `Editor` - the host adapter tying it all together

pub mod actions;
mod commands;
pub mod controller;
pub mod document;
pub mod editor;
pub mod error;
pub mod html;
pub mod marks;
pub mod types;
pub mod undo;


pub use actions::{ActionOutcome, EditorAction};
pub use controller::{
    ActiveFormatting, DEFAULT_SETTLE_WINDOW, MarkController, NotifyState, active_formatting,
};
pub use document::{Block, Document, ImageBlock, Inline, Paragraph, TextRun};
pub use editor::{ChangeCallback, Editor, EditorHandle};
pub use error::{EditorError, HtmlError};
pub use html::{HtmlSerializer, RegexSerializer, SerializerKind, TreeSerializer};
pub use marks::{FontSize, Mark, MarkKind, MarkSet, TextColor};
pub use types::{Alignment, BlockId, ImageAlignment, Position, Selection};
pub use undo::{UndoManager, UndoableDocument};
