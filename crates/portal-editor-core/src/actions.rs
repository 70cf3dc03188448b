//! Editor actions.
//!
//! Platform-agnostic definitions for editor operations. Keyboard input and the
//! toolbar both produce an `EditorAction`; [`crate::Editor::execute`] applies it.

use portal_common::EditorConfig;

use crate::marks::{FontSize, MarkKind, TextColor};
use crate::types::Alignment;

/// All possible editor actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorAction {
    // === Text Insertion ===
    /// Insert text at the cursor, replacing any selected content.
    Insert { text: String },

    /// Insert a hard line break (Shift+Enter, `<br>` equivalent).
    InsertLineBreak,

    /// Split the paragraph (Enter).
    InsertParagraph,

    // === Deletion ===
    /// Delete the selection, or one unit before the cursor (Backspace).
    DeleteBackward,

    // === History ===
    Undo,
    Redo,

    // === Formatting ===
    ToggleBold,
    ToggleItalic,
    ToggleStrikethrough,

    /// Align every block the selection touches.
    SetAlignment(Alignment),

    SetFontSize(FontSize),

    /// Subject to the color settle window.
    SetColor(TextColor),

    // === Media ===
    /// Ask the host to open its file picker. The editor itself does nothing.
    RequestImageUpload,

    // === Selection ===
    SelectAll,
}

impl EditorAction {
    /// The boolean mark a toggle action affects.
    pub fn mark_kind(&self) -> Option<MarkKind> {
        match self {
            Self::ToggleBold => Some(MarkKind::Bold),
            Self::ToggleItalic => Some(MarkKind::Italic),
            Self::ToggleStrikethrough => Some(MarkKind::Strike),
            _ => None,
        }
    }

    /// Whether the host configuration exposes this action.
    ///
    /// Typing, deletion, history and selection are always available; toolbar
    /// groups can be switched off.
    pub fn is_enabled(&self, config: &EditorConfig) -> bool {
        match self {
            Self::ToggleBold
            | Self::ToggleItalic
            | Self::ToggleStrikethrough
            | Self::SetAlignment(_) => config.show_formatting,
            Self::SetFontSize(_) => config.show_font_size,
            Self::SetColor(_) => config.show_text_color,
            Self::RequestImageUpload => config.show_image_upload,
            Self::Insert { .. }
            | Self::InsertLineBreak
            | Self::InsertParagraph
            | Self::DeleteBackward
            | Self::Undo
            | Self::Redo
            | Self::SelectAll => true,
        }
    }
}

/// What executing an action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The document changed.
    Applied,
    /// Nothing to do: a no-op edit, a sticky-mark change, or a swallowed
    /// invalid position.
    Unchanged,
    /// The configuration hides this action.
    Disabled,
    /// The host should open its file picker and feed the pipeline.
    OpenFilePicker,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_flags_gate_toolbar_groups() {
        let config = EditorConfig {
            show_text_color: false,
            show_image_upload: false,
            ..EditorConfig::default()
        };
        assert!(EditorAction::ToggleBold.is_enabled(&config));
        assert!(EditorAction::SetFontSize(FontSize::Px12).is_enabled(&config));
        assert!(!EditorAction::SetColor(TextColor::Red).is_enabled(&config));
        assert!(!EditorAction::RequestImageUpload.is_enabled(&config));
        assert!(EditorAction::Undo.is_enabled(&config));
    }

    #[test]
    fn test_mark_kind() {
        assert_eq!(EditorAction::ToggleItalic.mark_kind(), Some(MarkKind::Italic));
        assert_eq!(EditorAction::Undo.mark_kind(), None);
    }
}
