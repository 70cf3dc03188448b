//! Host adapter.
//!
//! `Editor` owns the document, its undo history and the mark controller, and
//! is the only thing a host container talks to. It feeds initial and external
//! content in, emits normalized HTML out through `on_change`, and keeps
//! external content from clobbering an edit in progress.

use std::fmt;
use std::time::Duration;

use portal_common::EditorConfig;
use web_time::Instant;

use crate::actions::{ActionOutcome, EditorAction};
use crate::controller::{ActiveFormatting, DEFAULT_SETTLE_WINDOW, MarkController, NotifyState};
use crate::document::{Block, Document, ImageBlock};
use crate::error::EditorError;
use crate::html::{HtmlSerializer, SerializerKind};
use crate::marks::{FontSize, Mark, MarkKind, TextColor};
use crate::types::{Alignment, BlockId, Position, Selection};
use crate::undo::{DEFAULT_MAX_STEPS, UndoManager, UndoableDocument};

/// Receives normalized HTML after every committed change.
pub type ChangeCallback = Box<dyn FnMut(&str)>;

/// Read-only view handed to the host's ready callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorHandle {
    html: String,
    is_empty: bool,
    placeholder: String,
}

impl EditorHandle {
    pub fn html(&self) -> &str {
        &self.html
    }

    /// True when the placeholder should be shown.
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }
}

/// A mounted rich-text editor.
pub struct Editor {
    config: EditorConfig,
    history: UndoableDocument,
    controller: MarkController,
    serializer: Box<dyn HtmlSerializer>,
    on_change: Option<ChangeCallback>,
    focused: bool,
    pending_external: Option<String>,
    mounted: bool,
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("config", &self.config)
            .field("document", self.history.document())
            .field("controller", &self.controller)
            .field("focused", &self.focused)
            .field("pending_external", &self.pending_external)
            .field("mounted", &self.mounted)
            .finish_non_exhaustive()
    }
}

impl Editor {
    /// Mount an editor on `initial_html`. Loading does not emit a change.
    pub fn new(
        config: EditorConfig,
        initial_html: &str,
        on_change: impl FnMut(&str) + 'static,
    ) -> Self {
        let serializer = SerializerKind::default().build();
        let doc = serializer.parse(initial_html);
        let mut controller = MarkController::new(DEFAULT_SETTLE_WINDOW);
        controller.set_selection(&doc, Selection::collapsed(doc.end()));
        tracing::debug!(blocks = doc.block_count(), "editor mounted");
        Self {
            config,
            history: UndoableDocument::new(doc, DEFAULT_MAX_STEPS),
            controller,
            serializer,
            on_change: Some(Box::new(on_change)),
            focused: false,
            pending_external: None,
            mounted: true,
        }
    }

    /// Use a different serializer strategy.
    pub fn with_serializer(mut self, kind: SerializerKind) -> Self {
        self.serializer = kind.build();
        self
    }

    pub fn with_settle_window(mut self, window: Duration) -> Self {
        let selection = self.controller.selection();
        self.controller = MarkController::new(window);
        self.controller
            .set_selection(self.history.document(), selection);
        self
    }

    /// Hand the host a read-only handle, once, now that the editor is live.
    pub fn on_ready(&self, ready: impl FnOnce(&EditorHandle)) {
        if !self.mounted {
            tracing::debug!("ready callback after unmount ignored");
            return;
        }
        ready(&self.handle());
    }

    pub fn handle(&self) -> EditorHandle {
        EditorHandle {
            html: self.html(),
            is_empty: self.is_empty(),
            placeholder: self.config.placeholder.clone(),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        self.history.document()
    }

    pub fn html(&self) -> String {
        self.serializer.serialize(self.history.document())
    }

    pub fn is_empty(&self) -> bool {
        self.history.document().is_empty()
    }

    pub fn placeholder(&self) -> &str {
        &self.config.placeholder
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn selection(&self) -> Selection {
        self.controller.selection()
    }

    pub fn active_formatting(&self) -> ActiveFormatting {
        self.controller.active()
    }

    pub fn notify_state(&self) -> NotifyState {
        self.controller.notify_state()
    }

    /// When the host should call [`Editor::poll_settled`], if a color change
    /// is settling.
    pub fn settle_deadline(&self) -> Option<Instant> {
        self.controller.notify_state().deadline()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // === Host lifecycle ===

    pub fn focus(&mut self) {
        self.focused = true;
    }

    /// Lose focus, applying any external content that arrived meanwhile.
    pub fn blur(&mut self) {
        self.focused = false;
        if let Some(html) = self.pending_external.take() {
            tracing::debug!("applying deferred external content");
            self.load(&html);
        }
    }

    /// New content from the host.
    ///
    /// Applied immediately when the editor is not focused. While focused it is
    /// held until `blur`, the latest value winning, so an edit in progress is
    /// never discarded and the cursor never jumps.
    pub fn set_external_content(&mut self, html: &str) -> Result<(), EditorError> {
        self.ensure_mounted()?;
        if self.focused {
            self.pending_external = Some(html.to_string());
            return Ok(());
        }
        self.load(html);
        Ok(())
    }

    /// Tear down. Pending callbacks and later mutations become no-ops.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.on_change = None;
        self.pending_external = None;
        self.controller.reset_notify();
        tracing::debug!("editor unmounted");
    }

    fn load(&mut self, html: &str) {
        let doc = self.serializer.parse(html);
        if self.serializer.serialize(&doc) == self.html() {
            return;
        }
        self.history.reset(doc);
        let end = self.history.document().end();
        self.controller
            .place_cursor(self.history.document(), Selection::collapsed(end));
    }

    // === Selection ===

    pub fn set_selection(&mut self, selection: Selection) -> Result<(), EditorError> {
        self.ensure_mounted()?;
        let doc = self.history.document();
        if let Err(err) = doc
            .validate(selection.anchor)
            .and_then(|_| doc.validate(selection.head))
        {
            tracing::warn!(error = %err, "ignoring selection change");
            return Ok(());
        }
        self.controller.set_selection(doc, selection);
        Ok(())
    }

    pub fn select_all(&mut self) -> Result<(), EditorError> {
        let doc = self.history.document();
        let all = Selection::new(doc.start(), doc.end());
        self.set_selection(all)
    }

    // === Editing ===

    /// Type text at the cursor, replacing the selection.
    pub fn insert_text(&mut self, text: &str) -> Result<(), EditorError> {
        let selection = self.selection();
        let sticky = self.controller.sticky_marks();
        let text = text.to_string();
        let cursor = self.mutate("insert text", move |doc| {
            let at = doc.delete_range(selection)?;
            let marks = sticky.unwrap_or_else(|| doc.marks_at(at));
            doc.insert_text(at, &text, marks)
        })?;
        self.finish_edit(cursor);
        Ok(())
    }

    pub fn insert_line_break(&mut self) -> Result<(), EditorError> {
        let selection = self.selection();
        let sticky = self.controller.sticky_marks();
        let cursor = self.mutate("line break", move |doc| {
            let at = doc.delete_range(selection)?;
            let marks = sticky.unwrap_or_else(|| doc.marks_at(at));
            doc.insert_hard_break(at, marks)
        })?;
        self.finish_edit(cursor);
        Ok(())
    }

    /// Enter.
    pub fn split_paragraph(&mut self) -> Result<(), EditorError> {
        let selection = self.selection();
        let cursor = self.mutate("split paragraph", move |doc| {
            let at = doc.delete_range(selection)?;
            doc.split_paragraph(at)
        })?;
        self.finish_edit(cursor);
        Ok(())
    }

    /// Backspace.
    pub fn delete_backward(&mut self) -> Result<(), EditorError> {
        let selection = self.selection();
        let cursor = self.mutate("delete backward", move |doc| {
            if selection.is_collapsed() {
                doc.delete_backward(selection.head)
            } else {
                doc.delete_range(selection)
            }
        })?;
        self.finish_edit(cursor);
        Ok(())
    }

    /// Toggle a boolean mark on the selection, or as a sticky mark at a cursor.
    pub fn toggle_mark(&mut self, kind: MarkKind) -> Result<(), EditorError> {
        self.ensure_mounted()?;
        let selection = self.selection();
        if selection.is_collapsed() {
            self.controller
                .toggle_sticky(self.history.document(), kind);
            return Ok(());
        }
        self.mutate("toggle mark", move |doc| doc.toggle_mark(selection, kind))?;
        self.controller.refresh(self.history.document());
        Ok(())
    }

    pub fn set_font_size(&mut self, size: FontSize) -> Result<(), EditorError> {
        self.set_mark(Mark::FontSize(size)).map(|_| ())
    }

    /// Apply a color now, notifying once the settle window has passed.
    pub fn set_color(&mut self, color: TextColor) -> Result<(), EditorError> {
        self.set_color_at(color, Instant::now())
    }

    /// [`Editor::set_color`] with an explicit clock.
    ///
    /// Every call restarts the settle window. Changes made inside the window,
    /// color or otherwise, are reported together by the single notification
    /// [`Editor::poll_settled_at`] emits once the window has passed.
    pub fn set_color_at(&mut self, color: TextColor, now: Instant) -> Result<(), EditorError> {
        self.ensure_mounted()?;
        let ranged = !self.selection().is_collapsed();
        if ranged {
            self.controller.begin_settle(now);
        }
        self.set_mark(Mark::Color(color))?;
        Ok(())
    }

    /// Emit the held-back notification if the settle window has passed.
    ///
    /// Returns true when a notification went out.
    pub fn poll_settled(&mut self) -> bool {
        self.poll_settled_at(Instant::now())
    }

    pub fn poll_settled_at(&mut self, now: Instant) -> bool {
        if !self.mounted || !self.controller.poll_settled(now) {
            return false;
        }
        tracing::debug!("color change settled");
        self.emit();
        true
    }

    fn set_mark(&mut self, mark: Mark) -> Result<bool, EditorError> {
        self.ensure_mounted()?;
        let selection = self.selection();
        if selection.is_collapsed() {
            self.controller.set_sticky(self.history.document(), mark);
            return Ok(false);
        }
        let applied = self
            .mutate("set mark", move |doc| doc.set_mark(selection, mark))?
            .is_some();
        self.controller.refresh(self.history.document());
        Ok(applied)
    }

    /// Align every block the selection touches.
    pub fn set_alignment(&mut self, alignment: Alignment) -> Result<(), EditorError> {
        let selection = self.selection();
        self.mutate("set alignment", move |doc| {
            for block in selection.start().block..=selection.end().block {
                doc.set_alignment(BlockId(block), alignment)?;
            }
            Ok(())
        })?;
        self.controller.refresh(self.history.document());
        Ok(())
    }

    pub fn set_block_alignment(&mut self, id: BlockId, alignment: Alignment) -> Result<(), EditorError> {
        self.mutate("set alignment", move |doc| doc.set_alignment(id, alignment))?;
        self.controller.refresh(self.history.document());
        Ok(())
    }

    /// Insert an image at the cursor and move the cursor past it.
    pub fn insert_image(&mut self, image: ImageBlock) -> Result<(), EditorError> {
        let selection = self.selection();
        let cursor = self.mutate("insert image", move |doc| {
            let at = doc.delete_range(selection)?;
            doc.insert_image(at, image)
        })?;
        self.finish_edit(cursor);
        Ok(())
    }

    /// Insert an image that finished uploading.
    ///
    /// `at` is where the upload was started; it is clamped to the current
    /// document since the user may have edited meanwhile. The user's selection
    /// is carried across the insertion. Returns where the next image of the
    /// same batch should go.
    pub fn insert_uploaded_image(
        &mut self,
        at: Position,
        image: ImageBlock,
    ) -> Result<Position, EditorError> {
        self.ensure_mounted()?;
        let at = self.history.document().clamp(at);
        let into_image = matches!(self.history.document().blocks()[at.block], Block::Image(_));
        let (next, _) = self.history.transact(|doc| doc.insert_image(at, image))?;

        let selection = self.selection();
        let remap = |pos| remap_after_image(pos, at, next, into_image);
        self.controller.carry_selection(
            self.history.document(),
            Selection::new(remap(selection.anchor), remap(selection.head)),
        );
        tracing::debug!(%at, %next, "inserted uploaded image");
        self.emit();
        Ok(next)
    }

    // === History ===

    pub fn undo(&mut self) -> Result<bool, EditorError> {
        self.ensure_mounted()?;
        let undone = self.history.undo();
        if undone {
            self.controller.refresh(self.history.document());
            self.emit();
        }
        Ok(undone)
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        self.ensure_mounted()?;
        let redone = self.history.redo();
        if redone {
            self.controller.refresh(self.history.document());
            self.emit();
        }
        Ok(redone)
    }

    /// Dispatch an action from the keyboard or the toolbar.
    pub fn execute(&mut self, action: &EditorAction) -> Result<ActionOutcome, EditorError> {
        self.ensure_mounted()?;
        if !action.is_enabled(&self.config) {
            tracing::debug!(?action, "action disabled by configuration");
            return Ok(ActionOutcome::Disabled);
        }
        let before = self.history.document().clone();
        match action {
            EditorAction::Insert { text } => self.insert_text(text)?,
            EditorAction::InsertLineBreak => self.insert_line_break()?,
            EditorAction::InsertParagraph => self.split_paragraph()?,
            EditorAction::DeleteBackward => self.delete_backward()?,
            EditorAction::Undo => {
                self.undo()?;
            }
            EditorAction::Redo => {
                self.redo()?;
            }
            EditorAction::ToggleBold | EditorAction::ToggleItalic | EditorAction::ToggleStrikethrough => {
                if let Some(kind) = action.mark_kind() {
                    self.toggle_mark(kind)?;
                }
            }
            EditorAction::SetAlignment(alignment) => self.set_alignment(*alignment)?,
            EditorAction::SetFontSize(size) => self.set_font_size(*size)?,
            EditorAction::SetColor(color) => self.set_color(*color)?,
            EditorAction::RequestImageUpload => return Ok(ActionOutcome::OpenFilePicker),
            EditorAction::SelectAll => self.select_all()?,
        }
        if *self.history.document() == before {
            Ok(ActionOutcome::Unchanged)
        } else {
            Ok(ActionOutcome::Applied)
        }
    }

    // === Internals ===

    fn ensure_mounted(&self) -> Result<(), EditorError> {
        if self.mounted {
            Ok(())
        } else {
            Err(EditorError::Unmounted)
        }
    }

    /// Run a structural edit as one undo step.
    ///
    /// Invalid positions are logged and swallowed; the document is untouched.
    /// Returns `None` when the edit was swallowed.
    fn mutate<T>(
        &mut self,
        name: &'static str,
        edit: impl FnOnce(&mut Document) -> Result<T, EditorError>,
    ) -> Result<Option<T>, EditorError> {
        self.ensure_mounted()?;
        match self.history.transact(edit) {
            Ok((out, changed)) => {
                tracing::debug!(command = name, changed, "edit");
                if changed {
                    self.emit();
                }
                Ok(Some(out))
            }
            Err(err) => {
                tracing::warn!(command = name, error = %err, "edit ignored");
                Ok(None)
            }
        }
    }

    fn finish_edit(&mut self, cursor: Option<Position>) {
        if let Some(cursor) = cursor {
            self.controller
                .place_cursor(self.history.document(), Selection::collapsed(cursor));
        } else {
            self.controller.refresh(self.history.document());
        }
    }

    /// Notify the host, unless a color change is still settling.
    ///
    /// A window that lapsed without a poll settles here, so the edit that
    /// follows it is not held back too.
    fn emit(&mut self) {
        if self.controller.notify_state().is_suppressed() {
            if !self.controller.poll_settled(Instant::now()) {
                tracing::trace!("change notification held for settle window");
                return;
            }
            tracing::debug!("settle window lapsed before poll");
        }
        let html = self.html();
        if let Some(on_change) = self.on_change.as_mut() {
            on_change(&html);
        }
    }
}

/// Where `pos` ends up after an image was inserted at `at`.
///
/// `next` is what `insert_image` returned. Inserting into a paragraph splits
/// it, so positions past the split point move into the paragraph after the
/// image; inserting next to an image only shifts later blocks.
fn remap_after_image(pos: Position, at: Position, next: Position, into_image: bool) -> Position {
    if into_image {
        return if pos.block >= next.block {
            Position::new(pos.block + 1, pos.offset)
        } else {
            pos
        };
    }
    let shift = next.block - at.block;
    match pos.block.cmp(&at.block) {
        std::cmp::Ordering::Less => pos,
        std::cmp::Ordering::Equal if pos.offset < at.offset => pos,
        std::cmp::Ordering::Equal => Position::new(next.block, pos.offset - at.offset),
        std::cmp::Ordering::Greater => Position::new(pos.block + shift, pos.offset),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn recording(html: &str) -> (Editor, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let editor = Editor::new(EditorConfig::default(), html, move |html: &str| {
            sink.borrow_mut().push(html.to_string())
        });
        (editor, log)
    }

    #[test]
    fn test_initial_load_does_not_emit() {
        let (editor, log) = recording("<p>Hello</p>");
        assert!(log.borrow().is_empty());
        assert_eq!(editor.html(), "<p>Hello</p>");
        assert_eq!(editor.selection(), Selection::collapsed(Position::new(0, 5)));
    }

    #[test]
    fn test_on_ready_gets_handle() {
        let config = EditorConfig {
            placeholder: "Say something".into(),
            ..EditorConfig::default()
        };
        let editor = Editor::new(config, "", |_: &str| {});
        let mut seen = None;
        editor.on_ready(|handle| seen = Some(handle.clone()));
        let handle = seen.unwrap();
        assert!(handle.is_empty());
        assert_eq!(handle.placeholder(), "Say something");
        assert_eq!(handle.html(), "<p><br></p>");
    }

    #[test]
    fn test_invalid_selection_is_ignored() {
        let (mut editor, _) = recording("<p>abc</p>");
        editor
            .set_selection(Selection::collapsed(Position::new(0, 9)))
            .unwrap();
        assert_eq!(editor.selection(), Selection::collapsed(Position::new(0, 3)));
    }

    #[test]
    fn test_external_content_deferred_while_focused() {
        let (mut editor, log) = recording("<p>draft</p>");
        editor.focus();
        editor.insert_text("!").unwrap();
        editor.set_external_content("<p>first</p>").unwrap();
        editor.set_external_content("<p>second</p>").unwrap();
        assert_eq!(editor.html(), "<p>draft!</p>");

        editor.blur();
        assert_eq!(editor.html(), "<p>second</p>");
        assert!(!editor.can_undo());
        assert_eq!(log.borrow().as_slice(), ["<p>draft!</p>"]);
    }

    #[test]
    fn test_external_content_applied_when_unfocused() {
        let (mut editor, log) = recording("");
        editor.set_external_content("<p>loaded</p>").unwrap();
        assert_eq!(editor.html(), "<p>loaded</p>");
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_unmount_makes_mutations_noops() {
        let (mut editor, log) = recording("<p>x</p>");
        editor.unmount();
        assert_eq!(editor.insert_text("y"), Err(EditorError::Unmounted));
        assert_eq!(
            editor.insert_uploaded_image(
                Position::new(0, 0),
                ImageBlock::new("https://cdn/a.png", "").unwrap()
            ),
            Err(EditorError::Unmounted)
        );
        assert_eq!(editor.html(), "<p>x</p>");
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_typing_replaces_selection() {
        let (mut editor, log) = recording("<p>hello world</p>");
        editor.set_selection(Selection::within(0, 6, 11)).unwrap();
        editor.insert_text("there").unwrap();
        assert_eq!(editor.html(), "<p>hello there</p>");
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(editor.selection(), Selection::collapsed(Position::new(0, 11)));
    }

    #[test]
    fn test_enter_then_backspace() {
        let (mut editor, _) = recording("<p>ab</p>");
        editor
            .set_selection(Selection::collapsed(Position::new(0, 1)))
            .unwrap();
        editor.split_paragraph().unwrap();
        assert_eq!(editor.html(), "<p>a</p><p>b</p>");
        assert_eq!(editor.selection().head, Position::new(1, 0));
        editor.delete_backward().unwrap();
        assert_eq!(editor.html(), "<p>ab</p>");
    }

    #[test]
    fn test_undo_redo_emit() {
        let (mut editor, log) = recording("<p>a</p>");
        editor.insert_text("b").unwrap();
        assert!(editor.undo().unwrap());
        assert!(editor.redo().unwrap());
        assert!(!editor.redo().unwrap());
        assert_eq!(
            log.borrow().as_slice(),
            ["<p>ab</p>", "<p>a</p>", "<p>ab</p>"]
        );
    }

    #[test]
    fn test_disabled_action() {
        let config = EditorConfig {
            show_font_size: false,
            ..EditorConfig::default()
        };
        let mut editor = Editor::new(config, "<p>x</p>", |_: &str| {});
        editor.select_all().unwrap();
        let outcome = editor
            .execute(&EditorAction::SetFontSize(FontSize::Px32))
            .unwrap();
        assert_eq!(outcome, ActionOutcome::Disabled);
        assert_eq!(editor.html(), "<p>x</p>");
        assert_eq!(
            editor.execute(&EditorAction::RequestImageUpload).unwrap(),
            ActionOutcome::OpenFilePicker
        );
    }

    #[test]
    fn test_uploaded_image_keeps_user_cursor() {
        let (mut editor, _) = recording("<p>abcdef</p><p>next</p>");
        editor
            .set_selection(Selection::collapsed(Position::new(0, 5)))
            .unwrap();
        let image = ImageBlock::new("https://cdn/1.png", "").unwrap();
        let next = editor
            .insert_uploaded_image(Position::new(0, 2), image)
            .unwrap();
        assert_eq!(next, Position::new(2, 0));
        assert_eq!(
            editor.html(),
            r#"<p>ab</p><img src="https://cdn/1.png" alt=""><p>cdef</p><p>next</p>"#
        );
        // Cursor was after "abcde"; it now sits after "cde".
        assert_eq!(editor.selection(), Selection::collapsed(Position::new(2, 3)));
    }

    #[test]
    fn test_uploaded_image_stale_position_is_clamped() {
        let (mut editor, _) = recording("<p>ab</p>");
        let image = ImageBlock::new("https://cdn/1.png", "").unwrap();
        let next = editor
            .insert_uploaded_image(Position::new(7, 3), image)
            .unwrap();
        assert_eq!(next, Position::new(2, 0));
        assert_eq!(editor.document().block_count(), 3);
    }

    #[test]
    fn test_remap_after_image() {
        let at = Position::new(1, 2);
        let next = Position::new(3, 0);
        assert_eq!(remap_after_image(Position::new(0, 4), at, next, false), Position::new(0, 4));
        assert_eq!(remap_after_image(Position::new(1, 1), at, next, false), Position::new(1, 1));
        assert_eq!(remap_after_image(Position::new(1, 2), at, next, false), Position::new(3, 0));
        assert_eq!(remap_after_image(Position::new(2, 1), at, next, false), Position::new(4, 1));

        // Inserted after an image block at index 1.
        let next = Position::new(2, 1);
        assert_eq!(remap_after_image(Position::new(1, 1), Position::new(1, 1), next, true), Position::new(1, 1));
        assert_eq!(remap_after_image(Position::new(2, 0), Position::new(1, 1), next, true), Position::new(3, 0));
    }
}
