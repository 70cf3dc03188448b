//! Snapshot history.
//!
//! Every committed edit pushes the previous tree, so stepping back restores
//! marks and alignment along with the text.

use crate::document::Document;
use crate::error::EditorError;

/// Linear undo/redo over some editable state.
pub trait UndoManager {
    fn can_undo(&self) -> bool;

    fn can_redo(&self) -> bool;

    /// Step back one edit. False when there is nothing to undo.
    fn undo(&mut self) -> bool;

    /// Re-apply the last undone edit. False when there is nothing to redo.
    fn redo(&mut self) -> bool;

    /// Forget both stacks. The current state is kept.
    fn clear_history(&mut self);
}

/// Default bound on recorded steps.
pub const DEFAULT_MAX_STEPS: usize = 100;

/// A `Document` wrapper that records a snapshot before every change.
///
/// All mutations go through [`UndoableDocument::transact`], which runs the
/// edit on a copy and only commits it when the edit succeeds. Snapshots hold
/// the full tree, so undo restores marks and alignment exactly.
#[derive(Clone, Debug)]
pub struct UndoableDocument {
    doc: Document,
    undo_stack: Vec<Document>,
    redo_stack: Vec<Document>,
    max_steps: usize,
}

impl Default for UndoableDocument {
    fn default() -> Self {
        Self::new(Document::new(), DEFAULT_MAX_STEPS)
    }
}

impl UndoableDocument {
    pub fn new(doc: Document, max_steps: usize) -> Self {
        Self {
            doc,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps,
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Replace the whole document and forget history.
    pub fn reset(&mut self, doc: Document) {
        self.doc = doc;
        self.clear_history();
    }

    /// Run an edit atomically.
    ///
    /// Returns the edit's output and whether the document changed. On error the
    /// document and history are untouched.
    pub fn transact<T>(
        &mut self,
        edit: impl FnOnce(&mut Document) -> Result<T, EditorError>,
    ) -> Result<(T, bool), EditorError> {
        let mut working = self.doc.clone();
        let out = edit(&mut working)?;
        let changed = working != self.doc;
        if changed {
            let before = std::mem::replace(&mut self.doc, working);
            self.record(before);
        }
        Ok((out, changed))
    }

    fn record(&mut self, before: Document) {
        self.redo_stack.clear();
        self.undo_stack.push(before);
        while self.undo_stack.len() > self.max_steps {
            self.undo_stack.remove(0);
        }
    }
}

impl UndoManager for UndoableDocument {
    fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn undo(&mut self) -> bool {
        let Some(prev) = self.undo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.doc, prev);
        self.redo_stack.push(current);
        true
    }

    fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.doc, next);
        self.undo_stack.push(current);
        true
    }

    fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
