//! Mark/selection controller.
//!
//! Tracks the selection and sticky marks, derives the formatting the toolbar
//! should show, and owns the notification state machine that collapses a
//! burst of color changes into a single change notification.

use std::time::Duration;

use web_time::Instant;

use crate::document::{Block, Document};
use crate::marks::{FontSize, Mark, MarkKind, MarkSet, TextColor};
use crate::types::{Alignment, Selection};

/// Default settle window after a color change.
pub const DEFAULT_SETTLE_WINDOW: Duration = Duration::from_millis(200);

/// What the toolbar shows as active for the current selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActiveFormatting {
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    /// `Default` when unset or mixed across the selection.
    pub font_size: FontSize,
    /// `Default` when unset or mixed across the selection.
    pub color: TextColor,
    /// `None` when the selection spans blocks with different alignments.
    pub alignment: Option<Alignment>,
}

impl ActiveFormatting {
    pub fn has(&self, kind: MarkKind) -> bool {
        match kind {
            MarkKind::Bold => self.bold,
            MarkKind::Italic => self.italic,
            MarkKind::Strike => self.strike,
        }
    }
}

/// Derive the active formatting for a selection.
///
/// A collapsed cursor reports the sticky marks when present, otherwise the
/// marks of the content just before it. A range reports a mark as active only
/// when every covered character carries it.
pub fn active_formatting(
    doc: &Document,
    selection: Selection,
    sticky: Option<MarkSet>,
) -> ActiveFormatting {
    let alignment = uniform_alignment(doc, selection);
    if selection.is_collapsed() {
        let marks = sticky.unwrap_or_else(|| doc.marks_at(selection.head));
        return ActiveFormatting {
            bold: marks.bold,
            italic: marks.italic,
            strike: marks.strike,
            font_size: marks.font_size,
            color: marks.color,
            alignment,
        };
    }

    let units = doc.range_units(selection);
    let chars: Vec<MarkSet> = units
        .iter()
        .filter(|u| u.is_char())
        .map(|u| u.marks())
        .collect();
    let marks = if chars.is_empty() {
        units.iter().map(|u| u.marks()).collect()
    } else {
        chars
    };
    let Some(first) = marks.first().copied() else {
        return ActiveFormatting {
            alignment,
            ..ActiveFormatting::default()
        };
    };

    ActiveFormatting {
        bold: marks.iter().all(|m| m.bold),
        italic: marks.iter().all(|m| m.italic),
        strike: marks.iter().all(|m| m.strike),
        font_size: if marks.iter().all(|m| m.font_size == first.font_size) {
            first.font_size
        } else {
            FontSize::Default
        },
        color: if marks.iter().all(|m| m.color == first.color) {
            first.color
        } else {
            TextColor::Default
        },
        alignment,
    }
}

fn uniform_alignment(doc: &Document, selection: Selection) -> Option<Alignment> {
    let (start, end) = (selection.start(), selection.end());
    let mut found: Option<Alignment> = None;
    for block in doc.blocks().get(start.block..=end.block.min(doc.block_count().saturating_sub(1)))? {
        let alignment = match block {
            Block::Paragraph(p) => p.alignment,
            Block::Image(image) => image.alignment.into(),
        };
        match found {
            None => found = Some(alignment),
            Some(a) if a != alignment => return None,
            Some(_) => {}
        }
    }
    found
}

/// Change-notification state.
///
/// `Idle` emits after every mutation. A color change moves to `Mutating`,
/// which suppresses notifications until the settle deadline passes; further
/// color changes push the deadline out. The transition back to `Idle`
/// produces exactly one notification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NotifyState {
    #[default]
    Idle,
    Mutating { settle_deadline: Instant },
}

impl NotifyState {
    /// Enter (or extend) the settle window.
    pub fn begin_settle(&mut self, now: Instant, window: Duration) {
        *self = Self::Mutating {
            settle_deadline: now + window,
        };
    }

    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Mutating { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self {
            Self::Idle => None,
            Self::Mutating { settle_deadline } => Some(*settle_deadline),
        }
    }

    /// Leave the settle window once `now` reaches the deadline.
    ///
    /// Returns true exactly once per window, on the transition to `Idle`.
    pub fn poll(&mut self, now: Instant) -> bool {
        match *self {
            Self::Mutating { settle_deadline } if now >= settle_deadline => {
                *self = Self::Idle;
                true
            }
            _ => false,
        }
    }
}

/// Selection, sticky marks and derived formatting for one editor.
#[derive(Clone, Debug)]
pub struct MarkController {
    selection: Selection,
    sticky: Option<MarkSet>,
    active: ActiveFormatting,
    notify: NotifyState,
    settle_window: Duration,
}

impl Default for MarkController {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_WINDOW)
    }
}

impl MarkController {
    pub fn new(settle_window: Duration) -> Self {
        Self {
            selection: Selection::default(),
            sticky: None,
            active: ActiveFormatting::default(),
            notify: NotifyState::Idle,
            settle_window,
        }
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn sticky_marks(&self) -> Option<MarkSet> {
        self.sticky
    }

    pub fn active(&self) -> ActiveFormatting {
        self.active
    }

    pub fn notify_state(&self) -> NotifyState {
        self.notify
    }

    pub fn settle_window(&self) -> Duration {
        self.settle_window
    }

    /// Move the selection. Sticky marks do not survive a selection change.
    pub fn set_selection(&mut self, doc: &Document, selection: Selection) {
        if selection != self.selection {
            self.sticky = None;
        }
        self.selection = selection;
        self.refresh(doc);
    }

    /// Move the cursor after an edit, keeping nothing sticky.
    pub(crate) fn place_cursor(&mut self, doc: &Document, selection: Selection) {
        self.sticky = None;
        self.selection = selection;
        self.refresh(doc);
    }

    /// Follow content that moved under the selection. Sticky marks stay.
    pub(crate) fn carry_selection(&mut self, doc: &Document, selection: Selection) {
        self.selection = selection;
        self.refresh(doc);
    }

    /// Recompute derived formatting after a mutation.
    pub fn refresh(&mut self, doc: &Document) {
        let clamped = Selection::new(doc.clamp(self.selection.anchor), doc.clamp(self.selection.head));
        self.selection = clamped;
        self.active = active_formatting(doc, clamped, self.sticky);
    }

    /// Marks the next inserted text should carry.
    pub fn marks_for_insert(&self, doc: &Document) -> MarkSet {
        self.sticky
            .unwrap_or_else(|| doc.marks_at(self.selection.head))
    }

    /// Flip a boolean mark for the next typed text only.
    pub fn toggle_sticky(&mut self, doc: &Document, kind: MarkKind) {
        let marks = self.marks_for_insert(doc);
        self.sticky = Some(marks.with_flag(kind, !marks.has(kind)));
        self.active = active_formatting(doc, self.selection, self.sticky);
    }

    /// Set a mark for the next typed text only.
    pub fn set_sticky(&mut self, doc: &Document, mark: Mark) {
        let marks = self.marks_for_insert(doc);
        self.sticky = Some(marks.with(mark));
        self.active = active_formatting(doc, self.selection, self.sticky);
    }

    pub(crate) fn take_sticky(&mut self) -> Option<MarkSet> {
        self.sticky.take()
    }

    pub(crate) fn begin_settle(&mut self, now: Instant) {
        self.notify.begin_settle(now, self.settle_window);
    }

    pub(crate) fn poll_settled(&mut self, now: Instant) -> bool {
        self.notify.poll(now)
    }

    pub(crate) fn reset_notify(&mut self) {
        self.notify = NotifyState::Idle;
    }
}
