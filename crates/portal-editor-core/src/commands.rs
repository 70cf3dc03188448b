//! Structural editing commands on a `Document`.
//!
//! Every command validates its positions before touching the tree and builds
//! replacement blocks before swapping them in, so a failed command leaves the
//! document exactly as it was.

use crate::document::{Block, Document, ImageBlock, Paragraph, Unit, text_units};
use crate::error::EditorError;
use crate::marks::{Mark, MarkKind, MarkSet};
use crate::types::{Alignment, BlockId, Position, Selection};

impl Document {
    /// Marks in effect for content typed at `at`.
    pub fn marks_at(&self, at: Position) -> MarkSet {
        match self.blocks().get(at.block) {
            Some(Block::Paragraph(p)) => p.marks_at(at.offset),
            _ => MarkSet::default(),
        }
    }

    /// Insert text at `at` with the given marks. `\n` becomes a hard break.
    ///
    /// Returns the position just after the inserted text.
    pub fn insert_text(
        &mut self,
        at: Position,
        text: &str,
        marks: MarkSet,
    ) -> Result<Position, EditorError> {
        self.insert_units(at, text_units(text, marks))
    }

    /// Insert a hard line break without starting a new block.
    pub fn insert_hard_break(
        &mut self,
        at: Position,
        marks: MarkSet,
    ) -> Result<Position, EditorError> {
        self.insert_units(at, vec![Unit::Break(marks)])
    }

    fn insert_units(&mut self, at: Position, units: Vec<Unit>) -> Result<Position, EditorError> {
        let paragraph = self.paragraph_at(at)?;
        if units.is_empty() {
            return Ok(at);
        }
        let inserted = units.len();
        let mut content = paragraph.units();
        content.splice(at.offset..at.offset, units);
        let updated = Paragraph::from_units(paragraph.alignment, content);
        let len = updated.len();
        self.blocks_mut()[at.block] = Block::Paragraph(updated);
        tracing::trace!(%at, inserted, "insert");
        Ok(Position::new(at.block, (at.offset + inserted).min(len)))
    }

    /// Split the block at `at` into two paragraphs (Enter).
    ///
    /// Returns the start of the second paragraph.
    pub fn split_paragraph(&mut self, at: Position) -> Result<Position, EditorError> {
        self.validate(at)?;
        match &self.blocks()[at.block] {
            Block::Paragraph(p) => {
                let mut left = p.units();
                let right = left.split_off(at.offset);
                let alignment = p.alignment;
                self.blocks_mut().splice(
                    at.block..=at.block,
                    [
                        Block::Paragraph(Paragraph::from_units(alignment, left)),
                        Block::Paragraph(Paragraph::from_units(alignment, right)),
                    ],
                );
                Ok(Position::new(at.block + 1, 0))
            }
            Block::Image(_) => {
                // Offset 0 opens a paragraph before the image, 1 after it.
                let index = at.block + at.offset;
                self.blocks_mut()
                    .insert(index, Block::Paragraph(Paragraph::default()));
                Ok(Position::new(at.block + 1, 0))
            }
        }
    }

    /// Delete everything between the selection bounds, merging the boundary
    /// paragraphs. Returns the collapsed cursor position.
    pub fn delete_range(&mut self, selection: Selection) -> Result<Position, EditorError> {
        let (start, end) = (selection.start(), selection.end());
        self.validate(start)?;
        self.validate(end)?;
        if start == end {
            return Ok(start);
        }

        let first = &self.blocks()[start.block];
        let last = &self.blocks()[end.block];
        let mut replacement: Vec<Block> = Vec::new();

        if start.block == end.block {
            match first {
                Block::Paragraph(p) => {
                    let mut units = p.units();
                    units.drain(start.offset..end.offset);
                    replacement.push(Block::Paragraph(Paragraph::from_units(p.alignment, units)));
                }
                // The only non-empty range inside an image covers the image.
                Block::Image(_) => {}
            }
        } else {
            let head = match first {
                Block::Paragraph(p) => {
                    let mut units = p.units();
                    units.truncate(start.offset);
                    Some((p.alignment, units))
                }
                Block::Image(_) => {
                    if start.offset == 1 {
                        replacement.push(first.clone());
                    }
                    None
                }
            };
            let tail = match last {
                Block::Paragraph(p) => Some(p.units().split_off(end.offset)),
                Block::Image(_) => None,
            };
            match (head, tail) {
                (Some((alignment, mut head)), Some(tail)) => {
                    head.extend(tail);
                    replacement.push(Block::Paragraph(Paragraph::from_units(alignment, head)));
                }
                (Some((alignment, head)), None) => {
                    replacement.push(Block::Paragraph(Paragraph::from_units(alignment, head)));
                    if end.offset == 0 {
                        replacement.push(last.clone());
                    }
                }
                (None, Some(tail)) => {
                    let alignment = last.as_paragraph().map(|p| p.alignment).unwrap_or_default();
                    replacement.push(Block::Paragraph(Paragraph::from_units(alignment, tail)));
                }
                (None, None) => {
                    if end.offset == 0 {
                        replacement.push(last.clone());
                    }
                }
            }
        }

        let cursor = match first {
            Block::Paragraph(_) => start,
            Block::Image(_) if start.offset == 1 && start.block != end.block => {
                Position::new(start.block + 1, 0)
            }
            Block::Image(_) => Position::new(start.block, 0),
        };

        self.blocks_mut()
            .splice(start.block..=end.block, replacement);
        if self.blocks().is_empty() {
            *self = Document::new();
        }
        tracing::trace!(%start, %end, "delete range");
        Ok(self.clamp(cursor))
    }

    /// Backspace at a collapsed cursor.
    pub fn delete_backward(&mut self, at: Position) -> Result<Position, EditorError> {
        self.validate(at)?;
        if at.offset > 0 {
            let from = Position::new(at.block, at.offset - 1);
            return self.delete_range(Selection::new(from, at));
        }
        if at.block == 0 {
            return Ok(at);
        }
        let prev = at.block - 1;
        match &self.blocks()[prev] {
            Block::Paragraph(p) => {
                let from = Position::new(prev, p.len());
                self.delete_range(Selection::new(from, at))
            }
            Block::Image(_) => {
                self.blocks_mut().remove(prev);
                Ok(Position::new(prev, 0))
            }
        }
    }

    /// Units covered by a selection, across blocks. Images contribute nothing.
    pub(crate) fn range_units(&self, selection: Selection) -> Vec<Unit> {
        let (start, end) = (selection.start(), selection.end());
        let mut out = Vec::new();
        for (index, block) in self.blocks().iter().enumerate() {
            if index < start.block || index > end.block {
                continue;
            }
            let Block::Paragraph(p) = block else {
                continue;
            };
            let units = p.units();
            let from = if index == start.block { start.offset } else { 0 };
            let to = if index == end.block { end.offset } else { units.len() };
            if from < to && to <= units.len() {
                out.extend_from_slice(&units[from..to]);
            }
        }
        out
    }

    fn map_marks(
        &mut self,
        selection: Selection,
        f: impl Fn(MarkSet) -> MarkSet,
    ) -> Result<(), EditorError> {
        let (start, end) = (selection.start(), selection.end());
        self.validate(start)?;
        self.validate(end)?;

        let mut updated = Vec::new();
        for index in start.block..=end.block {
            let Block::Paragraph(p) = &self.blocks()[index] else {
                continue;
            };
            let mut units = p.units();
            let from = if index == start.block { start.offset } else { 0 };
            let to = if index == end.block { end.offset } else { units.len() };
            for unit in &mut units[from..to] {
                *unit = unit.map_marks(&f);
            }
            updated.push((index, Paragraph::from_units(p.alignment, units)));
        }
        for (index, paragraph) in updated {
            self.blocks_mut()[index] = Block::Paragraph(paragraph);
        }
        Ok(())
    }

    /// Toggle a boolean mark over a non-empty range.
    ///
    /// The mark is removed when every covered character already carries it
    /// and added everywhere otherwise. Breaks only decide when the range holds
    /// no characters. Collapsed selections are sticky-mark territory and are
    /// handled by the editor, so this is a no-op for them.
    pub fn toggle_mark(&mut self, selection: Selection, kind: MarkKind) -> Result<(), EditorError> {
        self.validate(selection.start())?;
        self.validate(selection.end())?;
        if selection.is_collapsed() {
            return Ok(());
        }
        let units = self.range_units(selection);
        let chars: Vec<_> = units.iter().filter(|u| u.is_char()).collect();
        let all_marked = if chars.is_empty() {
            !units.is_empty() && units.iter().all(|u| u.marks().has(kind))
        } else {
            chars.iter().all(|u| u.marks().has(kind))
        };
        self.map_marks(selection, |marks| marks.with_flag(kind, !all_marked))
    }

    /// Set a mark over a range. Default font size/color clear the value.
    pub fn set_mark(&mut self, selection: Selection, mark: Mark) -> Result<(), EditorError> {
        self.map_marks(selection, |marks| marks.with(mark))
    }

    /// Update the alignment of a paragraph or image.
    pub fn set_alignment(&mut self, id: BlockId, alignment: Alignment) -> Result<(), EditorError> {
        match self
            .blocks_mut()
            .get_mut(id.0)
            .ok_or(EditorError::InvalidBlock(id))?
        {
            Block::Paragraph(p) => p.alignment = alignment,
            Block::Image(image) => image.alignment = alignment.into(),
        }
        Ok(())
    }

    /// Insert an image block at `at`, splitting the paragraph there.
    ///
    /// The text after the split point (possibly empty) becomes the paragraph
    /// following the image; the returned position is its start, so repeated
    /// insertions at the returned position keep their order.
    pub fn insert_image(
        &mut self,
        at: Position,
        image: ImageBlock,
    ) -> Result<Position, EditorError> {
        self.validate(at)?;
        match &self.blocks()[at.block] {
            Block::Paragraph(p) => {
                let mut left = p.units();
                let right = left.split_off(at.offset);
                let alignment = p.alignment;
                let mut replacement = Vec::with_capacity(3);
                let had_left = !left.is_empty();
                if had_left {
                    replacement.push(Block::Paragraph(Paragraph::from_units(alignment, left)));
                }
                replacement.push(Block::Image(image));
                replacement.push(Block::Paragraph(Paragraph::from_units(alignment, right)));
                self.blocks_mut().splice(at.block..=at.block, replacement);
                let after = at.block + if had_left { 2 } else { 1 };
                Ok(Position::new(after, 0))
            }
            Block::Image(_) => {
                let index = at.block + at.offset;
                self.blocks_mut().insert(index, Block::Image(image));
                Ok(Position::new(index, 1))
            }
        }
    }

    fn paragraph_at(&self, at: Position) -> Result<&Paragraph, EditorError> {
        self.validate(at)?;
        match &self.blocks()[at.block] {
            Block::Paragraph(p) => Ok(p),
            Block::Image(_) => Err(EditorError::position(at, "not inside a paragraph")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Inline, TextRun};
    use crate::marks::{FontSize, TextColor};

    fn plain() -> MarkSet {
        MarkSet::default()
    }

    fn runs(doc: &Document, block: usize) -> Vec<Inline> {
        doc.paragraph(BlockId(block)).unwrap().children().to_vec()
    }

    #[test]
    fn test_insert_text_coalesces_with_neighbour() {
        let mut doc = Document::from_text("hello");
        let at = doc.insert_text(Position::new(0, 5), " world", plain()).unwrap();
        assert_eq!(at, Position::new(0, 11));
        assert_eq!(runs(&doc, 0), vec![Inline::text("hello world", plain())]);
        doc.check_invariants().unwrap();
    }

    #[test]
    fn test_insert_text_into_empty_paragraph() {
        let mut doc = Document::new();
        let at = doc.insert_text(Position::new(0, 0), "x", plain()).unwrap();
        assert_eq!(at, Position::new(0, 1));
        assert_eq!(runs(&doc, 0), vec![Inline::text("x", plain())]);
        assert!(!doc.is_empty());
    }

    #[test]
    fn test_insert_text_tab_is_space() {
        let mut doc = Document::new();
        doc.insert_text(Position::new(0, 0), "a\tb", plain()).unwrap();
        assert_eq!(runs(&doc, 0), vec![Inline::text("a b", plain())]);
        assert_eq!(doc.paragraph(BlockId(0)).unwrap().len(), 3);
    }

    #[test]
    fn test_insert_text_newline_is_hard_break() {
        let mut doc = Document::new();
        doc.insert_text(Position::new(0, 0), "a\r\nb", plain()).unwrap();
        assert_eq!(
            runs(&doc, 0),
            vec![
                Inline::text("a", plain()),
                Inline::hard_break(),
                Inline::text("b", plain())
            ]
        );
        assert_eq!(doc.block_count(), 1);
    }

    #[test]
    fn test_insert_at_stale_position_is_rejected() {
        let mut doc = Document::from_text("abc");
        let before = doc.clone();
        let err = doc.insert_text(Position::new(0, 4), "x", plain()).unwrap_err();
        assert!(matches!(err, EditorError::InvalidPosition { .. }));
        let err = doc.insert_text(Position::new(3, 0), "x", plain()).unwrap_err();
        assert!(matches!(err, EditorError::InvalidPosition { .. }));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_toggle_bold_merges_runs() {
        let bold = plain().bold();
        let mut doc = Document::from_blocks(vec![Block::Paragraph(Paragraph::new(
            Alignment::Left,
            vec![Inline::text("ab", plain()), Inline::text("cd", bold)],
        ))]);
        doc.toggle_mark(Selection::within(0, 0, 4), MarkKind::Bold).unwrap();
        assert_eq!(runs(&doc, 0), vec![Inline::text("abcd", bold)]);

        // Uniformly bold now, so toggling again removes it everywhere.
        doc.toggle_mark(Selection::within(0, 0, 4), MarkKind::Bold).unwrap();
        assert_eq!(runs(&doc, 0), vec![Inline::text("abcd", plain())]);
    }

    #[test]
    fn test_toggle_splits_at_range_boundaries() {
        let mut doc = Document::from_text("abcdef");
        doc.toggle_mark(Selection::within(0, 2, 4), MarkKind::Italic).unwrap();
        assert_eq!(
            runs(&doc, 0),
            vec![
                Inline::text("ab", plain()),
                Inline::text("cd", plain().italic()),
                Inline::text("ef", plain()),
            ]
        );
        doc.check_invariants().unwrap();
    }

    #[test]
    fn test_toggle_across_blocks_skips_images() {
        let mut doc = Document::from_text("one\ntwo");
        doc.insert_image(Position::new(1, 0), ImageBlock::new("https://i/1.png", "").unwrap())
            .unwrap();
        // blocks: "one", image, "two"
        doc.toggle_mark(
            Selection::new(Position::new(0, 1), Position::new(2, 2)),
            MarkKind::Strike,
        )
        .unwrap();
        assert_eq!(
            runs(&doc, 0),
            vec![Inline::text("o", plain()), Inline::text("ne", plain().strike())]
        );
        assert_eq!(
            runs(&doc, 2),
            vec![Inline::text("tw", plain().strike()), Inline::text("o", plain())]
        );
    }

    #[test]
    fn test_set_mark_single_valued() {
        let mut doc = Document::from_text("abc");
        let all = Selection::within(0, 0, 3);
        doc.set_mark(all, Mark::Color(TextColor::Red)).unwrap();
        doc.set_mark(Selection::within(0, 1, 2), Mark::Color(TextColor::Blue)).unwrap();
        doc.set_mark(all, Mark::FontSize(FontSize::Px20)).unwrap();
        let red = MarkSet {
            color: TextColor::Red,
            font_size: FontSize::Px20,
            ..plain()
        };
        let blue = MarkSet {
            color: TextColor::Blue,
            ..red
        };
        assert_eq!(
            runs(&doc, 0),
            vec![
                Inline::text("a", red),
                Inline::text("b", blue),
                Inline::text("c", red)
            ]
        );
        doc.set_mark(all, Mark::Color(TextColor::Default)).unwrap();
        doc.set_mark(all, Mark::FontSize(FontSize::Default)).unwrap();
        assert_eq!(runs(&doc, 0), vec![Inline::text("abc", plain())]);
    }

    #[test]
    fn test_set_alignment_keeps_content() {
        let mut doc = Document::from_text("hi");
        doc.set_alignment(BlockId(0), Alignment::Justify).unwrap();
        let p = doc.paragraph(BlockId(0)).unwrap();
        assert_eq!(p.alignment, Alignment::Justify);
        assert_eq!(p.text(), "hi");
        assert_eq!(
            doc.set_alignment(BlockId(4), Alignment::Left),
            Err(EditorError::InvalidBlock(BlockId(4)))
        );
    }

    #[test]
    fn test_split_and_merge_paragraph() {
        let mut doc = Document::from_text("hello");
        doc.set_alignment(BlockId(0), Alignment::Center).unwrap();
        let at = doc.split_paragraph(Position::new(0, 2)).unwrap();
        assert_eq!(at, Position::new(1, 0));
        assert_eq!(doc.text(), "he\nllo");
        assert_eq!(doc.paragraph(BlockId(1)).unwrap().alignment, Alignment::Center);

        let at = doc.delete_backward(at).unwrap();
        assert_eq!(at, Position::new(0, 2));
        assert_eq!(doc.text(), "hello");
        assert_eq!(doc.block_count(), 1);
    }

    #[test]
    fn test_split_at_end_creates_empty_paragraph() {
        let mut doc = Document::from_text("abc");
        doc.split_paragraph(Position::new(0, 3)).unwrap();
        assert_eq!(doc.block_count(), 2);
        assert!(doc.paragraph(BlockId(1)).unwrap().is_empty());
        doc.check_invariants().unwrap();
    }

    #[test]
    fn test_delete_range_across_blocks() {
        let mut doc = Document::from_text("first\nsecond\nthird");
        let at = doc
            .delete_range(Selection::new(Position::new(0, 2), Position::new(2, 3)))
            .unwrap();
        assert_eq!(at, Position::new(0, 2));
        assert_eq!(doc.text(), "fird");
        assert_eq!(doc.block_count(), 1);
    }

    #[test]
    fn test_delete_everything_leaves_empty_document() {
        let mut doc = Document::from_text("abc\ndef");
        doc.insert_image(Position::new(1, 3), ImageBlock::new("https://i/x.png", "").unwrap())
            .unwrap();
        let end = doc.end();
        doc.delete_range(Selection::new(doc.start(), end)).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_delete_backward_removes_image() {
        let mut doc = Document::from_text("abc");
        let after = doc
            .insert_image(Position::new(0, 3), ImageBlock::new("https://i/x.png", "").unwrap())
            .unwrap();
        assert_eq!(doc.block_count(), 3);
        let at = doc.delete_backward(after).unwrap();
        assert_eq!(at, Position::new(1, 0));
        assert_eq!(doc.block_count(), 2);
        assert!(doc.blocks().iter().all(|b| matches!(b, Block::Paragraph(_))));
    }

    #[test]
    fn test_insert_image_splits_paragraph() {
        let mut doc = Document::from_text("hello world");
        let after = doc
            .insert_image(Position::new(0, 5), ImageBlock::new("https://i/a.png", "a").unwrap())
            .unwrap();
        assert_eq!(after, Position::new(2, 0));
        assert_eq!(doc.block_count(), 3);
        assert!(matches!(&doc.blocks()[1], Block::Image(i) if i.url() == "https://i/a.png"));
        assert_eq!(
            runs(&doc, 2),
            vec![Inline::Text(TextRun::plain(" world"))]
        );

        // Second insertion at the returned cursor lands after the first.
        doc.insert_image(after, ImageBlock::new("https://i/b.png", "b").unwrap())
            .unwrap();
        let urls: Vec<_> = doc
            .blocks()
            .iter()
            .filter_map(|b| match b {
                Block::Image(i) => Some(i.url()),
                _ => None,
            })
            .collect();
        assert_eq!(urls, vec!["https://i/a.png", "https://i/b.png"]);
        doc.check_invariants().unwrap();
    }

    #[test]
    fn test_insert_image_into_empty_document() {
        let mut doc = Document::new();
        let after = doc
            .insert_image(Position::new(0, 0), ImageBlock::new("https://i/a.png", "").unwrap())
            .unwrap();
        assert_eq!(after, Position::new(1, 0));
        assert_eq!(doc.block_count(), 2);
        assert!(matches!(&doc.blocks()[0], Block::Image(_)));
        assert!(doc.paragraph(BlockId(1)).unwrap().is_empty());
    }

    #[test]
    fn test_marks_at_reads_previous_unit() {
        let bold = plain().bold();
        let doc = Document::from_blocks(vec![Block::Paragraph(Paragraph::new(
            Alignment::Left,
            vec![Inline::text("ab", bold), Inline::text("cd", plain())],
        ))]);
        assert_eq!(doc.marks_at(Position::new(0, 0)), bold);
        assert_eq!(doc.marks_at(Position::new(0, 2)), bold);
        assert_eq!(doc.marks_at(Position::new(0, 3)), plain());
    }
}
