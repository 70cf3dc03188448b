//! Structured document model.
//!
//! A `Document` is an ordered list of blocks. Paragraph content is kept
//! normalized at all times: adjacent text runs with equal marks are merged,
//! text runs are never empty, and a paragraph without content holds exactly
//! one placeholder hard break.

use crate::error::EditorError;
use crate::marks::MarkSet;
use crate::types::{Alignment, BlockId, ImageAlignment, Position};

/// A styled run of text. `content` is never empty inside a paragraph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextRun {
    pub content: String,
    pub marks: MarkSet,
}

impl TextRun {
    pub fn new(content: impl Into<String>, marks: MarkSet) -> Self {
        Self {
            content: content.into(),
            marks,
        }
    }

    pub fn plain(content: impl Into<String>) -> Self {
        Self::new(content, MarkSet::default())
    }
}

/// Inline content of a paragraph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inline {
    Text(TextRun),
    HardBreak { marks: MarkSet },
}

impl Inline {
    pub fn text(content: impl Into<String>, marks: MarkSet) -> Self {
        Self::Text(TextRun::new(content, marks))
    }

    pub fn hard_break() -> Self {
        Self::HardBreak {
            marks: MarkSet::default(),
        }
    }

    pub fn marks(&self) -> MarkSet {
        match self {
            Self::Text(run) => run.marks,
            Self::HardBreak { marks } => *marks,
        }
    }
}

/// One addressable unit of paragraph content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Unit {
    Char(char, MarkSet),
    Break(MarkSet),
}

impl Unit {
    pub(crate) fn marks(&self) -> MarkSet {
        match self {
            Self::Char(_, marks) | Self::Break(marks) => *marks,
        }
    }

    pub(crate) fn map_marks(self, f: impl Fn(MarkSet) -> MarkSet) -> Self {
        match self {
            Self::Char(c, marks) => Self::Char(c, f(marks)),
            Self::Break(marks) => Self::Break(f(marks)),
        }
    }

    pub(crate) fn is_char(&self) -> bool {
        matches!(self, Self::Char(..))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paragraph {
    pub alignment: Alignment,
    children: Vec<Inline>,
}

impl Default for Paragraph {
    fn default() -> Self {
        Self::empty(Alignment::Left)
    }
}

impl Paragraph {
    /// Build a paragraph from arbitrary inline nodes, normalizing them.
    pub fn new(alignment: Alignment, children: Vec<Inline>) -> Self {
        let units = children.iter().flat_map(inline_units).collect();
        Self::from_units(alignment, units)
    }

    /// The canonical empty paragraph.
    pub fn empty(alignment: Alignment) -> Self {
        Self {
            alignment,
            children: vec![Inline::hard_break()],
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(Alignment::Left, vec![Inline::text(text, MarkSet::default())])
    }

    pub fn children(&self) -> &[Inline] {
        &self.children
    }

    /// True for the canonical empty paragraph (a lone placeholder break).
    pub fn is_empty(&self) -> bool {
        matches!(self.children.as_slice(), [Inline::HardBreak { .. }])
    }

    /// Length in units. The placeholder break does not count.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        self.children
            .iter()
            .map(|inline| match inline {
                Inline::Text(run) => run.content.chars().count(),
                Inline::HardBreak { .. } => 1,
            })
            .sum()
    }

    /// Plain text, hard breaks as `\n`.
    pub fn text(&self) -> String {
        self.units()
            .into_iter()
            .map(|u| match u {
                Unit::Char(c, _) => c,
                Unit::Break(_) => '\n',
            })
            .collect()
    }

    pub(crate) fn units(&self) -> Vec<Unit> {
        if self.is_empty() {
            return Vec::new();
        }
        self.children.iter().flat_map(inline_units).collect()
    }

    /// Rebuild runs from units, coalescing equal neighbours.
    pub(crate) fn from_units(alignment: Alignment, units: Vec<Unit>) -> Self {
        let mut children: Vec<Inline> = Vec::new();
        for unit in units {
            match unit {
                Unit::Char(c, marks) => match children.last_mut() {
                    Some(Inline::Text(run)) if run.marks == marks => run.content.push(c),
                    _ => children.push(Inline::Text(TextRun::new(c.to_string(), marks))),
                },
                Unit::Break(marks) => children.push(Inline::HardBreak { marks }),
            }
        }
        if children.is_empty() {
            return Self::empty(alignment);
        }
        Self {
            alignment,
            children,
        }
    }

    /// Marks of the unit just before `offset`, or just after at offset 0.
    pub(crate) fn marks_at(&self, offset: usize) -> MarkSet {
        if self.is_empty() {
            return self.children[0].marks();
        }
        let units = self.units();
        let idx = offset.min(units.len());
        if idx > 0 {
            units[idx - 1].marks()
        } else {
            units.first().map(Unit::marks).unwrap_or_default()
        }
    }
}

/// A `\n` inside run content is a hard break, a `\t` is a space and `\r` is
/// dropped. Parsed markup reads tabs the same way.
pub(crate) fn inline_units(inline: &Inline) -> Vec<Unit> {
    match inline {
        Inline::Text(run) => text_units(&run.content, run.marks),
        Inline::HardBreak { marks } => vec![Unit::Break(*marks)],
    }
}

pub(crate) fn text_units(text: &str, marks: MarkSet) -> Vec<Unit> {
    text.chars()
        .filter(|&c| c != '\r')
        .map(|c| match c {
            '\n' => Unit::Break(marks),
            '\t' => Unit::Char(' ', marks),
            c => Unit::Char(c, marks),
        })
        .collect()
}

/// A block-level picture. `url` is never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBlock {
    url: String,
    pub alt: String,
    pub alignment: ImageAlignment,
}

impl ImageBlock {
    /// Returns `None` for an empty URL.
    pub fn new(url: impl Into<String>, alt: impl Into<String>) -> Option<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return None;
        }
        Some(Self {
            url,
            alt: alt.into(),
            alignment: ImageAlignment::Left,
        })
    }

    pub fn with_alignment(mut self, alignment: ImageAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Paragraph(Paragraph),
    Image(ImageBlock),
}

impl Block {
    /// Number of positions inside the block minus one.
    pub fn len(&self) -> usize {
        match self {
            Self::Paragraph(p) => p.len(),
            Self::Image(_) => 1,
        }
    }

    pub fn as_paragraph(&self) -> Option<&Paragraph> {
        match self {
            Self::Paragraph(p) => Some(p),
            Self::Image(_) => None,
        }
    }
}

/// The editable document: a non-empty list of blocks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document holding one empty paragraph.
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::Paragraph(Paragraph::default())],
        }
    }

    /// Build from blocks. An empty list becomes the empty document.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        if blocks.is_empty() {
            return Self::new();
        }
        Self { blocks }
    }

    /// One plain paragraph per line of `text`.
    pub fn from_text(text: &str) -> Self {
        Self::from_blocks(
            text.split('\n')
                .map(|line| Block::Paragraph(Paragraph::from_text(line)))
                .collect(),
        )
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, id: BlockId) -> Result<&Block, EditorError> {
        self.blocks.get(id.0).ok_or(EditorError::InvalidBlock(id))
    }

    pub fn paragraph(&self, id: BlockId) -> Result<&Paragraph, EditorError> {
        match self.block(id)? {
            Block::Paragraph(p) => Ok(p),
            Block::Image(_) => Err(EditorError::NotAParagraph(id)),
        }
    }

    /// True when the document is a single empty paragraph.
    pub fn is_empty(&self) -> bool {
        matches!(self.blocks.as_slice(), [Block::Paragraph(p)] if p.is_empty())
    }

    /// Check that `at` addresses an existing location.
    pub fn validate(&self, at: Position) -> Result<(), EditorError> {
        let block = self
            .blocks
            .get(at.block)
            .ok_or(EditorError::position(at, "block out of range"))?;
        if at.offset > block.len() {
            return Err(EditorError::position(at, "offset past end of block"));
        }
        Ok(())
    }

    /// Nearest valid position to `at`.
    pub fn clamp(&self, at: Position) -> Position {
        if at.block >= self.blocks.len() {
            return self.end();
        }
        Position::new(at.block, at.offset.min(self.blocks[at.block].len()))
    }

    pub fn start(&self) -> Position {
        Position::new(0, 0)
    }

    pub fn end(&self) -> Position {
        let last = self.blocks.len() - 1;
        Position::new(last, self.blocks[last].len())
    }

    /// Plain text of all paragraphs, one per line. Images are skipped.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(Block::as_paragraph)
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Verify the structural invariants, describing the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.blocks.is_empty() {
            return Err("document has no blocks".into());
        }
        for (i, block) in self.blocks.iter().enumerate() {
            match block {
                Block::Image(image) => {
                    if image.url.trim().is_empty() {
                        return Err(format!("image {i} has an empty url"));
                    }
                }
                Block::Paragraph(p) => {
                    if p.children.is_empty() {
                        return Err(format!("paragraph {i} has no children"));
                    }
                    for pair in p.children.windows(2) {
                        if let [Inline::Text(a), Inline::Text(b)] = pair {
                            if a.marks == b.marks {
                                return Err(format!(
                                    "paragraph {i} has uncoalesced runs {:?} / {:?}",
                                    a.content, b.content
                                ));
                            }
                        }
                    }
                    for child in &p.children {
                        if let Inline::Text(run) = child {
                            if run.content.is_empty() {
                                return Err(format!("paragraph {i} has an empty text run"));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
