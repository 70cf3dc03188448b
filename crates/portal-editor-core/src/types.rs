//! Core editor types: positions, selections and block attributes.

use std::fmt;

/// Index of a block in the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A location in the document.
///
/// `offset` counts inline units within the block: one per text character
/// (Unicode scalar value, NOT byte) and one per hard break. Image blocks have
/// two positions, 0 (before) and 1 (after).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub block: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(block: usize, offset: usize) -> Self {
        Self { block, offset }
    }

    pub fn block_id(&self) -> BlockId {
        BlockId(self.block)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block, self.offset)
    }
}

/// Text selection with anchor and head positions.
///
/// The anchor is where the selection started, the head is where the cursor is now.
/// They may be in any order - use `start()` and `end()` for ordered bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    /// Where selection started
    pub anchor: Position,
    /// Where cursor is now
    pub head: Position,
}

impl Default for Selection {
    fn default() -> Self {
        Self::collapsed(Position::default())
    }
}

impl Selection {
    pub fn new(anchor: Position, head: Position) -> Self {
        Self { anchor, head }
    }

    /// Create a collapsed selection (cursor position).
    pub fn collapsed(at: Position) -> Self {
        Self {
            anchor: at,
            head: at,
        }
    }

    /// Selection inside a single block.
    pub fn within(block: usize, start: usize, end: usize) -> Self {
        Self::new(Position::new(block, start), Position::new(block, end))
    }

    pub fn start(&self) -> Position {
        self.anchor.min(self.head)
    }

    pub fn end(&self) -> Position {
        self.anchor.max(self.head)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Check if the selection is backwards (head before anchor).
    pub fn is_backwards(&self) -> bool {
        self.head < self.anchor
    }
}

impl From<Position> for Selection {
    fn from(at: Position) -> Self {
        Self::collapsed(at)
    }
}

/// Paragraph alignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "justify",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" | "end" => Some(Self::Right),
            "justify" => Some(Self::Justify),
            _ => None,
        }
    }
}

/// Image blocks support every alignment except justify.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImageAlignment {
    #[default]
    Left,
    Center,
    Right,
}

impl ImageAlignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

impl From<Alignment> for ImageAlignment {
    /// Justify has no meaning for a picture; it falls back to left.
    fn from(alignment: Alignment) -> Self {
        match alignment {
            Alignment::Center => Self::Center,
            Alignment::Right => Self::Right,
            Alignment::Left | Alignment::Justify => Self::Left,
        }
    }
}

impl From<ImageAlignment> for Alignment {
    fn from(alignment: ImageAlignment) -> Self {
        match alignment {
            ImageAlignment::Left => Self::Left,
            ImageAlignment::Center => Self::Center,
            ImageAlignment::Right => Self::Right,
        }
    }
}
