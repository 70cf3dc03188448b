//! Inline marks: boolean styles plus the single-valued font size and color.

use std::fmt;

/// Boolean marks that can be toggled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkKind {
    Bold,
    Italic,
    Strike,
}

/// Font size choices offered by the toolbar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontSize {
    #[default]
    Default,
    Px12,
    Px14,
    Px16,
    Px18,
    Px20,
    Px24,
    Px28,
    Px32,
}

impl FontSize {
    pub const ALL: [FontSize; 9] = [
        Self::Default,
        Self::Px12,
        Self::Px14,
        Self::Px16,
        Self::Px18,
        Self::Px20,
        Self::Px24,
        Self::Px28,
        Self::Px32,
    ];

    /// CSS value, `None` for the default size.
    pub fn css(&self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::Px12 => Some("12px"),
            Self::Px14 => Some("14px"),
            Self::Px16 => Some("16px"),
            Self::Px18 => Some("18px"),
            Self::Px20 => Some("20px"),
            Self::Px24 => Some("24px"),
            Self::Px28 => Some("28px"),
            Self::Px32 => Some("32px"),
        }
    }

    /// Inverse of [`FontSize::css`]. Unknown sizes read as the default.
    pub fn from_css(value: &str) -> Self {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.css().is_some_and(|css| css.eq_ignore_ascii_case(value)))
            .unwrap_or_default()
    }
}

/// Named text colors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextColor {
    #[default]
    Default,
    Black,
    Gray,
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
}

impl TextColor {
    pub const ALL: [TextColor; 9] = [
        Self::Default,
        Self::Black,
        Self::Gray,
        Self::Red,
        Self::Orange,
        Self::Yellow,
        Self::Green,
        Self::Blue,
        Self::Purple,
    ];

    pub fn css(&self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::Black => Some("#000000"),
            Self::Gray => Some("#868e96"),
            Self::Red => Some("#e03131"),
            Self::Orange => Some("#f08c00"),
            Self::Yellow => Some("#fab005"),
            Self::Green => Some("#2f9e44"),
            Self::Blue => Some("#1971c2"),
            Self::Purple => Some("#9c36b5"),
        }
    }

    /// Accepts the hex value or the lowercase color name.
    pub fn from_css(value: &str) -> Self {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|c| {
                c.css().is_some_and(|css| css.eq_ignore_ascii_case(value))
                    || (*c != Self::Default && c.name().eq_ignore_ascii_case(value))
            })
            .unwrap_or_default()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Black => "black",
            Self::Gray => "gray",
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Purple => "purple",
        }
    }
}

impl fmt::Display for TextColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single mark value, as applied by a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mark {
    Bold,
    Italic,
    Strike,
    FontSize(FontSize),
    Color(TextColor),
}

impl From<MarkKind> for Mark {
    fn from(kind: MarkKind) -> Self {
        match kind {
            MarkKind::Bold => Mark::Bold,
            MarkKind::Italic => Mark::Italic,
            MarkKind::Strike => Mark::Strike,
        }
    }
}

/// The full set of marks on one inline node.
///
/// Font size and color are single-valued; `Default` means "not set".
/// Two runs may be coalesced exactly when their `MarkSet`s are equal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MarkSet {
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    pub font_size: FontSize,
    pub color: TextColor,
}

impl MarkSet {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn has(&self, kind: MarkKind) -> bool {
        match kind {
            MarkKind::Bold => self.bold,
            MarkKind::Italic => self.italic,
            MarkKind::Strike => self.strike,
        }
    }

    pub fn with_flag(mut self, kind: MarkKind, on: bool) -> Self {
        match kind {
            MarkKind::Bold => self.bold = on,
            MarkKind::Italic => self.italic = on,
            MarkKind::Strike => self.strike = on,
        }
        self
    }

    /// Apply a mark. `FontSize(Default)`/`Color(Default)` clear the value.
    pub fn with(self, mark: Mark) -> Self {
        match mark {
            Mark::Bold => self.with_flag(MarkKind::Bold, true),
            Mark::Italic => self.with_flag(MarkKind::Italic, true),
            Mark::Strike => self.with_flag(MarkKind::Strike, true),
            Mark::FontSize(font_size) => Self { font_size, ..self },
            Mark::Color(color) => Self { color, ..self },
        }
    }

    pub fn bold(self) -> Self {
        self.with(Mark::Bold)
    }

    pub fn italic(self) -> Self {
        self.with(Mark::Italic)
    }

    pub fn strike(self) -> Self {
        self.with(Mark::Strike)
    }
}
