//! HTML serialization and normalization.
//!
//! Two interchangeable strategies sit behind [`HtmlSerializer`]:
//!
//! - [`TreeSerializer`] walks the document tree and emits normalized markup
//!   directly.
//! - [`RegexSerializer`] emits raw markup and rewrites it with string rules,
//!   for callers that only have a flat string to work with.
//!
//! Both produce identical output for every document, and both satisfy
//! `serialize(parse(serialize(d))) == serialize(d)`.
//!
//! Normalized output preserves what a browser would otherwise collapse: runs
//! of spaces become one space followed by `&nbsp;` entities, and an empty
//! paragraph is written as `<p><br></p>` rather than `<p></p>`.

mod parser;
mod rewrite;
mod writer;

use std::fmt;

pub use parser::{parse, try_parse};
pub use rewrite::RegexSerializer;

use crate::document::Document;

/// Converts between a `Document` and its HTML form.
pub trait HtmlSerializer {
    /// Write normalized HTML.
    fn serialize(&self, doc: &Document) -> String;

    /// Read HTML. Never fails; malformed input becomes one plain paragraph.
    fn parse(&self, html: &str) -> Document {
        parser::parse(html)
    }

    /// Parse then serialize.
    fn normalize(&self, html: &str) -> String {
        self.serialize(&self.parse(html))
    }
}

/// Structural tree-walk serializer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TreeSerializer;

impl HtmlSerializer for TreeSerializer {
    fn serialize(&self, doc: &Document) -> String {
        writer::write_document(doc, writer::WriteMode::Normalized)
    }
}

/// Which serializer strategy to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SerializerKind {
    #[default]
    Tree,
    Regex,
}

impl SerializerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Regex => "regex",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tree" => Some(Self::Tree),
            "regex" => Some(Self::Regex),
            _ => None,
        }
    }

    pub fn build(self) -> Box<dyn HtmlSerializer> {
        match self {
            Self::Tree => Box::new(TreeSerializer),
            Self::Regex => Box::new(RegexSerializer),
        }
    }
}

impl fmt::Display for SerializerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, ImageBlock, Inline, Paragraph};
    use crate::marks::{FontSize, Mark, MarkSet, TextColor};
    use crate::types::{Alignment, ImageAlignment};

    fn both(doc: &Document) -> String {
        let tree = TreeSerializer.serialize(doc);
        let regex = RegexSerializer.serialize(doc);
        assert_eq!(tree, regex, "strategies disagree");
        tree
    }

    fn sample_documents() -> Vec<Document> {
        let red = MarkSet::default().with(Mark::Color(TextColor::Red));
        let big = MarkSet::default()
            .with(Mark::FontSize(FontSize::Px24))
            .italic();
        vec![
            Document::new(),
            Document::from_text("Hello"),
            Document::from_text("first\n\nthird"),
            Document::from_text("a   b"),
            Document::from_text("col\tcol\t\tend"),
            Document::from_text("  leading and trailing  "),
            Document::from_text("tom & jerry <3 \u{a0}x"),
            Document::from_blocks(vec![
                Block::Paragraph(Paragraph::new(
                    Alignment::Center,
                    vec![
                        Inline::text("plain ", MarkSet::default()),
                        Inline::text("bold  red", red.bold()),
                        Inline::hard_break(),
                        Inline::text(" big", big),
                        Inline::text("struck", MarkSet::default().strike()),
                    ],
                )),
                Block::Image(
                    ImageBlock::new("https://cdn.example/a b.png?x=1&y=\"2\"", "a  cat")
                        .unwrap()
                        .with_alignment(ImageAlignment::Right),
                ),
                Block::Paragraph(Paragraph::empty(Alignment::Justify)),
                Block::Paragraph(Paragraph::new(
                    Alignment::Left,
                    vec![Inline::hard_break(), Inline::hard_break()],
                )),
            ]),
        ]
    }

    #[test]
    fn test_strategies_agree_and_are_idempotent() {
        for doc in sample_documents() {
            let once = both(&doc);
            for kind in [SerializerKind::Tree, SerializerKind::Regex] {
                let serializer = kind.build();
                let reparsed = serializer.parse(&once);
                reparsed.check_invariants().unwrap();
                assert_eq!(serializer.serialize(&reparsed), once, "{kind} on {once}");
            }
        }
    }

    #[test]
    fn test_blank_line_preserved() {
        let html = both(&Document::from_text("first\n\nthird"));
        insta::assert_snapshot!(html, @"<p>first</p><p><br></p><p>third</p>");
    }

    #[test]
    fn test_space_run() {
        let html = both(&Document::from_text("a   b"));
        insta::assert_snapshot!(html, @"<p>a &nbsp;&nbsp;b</p>");
    }

    #[test]
    fn test_marks_and_alignment() {
        let doc = &sample_documents()[6];
        insta::assert_snapshot!(both(doc), @r#"<p style="text-align: center">plain <span style="color: #e03131"><strong>bold &nbsp;red</strong></span><br><span style="font-size: 24px"><em> big</em></span><s>struck</s></p><img src="https://cdn.example/a b.png?x=1&amp;y=&quot;2&quot;" alt="a  cat" data-align="right"><p style="text-align: justify"><br></p><p><br><br></p>"#);
    }

    #[test]
    fn test_normalize_external_markup() {
        let html = "<div align=\"right\"><b>x</b>  <i>y</i></div>\n<p></p><h2>title</h2>";
        insta::assert_snapshot!(
            TreeSerializer.normalize(html),
            @r#"<p style="text-align: right"><strong>x</strong> &nbsp;<em>y</em></p><p><br></p><p>title</p>"#
        );
        assert_eq!(
            RegexSerializer.normalize(html),
            TreeSerializer.normalize(html)
        );
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(SerializerKind::parse("Regex"), Some(SerializerKind::Regex));
        assert_eq!(SerializerKind::parse("dom"), None);
        assert_eq!(SerializerKind::default().to_string(), "tree");
    }
}
