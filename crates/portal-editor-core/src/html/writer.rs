//! Tree walk from `Document` to markup.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::document::{Block, Document, ImageBlock, Inline, Paragraph};
use crate::marks::MarkSet;
use crate::types::{Alignment, ImageAlignment};

pub(crate) const NBSP: char = '\u{a0}';
pub(crate) const NBSP_ENTITY: &str = "&nbsp;";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// Space runs and empty paragraphs are made to survive a browser.
    Normalized,
    /// Literal spaces, `<p></p>` for empty paragraphs. Input for the regex rules.
    Raw,
}

pub(crate) fn write_document(doc: &Document, mode: WriteMode) -> String {
    let mut out = String::new();
    for block in doc.blocks() {
        match block {
            Block::Paragraph(p) => write_paragraph(&mut out, p, mode),
            Block::Image(image) => write_image(&mut out, image),
        }
    }
    out
}

fn write_paragraph(out: &mut String, p: &Paragraph, mode: WriteMode) {
    match p.alignment {
        Alignment::Left => out.push_str("<p>"),
        other => {
            out.push_str("<p style=\"text-align: ");
            out.push_str(other.as_str());
            out.push_str("\">");
        }
    }
    if p.is_empty() {
        if mode == WriteMode::Normalized {
            out.push_str("<br>");
        }
    } else {
        for child in p.children() {
            match child {
                Inline::Text(run) => {
                    open_marks(out, run.marks);
                    match mode {
                        WriteMode::Normalized => push_normalized_text(out, &encode_text(&run.content)),
                        WriteMode::Raw => out.push_str(&encode_text(&run.content)),
                    }
                    close_marks(out, run.marks);
                }
                Inline::HardBreak { .. } => out.push_str("<br>"),
            }
        }
    }
    out.push_str("</p>");
}

fn write_image(out: &mut String, image: &ImageBlock) {
    out.push_str("<img src=\"");
    out.push_str(&encode_double_quoted_attribute(image.url()));
    out.push_str("\" alt=\"");
    out.push_str(&encode_double_quoted_attribute(&image.alt));
    out.push('"');
    if image.alignment != ImageAlignment::Left {
        out.push_str(" data-align=\"");
        out.push_str(image.alignment.as_str());
        out.push('"');
    }
    out.push('>');
}

/// Inline style for the single-valued marks, if any are set.
pub(crate) fn span_style(marks: MarkSet) -> Option<String> {
    let parts: Vec<String> = [
        marks.font_size.css().map(|v| format!("font-size: {v}")),
        marks.color.css().map(|v| format!("color: {v}")),
    ]
    .into_iter()
    .flatten()
    .collect();
    (!parts.is_empty()).then(|| parts.join("; "))
}

// Nesting order, outermost first: span, strong, em, s.
fn open_marks(out: &mut String, marks: MarkSet) {
    if let Some(style) = span_style(marks) {
        out.push_str("<span style=\"");
        out.push_str(&style);
        out.push_str("\">");
    }
    if marks.bold {
        out.push_str("<strong>");
    }
    if marks.italic {
        out.push_str("<em>");
    }
    if marks.strike {
        out.push_str("<s>");
    }
}

fn close_marks(out: &mut String, marks: MarkSet) {
    if marks.strike {
        out.push_str("</s>");
    }
    if marks.italic {
        out.push_str("</em>");
    }
    if marks.bold {
        out.push_str("</strong>");
    }
    if span_style(marks).is_some() {
        out.push_str("</span>");
    }
}

/// Write already-escaped text, keeping space runs and non-breaking spaces.
///
/// A run of N spaces becomes one space followed by N-1 `&nbsp;`.
pub(crate) fn push_normalized_text(out: &mut String, escaped: &str) {
    let mut spaces = 0usize;
    for c in escaped.chars() {
        if c == ' ' {
            spaces += 1;
            continue;
        }
        flush_spaces(out, spaces);
        spaces = 0;
        if c == NBSP {
            out.push_str(NBSP_ENTITY);
        } else {
            out.push(c);
        }
    }
    flush_spaces(out, spaces);
}

fn flush_spaces(out: &mut String, count: usize) {
    if count == 0 {
        return;
    }
    out.push(' ');
    for _ in 1..count {
        out.push_str(NBSP_ENTITY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(text: &str) -> String {
        let mut out = String::new();
        push_normalized_text(&mut out, text);
        out
    }

    #[test]
    fn test_space_runs() {
        assert_eq!(normalized("a b"), "a b");
        assert_eq!(normalized("a   b"), "a &nbsp;&nbsp;b");
        assert_eq!(normalized("  "), " &nbsp;");
        assert_eq!(normalized("x\u{a0}y"), "x&nbsp;y");
    }

    #[test]
    fn test_raw_mode_leaves_empty_paragraph_bare() {
        let doc = Document::from_text("a  b\n");
        assert_eq!(write_document(&doc, WriteMode::Raw), "<p>a  b</p><p></p>");
        assert_eq!(
            write_document(&doc, WriteMode::Normalized),
            "<p>a &nbsp;b</p><p><br></p>"
        );
    }
}
