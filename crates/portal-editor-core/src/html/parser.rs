//! Markup to `Document`.
//!
//! A small tokenizer over a constrained tag vocabulary feeds a builder that
//! tracks open elements. Block tags (`p`, `div`, `h1`-`h6`, `li`,
//! `blockquote`) each become a paragraph; `strong`/`b`, `em`/`i` and
//! `s`/`strike`/`del` set marks; inline `style` attributes supply font size and
//! color. Any other inline tag is transparent.
//!
//! Known limitations:
//! - Tag and attribute names are ASCII `[A-Za-z0-9:_-]`.
//! - Whitespace is not collapsed; `\n` and `\t` in text read as one space.

use html_escape::decode_html_entities;

use crate::document::{Block, Document, ImageBlock, Inline, Paragraph, Unit};
use crate::error::HtmlError;
use crate::marks::{FontSize, Mark, MarkSet, TextColor};
use crate::types::{Alignment, ImageAlignment};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Text(String),
    StartTag {
        name: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag(String),
}

fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "source" | "wbr"
    )
}

fn is_block_element(name: &str) -> bool {
    matches!(
        name,
        "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" | "blockquote" | "pre"
    )
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'_' || c == b':'
}

fn tokenize(input: &str) -> Result<Vec<Token>, HtmlError> {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut out = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    let flush_text = |text: &mut String, out: &mut Vec<Token>| {
        if !text.is_empty() {
            out.push(Token::Text(decode_html_entities(text).into_owned()));
            text.clear();
        }
    };

    while i < len {
        if bytes[i] != b'<' {
            let start = i;
            while i < len && bytes[i] != b'<' {
                i += 1;
            }
            text.push_str(&input[start..i]);
            continue;
        }

        if input[i..].starts_with("<!--") {
            let end = input[i + 4..].find("-->").ok_or_else(|| HtmlError::Malformed {
                offset: i,
                reason: "unterminated comment".into(),
            })?;
            i += 4 + end + 3;
            continue;
        }
        if input[i..].starts_with("<!") || input[i..].starts_with("<?") {
            let end = input[i..].find('>').ok_or_else(|| HtmlError::Malformed {
                offset: i,
                reason: "unterminated declaration".into(),
            })?;
            i += end + 1;
            continue;
        }

        let closing = bytes.get(i + 1) == Some(&b'/');
        let name_start = if closing { i + 2 } else { i + 1 };
        let mut j = name_start;
        while j < len && is_name_char(bytes[j]) {
            j += 1;
        }
        if j == name_start {
            // A stray `<` is text, as browsers treat it.
            text.push('<');
            i += 1;
            continue;
        }
        let name = input[name_start..j].to_ascii_lowercase();
        flush_text(&mut text, &mut out);

        if closing {
            let end = input[j..].find('>').ok_or_else(|| HtmlError::Malformed {
                offset: i,
                reason: format!("unterminated end tag </{name}"),
            })?;
            out.push(Token::EndTag(name));
            i = j + end + 1;
            continue;
        }

        let mut k = j;
        let mut attributes = Vec::new();
        let mut self_closing = false;
        loop {
            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k >= len {
                return Err(HtmlError::Malformed {
                    offset: i,
                    reason: format!("unterminated start tag <{name}"),
                });
            }
            if bytes[k] == b'>' {
                k += 1;
                break;
            }
            if bytes[k] == b'/' {
                if bytes.get(k + 1) == Some(&b'>') {
                    self_closing = true;
                    k += 2;
                    break;
                }
                k += 1;
                continue;
            }
            let attr_start = k;
            while k < len && is_name_char(bytes[k]) {
                k += 1;
            }
            if attr_start == k {
                k += 1;
                continue;
            }
            let attr_name = input[attr_start..k].to_ascii_lowercase();
            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            let mut value = String::new();
            if k < len && bytes[k] == b'=' {
                k += 1;
                while k < len && bytes[k].is_ascii_whitespace() {
                    k += 1;
                }
                if k < len && (bytes[k] == b'"' || bytes[k] == b'\'') {
                    let quote = bytes[k];
                    let value_start = k + 1;
                    let close = input[value_start..]
                        .bytes()
                        .position(|b| b == quote)
                        .ok_or_else(|| HtmlError::Malformed {
                            offset: k,
                            reason: format!("unterminated attribute {attr_name}"),
                        })?;
                    value = decode_html_entities(&input[value_start..value_start + close])
                        .into_owned();
                    k = value_start + close + 1;
                } else {
                    let value_start = k;
                    while k < len && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                        k += 1;
                    }
                    value = decode_html_entities(&input[value_start..k]).into_owned();
                }
            }
            attributes.push((attr_name, value));
        }
        if is_void_element(&name) {
            self_closing = true;
        }
        out.push(Token::StartTag {
            name,
            attributes,
            self_closing,
        });
        i = k;
    }
    flush_text(&mut text, &mut out);
    Ok(out)
}

/// `property: value` pairs of an inline style attribute.
fn style_properties(style: &str) -> impl Iterator<Item = (String, &str)> {
    style.split(';').filter_map(|decl| {
        let (key, value) = decl.split_once(':')?;
        Some((key.trim().to_ascii_lowercase(), value.trim()))
    })
}

fn attribute<'a>(attributes: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn block_alignment(attributes: &[(String, String)]) -> Alignment {
    attribute(attributes, "style")
        .into_iter()
        .flat_map(style_properties)
        .find(|(key, _)| key == "text-align")
        .and_then(|(_, value)| Alignment::parse(value))
        .or_else(|| attribute(attributes, "align").and_then(Alignment::parse))
        .unwrap_or_default()
}

fn inline_marks(name: &str, attributes: &[(String, String)], mut marks: MarkSet) -> MarkSet {
    match name {
        "strong" | "b" => marks = marks.with(Mark::Bold),
        "em" | "i" => marks = marks.with(Mark::Italic),
        "s" | "strike" | "del" => marks = marks.with(Mark::Strike),
        _ => {}
    }
    if let Some(style) = attribute(attributes, "style") {
        for (key, value) in style_properties(style) {
            match key.as_str() {
                "font-size" => marks = marks.with(Mark::FontSize(FontSize::from_css(value))),
                "color" => marks = marks.with(Mark::Color(TextColor::from_css(value))),
                _ => {}
            }
        }
    }
    if name == "font" {
        if let Some(color) = attribute(attributes, "color") {
            marks = marks.with(Mark::Color(TextColor::from_css(color)));
        }
    }
    marks
}

struct OpenElement {
    name: String,
    marks: MarkSet,
}

struct OpenParagraph {
    alignment: Alignment,
    units: Vec<Unit>,
    /// Opened by a block tag, so it is kept even without content.
    explicit: bool,
}

#[derive(Default)]
struct Builder {
    blocks: Vec<Block>,
    stack: Vec<OpenElement>,
    current: Option<OpenParagraph>,
}

impl Builder {
    fn marks(&self) -> MarkSet {
        self.stack.last().map(|e| e.marks).unwrap_or_default()
    }

    fn paragraph(&mut self) -> &mut OpenParagraph {
        self.current.get_or_insert_with(|| OpenParagraph {
            alignment: Alignment::Left,
            units: Vec::new(),
            explicit: false,
        })
    }

    fn flush(&mut self) {
        if let Some(open) = self.current.take() {
            if open.explicit || !open.units.is_empty() {
                self.blocks.push(Block::Paragraph(Paragraph::from_units(
                    open.alignment,
                    open.units,
                )));
            }
        }
    }

    /// Close the current paragraph only if it holds content.
    fn flush_if_content(&mut self) {
        if self.current.as_ref().is_some_and(|p| !p.units.is_empty()) {
            self.flush();
        } else {
            self.current = None;
        }
    }

    fn text(&mut self, text: &str) {
        if self.current.is_none() && text.chars().all(|c| c.is_ascii_whitespace()) {
            return;
        }
        let marks = self.marks();
        let paragraph = self.paragraph();
        for c in text.chars() {
            match c {
                '\r' => {}
                '\n' | '\t' => paragraph.units.push(Unit::Char(' ', marks)),
                c => paragraph.units.push(Unit::Char(c, marks)),
            }
        }
    }

    fn start_tag(&mut self, name: String, attributes: Vec<(String, String)>, self_closing: bool) {
        match name.as_str() {
            "br" => {
                let marks = self.marks();
                self.paragraph().units.push(Unit::Break(marks));
            }
            "img" => {
                let alignment = self.current.as_ref().map(|p| p.alignment);
                self.flush_if_content();
                let src = attribute(&attributes, "src").unwrap_or_default();
                let alt = attribute(&attributes, "alt").unwrap_or_default();
                match ImageBlock::new(src, alt) {
                    Some(image) => {
                        let align = attribute(&attributes, "data-align")
                            .and_then(Alignment::parse)
                            .map(ImageAlignment::from)
                            .unwrap_or_default();
                        self.blocks.push(Block::Image(image.with_alignment(align)));
                    }
                    None => tracing::debug!("dropping image without src"),
                }
                if let Some(alignment) = alignment {
                    self.current = Some(OpenParagraph {
                        alignment,
                        units: Vec::new(),
                        explicit: false,
                    });
                }
            }
            name if is_void_element(name) => {}
            name if is_block_element(name) => {
                self.flush_if_content();
                self.current = Some(OpenParagraph {
                    alignment: block_alignment(&attributes),
                    units: Vec::new(),
                    explicit: true,
                });
                let marks = self.marks();
                if self_closing {
                    self.flush();
                } else {
                    self.stack.push(OpenElement {
                        name: name.to_string(),
                        marks,
                    });
                }
            }
            name => {
                if !self_closing {
                    let marks = inline_marks(name, &attributes, self.marks());
                    self.stack.push(OpenElement {
                        name: name.to_string(),
                        marks,
                    });
                }
            }
        }
    }

    fn end_tag(&mut self, name: &str) -> Result<(), String> {
        let Some(index) = self.stack.iter().rposition(|e| e.name == name) else {
            if is_void_element(name) {
                return Ok(());
            }
            return Err(format!("unexpected end tag </{name}>"));
        };
        self.stack.truncate(index);
        if is_block_element(name) {
            self.flush();
        }
        Ok(())
    }

    fn finish(mut self) -> Document {
        self.flush();
        Document::from_blocks(self.blocks)
    }
}

/// Strict parse. Fails on unterminated tags and unmatched end tags.
pub fn try_parse(html: &str) -> Result<Document, HtmlError> {
    let tokens = tokenize(html)?;
    let mut builder = Builder::default();
    let mut offset = 0;
    for token in tokens {
        match token {
            Token::Text(text) => {
                offset += text.len();
                builder.text(&text);
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => builder.start_tag(name, attributes, self_closing),
            Token::EndTag(name) => builder
                .end_tag(&name)
                .map_err(|reason| HtmlError::Malformed { offset, reason })?,
        }
    }
    Ok(builder.finish())
}

/// Parse, falling back to the raw input as one plain paragraph.
pub fn parse(html: &str) -> Document {
    match try_parse(html) {
        Ok(doc) => doc,
        Err(err) => {
            tracing::warn!(error = %err, "malformed html, loading as plain text");
            Document::from_blocks(vec![Block::Paragraph(Paragraph::new(
                Alignment::Left,
                vec![Inline::text(html, MarkSet::default())],
            ))])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlockId;

    #[test]
    fn test_empty_input_is_empty_document() {
        assert!(parse("").is_empty());
        assert!(parse("  \n ").is_empty());
        assert!(parse("<p><br></p>").is_empty());
        assert!(parse("<p></p>").is_empty());
    }

    #[test]
    fn test_nbsp_kept_as_character() {
        let doc = parse("<p>a &nbsp;&nbsp;b</p>");
        assert_eq!(doc.text(), "a \u{a0}\u{a0}b");
    }

    #[test]
    fn test_nested_marks_and_styles() {
        let doc = parse(
            r#"<p><span style="font-size: 18px; color: #1971c2"><b>x</b></span><i>y</i></p>"#,
        );
        let p = doc.paragraph(BlockId(0)).unwrap();
        let x = MarkSet {
            font_size: FontSize::Px18,
            color: TextColor::Blue,
            ..MarkSet::default()
        }
        .bold();
        assert_eq!(
            p.children(),
            &[
                Inline::text("x", x),
                Inline::text("y", MarkSet::default().italic())
            ]
        );
    }

    #[test]
    fn test_image_inside_paragraph_splits_it() {
        let doc = parse(r#"<p style="text-align: right">a<img src="u.png" alt="">b</p>"#);
        assert_eq!(doc.block_count(), 3);
        assert_eq!(doc.paragraph(BlockId(0)).unwrap().text(), "a");
        assert!(matches!(doc.blocks()[1], Block::Image(_)));
        let tail = doc.paragraph(BlockId(2)).unwrap();
        assert_eq!(tail.text(), "b");
        assert_eq!(tail.alignment, Alignment::Right);
    }

    #[test]
    fn test_image_without_src_dropped() {
        let doc = parse(r#"<img alt="x"><p>t</p>"#);
        assert_eq!(doc.block_count(), 1);
        assert_eq!(doc.text(), "t");
    }

    #[test]
    fn test_loose_text_becomes_paragraph() {
        let doc = parse("hello <b>world</b>");
        assert_eq!(doc.block_count(), 1);
        assert_eq!(doc.text(), "hello world");
    }

    #[test]
    fn test_stray_angle_bracket_is_text() {
        assert_eq!(parse("<p>1 < 2</p>").text(), "1 < 2");
    }

    #[test]
    fn test_unclosed_elements_are_closed_at_end() {
        let doc = try_parse("<p><b>open").unwrap();
        assert_eq!(doc.text(), "open");
    }

    #[test]
    fn test_malformed_falls_back_to_text() {
        assert!(try_parse("<p>a</b></p>").is_err());
        assert!(try_parse("<p class=\"x").is_err());

        let doc = parse("<p>a</b></p>");
        assert_eq!(doc.block_count(), 1);
        assert_eq!(doc.text(), "<p>a</b></p>");
        doc.check_invariants().unwrap();
    }

    #[test]
    fn test_fallback_breaks_lines_and_spaces_tabs() {
        let doc = parse("<p>a</b>\n\tb</p>");
        assert_eq!(doc.block_count(), 1);
        assert_eq!(doc.text(), "<p>a</b>\n b</p>");
        doc.check_invariants().unwrap();
    }
}
