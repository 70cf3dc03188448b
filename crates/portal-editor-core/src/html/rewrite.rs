//! String-rewriting serializer.
//!
//! Writes raw markup and then fixes it up with regular expressions, the way
//! markup is normalized where no tree is available.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::HtmlSerializer;
use super::writer::{self, NBSP, NBSP_ENTITY, WriteMode};
use crate::document::Document;

/// A whole tag, allowing `>` inside quoted attribute values.
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<(?:[^>"']|"[^"]*"|'[^']*')*>"#).unwrap());

static EMPTY_PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<p(\s[^>]*)?(?:></p>|/>)").unwrap());

static SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());

/// Regex-based serializer. Output is identical to [`super::TreeSerializer`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RegexSerializer;

impl RegexSerializer {
    /// Apply the normalization rules to raw markup.
    pub fn rewrite(&self, raw: &str) -> String {
        let html = EMPTY_PARAGRAPH.replace_all(raw, |caps: &Captures| {
            format!("<p{}><br></p>", caps.get(1).map_or("", |m| m.as_str()))
        });

        let mut out = String::with_capacity(html.len());
        let mut last = 0;
        for tag in TAG.find_iter(&html) {
            rewrite_text(&mut out, &html[last..tag.start()]);
            out.push_str(tag.as_str());
            last = tag.end();
        }
        rewrite_text(&mut out, &html[last..]);
        out
    }
}

impl HtmlSerializer for RegexSerializer {
    fn serialize(&self, doc: &Document) -> String {
        self.rewrite(&writer::write_document(doc, WriteMode::Raw))
    }
}

fn rewrite_text(out: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    let spaced = SPACE_RUN.replace_all(text, |caps: &Captures| {
        let run = caps[0].len();
        format!(" {}", NBSP_ENTITY.repeat(run - 1))
    });
    out.push_str(&spaced.replace(NBSP, NBSP_ENTITY));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_paragraph_rules() {
        let s = RegexSerializer;
        assert_eq!(s.rewrite("<p></p>"), "<p><br></p>");
        assert_eq!(
            s.rewrite(r#"<p style="text-align: center"></p>"#),
            r#"<p style="text-align: center"><br></p>"#
        );
        assert_eq!(s.rewrite("<p/>"), "<p><br></p>");
        assert_eq!(s.rewrite("<p>x</p>"), "<p>x</p>");
    }

    #[test]
    fn test_spaces_inside_attributes_untouched() {
        let s = RegexSerializer;
        assert_eq!(
            s.rewrite(r#"<img src="a.png" alt="x > y   z"><p>1   2</p>"#),
            r#"<img src="a.png" alt="x > y   z"><p>1 &nbsp;&nbsp;2</p>"#
        );
    }

    #[test]
    fn test_literal_nbsp() {
        assert_eq!(RegexSerializer.rewrite("<p>a\u{a0} b</p>"), "<p>a&nbsp; b</p>");
    }
}
