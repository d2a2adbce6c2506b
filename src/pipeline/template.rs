use anyhow::Result;

use crate::pipeline::transform::{SourceFile, Transform};

const FRAGMENT_JOIN: &str = "' +\n    '";

/// Escape markup into the body of a single-quoted script string literal.
///
/// Order matters: backslashes first, then quotes, then line breaks. Each
/// line break closes the literal, emits its own escape (`\n`, or `\r\n`
/// for a CRLF break), and reopens the literal on the next line, so the
/// generated source stays readable while decoding back to the original
/// bytes exactly.
fn escape_literal(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut chars = markup.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\r' if chars.peek() == Some(&'\n') => {
                chars.next();
                out.push_str("\\r\\n");
                out.push_str(FRAGMENT_JOIN);
            }
            '\n' => {
                out.push_str("\\n");
                out.push_str(FRAGMENT_JOIN);
            }
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

/// Generate the source fragment assigning `markup` to the constant
/// `name`.
pub fn inline_markup(name: &str, markup: &str) -> String {
    format!("const {} = '{}'\n", name, escape_literal(markup))
}

/// Pipeline step converting each markup file into a generated script
/// fragment named after the file with a `.js` extension.
#[derive(Debug, Clone)]
pub struct InlineTemplate {
    pub constant: String,
}

impl InlineTemplate {
    pub fn new(constant: impl Into<String>) -> Self {
        Self {
            constant: constant.into(),
        }
    }
}

impl Transform for InlineTemplate {
    fn apply(&self, input: Vec<SourceFile>) -> Result<Vec<SourceFile>> {
        input
            .into_iter()
            .map(|file| {
                let body = inline_markup(&self.constant, file.text()?);
                Ok(SourceFile::new(file.path.with_extension("js"), body))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Undo the generated literal: strip the assignment wrapper, rejoin the
    /// fragments, resolve the escapes. Mirrors what the runtime's string
    /// parser does to the fragment.
    fn decode(fragment: &str, name: &str) -> String {
        let body = fragment
            .strip_prefix(&format!("const {} = '", name))
            .unwrap()
            .strip_suffix("'\n")
            .unwrap()
            .replace(FRAGMENT_JOIN, "");
        let mut out = String::new();
        let mut chars = body.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('\\') => out.push('\\'),
                Some('\'') => out.push('\''),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                other => panic!("unexpected escape {:?}", other),
            }
        }
        out
    }

    #[test]
    fn round_trips_plain_markup() {
        let markup = "<div class=\"x\">hello</div>\n<p>bye</p>\n";
        let fragment = inline_markup("TEMPLATE", markup);
        assert_eq!(decode(&fragment, "TEMPLATE"), markup);
    }

    #[test]
    fn round_trips_quotes_and_backslashes() {
        let markup = "it's a \\ backslash \\' tricky '' case";
        let fragment = inline_markup("TEMPLATE", markup);
        assert_eq!(decode(&fragment, "TEMPLATE"), markup);
    }

    #[test]
    fn round_trips_mixed_line_endings() {
        let markup = "one\r\ntwo\nthree\rfour";
        let fragment = inline_markup("TEMPLATE", markup);
        assert_eq!(decode(&fragment, "TEMPLATE"), markup);
    }

    #[test]
    fn line_breaks_split_the_literal() {
        let fragment = inline_markup("TEMPLATE", "a\nb");
        assert_eq!(fragment, "const TEMPLATE = 'a\\n' +\n    'b'\n");
    }

    #[test]
    fn escape_order_is_backslash_first() {
        // A literal backslash-n in the markup must not decode as a newline.
        let fragment = inline_markup("TEMPLATE", "a\\nb");
        assert_eq!(fragment, "const TEMPLATE = 'a\\\\nb'\n");
        assert_eq!(decode(&fragment, "TEMPLATE"), "a\\nb");
    }

    #[test]
    fn transform_renames_to_js() {
        let step = InlineTemplate::new("TEMPLATE");
        let out = step
            .apply(vec![SourceFile::new("template.html", "<b>x</b>")])
            .unwrap();
        assert_eq!(out[0].path, PathBuf::from("template.js"));
        assert_eq!(
            std::str::from_utf8(&out[0].contents).unwrap(),
            "const TEMPLATE = '<b>x</b>'\n"
        );
    }
}
