//! Scalar source text to string values.
//!
//! Double-quoted scalars are decoded with a logos lexer over their escape
//! sequences and line breaks.

use logos::Logos;

use crate::cst::SyntaxKind;

/// The value of a scalar whose content token has `kind` and `source` text.
pub(crate) fn decode(kind: SyntaxKind, source: &str) -> String {
    match kind {
        SyntaxKind::ALIAS => source.get(1..).unwrap_or_default().to_string(),
        SyntaxKind::SINGLE_QUOTED => {
            let inner = source.strip_prefix('\'').unwrap_or(source);
            let inner = inner.strip_suffix('\'').unwrap_or(inner);
            fold_lines(&inner.replace("''", "'"))
        }
        SyntaxKind::DOUBLE_QUOTED => {
            let inner = source.strip_prefix('"').unwrap_or(source);
            let inner = inner.strip_suffix('"').unwrap_or(inner);
            unescape_double(inner)
        }
        SyntaxKind::BLOCK_SCALAR => block_value(source),
        _ => fold_lines(source),
    }
}

/// Pieces of double-quoted text.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum Escape {
    /// `\` at the end of a line joins it with the next one.
    #[regex(r"\\\r?\n[ \t]*")]
    EscapedBreak,

    #[regex(r"\\x[0-9a-fA-F][0-9a-fA-F]")]
    Hex2,

    #[regex(r"\\u[0-9a-fA-F][0-9a-fA-F][0-9a-fA-F][0-9a-fA-F]")]
    Hex4,

    #[regex(r"\\U[0-9a-fA-F][0-9a-fA-F][0-9a-fA-F][0-9a-fA-F][0-9a-fA-F][0-9a-fA-F][0-9a-fA-F][0-9a-fA-F]")]
    Hex8,

    #[regex(r#"\\[0abtnvfreN_LP "/\\\t]"#)]
    Simple,

    /// Line breaks with the whitespace around them.
    #[regex(r"[ \t]*(\r?\n[ \t]*)+")]
    Break,

    #[regex(r"[ \t]+")]
    Space,

    #[regex(r"[^\\ \t\r\n]+")]
    Text,
}

fn unescape_double(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut lexer = Escape::lexer(text);
    while let Some(token) = lexer.next() {
        let slice = lexer.slice();
        match token {
            Ok(Escape::EscapedBreak) => {}
            Ok(Escape::Hex2 | Escape::Hex4 | Escape::Hex8) => {
                match u32::from_str_radix(&slice[2..], 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => out.push_str(slice),
                }
            }
            Ok(Escape::Simple) => out.push(simple_escape(&slice[1..])),
            Ok(Escape::Break) => {
                let lines = slice.matches('\n').count();
                if lines == 1 {
                    out.push(' ');
                } else {
                    out.extend(std::iter::repeat('\n').take(lines - 1));
                }
            }
            Ok(Escape::Space | Escape::Text) | Err(()) => out.push_str(slice),
        }
    }
    out
}

fn simple_escape(escaped: &str) -> char {
    match escaped {
        "0" => '\0',
        "a" => '\u{07}',
        "b" => '\u{08}',
        "t" | "\t" => '\t',
        "n" => '\n',
        "v" => '\u{0b}',
        "f" => '\u{0c}',
        "r" => '\r',
        "e" => '\u{1b}',
        "N" => '\u{85}',
        "_" => '\u{a0}',
        "L" => '\u{2028}',
        "P" => '\u{2029}',
        other => other.chars().next().unwrap_or('\\'),
    }
}

fn fold_lines(text: &str) -> String {
    let mut lines = text.lines().map(str::trim);
    let mut out = lines.next().unwrap_or_default().to_string();
    for line in lines {
        if line.is_empty() {
            out.push('\n');
        } else {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push(' ');
            }
            out.push_str(line);
        }
    }
    out
}

fn block_value(source: &str) -> String {
    let mut lines = source.lines();
    let header = lines.next().unwrap_or_default();
    let body: Vec<&str> = lines.collect();
    let indent = body
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);
    let stripped: Vec<&str> = body
        .iter()
        .map(|l| l.get(indent..).unwrap_or(""))
        .collect();
    let mut value = if header.starts_with('>') {
        fold_lines(&stripped.join("\n"))
    } else {
        stripped.join("\n")
    };
    if !header.contains('-') && !value.is_empty() {
        value.push('\n');
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double(source: &str) -> String {
        decode(SyntaxKind::DOUBLE_QUOTED, source)
    }

    #[test]
    fn simple_escapes() {
        assert_eq!(double(r#""tab\there""#), "tab\there");
        assert_eq!(double(r#""q\"uote\\ \/""#), "q\"uote\\ /");
        assert_eq!(double(r#""\0\a\e\N\_""#), "\0\u{07}\u{1b}\u{85}\u{a0}");
    }

    #[test]
    fn unicode_escapes() {
        assert_eq!(double(r#""\x41é\U0001F600""#), "A\u{e9}\u{1F600}");
        assert_eq!(double(r#""$ref""#), "$ref");
        // lone surrogates are not characters
        assert_eq!(double(r#""\uD800""#), "\\uD800");
    }

    #[test]
    fn line_breaks_fold() {
        assert_eq!(double("\"one  \n   two\""), "one two");
        assert_eq!(double("\"one\n\n  two\""), "one\ntwo");
        assert_eq!(double("\"  lead\""), "  lead");
    }

    #[test]
    fn escaped_line_break_joins_lines() {
        assert_eq!(double("\"con\\\n    cat\""), "concat");
        assert_eq!(double("\"keep \\\r\n  space\""), "keep space");
    }

    #[test]
    fn malformed_escapes_stay_verbatim() {
        assert_eq!(double(r#""\q\x4""#), "\\q\\x4");
        assert_eq!(double("\"end\\"), "end\\");
    }

    #[test]
    fn other_styles() {
        assert_eq!(decode(SyntaxKind::SINGLE_QUOTED, "'it''s'"), "it's");
        assert_eq!(decode(SyntaxKind::PLAIN, "plain\n  folded"), "plain folded");
        assert_eq!(decode(SyntaxKind::BLOCK_SCALAR, "|\n  one\n  two\n"), "one\ntwo\n");
        assert_eq!(decode(SyntaxKind::BLOCK_SCALAR, ">-\n  one\n  two\n"), "one two");
        assert_eq!(decode(SyntaxKind::ALIAS, "*name"), "name");
    }
}
