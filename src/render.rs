use crate::tokenizer::{TokenKind, Tokenizer};

const RESET: &str = "\u{001b}[0m";
const KEYWORD: &str = "\u{001b}[1;34m";
const NUMBER: &str = "\u{001b}[33m";
const STRING: &str = "\u{001b}[32m";
const CONSTANT: &str = "\u{001b}[35m";
const COMMENT: &str = "\u{001b}[90m";

/// ANSI source renderer used by `mod show`.
///
/// Highlighting is driven by the tokenizer's spans; source that does not
/// tokenize is passed through untouched so `show` never fails on a module
/// whose later cells broke mid-edit.
#[derive(Debug, Clone)]
pub struct Highlighter {
    color: bool,
}

impl Highlighter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Render a module's provenance line plus its accumulated source.
    pub fn render_cell(&self, build_line: &str, source: &str) -> String {
        let annotated = format!("// {}\n{}", build_line, source);
        self.highlight(&annotated)
    }

    pub fn highlight(&self, source: &str) -> String {
        if !self.color {
            return source.to_string();
        }
        let mut tokenizer = Tokenizer::new(source);
        let tokens = match tokenizer.tokenize() {
            Ok(tokens) => tokens,
            Err(_) => return source.to_string(),
        };

        let chars: Vec<char> = source.chars().collect();
        let mut out = String::new();
        let mut cursor = 0usize;
        for token in &tokens {
            let start = token.position.offset.min(chars.len());
            let end = (start + token.length).min(chars.len());
            if start > cursor {
                out.extend(chars[cursor..start].iter());
            }
            let text: String = chars[start..end].iter().collect();
            match style_for(&token.kind) {
                Some(style) => {
                    out.push_str(style);
                    out.push_str(&text);
                    out.push_str(RESET);
                }
                None => out.push_str(&text),
            }
            cursor = end;
        }
        if cursor < chars.len() {
            out.extend(chars[cursor..].iter());
        }
        out
    }
}

fn style_for(kind: &TokenKind) -> Option<&'static str> {
    match kind {
        TokenKind::Let
        | TokenKind::Mut
        | TokenKind::Fn
        | TokenKind::If
        | TokenKind::Else
        | TokenKind::While
        | TokenKind::For
        | TokenKind::In
        | TokenKind::Return
        | TokenKind::Break
        | TokenKind::Continue
        | TokenKind::Import => Some(KEYWORD),
        TokenKind::Integer(_) | TokenKind::Float(_) => Some(NUMBER),
        TokenKind::String(_) => Some(STRING),
        TokenKind::Boolean(_) | TokenKind::Null => Some(CONSTANT),
        TokenKind::Comment(_) => Some(COMMENT),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_mode_passes_source_through() {
        let highlighter = Highlighter::new(false);
        let source = "let x = 1 // note\n";
        assert_eq!(highlighter.highlight(source), source);
    }

    #[test]
    fn keywords_are_styled_in_color_mode() {
        let highlighter = Highlighter::new(true);
        let rendered = highlighter.highlight("let x = 1");
        assert!(rendered.starts_with(KEYWORD));
        assert!(rendered.contains(RESET));
        assert!(rendered.contains("x = "));
    }

    #[test]
    fn render_cell_prefixes_the_build_line_as_comment() {
        let highlighter = Highlighter::new(false);
        let rendered = highlighter.render_cell("mod build demo", "x = 1\n");
        assert_eq!(rendered, "// mod build demo\nx = 1\n");
    }

    #[test]
    fn untokenizable_source_is_passed_through() {
        let highlighter = Highlighter::new(true);
        let source = "x = \"unterminated";
        assert_eq!(highlighter.highlight(source), source);
    }
}
