//! # Lexer - Tokenizing Rich Markup
//!
//! First stage of reading annotation comments and highlighted text: the
//! markup is split into tags, entities and text runs using the [Logos] lexer
//! generator.
//!
//! [Logos]: https://docs.rs/logos
//!
//! Like the rest of this crate, the lexer is forgiving. Every byte of the
//! input ends up in exactly one token; anything Logos cannot classify (a
//! stray `<` or `&`) becomes a [`TokenKind::Text`] token instead of an error.
//!
//! ```
//! use citenote_markup::lexer::{lex, TokenKind};
//!
//! let tokens = lex("<b>bold</b> &amp; plain");
//! let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
//! assert_eq!(
//!     kinds,
//!     vec![
//!         TokenKind::OpenTag,
//!         TokenKind::Text,
//!         TokenKind::CloseTag,
//!         TokenKind::Text,
//!         TokenKind::Entity,
//!         TokenKind::Text,
//!     ]
//! );
//! ```

use logos::Logos;

/// Token kinds produced by the Logos lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `<!-- ... -->`, dropped by the reader
    #[regex(r"<!--([^-]|-[^-])*-->")]
    Comment,

    /// `<tag attr="value">` or self-closing `<br/>`
    #[regex(r#"<[A-Za-z][A-Za-z0-9]*([^<>"']|"[^"]*"|'[^']*')*>"#)]
    OpenTag,

    /// `</tag>`
    #[regex(r"</[A-Za-z][A-Za-z0-9]*[ \t\r\n]*>")]
    CloseTag,

    /// `&amp;`, `&#8220;`, `&#x201C;`
    #[regex(r"&[A-Za-z0-9#]+;")]
    Entity,

    /// Anything that is not markup
    #[regex(r"[^<&]+")]
    Text,
}

/// A lexed token with its kind and text slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

impl Token<'_> {
    /// Lowercased tag name of an open or close tag.
    pub fn tag_name(&self) -> Option<String> {
        let inner = match self.kind {
            TokenKind::OpenTag => self.text.strip_prefix('<')?,
            TokenKind::CloseTag => self.text.strip_prefix("</")?,
            _ => return None,
        };
        let name: String = inner
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        Some(name.to_ascii_lowercase())
    }

    /// Value of a quoted or bare attribute on an open tag.
    pub fn attr(&self, name: &str) -> Option<String> {
        if self.kind != TokenKind::OpenTag {
            return None;
        }
        let body = self.text.trim_start_matches('<').trim_end_matches('>');
        let body = body.trim_end_matches('/');
        // skip the tag name
        let mut rest = body.trim_start_matches(|c: char| c.is_ascii_alphanumeric());

        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                return None;
            }
            let key_len = rest
                .find(|c: char| c == '=' || c.is_whitespace())
                .unwrap_or(rest.len());
            let key = &rest[..key_len];
            rest = rest[key_len..].trim_start();

            let value = if let Some(after_eq) = rest.strip_prefix('=') {
                let after_eq = after_eq.trim_start();
                let (value, remaining) = match after_eq.chars().next() {
                    Some(quote @ ('"' | '\'')) => {
                        let inner = &after_eq[1..];
                        let end = inner.find(quote).unwrap_or(inner.len());
                        (&inner[..end], inner.get(end + 1..).unwrap_or(""))
                    }
                    _ => {
                        let end = after_eq
                            .find(char::is_whitespace)
                            .unwrap_or(after_eq.len());
                        (&after_eq[..end], &after_eq[end..])
                    }
                };
                rest = remaining;
                value
            } else {
                ""
            };

            if key.eq_ignore_ascii_case(name) {
                return Some(html_escape::decode_html_entities(value).into_owned());
            }
        }
    }

    /// True for `<br/>`-style tags.
    pub fn is_self_closing(&self) -> bool {
        self.kind == TokenKind::OpenTag && self.text.trim_end_matches('>').ends_with('/')
    }
}

/// Lex the input into a sequence of tokens.
///
/// Guarantees that all bytes from the input appear in the output tokens.
pub fn lex(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(input);

    while let Some(result) = lexer.next() {
        let text = lexer.slice();
        // unrecognized input is plain text
        let kind = result.unwrap_or(TokenKind::Text);
        tokens.push(Token { kind, text });
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token(kind: TokenKind, text: &str) -> Token<'_> {
        Token { kind, text }
    }

    #[test]
    fn lex_empty_input() {
        assert_eq!(lex(""), vec![]);
    }

    #[test]
    fn lex_preserves_all_text() {
        let input = "<p class=\"x\">a &lt; b</p><br/> c < d";
        let reconstructed: String = lex(input).iter().map(|t| t.text).collect();
        assert_eq!(reconstructed, input);
    }

    #[test]
    fn lex_tags_and_text() {
        assert_eq!(
            lex("<i>x</i>"),
            vec![
                token(TokenKind::OpenTag, "<i>"),
                token(TokenKind::Text, "x"),
                token(TokenKind::CloseTag, "</i>"),
            ]
        );
    }

    #[test]
    fn stray_angle_bracket_is_text() {
        let tokens = lex("1 < 2");
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Text));
    }

    #[test]
    fn comment_is_one_token() {
        let tokens = lex("a<!-- note -->b");
        assert_eq!(tokens[1], token(TokenKind::Comment, "<!-- note -->"));
    }

    #[test]
    fn tag_name_is_lowercased() {
        let tokens = lex("<STRONG>");
        assert_eq!(tokens[0].tag_name().as_deref(), Some("strong"));
    }

    #[test]
    fn attr_reads_quoted_and_bare_values() {
        let tokens = lex(r#"<a title=x href="https://example.org/?a=1&amp;b=2">"#);
        assert_eq!(
            tokens[0].attr("href").as_deref(),
            Some("https://example.org/?a=1&b=2")
        );
        assert_eq!(tokens[0].attr("title").as_deref(), Some("x"));
        assert_eq!(tokens[0].attr("rel"), None);
    }

    #[test]
    fn self_closing_detection() {
        assert!(lex("<br/>")[0].is_self_closing());
        assert!(!lex("<br>")[0].is_self_closing());
    }
}
