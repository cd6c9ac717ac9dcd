//! Turns the token stream into blocks of styled text runs.

use crate::lexer::{Token, TokenKind, lex};

/// Inline formatting carried by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Style {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    Subscript,
    Superscript,
    Link { href: String },
}

impl Style {
    fn from_tag(token: &Token<'_>, name: &str) -> Option<Self> {
        Some(match name {
            "b" | "strong" => Style::Bold,
            "i" | "em" => Style::Italic,
            "u" => Style::Underline,
            "s" | "strike" | "del" => Style::Strike,
            "code" => Style::Code,
            "sub" => Style::Subscript,
            "sup" => Style::Superscript,
            "a" => Style::Link {
                href: token.attr("href").unwrap_or_default(),
            },
            _ => return None,
        })
    }

    fn same_kind(&self, other: &Style) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// An inline piece of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Run {
    Text { text: String, styles: Vec<Style> },
    LineBreak,
}

/// Kind of a block-level element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading { level: u8 },
    Preformatted,
}

/// A block with its inline runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub runs: Vec<Run>,
}

impl Block {
    fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            runs: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Concatenated text of the block, line breaks as `\n`.
    pub fn plain_text(&self) -> String {
        self.runs
            .iter()
            .map(|run| match run {
                Run::Text { text, .. } => text.as_str(),
                Run::LineBreak => "\n",
            })
            .collect()
    }
}

fn block_kind_for(name: &str) -> Option<BlockKind> {
    match name {
        "p" | "div" | "li" | "blockquote" | "dt" | "dd" => Some(BlockKind::Paragraph),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some(BlockKind::Heading {
            level: name[1..].parse().unwrap_or(1),
        }),
        "pre" => Some(BlockKind::Preformatted),
        _ => None,
    }
}

struct Reader {
    inline: bool,
    blocks: Vec<Block>,
    current: Block,
    styles: Vec<Style>,
}

impl Reader {
    fn new(inline: bool) -> Self {
        Self {
            inline,
            blocks: Vec::new(),
            current: Block::new(BlockKind::Paragraph),
            styles: Vec::new(),
        }
    }

    fn ends_with_space(&self) -> bool {
        match self.current.runs.last() {
            Some(Run::Text { text, .. }) => text.ends_with(' '),
            Some(Run::LineBreak) | None => true,
        }
    }

    /// Appends text, collapsing whitespace runs into single spaces.
    fn push_text(&mut self, text: &str) {
        if self.current.kind == BlockKind::Preformatted {
            self.append(text.to_string());
            return;
        }

        let mut out = String::with_capacity(text.len());
        let mut last_space = self.ends_with_space();
        for c in text.chars() {
            if c.is_whitespace() {
                if !last_space {
                    out.push(' ');
                    last_space = true;
                }
            } else {
                out.push(c);
                last_space = false;
            }
        }
        if !out.is_empty() {
            self.append(out);
        }
    }

    fn append(&mut self, text: String) {
        if let Some(Run::Text {
            text: last,
            styles,
        }) = self.current.runs.last_mut()
            && *styles == self.styles
        {
            last.push_str(&text);
            return;
        }
        self.current.runs.push(Run::Text {
            text,
            styles: self.styles.clone(),
        });
    }

    fn trim_trailing_space(&mut self) {
        if self.current.kind == BlockKind::Preformatted {
            return;
        }
        if let Some(Run::Text { text, .. }) = self.current.runs.last_mut() {
            let trimmed = text.trim_end_matches(' ').len();
            text.truncate(trimmed);
            if text.is_empty() {
                self.current.runs.pop();
            }
        }
    }

    fn break_block(&mut self, next: BlockKind) {
        if self.inline {
            // flattened blocks share one run list, separated by a space
            if !self.ends_with_space() {
                self.append(" ".to_string());
            }
            return;
        }
        self.trim_trailing_space();
        let finished = std::mem::replace(&mut self.current, Block::new(next));
        if !finished.is_empty() {
            self.blocks.push(finished);
        }
    }

    fn open_tag(&mut self, token: &Token<'_>) {
        let Some(name) = token.tag_name() else {
            return;
        };
        if name == "br" {
            self.trim_trailing_space();
            self.current.runs.push(Run::LineBreak);
            return;
        }
        if let Some(kind) = block_kind_for(&name) {
            self.break_block(kind);
            return;
        }
        if token.is_self_closing() {
            return;
        }
        if let Some(style) = Style::from_tag(token, &name) {
            self.styles.retain(|s| !s.same_kind(&style));
            self.styles.push(style);
        }
    }

    fn close_tag(&mut self, token: &Token<'_>) {
        let Some(name) = token.tag_name() else {
            return;
        };
        if block_kind_for(&name).is_some() {
            self.break_block(BlockKind::Paragraph);
            return;
        }
        if let Some(style) = Style::from_tag(token, &name)
            && let Some(idx) = self.styles.iter().rposition(|s| s.same_kind(&style))
        {
            self.styles.remove(idx);
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.trim_trailing_space();
        if self.inline {
            if self.current.is_empty() {
                return Vec::new();
            }
            self.current.kind = BlockKind::Paragraph;
            return vec![self.current];
        }
        self.break_block(BlockKind::Paragraph);
        self.blocks
    }
}

/// Read markup into blocks.
///
/// In inline mode every block boundary is flattened and at most one
/// [`BlockKind::Paragraph`] block is returned, suitable for embedding in
/// an existing paragraph or inside a highlight.
pub fn parse(markup: &str, inline: bool) -> Vec<Block> {
    let mut reader = Reader::new(inline);

    for token in lex(markup) {
        match token.kind {
            TokenKind::Text => reader.push_text(token.text),
            TokenKind::Entity => {
                // a decoded entity is never collapsed, `&nbsp;` included
                let decoded = html_escape::decode_html_entities(token.text);
                reader.append(decoded.into_owned());
            }
            TokenKind::OpenTag => reader.open_tag(&token),
            TokenKind::CloseTag => reader.close_tag(&token),
            TokenKind::Comment => {}
        }
    }

    reader.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn text(text: &str, styles: Vec<Style>) -> Run {
        Run::Text {
            text: text.to_string(),
            styles,
        }
    }

    #[rstest]
    #[case("hello", "hello")]
    #[case("  hello   world ", "hello world")]
    #[case("<p>one</p><p>two</p>", "one two")]
    #[case("a &amp; b", "a & b")]
    #[case("&#8220;q&#8221;", "\u{201C}q\u{201D}")]
    #[case("x<!-- hidden -->y", "xy")]
    #[case("<span class=\"c\">kept</span>", "kept")]
    fn inline_plain_text(#[case] markup: &str, #[case] expected: &str) {
        let blocks = parse(markup, true);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].plain_text(), expected);
    }

    #[test]
    fn inline_empty_markup_has_no_blocks() {
        assert!(parse("", true).is_empty());
        assert!(parse("<p> </p>", true).is_empty());
    }

    #[test]
    fn nested_styles_accumulate() {
        let blocks = parse("<b>bold <i>both</i></b> plain", true);
        assert_eq!(
            blocks[0].runs,
            vec![
                text("bold ", vec![Style::Bold]),
                text("both", vec![Style::Bold, Style::Italic]),
                text(" plain", vec![]),
            ]
        );
    }

    #[test]
    fn link_keeps_href() {
        let blocks = parse(r#"see <a href="https://zotero.org">site</a>"#, true);
        assert_eq!(
            blocks[0].runs[1],
            text(
                "site",
                vec![Style::Link {
                    href: "https://zotero.org".to_string()
                }]
            )
        );
    }

    #[test]
    fn line_break_is_a_run() {
        let blocks = parse("a<br>b", true);
        assert_eq!(
            blocks[0].runs,
            vec![text("a", vec![]), Run::LineBreak, text("b", vec![])]
        );
    }

    #[test]
    fn block_mode_splits_blocks() {
        let blocks = parse("<h2>Title</h2><p>Body</p><pre>  code\n  more</pre>", false);
        let kinds: Vec<_> = blocks.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Heading { level: 2 },
                BlockKind::Paragraph,
                BlockKind::Preformatted
            ]
        );
        assert_eq!(blocks[2].plain_text(), "  code\n  more");
    }

    #[test]
    fn block_mode_bare_text_is_paragraph() {
        let blocks = parse("just text", false);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::Paragraph);
    }
}
