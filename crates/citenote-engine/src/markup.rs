//! Conversion of rich markup into document content.

use citenote_markup::{Block, BlockKind, Run, Style};

use crate::model::{Attrs, Fragment, Mark, MarkAttrs, MarkType, Node, NodeType};

/// Turns external markup into document content.
pub trait MarkupParser {
    /// Parse `markup`. In inline mode the result is inline content that can
    /// sit inside a paragraph or a highlight; otherwise it is blocks.
    fn parse(&self, markup: &str, inline: bool) -> Fragment;
}

/// The HTML subset reader from `citenote-markup`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlMarkup;

impl MarkupParser for HtmlMarkup {
    fn parse(&self, markup: &str, inline: bool) -> Fragment {
        let blocks = citenote_markup::parse(markup, inline);
        if inline {
            return blocks
                .first()
                .map(|block| inline_content(block, true))
                .unwrap_or_default();
        }
        Fragment::from_nodes(blocks.iter().filter(|b| !b.is_empty()).map(block_node))
    }
}

fn block_node(block: &Block) -> Node {
    match block.kind {
        BlockKind::Paragraph => {
            Node::new(NodeType::Paragraph, Attrs::default(), inline_content(block, true))
        }
        BlockKind::Heading { level } => {
            let attrs = Attrs {
                level: Some(level),
                ..Attrs::default()
            };
            Node::new(NodeType::Heading, attrs, inline_content(block, true))
        }
        BlockKind::Preformatted => {
            Node::new(NodeType::CodeBlock, Attrs::default(), inline_content(block, false))
        }
    }
}

/// Runs as inline nodes. Unmarked content turns line breaks into newlines.
fn inline_content(block: &Block, marked: bool) -> Fragment {
    if !marked {
        return Fragment::from(Node::new_text(block.plain_text(), Vec::new()));
    }
    Fragment::from_nodes(block.runs.iter().map(|run| match run {
        Run::Text { text, styles } => Node::new_text(text.as_str(), marks_for(styles)),
        Run::LineBreak => Node::leaf(NodeType::HardBreak, Attrs::default()),
    }))
}

fn marks_for(styles: &[Style]) -> Vec<Mark> {
    styles.iter().fold(Vec::new(), |set, style| {
        let mark = match style {
            Style::Bold => Mark::new(MarkType::Strong),
            Style::Italic => Mark::new(MarkType::Em),
            Style::Underline => Mark::new(MarkType::Underline),
            Style::Strike => Mark::new(MarkType::Strike),
            Style::Code => Mark::new(MarkType::Code),
            Style::Subscript => Mark::new(MarkType::Subscript),
            Style::Superscript => Mark::new(MarkType::Superscript),
            Style::Link { href } => MarkType::Link.create(MarkAttrs {
                href: Some(href.clone()),
                ..MarkAttrs::default()
            }),
        };
        mark.add_to_set(&set)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build::{bold, code_block, h, hard_break, marked, p, text};
    use pretty_assertions::assert_eq;

    #[test]
    fn inline_runs_become_marked_text() {
        let content = HtmlMarkup.parse("<b>Bold</b> and <i>it</i><br>x", true);
        assert_eq!(
            content,
            Fragment::from(vec![
                bold("Bold"),
                text(" and "),
                marked("it", &[MarkType::Em]),
                hard_break(),
                text("x"),
            ])
        );
    }

    #[test]
    fn links_keep_href() {
        let content = HtmlMarkup.parse(r#"<a href="https://example.org">site</a>"#, true);
        let mark = &content.child(0).marks()[0];
        assert_eq!(mark.mark_type, MarkType::Link);
        assert_eq!(mark.attrs.href.as_deref(), Some("https://example.org"));
    }

    #[test]
    fn block_mode_builds_blocks() {
        let content = HtmlMarkup.parse("<h2>Title</h2><p>Body</p><pre>a\nb</pre>", false);
        assert_eq!(
            content,
            Fragment::from(vec![
                h(2, vec![text("Title")]),
                p(vec![text("Body")]),
                code_block("a\nb"),
            ])
        );
    }

    #[test]
    fn empty_markup_is_empty() {
        assert!(HtmlMarkup.parse("", true).is_empty());
    }
}
