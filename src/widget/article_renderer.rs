//! Lays out a transformed article as word-wrapped terminal lines.

use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use textwrap::core::Fragment;
use textwrap::wrap_algorithms::wrap_first_fit;
use unicode_width::UnicodeWidthStr;

use crate::parsing::{Activation, UiElement, UiNode};
use crate::theme::Base16Palette;

/// A navigable link as laid out on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLink {
    pub activation: Activation,
    /// First line the link text appears on
    pub line: Option<usize>,
    pub highlighted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RenderedArticle {
    pub lines: Vec<Line<'static>>,
    /// Internal links in document order
    pub links: Vec<RenderedLink>,
}

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "body", "caption", "dd", "details", "div", "dl", "dt",
    "figcaption", "figure", "footer", "header", "main", "nav", "pre", "section", "summary",
    "table", "tbody", "thead", "tfoot", "tr",
];

#[derive(Debug, Clone)]
struct Word {
    text: String,
    style: Style,
    link: Option<usize>,
    trailing_space: bool,
}

impl Fragment for Word {
    fn width(&self) -> f64 {
        self.text.width() as f64
    }

    fn whitespace_width(&self) -> f64 {
        if self.trailing_space { 1.0 } else { 0.0 }
    }

    fn penalty_width(&self) -> f64 {
        0.0
    }
}

pub fn render_article(
    nodes: &[UiNode],
    width: u16,
    focused_link: Option<usize>,
    palette: &Base16Palette,
) -> RenderedArticle {
    let mut builder = ArticleBuilder {
        width: width.max(1) as usize,
        palette,
        focused_link,
        lines: Vec::new(),
        words: Vec::new(),
        indent: 0,
        prefix: None,
        lists: Vec::new(),
        links: Vec::new(),
    };

    let base = Style::default().fg(palette.base_05);
    for node in nodes {
        builder.walk(node, base, None);
    }
    builder.flush();

    while builder.lines.last().is_some_and(|line| line.width() == 0) {
        builder.lines.pop();
    }

    RenderedArticle {
        lines: builder.lines,
        links: builder.links,
    }
}

struct ArticleBuilder<'p> {
    width: usize,
    palette: &'p Base16Palette,
    focused_link: Option<usize>,
    lines: Vec<Line<'static>>,
    words: Vec<Word>,
    indent: usize,
    /// Bullet or number for the first line of the current block
    prefix: Option<String>,
    /// Next number for each open list, `None` for bulleted lists
    lists: Vec<Option<usize>>,
    links: Vec<RenderedLink>,
}

impl ArticleBuilder<'_> {
    fn walk(&mut self, node: &UiNode, style: Style, link: Option<usize>) {
        match node {
            UiNode::Text(text) => self.push_text(text, style, link),
            UiNode::Element(element) => self.walk_element(element, style, link),
            UiNode::Omitted => {}
        }
    }

    fn walk_children(&mut self, element: &UiElement, style: Style, link: Option<usize>) {
        for child in element.children() {
            self.walk(child, style, link);
        }
    }

    fn walk_element(&mut self, element: &UiElement, style: Style, link: Option<usize>) {
        if is_hidden(element) {
            return;
        }

        match element.tag.as_str() {
            "br" => self.flush(),
            "hr" => {
                self.flush();
                let rule = "─".repeat(self.width.saturating_sub(self.indent));
                self.lines.push(Line::from(Span::styled(
                    rule,
                    Style::default().fg(self.palette.base_03),
                )));
            }
            "img" => self.push_word(
                "[image]",
                Style::default().fg(self.palette.base_03),
                link,
                true,
            ),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                self.ensure_blank();
                let mut heading = style.fg(self.palette.base_0d).add_modifier(Modifier::BOLD);
                if matches!(element.tag.as_str(), "h1" | "h2") {
                    heading = heading.add_modifier(Modifier::UNDERLINED);
                }
                self.walk_children(element, heading, link);
                self.flush();
            }
            "p" => {
                self.flush();
                self.walk_children(element, style, link);
                self.flush();
                self.ensure_blank();
            }
            "ul" | "ol" => {
                self.flush();
                self.lists
                    .push((element.tag == "ol").then_some(1));
                self.indent += 2;
                self.walk_children(element, style, link);
                self.flush();
                self.indent -= 2;
                self.lists.pop();
                if self.lists.is_empty() {
                    self.ensure_blank();
                }
            }
            "li" => {
                self.flush();
                self.prefix = Some(match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let label = format!("{n}. ");
                        *n += 1;
                        label
                    }
                    _ => "• ".to_string(),
                });
                self.walk_children(element, style, link);
                self.flush();
            }
            "blockquote" => {
                self.flush();
                self.indent += 2;
                self.walk_children(element, style.add_modifier(Modifier::ITALIC), link);
                self.flush();
                self.indent -= 2;
            }
            "td" | "th" => {
                let cell = if element.tag == "th" {
                    style.add_modifier(Modifier::BOLD)
                } else {
                    style
                };
                self.walk_children(element, cell, link);
                self.mark_space();
            }
            "a" => match &element.on_activate {
                Some(activation) => {
                    let id = self.links.len();
                    self.links.push(RenderedLink {
                        activation: activation.clone(),
                        line: None,
                        highlighted: element.highlighted,
                    });
                    let link_style = self.link_style(style, id, element.highlighted);
                    self.walk_children(element, link_style, Some(id));
                }
                None => self.walk_children(element, style, link),
            },
            "b" | "strong" => self.walk_children(element, style.add_modifier(Modifier::BOLD), link),
            "i" | "em" | "cite" => {
                self.walk_children(element, style.add_modifier(Modifier::ITALIC), link)
            }
            "code" | "kbd" | "samp" | "tt" => {
                self.walk_children(element, style.fg(self.palette.base_0b), link)
            }
            "sup" | "sub" | "small" => {
                self.walk_children(element, style.add_modifier(Modifier::DIM), link)
            }
            tag if BLOCK_TAGS.contains(&tag) => {
                self.flush();
                self.walk_children(element, style, link);
                self.flush();
            }
            _ => self.walk_children(element, style, link),
        }
    }

    fn link_style(&self, base: Style, id: usize, highlighted: bool) -> Style {
        let mut style = if highlighted {
            base.fg(self.palette.base_0a).add_modifier(Modifier::BOLD)
        } else {
            base.fg(self.palette.base_0c)
        };
        style = style.add_modifier(Modifier::UNDERLINED);
        if self.focused_link == Some(id) {
            style = style.add_modifier(Modifier::REVERSED);
        }
        style
    }

    /// Whitespace collapses to single spaces between words, as in a browser
    fn push_text(&mut self, text: &str, style: Style, link: Option<usize>) {
        if text.starts_with(char::is_whitespace) {
            self.mark_space();
        }
        let mut parts = text.split_whitespace().peekable();
        while let Some(part) = parts.next() {
            let more = parts.peek().is_some();
            self.push_word(part, style, link, more);
        }
        if text.ends_with(char::is_whitespace) {
            self.mark_space();
        }
    }

    fn push_word(&mut self, text: &str, style: Style, link: Option<usize>, space_after: bool) {
        self.words.push(Word {
            text: text.to_string(),
            style,
            link,
            trailing_space: space_after,
        });
    }

    fn mark_space(&mut self) {
        if let Some(last) = self.words.last_mut() {
            last.trailing_space = true;
        }
    }

    fn ensure_blank(&mut self) {
        if self.lines.last().is_some_and(|line| line.width() > 0) {
            self.lines.push(Line::default());
        }
    }

    fn flush(&mut self) {
        if self.words.is_empty() {
            self.prefix = None;
            return;
        }

        let prefix = self.prefix.take().unwrap_or_default();
        let prefix_width = prefix.width();
        let available = self
            .width
            .saturating_sub(self.indent + prefix_width)
            .max(1);

        let words = split_long_words(std::mem::take(&mut self.words), available);
        let wrapped = wrap_first_fit(&words, &[available as f64]);

        for (row, line_words) in wrapped.iter().enumerate() {
            let line_index = self.lines.len();
            let lead = if row == 0 {
                format!("{}{}", " ".repeat(self.indent), prefix)
            } else {
                " ".repeat(self.indent + prefix_width)
            };

            let mut spans = Vec::with_capacity(line_words.len() * 2 + 1);
            if !lead.is_empty() {
                spans.push(Span::raw(lead));
            }
            for (i, word) in line_words.iter().enumerate() {
                if let Some(id) = word.link {
                    let rendered = &mut self.links[id];
                    rendered.line.get_or_insert(line_index);
                }
                spans.push(Span::styled(word.text.clone(), word.style));

                let next = line_words.get(i + 1);
                if word.trailing_space && next.is_some() {
                    // Spaces inside one link keep the link underline
                    let same_link = word.link.is_some() && next.map(|n| n.link) == Some(word.link);
                    let gap = if same_link {
                        word.style
                    } else {
                        Style::default()
                    };
                    spans.push(Span::styled(" ", gap));
                }
            }
            self.lines.push(Line::from(spans));
        }
    }
}

fn split_long_words(words: Vec<Word>, available: usize) -> Vec<Word> {
    let mut out = Vec::with_capacity(words.len());
    for word in words {
        if word.text.width() <= available {
            out.push(word);
            continue;
        }
        let mut chunk = String::new();
        let mut chunk_width = 0;
        for ch in word.text.chars() {
            let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
            if chunk_width + ch_width > available && !chunk.is_empty() {
                out.push(Word {
                    text: std::mem::take(&mut chunk),
                    trailing_space: false,
                    ..word.clone()
                });
                chunk_width = 0;
            }
            chunk.push(ch);
            chunk_width += ch_width;
        }
        out.push(Word {
            text: chunk,
            ..word
        });
    }
    out
}

fn is_hidden(element: &UiElement) -> bool {
    element.attr("style").is_some_and(|style| {
        let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
        compact.contains("display:none")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_head::NullHead;
    use crate::parsing::{Document, LinkContext, transform};
    use crate::theme::current_theme;

    fn render_html(body: &str, open: &[String], width: u16, focus: Option<usize>) -> RenderedArticle {
        let doc = Document::parse(&format!(
            "<html><head><title>T</title></head><body>{body}</body></html>"
        ));
        let nodes = transform(Some(&doc), &LinkContext::new("Cat", open), &mut NullHead);
        render_article(&nodes, width, focus, current_theme())
    }

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn collapses_whitespace_and_wraps() {
        let article = render_html("<p>one   two\n three four five</p>", &[], 10, None);
        let text: Vec<String> = article.lines.iter().map(plain).collect();
        assert_eq!(text, ["one two", "three four", "five"]);
    }

    #[test]
    fn paragraphs_are_separated_by_blank_lines() {
        let article = render_html("<p>first</p>\n<p>second</p>", &[], 40, None);
        let text: Vec<String> = article.lines.iter().map(plain).collect();
        assert_eq!(text, ["first", "", "second"]);
    }

    #[test]
    fn list_items_get_bullets_and_numbers() {
        let article = render_html(
            "<ul><li>alpha</li><li>beta</li></ul><ol><li>one</li><li>two</li></ol>",
            &[],
            40,
            None,
        );
        let text: Vec<String> = article.lines.iter().map(plain).collect();
        assert_eq!(text, ["  • alpha", "  • beta", "", "  1. one", "  2. two"]);
    }

    #[test]
    fn records_links_with_their_lines() {
        let article = render_html(
            r#"<p>Cats chase</p><p>the <a rel="mw:WikiLink" title="Mouse">mouse</a> and
               <a rel="mw:WikiLink" title="Cat">cats</a>.</p>"#,
            &["Cat".to_string()],
            40,
            Some(0),
        );

        assert_eq!(article.links.len(), 2);
        assert_eq!(article.links[0].activation.target(), "Mouse");
        assert_eq!(article.links[0].line, Some(2));
        assert!(!article.links[0].highlighted);
        assert!(article.links[1].highlighted);

        let focused = article.lines[2]
            .spans
            .iter()
            .find(|span| span.content == "mouse")
            .unwrap();
        assert!(focused.style.add_modifier.contains(Modifier::REVERSED));
    }

    #[test]
    fn hidden_and_external_content() {
        let article = render_html(
            r#"<div style="display: none">secret</div><p><a href="https://x.org">site</a></p>"#,
            &[],
            40,
            None,
        );
        let text: Vec<String> = article.lines.iter().map(plain).collect();
        assert_eq!(text, ["site"]);
        assert!(article.links.is_empty());
    }

    #[test]
    fn long_words_are_split() {
        let article = render_html("<p>abcdefghijkl</p>", &[], 5, None);
        let text: Vec<String> = article.lines.iter().map(plain).collect();
        assert_eq!(text, ["abcde", "fghij", "kl"]);
    }
}
