use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::page_head::HeadSink;
use crate::panes::{PaneController, PaneSlot, PaneStatus};
use crate::parsing::{Activation, LinkContext, UiNode, transform};
use crate::theme::Base16Palette;
use crate::widget::article_renderer::{RenderedArticle, RenderedLink, render_article};

/// Inputs a transform pass depends on, besides the document itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TreeKey {
    generation: u64,
    revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RenderKey {
    tree: TreeKey,
    width: u16,
    focused_link: Option<usize>,
    theme: usize,
}

/// On-screen state of one pane: scroll position, link cursor, and the last
/// transform and layout results.
///
/// The transform is re-run only when the pane's document or the open pane
/// list changes; layout is redone when the width, link cursor or theme change.
pub struct PaneView {
    title: String,
    scroll: usize,
    focused_link: Option<usize>,
    reveal_focus: bool,
    tree: Option<(TreeKey, Vec<UiNode>)>,
    rendered: Option<(RenderKey, RenderedArticle)>,
    content_height: usize,
}

impl PaneView {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            scroll: 0,
            focused_link: None,
            reveal_focus: false,
            tree: None,
            rendered: None,
            content_height: 0,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll
    }

    pub fn focused_link(&self) -> Option<usize> {
        self.focused_link
    }

    /// Brings the transformed tree up to date with the controller and the
    /// current pane list. Returns true when a new transform pass ran.
    pub fn sync(
        &mut self,
        controller: &PaneController,
        open_titles: &[String],
        revision: u64,
        head: &mut dyn HeadSink,
    ) -> bool {
        let key = TreeKey {
            generation: controller.generation(),
            revision,
        };
        if self.tree.as_ref().is_some_and(|(cached, _)| *cached == key) {
            return false;
        }

        let doc = controller.status().document().map(|doc| doc.as_ref());
        let ctx = LinkContext::new(&self.title, open_titles);
        let nodes = transform(doc, &ctx, head);
        self.tree = Some((key, nodes));
        true
    }

    pub fn links(&self) -> &[RenderedLink] {
        self.rendered
            .as_ref()
            .map(|(_, article)| article.links.as_slice())
            .unwrap_or(&[])
    }

    pub fn focused_activation(&self) -> Option<Activation> {
        let index = self.focused_link?;
        self.links().get(index).map(|link| link.activation.clone())
    }

    pub fn next_link(&mut self) {
        let count = self.links().len();
        if count == 0 {
            return;
        }
        self.focused_link = Some(match self.focused_link {
            Some(index) => (index + 1) % count,
            None => self.first_visible_link().unwrap_or(0),
        });
        self.reveal_focus = true;
    }

    pub fn previous_link(&mut self) {
        let count = self.links().len();
        if count == 0 {
            return;
        }
        self.focused_link = Some(match self.focused_link {
            Some(0) | None => count - 1,
            Some(index) => index - 1,
        });
        self.reveal_focus = true;
    }

    fn first_visible_link(&self) -> Option<usize> {
        self.links()
            .iter()
            .position(|link| link.line.is_some_and(|line| line >= self.scroll))
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll = (self.scroll + lines).min(self.max_scroll());
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn half_page(&self) -> usize {
        (self.content_height / 2).max(1)
    }

    fn max_scroll(&self) -> usize {
        let total = self
            .rendered
            .as_ref()
            .map(|(_, article)| article.lines.len())
            .unwrap_or(0);
        total.saturating_sub(self.content_height.max(1))
    }

    /// Draws the pane into its slot. `index` is the pane's current position
    /// in the stack and is shown in the border.
    pub fn render(
        &mut self,
        f: &mut Frame,
        slot: &PaneSlot,
        index: usize,
        status: &PaneStatus,
        is_focused: bool,
        palette: &Base16Palette,
        theme: usize,
    ) {
        if slot.collapsed {
            self.render_spine(f, slot.area, status, is_focused, palette);
            return;
        }

        let (text_color, border_color, bg) = palette.get_panel_colors(is_focused);
        let heading = display_title(&self.title, status);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title(format!(" {} · {} ", index + 1, heading))
            .style(Style::default().bg(bg));
        let inner = block.inner(slot.area);
        f.render_widget(block, slot.area);

        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let heading_area = Rect::new(inner.x + 1, inner.y, inner.width.saturating_sub(2), 1);
        let title_line = Line::from(Span::styled(
            heading,
            Style::default()
                .fg(text_color)
                .add_modifier(Modifier::BOLD),
        ));
        f.render_widget(Paragraph::new(title_line), heading_area);

        let content_area = Rect::new(
            inner.x + 1,
            inner.y + 2.min(inner.height),
            inner.width.saturating_sub(2),
            inner.height.saturating_sub(2),
        );
        self.content_height = content_area.height as usize;

        match status {
            PaneStatus::Pending => {
                let loading = Paragraph::new(Line::from(Span::styled(
                    "Loading…",
                    Style::default().fg(palette.base_03),
                )));
                f.render_widget(loading, content_area);
            }
            PaneStatus::Failed(error) => {
                let message = Paragraph::new(Line::from(Span::styled(
                    format!("Error: {error}"),
                    Style::default().fg(palette.base_08),
                )));
                f.render_widget(message, content_area);
            }
            PaneStatus::Ready(_) => {
                self.layout(content_area.width, theme, palette);
                self.apply_reveal();
                if let Some((_, article)) = &self.rendered {
                    let visible: Vec<Line> = article
                        .lines
                        .iter()
                        .skip(self.scroll)
                        .take(content_area.height as usize)
                        .cloned()
                        .collect();
                    f.render_widget(Paragraph::new(visible), content_area);
                }
            }
        }
    }

    fn layout(&mut self, width: u16, theme: usize, palette: &Base16Palette) {
        let Some((tree_key, nodes)) = &self.tree else {
            return;
        };
        let key = RenderKey {
            tree: *tree_key,
            width,
            focused_link: self.focused_link,
            theme,
        };
        if self.rendered.as_ref().is_some_and(|(cached, _)| *cached == key) {
            return;
        }

        let article = render_article(nodes, width, self.focused_link, palette);
        if self
            .focused_link
            .is_some_and(|index| index >= article.links.len())
        {
            self.focused_link = None;
        }
        self.rendered = Some((key, article));
        self.scroll = self.scroll.min(self.max_scroll());
    }

    fn apply_reveal(&mut self) {
        if !std::mem::take(&mut self.reveal_focus) {
            return;
        }
        let Some(line) = self
            .focused_link
            .and_then(|index| self.links().get(index))
            .and_then(|link| link.line)
        else {
            return;
        };
        let height = self.content_height.max(1);
        if line < self.scroll {
            self.scroll = line;
        } else if line >= self.scroll + height {
            self.scroll = line + 1 - height;
        }
    }

    fn render_spine(
        &self,
        f: &mut Frame,
        area: Rect,
        status: &PaneStatus,
        is_focused: bool,
        palette: &Base16Palette,
    ) {
        let (text_color, border_color, bg) = palette.get_panel_colors(is_focused);
        let block = Block::default()
            .borders(Borders::RIGHT)
            .border_style(Style::default().fg(border_color))
            .style(Style::default().bg(bg));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let title = display_title(&self.title, status);
        let lines: Vec<Line> = title
            .chars()
            .take(inner.height as usize)
            .map(|ch| {
                Line::from(Span::styled(
                    ch.to_string(),
                    Style::default().fg(text_color),
                ))
                .centered()
            })
            .collect();
        f.render_widget(Paragraph::new(lines), inner);
    }
}

/// Heading for a pane: the document title once loaded, the requested title
/// while loading, and "Error" after a failed fetch.
pub fn display_title(requested: &str, status: &PaneStatus) -> String {
    match status {
        PaneStatus::Pending => requested.replace('_', " "),
        PaneStatus::Failed(_) => "Error".to_string(),
        PaneStatus::Ready(doc) if doc.title.trim().is_empty() => requested.replace('_', " "),
        PaneStatus::Ready(doc) => doc.title.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::Document;
    use crate::wiki_client::FetchError;
    use std::sync::Arc;

    #[test]
    fn display_title_follows_status() {
        assert_eq!(
            display_title("Felis_catus", &PaneStatus::Pending),
            "Felis catus"
        );
        assert_eq!(
            display_title(
                "Cat",
                &PaneStatus::Failed(FetchError::Status { status: 500 })
            ),
            "Error"
        );
        let doc = Document::new("Cat (animal)", Vec::new());
        assert_eq!(
            display_title("Cat", &PaneStatus::Ready(Arc::new(doc))),
            "Cat (animal)"
        );
    }

    #[test]
    fn link_cursor_without_links_stays_empty() {
        let mut view = PaneView::new("Cat");
        view.next_link();
        view.previous_link();
        assert_eq!(view.focused_link(), None);
        assert_eq!(view.focused_activation(), None);
    }
}
