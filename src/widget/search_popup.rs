use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use flume::{Receiver, TryRecvError};
use log::{debug, warn};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::search::{MIN_QUERY_LEN, SearchError, SearchSource, Suggestion};
use crate::theme::Base16Palette;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);
const POPUP_WIDTH: u16 = 60;

type SearchResult = Result<Vec<Suggestion>, SearchError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchAction {
    Close,
    /// Open the chosen article as a new pane
    Open(String),
}

struct InflightSearch {
    query: String,
    receiver: Receiver<SearchResult>,
}

/// Title search box with live suggestions.
///
/// Lookups run on a short-lived thread once typing pauses for the debounce
/// interval. A result whose query no longer matches the input is dropped.
pub struct SearchPopup {
    source: Arc<dyn SearchSource>,
    query: String,
    suggestions: Vec<Suggestion>,
    selected: usize,
    error: Option<String>,
    debounce: Duration,
    dirty_since: Option<Instant>,
    inflight: Option<InflightSearch>,
}

impl SearchPopup {
    pub fn new(source: Arc<dyn SearchSource>) -> Self {
        Self {
            source,
            query: String::new(),
            suggestions: Vec::new(),
            selected: 0,
            error: None,
            debounce: DEFAULT_DEBOUNCE,
            dirty_since: None,
            inflight: None,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.set_debounce(debounce);
        self
    }

    pub fn set_debounce(&mut self, debounce: Duration) {
        self.debounce = debounce;
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_searching(&self) -> bool {
        self.inflight.is_some() || self.dirty_since.is_some()
    }

    pub fn reset(&mut self) {
        self.query.clear();
        self.suggestions.clear();
        self.selected = 0;
        self.error = None;
        self.dirty_since = None;
        self.inflight = None;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<SearchAction> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => Some(SearchAction::Close),
            KeyCode::Enter => self
                .suggestions
                .get(self.selected)
                .map(|suggestion| SearchAction::Open(suggestion.title.clone())),
            KeyCode::Down | KeyCode::Tab => {
                self.select_next();
                None
            }
            KeyCode::Char('n') if ctrl => {
                self.select_next();
                None
            }
            KeyCode::Up | KeyCode::BackTab => {
                self.select_previous();
                None
            }
            KeyCode::Char('p') if ctrl => {
                self.select_previous();
                None
            }
            KeyCode::Backspace => {
                if self.query.pop().is_some() {
                    self.query_changed();
                }
                None
            }
            KeyCode::Char(c) if !ctrl => {
                self.query.push(c);
                self.query_changed();
                None
            }
            _ => None,
        }
    }

    fn select_next(&mut self) {
        if !self.suggestions.is_empty() {
            self.selected = (self.selected + 1).min(self.suggestions.len() - 1);
        }
    }

    fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn query_changed(&mut self) {
        self.dirty_since = Some(Instant::now());
        self.error = None;
        if self.query.trim().chars().count() < MIN_QUERY_LEN {
            self.suggestions.clear();
            self.selected = 0;
        }
    }

    /// Starts due lookups and collects finished ones. Returns true when the
    /// visible state changed.
    pub fn tick(&mut self) -> bool {
        let mut changed = self.collect_result();

        let due = self
            .dirty_since
            .is_some_and(|since| since.elapsed() >= self.debounce);
        if due {
            self.dirty_since = None;
            let query = self.query.trim().to_string();
            if query.chars().count() >= MIN_QUERY_LEN {
                self.start_lookup(query);
            } else {
                self.inflight = None;
                changed = true;
            }
        }
        changed
    }

    fn start_lookup(&mut self, query: String) {
        debug!("Looking up suggestions for {query:?}");
        let (tx, rx) = flume::bounded(1);
        let source = Arc::clone(&self.source);
        let request = query.clone();
        std::thread::spawn(move || {
            // receiver is gone when a newer lookup replaced this one
            let _ = tx.send(source.suggest(&request));
        });
        self.inflight = Some(InflightSearch {
            query,
            receiver: rx,
        });
    }

    fn collect_result(&mut self) -> bool {
        let Some(inflight) = &self.inflight else {
            return false;
        };
        let result = match inflight.receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => {
                self.inflight = None;
                return false;
            }
        };

        let query = inflight.query.clone();
        self.inflight = None;
        if query != self.query.trim() {
            debug!("Dropping stale suggestions for {query:?}");
            return false;
        }

        match result {
            Ok(suggestions) => {
                self.suggestions = suggestions;
                self.error = None;
            }
            Err(e) => {
                warn!("Search for {query:?} failed: {e}");
                self.suggestions.clear();
                self.error = Some(e.to_string());
            }
        }
        self.selected = 0;
        true
    }

    pub fn render(&self, f: &mut Frame, area: Rect, palette: &Base16Palette) {
        let width = POPUP_WIDTH.min(area.width);
        let list_rows = self.suggestions.len().max(1) as u16;
        let height = (list_rows + 4).min(area.height);
        let popup_area = Rect::new(
            area.x + (area.width - width) / 2,
            area.y + area.height.saturating_sub(height) / 3,
            width,
            height,
        );

        f.render_widget(Clear, popup_area);

        let mut lines = vec![
            Line::from(vec![
                Span::styled("Search: ", Style::default().fg(palette.base_0d)),
                Span::styled(
                    format!("{}▏", self.query),
                    Style::default().fg(palette.base_06),
                ),
            ]),
            Line::default(),
        ];

        let (selected_bg, selected_fg) = palette.get_selection_colors(true);
        if let Some(error) = &self.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(palette.base_08),
            )));
        } else if self.suggestions.is_empty() {
            let hint = if self.query.trim().chars().count() < MIN_QUERY_LEN {
                format!("Type at least {MIN_QUERY_LEN} characters")
            } else if self.is_searching() {
                "Searching…".to_string()
            } else {
                "No matches".to_string()
            };
            lines.push(Line::from(Span::styled(
                hint,
                Style::default().fg(palette.base_03),
            )));
        } else {
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                let style = if i == self.selected {
                    Style::default()
                        .bg(selected_bg)
                        .fg(selected_fg)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(palette.base_05)
                };
                lines.push(Line::from(Span::styled(
                    format!(" {} ", suggestion.label),
                    style,
                )));
            }
        }

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .title(" Open article ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.base_0c))
                .style(Style::default().bg(palette.base_00)),
        );
        f.render_widget(paragraph, popup_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource {
        calls: AtomicUsize,
    }

    impl SearchSource for FixedSource {
        fn suggest(&self, query: &str) -> Result<Vec<Suggestion>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if query == "fail" {
                return Err(SearchError::Status(503));
            }
            Ok(vec![
                Suggestion {
                    label: format!("{query} one"),
                    title: format!("{query}_one"),
                },
                Suggestion {
                    label: format!("{query} two"),
                    title: format!("{query}_two"),
                },
            ])
        }
    }

    fn popup() -> (SearchPopup, Arc<FixedSource>) {
        let source = Arc::new(FixedSource {
            calls: AtomicUsize::new(0),
        });
        let popup = SearchPopup::new(source.clone()).with_debounce(Duration::ZERO);
        (popup, source)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    fn type_text(popup: &mut SearchPopup, text: &str) {
        for c in text.chars() {
            popup.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn settle(popup: &mut SearchPopup) {
        let deadline = Instant::now() + Duration::from_secs(5);
        popup.tick();
        while popup.is_searching() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
            popup.tick();
        }
    }

    #[test]
    fn suggestions_arrive_and_enter_opens_selected() {
        let (mut popup, _) = popup();
        type_text(&mut popup, "cat");
        settle(&mut popup);

        assert_eq!(popup.suggestions().len(), 2);
        popup.handle_key(key(KeyCode::Down));
        assert_eq!(popup.selected(), 1);
        popup.handle_key(key(KeyCode::Down));
        assert_eq!(popup.selected(), 1);

        assert_eq!(
            popup.handle_key(key(KeyCode::Enter)),
            Some(SearchAction::Open("cat_two".to_string()))
        );
    }

    #[test]
    fn short_query_never_searches() {
        let (mut popup, source) = popup();
        type_text(&mut popup, "ca");
        settle(&mut popup);

        assert!(popup.suggestions().is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(popup.handle_key(key(KeyCode::Enter)), None);
    }

    #[test]
    fn stale_results_are_dropped() {
        let (mut popup, _) = popup();
        type_text(&mut popup, "cat");
        popup.tick();
        // query edited before the lookup result is collected
        popup.handle_key(key(KeyCode::Backspace));
        settle(&mut popup);

        assert_eq!(popup.query(), "ca");
        assert!(popup.suggestions().is_empty());
    }

    #[test]
    fn failed_search_shows_error() {
        let (mut popup, _) = popup();
        type_text(&mut popup, "fail");
        settle(&mut popup);

        assert!(popup.suggestions().is_empty());
        assert_eq!(popup.error(), Some("search returned HTTP 503"));
    }

    #[test]
    fn escape_closes_and_reset_clears() {
        let (mut popup, _) = popup();
        type_text(&mut popup, "dog");
        assert_eq!(popup.handle_key(key(KeyCode::Esc)), Some(SearchAction::Close));
        popup.reset();
        assert_eq!(popup.query(), "");
        assert!(!popup.is_searching());
    }
}
