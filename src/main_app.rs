use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{KeyEventKind, KeyModifiers};
use log::{debug, error, info, warn};
use ratatui::{
    Frame, Terminal,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Paragraph},
};

use crate::event_source::{Event, EventSource, KeyCode, KeyEvent};
use crate::page_head::PageHead;
use crate::panes::codec;
use crate::panes::{PaneController, PaneStack, PaneStatus, StripLayout};
use crate::parsing::Activation;
use crate::search::SearchSource;
use crate::settings::{self, Settings};
use crate::theme::{current_theme, current_theme_id, set_theme};
use crate::widget::help_popup::{HelpPopup, HelpPopupAction};
use crate::widget::hud_message::HudMessage;
use crate::widget::pane_view::PaneView;
use crate::widget::search_popup::{SearchAction, SearchPopup};
use crate::wiki_client::DocumentSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePopup {
    Search,
    Help,
}

pub struct App {
    stack: PaneStack,
    controllers: HashMap<String, PaneController>,
    views: HashMap<String, PaneView>,
    source: Arc<dyn DocumentSource>,
    head: PageHead,
    layout: StripLayout,
    focus: usize,
    first_visible: usize,
    search: SearchPopup,
    help: HelpPopup,
    popup: Option<ActivePopup>,
    hud: Option<HudMessage>,
    browse_url: String,
}

impl App {
    /// Builds the app around an initial pane stack, using the current
    /// settings for geometry and script handling.
    pub fn new(
        stack: PaneStack,
        source: Arc<dyn DocumentSource>,
        search_source: Arc<dyn SearchSource>,
    ) -> Self {
        Self::with_settings(stack, source, search_source, &settings::current())
    }

    pub fn with_settings(
        stack: PaneStack,
        source: Arc<dyn DocumentSource>,
        search_source: Arc<dyn SearchSource>,
        settings: &Settings,
    ) -> Self {
        let mut app = Self {
            stack,
            controllers: HashMap::new(),
            views: HashMap::new(),
            source,
            head: PageHead::new(settings.load_scripts),
            layout: StripLayout::new(settings.pane_width, settings.spine_width),
            focus: 0,
            first_visible: 0,
            search: SearchPopup::new(search_source),
            help: HelpPopup::new(),
            popup: None,
            hud: None,
            browse_url: settings.browse_url.clone(),
        };
        app.reconcile();
        app
    }

    pub fn with_search_debounce(mut self, debounce: Duration) -> Self {
        self.search.set_debounce(debounce);
        self
    }

    pub fn stack(&self) -> &PaneStack {
        &self.stack
    }

    pub fn titles(&self) -> Vec<String> {
        self.stack.titles()
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn focused_title(&self) -> Option<String> {
        self.stack.titles().into_iter().nth(self.focus)
    }

    pub fn status_of(&self, title: &str) -> Option<&PaneStatus> {
        self.controllers.get(title).map(PaneController::status)
    }

    pub fn view(&self, title: &str) -> Option<&PaneView> {
        self.views.get(title)
    }

    pub fn active_popup(&self) -> Option<ActivePopup> {
        self.popup
    }

    pub fn search(&self) -> &SearchPopup {
        &self.search
    }

    pub fn head(&self) -> &PageHead {
        &self.head
    }

    pub fn hud_message(&self) -> Option<&HudMessage> {
        self.hud.as_ref()
    }

    pub fn has_pending_loads(&self) -> bool {
        self.controllers
            .values()
            .any(|controller| controller.status().is_pending())
            || self.search.is_searching()
    }

    /// Location string carrying the current token, e.g. `page=Cat,Dog`
    pub fn location(&self) -> String {
        codec::location_for(self.stack.token())
    }

    /// Brings controllers and views in line with the token. New titles get a
    /// fresh controller; controllers of closed titles are dropped, which
    /// cancels their fetch.
    fn reconcile(&mut self) {
        let titles = self.stack.titles();

        self.controllers.retain(|title, _| {
            let keep = titles.contains(title);
            if !keep {
                debug!("Dropping controller for {title:?}");
            }
            keep
        });
        self.views.retain(|title, _| titles.contains(title));

        for title in &titles {
            if !self.controllers.contains_key(title) {
                let controller = PaneController::spawn(title.clone(), Arc::clone(&self.source));
                self.controllers.insert(title.clone(), controller);
            }
            self.views
                .entry(title.clone())
                .or_insert_with(|| PaneView::new(title.clone()));
        }

        self.focus = self.focus.min(titles.len().saturating_sub(1));
        if titles.is_empty() && self.popup.is_none() {
            self.open_search();
        }
        self.sync_views();
    }

    fn sync_views(&mut self) {
        let titles = self.stack.titles();
        let revision = self.stack.revision();
        for title in &titles {
            if let (Some(controller), Some(view)) =
                (self.controllers.get(title), self.views.get_mut(title))
            {
                view.sync(controller, &titles, revision, &mut self.head);
            }
        }
    }

    /// Collects finished fetches and searches. Returns true when anything
    /// visible changed.
    pub fn tick(&mut self) -> bool {
        let mut changed = false;
        for controller in self.controllers.values_mut() {
            changed |= controller.poll();
        }
        if changed {
            self.sync_views();
        }

        if self.popup == Some(ActivePopup::Search) {
            changed |= self.search.tick();
        }

        if self.hud.as_ref().is_some_and(HudMessage::is_expired) {
            self.hud = None;
            changed = true;
        }
        changed
    }

    /// Applies a link activation from a pane. Activating a link whose target
    /// is already open changes nothing.
    pub fn apply(&mut self, activation: &Activation) -> bool {
        match activation {
            Activation::InsertAfter { anchor, target } => {
                if !self.stack.insert_after(anchor, target) {
                    if self.stack.contains(target) {
                        debug!("{target:?} already open, ignoring activation");
                    } else {
                        self.reject_title(target);
                    }
                    return false;
                }
                info!("Opened {target:?} after {anchor:?}");
                self.reconcile();
                if let Some(index) = self.stack.index_of(target) {
                    self.focus = index;
                }
                true
            }
        }
    }

    /// Opens `title` at the end of the stack, or focuses it when already open
    pub fn open_title(&mut self, title: &str) {
        if self.stack.open(title) {
            info!("Opened {title:?}");
            self.reconcile();
        }
        match self.stack.index_of(title) {
            Some(index) => self.focus = index,
            None => self.reject_title(title),
        }
    }

    fn reject_title(&mut self, title: &str) {
        warn!("Cannot open {title:?} as a pane");
        self.hud = Some(HudMessage::error(format!("Cannot open {title}")));
    }

    pub fn close_focused(&mut self) -> bool {
        let Some(title) = self.focused_title() else {
            return false;
        };
        if !self.stack.close(&title) {
            return false;
        }
        info!("Closed {title:?}");
        self.reconcile();
        true
    }

    fn focused_view_mut(&mut self) -> Option<&mut PaneView> {
        let title = self.focused_title()?;
        self.views.get_mut(&title)
    }

    fn open_search(&mut self) {
        self.search.reset();
        self.popup = Some(ActivePopup::Search);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<AppAction> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            return Some(AppAction::Quit);
        }

        match self.popup {
            Some(ActivePopup::Search) => {
                match self.search.handle_key(key) {
                    Some(SearchAction::Close) => self.popup = None,
                    Some(SearchAction::Open(title)) => {
                        self.popup = None;
                        self.search.reset();
                        self.open_title(&title);
                    }
                    None => {}
                }
                return None;
            }
            Some(ActivePopup::Help) => {
                if let Some(HelpPopupAction::Close) = self.help.handle_key(key) {
                    self.popup = None;
                }
                return None;
            }
            None => {}
        }

        match key.code {
            KeyCode::Char('q') => return Some(AppAction::Quit),
            KeyCode::Char('?') => self.popup = Some(ActivePopup::Help),
            KeyCode::Char('/') => self.open_search(),
            KeyCode::Char('k') if ctrl => self.open_search(),
            KeyCode::Char('d') if ctrl => {
                if let Some(view) = self.focused_view_mut() {
                    let lines = view.half_page();
                    view.scroll_down(lines);
                }
            }
            KeyCode::Char('u') if ctrl => {
                if let Some(view) = self.focused_view_mut() {
                    let lines = view.half_page();
                    view.scroll_up(lines);
                }
            }
            KeyCode::Char('h') | KeyCode::Left => self.focus = self.focus.saturating_sub(1),
            KeyCode::Char('l') | KeyCode::Right => {
                self.focus = (self.focus + 1).min(self.stack.len().saturating_sub(1));
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if let Some(view) = self.focused_view_mut() {
                    view.scroll_down(1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if let Some(view) = self.focused_view_mut() {
                    view.scroll_up(1);
                }
            }
            KeyCode::Tab => {
                if let Some(view) = self.focused_view_mut() {
                    view.next_link();
                }
            }
            KeyCode::BackTab => {
                if let Some(view) = self.focused_view_mut() {
                    view.previous_link();
                }
            }
            KeyCode::Enter => {
                let activation = self
                    .focused_title()
                    .and_then(|title| self.views.get(&title))
                    .and_then(PaneView::focused_activation);
                if let Some(activation) = activation {
                    self.apply(&activation);
                }
            }
            KeyCode::Char('x') => {
                self.close_focused();
            }
            KeyCode::Char('y') => self.copy_location(),
            KeyCode::Char('o') => self.open_in_browser(),
            KeyCode::Char('t') => self.cycle_theme(),
            _ => {}
        }
        None
    }

    fn copy_location(&mut self) {
        let location = self.location();
        let result = arboard::Clipboard::new()
            .and_then(|mut clipboard| clipboard.set_text(location.clone()));
        self.hud = Some(match result {
            Ok(()) => {
                debug!("Copied {location:?} to clipboard");
                HudMessage::info(format!("Copied {location}"))
            }
            Err(e) => {
                error!("Failed to copy location to clipboard: {e}");
                HudMessage::error("Clipboard unavailable")
            }
        });
    }

    fn open_in_browser(&mut self) {
        let Some(title) = self.focused_title() else {
            return;
        };
        let url = format!("{}{}", self.browse_url, urlencoding::encode(&title));
        if let Err(e) = open::that(&url) {
            error!("Failed to open {url}: {e}");
            self.hud = Some(HudMessage::error("Could not open browser"));
        }
    }

    fn cycle_theme(&mut self) {
        let next = current_theme_id().next();
        set_theme(next);
        settings::set_theme_name(next.name());
        self.hud = Some(HudMessage::info(format!("Theme: {}", next.name())));
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let palette = current_theme();
        let theme = current_theme_id() as usize;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(f.area());
        let strip = chunks[0];

        f.render_widget(
            Block::default().style(Style::default().bg(palette.base_00)),
            f.area(),
        );

        let titles = self.stack.titles();
        if titles.is_empty() {
            let hint = Paragraph::new(Line::from(Span::styled(
                "No article open. Press / to search.",
                Style::default().fg(palette.base_03),
            )))
            .alignment(Alignment::Center);
            let middle = Rect::new(strip.x, strip.y + strip.height / 2, strip.width, 1);
            f.render_widget(hint, middle);
        } else {
            self.first_visible =
                self.layout
                    .scroll_to(self.first_visible, self.focus, titles.len(), strip.width);
            for slot in self.layout.slots(titles.len(), self.first_visible, strip) {
                let title = &titles[slot.index];
                let (Some(controller), Some(view)) =
                    (self.controllers.get(title), self.views.get_mut(title))
                else {
                    continue;
                };
                view.render(
                    f,
                    &slot,
                    slot.index,
                    controller.status(),
                    slot.index == self.focus,
                    palette,
                    theme,
                );
            }
        }

        self.draw_status_bar(f, chunks[1]);

        match self.popup {
            Some(ActivePopup::Search) => self.search.render(f, strip, palette),
            Some(ActivePopup::Help) => self.help.render(f, strip, palette),
            None => {}
        }
    }

    fn draw_status_bar(&self, f: &mut Frame, area: Rect) {
        let palette = current_theme();
        if let Some(hud) = &self.hud {
            f.render_widget(Paragraph::new(hud.styled_line(palette)), area);
            return;
        }

        let location = self.location();
        let left = if location.is_empty() {
            "no panes".to_string()
        } else {
            location
        };
        let line = Line::from(vec![
            Span::styled(format!(" {left} "), Style::default().fg(palette.base_04)),
            Span::styled(" ? help ", Style::default().fg(palette.base_03)),
        ]);
        f.render_widget(
            Paragraph::new(line).style(Style::default().bg(palette.base_01)),
            area,
        );
    }
}

pub fn run_app_with_event_source<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();
    let mut first_render = true;
    loop {
        let mut events_processed = 0;
        let mut should_quit = false;
        while event_source.poll(Duration::from_millis(0))? && events_processed < 50 {
            let event = event_source.read()?;
            events_processed += 1;
            match event {
                Event::Key(key) => {
                    if app.handle_key(key) == Some(AppAction::Quit) {
                        should_quit = true;
                    }
                }
                Event::Resize(cols, rows) => debug!("Resized to {cols}x{rows}"),
                _ => {}
            }
            if should_quit {
                break;
            }
        }
        if should_quit {
            return Ok(());
        }

        let mut needs_redraw = events_processed > 0 || first_render;
        first_render = false;

        if last_tick.elapsed() >= tick_rate {
            needs_redraw |= app.tick();
            last_tick = Instant::now();
        }

        if needs_redraw {
            terminal.draw(|f| app.draw(f))?;
        }

        if event_source.is_exhausted() && !app.has_pending_loads() {
            app.tick();
            terminal.draw(|f| app.draw(f))?;
            return Ok(());
        }

        // If no events were processed, wait a bit to avoid busy-waiting
        if events_processed == 0 {
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));
            let _ = event_source.poll(timeout);
        }
    }
}
