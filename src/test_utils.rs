pub mod test_helpers {
    use std::collections::HashMap;
    use std::time::{Duration, Instant};

    use crate::event_source::{Event, KeyCode, SimulatedEventSource};
    use crate::main_app::App;
    use crate::search::{SearchError, SearchSource, Suggestion};
    use crate::wiki_client::{DocumentSource, FetchError};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    /// Builder for creating test scenarios with simulated user input
    pub struct TestScenarioBuilder {
        events: Vec<Event>,
    }

    impl Default for TestScenarioBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestScenarioBuilder {
        pub fn new() -> Self {
            Self { events: Vec::new() }
        }

        /// Add a character key press
        pub fn press_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::char(c));
            self
        }

        /// Add a Ctrl+character key press
        pub fn press_ctrl_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::ctrl(c));
            self
        }

        pub fn press_enter(mut self) -> Self {
            self.events.push(SimulatedEventSource::key(KeyCode::Enter));
            self
        }

        pub fn press_tab(mut self) -> Self {
            self.events.push(SimulatedEventSource::key(KeyCode::Tab));
            self
        }

        pub fn press_esc(mut self) -> Self {
            self.events.push(SimulatedEventSource::key(KeyCode::Esc));
            self
        }

        /// Type each character of `text`
        pub fn type_text(mut self, text: &str) -> Self {
            for c in text.chars() {
                self.events.push(SimulatedEventSource::char(c));
            }
            self
        }

        /// Move pane focus right n times (press 'l' n times)
        pub fn focus_right(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char('l'));
            }
            self
        }

        /// Move pane focus left n times (press 'h' n times)
        pub fn focus_left(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char('h'));
            }
            self
        }

        /// Close the focused pane (press 'x')
        pub fn close_pane(mut self) -> Self {
            self.events.push(SimulatedEventSource::char('x'));
            self
        }

        /// Quit the application (Ctrl+c works even with a popup open)
        pub fn quit(mut self) -> Self {
            self.events.push(SimulatedEventSource::ctrl('c'));
            self
        }

        /// Build the simulated event source
        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::new(self.events)
        }
    }

    /// Document source serving canned HTML. Titles without an entry fail
    /// with HTTP 404.
    #[derive(Default)]
    pub struct FakeDocumentSource {
        pages: HashMap<String, String>,
    }

    impl FakeDocumentSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, title: &str, html: impl Into<String>) -> Self {
            self.pages.insert(title.to_string(), html.into());
            self
        }
    }

    impl DocumentSource for FakeDocumentSource {
        fn fetch_html(&self, title: &str) -> Result<String, FetchError> {
            self.pages
                .get(title)
                .cloned()
                .ok_or(FetchError::Status { status: 404 })
        }
    }

    /// Search source answering every query with the same suggestions
    #[derive(Default)]
    pub struct FakeSearchSource {
        suggestions: Vec<Suggestion>,
    }

    impl FakeSearchSource {
        pub fn new(titles: &[&str]) -> Self {
            Self {
                suggestions: titles
                    .iter()
                    .map(|title| Suggestion {
                        label: title.replace('_', " "),
                        title: title.to_string(),
                    })
                    .collect(),
            }
        }
    }

    impl SearchSource for FakeSearchSource {
        fn suggest(&self, _query: &str) -> Result<Vec<Suggestion>, SearchError> {
            Ok(self.suggestions.clone())
        }
    }

    /// Minimal article page in the shape the REST endpoint returns
    pub fn article_html(title: &str, body: &str) -> String {
        format!("<!DOCTYPE html><html><head><title>{title}</title></head><body>{body}</body></html>")
    }

    /// Ticks the app until no fetch or search is outstanding
    pub fn wait_for_loads(app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(5);
        app.tick();
        while app.has_pending_loads() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
            app.tick();
        }
    }

    /// Create a test terminal for snapshot testing
    pub fn create_test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        let backend = TestBackend::new(width, height);
        Terminal::new(backend).unwrap()
    }

    /// Capture the current terminal buffer as a string
    pub fn capture_terminal_state(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut lines = Vec::new();

        for y in 0..buffer.area.height {
            let mut line = String::new();
            for x in 0..buffer.area.width {
                line.push_str(buffer[(x, y)].symbol());
            }
            // Trim trailing whitespace from each line
            lines.push(line.trim_end().to_string());
        }

        // Remove trailing empty lines
        while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
            lines.pop();
        }

        lines.join("\n")
    }
}
