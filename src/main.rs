use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, LevelFilter, WriteLogger};

use wikipanes::event_source::KeyboardEventSource;
use wikipanes::panes::{PaneStack, codec};
use wikipanes::search::OpenSearchClient;
use wikipanes::theme::{ThemeId, set_theme};
use wikipanes::wiki_client::HttpDocumentSource;
use wikipanes::{App, panic_handler, run_app_with_event_source, settings};

/// Terminal Wikipedia reader that opens linked articles in side-by-side panes
#[derive(Debug, Parser)]
#[command(name = "wikipanes", version, about)]
struct Args {
    /// Comma-separated page titles to open, e.g. Cat,Dog
    #[arg(long, conflicts_with = "location")]
    page: Option<String>,

    /// Location string to resume from, e.g. '?page=Cat,Dog'
    #[arg(long)]
    location: Option<String>,

    #[arg(long = "log-file", default_value = "wikipanes.log")]
    log_file: PathBuf,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Settings file to use instead of the default config location
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn initial_token(&self) -> Option<String> {
        match (&self.page, &self.location) {
            (Some(page), _) => Some(page.clone()).filter(|page| !page.is_empty()),
            (None, Some(location)) => codec::token_from_location(location),
            (None, None) => None,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    WriteLogger::init(
        level,
        Config::default(),
        File::create(&args.log_file)
            .with_context(|| format!("Failed to create log file {:?}", args.log_file))?,
    )?;

    info!("Starting wikipanes");

    settings::load_settings(args.config.as_deref());
    let settings = settings::current();
    if let Some(theme) = ThemeId::from_name(&settings.theme) {
        set_theme(theme);
    }

    let documents = Arc::new(HttpDocumentSource::new(
        settings.article_endpoint.clone(),
        settings.request_timeout(),
    )?);
    let search = Arc::new(OpenSearchClient::new(
        settings.search_endpoint.clone(),
        settings.search_limit,
        settings.request_timeout(),
    )?);

    let stack = PaneStack::from_token(args.initial_token());
    let mut app = App::with_settings(stack, documents, search, &settings);

    panic_handler::initialize_panic_handler(&args.log_file);

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut event_source = KeyboardEventSource;
    let res = run_app_with_event_source(&mut terminal, &mut app, &mut event_source);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("Application error: {err:?}");
        println!("{err:?}");
    }

    let location = app.location();
    if !location.is_empty() {
        println!("?{location}");
    }

    info!("Shutting down wikipanes");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_argument_wins() {
        let args = Args::parse_from(["wikipanes", "--page", "Cat,Dog"]);
        assert_eq!(args.initial_token().as_deref(), Some("Cat,Dog"));
    }

    #[test]
    fn location_argument_is_decoded() {
        let args = Args::parse_from(["wikipanes", "--location", "?page=Cat&lang=en"]);
        assert_eq!(args.initial_token().as_deref(), Some("Cat"));

        let args = Args::parse_from(["wikipanes"]);
        assert_eq!(args.initial_token(), None);
    }
}
