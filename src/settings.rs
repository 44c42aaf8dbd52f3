use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};
use std::time::Duration;

use crate::search::DEFAULT_SEARCH_ENDPOINT;
use crate::wiki_client::DEFAULT_ARTICLE_ENDPOINT;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "wikipanes";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_theme")]
    pub theme: String,

    /// Width in columns of a fully shown pane
    #[serde(default = "default_pane_width")]
    pub pane_width: u16,

    /// Width in columns of a collapsed pane
    #[serde(default = "default_spine_width")]
    pub spine_width: u16,

    #[serde(default = "default_article_endpoint")]
    pub article_endpoint: String,

    #[serde(default = "default_search_endpoint")]
    pub search_endpoint: String,

    /// Prefix of the human-readable article address opened with `o`
    #[serde(default = "default_browse_url")]
    pub browse_url: String,

    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Register `<script>` resources found in articles. Off by default.
    #[serde(default)]
    pub load_scripts: bool,

    /// No timeout when unset: a stalled request keeps its pane loading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_theme() -> String {
    "Oceanic Next".to_string()
}

fn default_pane_width() -> u16 {
    72
}

fn default_spine_width() -> u16 {
    3
}

fn default_article_endpoint() -> String {
    DEFAULT_ARTICLE_ENDPOINT.to_string()
}

fn default_search_endpoint() -> String {
    DEFAULT_SEARCH_ENDPOINT.to_string()
}

fn default_browse_url() -> String {
    "https://en.wikipedia.org/wiki/".to_string()
}

fn default_search_limit() -> usize {
    6
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            theme: default_theme(),
            pane_width: default_pane_width(),
            spine_width: default_spine_width(),
            article_endpoint: default_article_endpoint(),
            search_endpoint: default_search_endpoint(),
            browse_url: default_browse_url(),
            search_limit: default_search_limit(),
            load_scripts: false,
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));
static SETTINGS_PATH: LazyLock<RwLock<Option<PathBuf>>> = LazyLock::new(|| RwLock::new(None));

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Loads settings from `path`, or from the default config location. A
/// missing file is created with defaults; a broken one is logged and ignored.
pub fn load_settings(path: Option<&Path>) {
    let Some(path) = path.map(Path::to_path_buf).or_else(default_config_path) else {
        warn!("Could not determine config directory, using default settings");
        return;
    };

    if let Ok(mut slot) = SETTINGS_PATH.write() {
        *slot = Some(path.clone());
    }

    if path.exists() {
        load_settings_from_path(&path);
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        if let Ok(settings) = SETTINGS.read() {
            save_settings_to_file(&settings, &path);
        }
    }
}

fn load_settings_from_path(path: &Path) {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }

                if let Ok(mut global) = SETTINGS.write() {
                    *global = settings;
                }
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

pub fn save_settings() {
    let path = SETTINGS_PATH
        .read()
        .ok()
        .and_then(|slot| slot.clone())
        .or_else(default_config_path);
    let Some(path) = path else {
        warn!("Could not determine config directory, cannot save settings");
        return;
    };

    if let Ok(settings) = SETTINGS.read() {
        save_settings_to_file(&settings, &path);
    }
}

fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = match serde_yaml::to_string(settings) {
        Ok(yaml) => format!("{SETTINGS_HEADER}{yaml}"),
        Err(e) => {
            error!("Failed to serialize settings: {e}");
            return;
        }
    };

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

const SETTINGS_HEADER: &str = r#"# wikipanes settings
#
# theme:               "Oceanic Next" or "Catppuccin Mocha"
# pane_width:          columns used by a fully shown pane
# spine_width:         columns used by a collapsed pane
# browse_url:          address prefix used when opening an article in a browser
# load_scripts:        register <script> resources found in articles
# request_timeout_secs: optional; unset means wait forever

"#;

// Public API for accessing/modifying settings

pub fn current() -> Settings {
    SETTINGS.read().map(|s| s.clone()).unwrap_or_default()
}

pub fn get_theme_name() -> String {
    SETTINGS
        .read()
        .map(|s| s.theme.clone())
        .unwrap_or_else(|_| default_theme())
}

pub fn set_theme_name(name: &str) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.theme = name.to_string();
    }
    save_settings();
}
