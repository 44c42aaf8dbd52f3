// Export modules for use in tests
pub mod event_source;
pub mod main_app;
pub mod page_head;
pub mod panes;
pub mod panic_handler;
pub mod parsing;
pub mod search;
pub mod settings;
pub mod theme;
pub mod widget;
pub mod wiki_client;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main app components
pub use main_app::{ActivePopup, App, AppAction, run_app_with_event_source};
