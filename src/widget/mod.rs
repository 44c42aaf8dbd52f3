pub mod article_renderer;
pub mod help_popup;
pub mod hud_message;
pub mod pane_view;
pub mod search_popup;
