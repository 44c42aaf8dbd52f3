pub mod document;
pub mod link_classifier;
pub mod transformer;
pub mod ui_node;

pub use document::{Document, Element, Node};
pub use link_classifier::{LinkKind, WIKI_LINK_REL, classify};
pub use transformer::{ElementKind, LinkContext, transform};
pub use ui_node::{Activation, UiElement, UiNode};
