use std::collections::BTreeMap;

/// `rel` value Parsoid puts on links to other articles of the same wiki
pub const WIKI_LINK_REL: &str = "mw:WikiLink";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkKind {
    /// Navigable inside the app; carries the target page title
    Internal(String),
    /// Anything else. Rendered inert.
    External,
}

/// An anchor is internal only when it has the wiki-link `rel` marker and a
/// `title` attribute. The title is used verbatim as the target page.
pub fn classify(attributes: &BTreeMap<String, String>) -> LinkKind {
    let is_wiki_link = attributes
        .get("rel")
        .is_some_and(|rel| rel == WIKI_LINK_REL);

    match attributes.get("title") {
        Some(title) if is_wiki_link => LinkKind::Internal(title.clone()),
        _ => LinkKind::External,
    }
}
