use crate::page_head::{HeadSink, ScriptSource};
use crate::parsing::document::{Document, Element, Node};
use crate::parsing::link_classifier::{LinkKind, classify};
use crate::parsing::ui_node::{Activation, UiElement, UiNode};
use std::collections::BTreeMap;

/// Attributes that survive the transform on any element
const ALLOWED_ATTRIBUTES: &[&str] = &["style", "class", "typeof", "role", "colspan"];

/// Extra attributes allowed per tag
const TAG_ATTRIBUTES: &[(&str, &[&str])] = &[("img", &["src"])];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Which pane the tree is rendered in and which titles are open.
#[derive(Debug, Clone, Copy)]
pub struct LinkContext<'a> {
    /// Title of the pane holding the document; new panes open right after it
    pub anchor_title: &'a str,
    pub open_titles: &'a [String],
}

impl<'a> LinkContext<'a> {
    pub fn new(anchor_title: &'a str, open_titles: &'a [String]) -> Self {
        Self {
            anchor_title,
            open_titles,
        }
    }

    fn is_open(&self, title: &str) -> bool {
        self.open_titles.iter().any(|open| open == title)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// No visual representation: link, meta, base
    Ignored,
    /// Routed to the page head
    Style,
    /// Handed to the script loader, never rendered
    Script,
    Anchor,
    Void,
    Generic,
}

impl ElementKind {
    pub fn of(tag: &str) -> Self {
        match tag {
            "link" | "meta" | "base" => ElementKind::Ignored,
            "style" => ElementKind::Style,
            "script" => ElementKind::Script,
            "a" => ElementKind::Anchor,
            _ if VOID_TAGS.contains(&tag) => ElementKind::Void,
            _ => ElementKind::Generic,
        }
    }
}

/// Turns a fetched document into the abstract UI tree for one render.
///
/// Pure with respect to its inputs: the same document and context always give
/// the same tree. Style and script side effects go to `head`. A pending pane
/// passes `None` and gets an empty forest.
pub fn transform(
    doc: Option<&Document>,
    ctx: &LinkContext<'_>,
    head: &mut dyn HeadSink,
) -> Vec<UiNode> {
    match doc {
        Some(doc) => transform_children(&doc.body, ctx, head),
        None => Vec::new(),
    }
}

pub fn transform_node(node: &Node, ctx: &LinkContext<'_>, head: &mut dyn HeadSink) -> UiNode {
    match node {
        Node::Text(content) if content.trim().is_empty() => UiNode::Omitted,
        Node::Text(content) => UiNode::Text(content.clone()),
        Node::Element(element) => transform_element(element, ctx, head),
    }
}

fn transform_children(
    nodes: &[Node],
    ctx: &LinkContext<'_>,
    head: &mut dyn HeadSink,
) -> Vec<UiNode> {
    nodes
        .iter()
        .map(|node| transform_node(node, ctx, head))
        .filter(|node| !node.is_omitted())
        .collect()
}

fn transform_element(
    element: &Element,
    ctx: &LinkContext<'_>,
    head: &mut dyn HeadSink,
) -> UiNode {
    match ElementKind::of(&element.tag) {
        ElementKind::Ignored => UiNode::Omitted,
        ElementKind::Style => {
            head.inject_style(&element.text_content());
            UiNode::Omitted
        }
        ElementKind::Script => {
            let script = match element.attr("src") {
                Some(src) => ScriptSource::Src(src.to_string()),
                None => ScriptSource::Inline(element.text_content()),
            };
            head.load_script(script);
            UiNode::Omitted
        }
        ElementKind::Anchor => transform_anchor(element, ctx, head),
        ElementKind::Void => UiNode::Element(UiElement {
            tag: element.tag.clone(),
            attributes: allowed_attributes(element),
            children: None,
            on_activate: None,
            highlighted: false,
        }),
        ElementKind::Generic => UiNode::Element(UiElement {
            tag: element.tag.clone(),
            attributes: allowed_attributes(element),
            children: Some(transform_children(&element.children, ctx, head)),
            on_activate: None,
            highlighted: false,
        }),
    }
}

fn transform_anchor(
    element: &Element,
    ctx: &LinkContext<'_>,
    head: &mut dyn HeadSink,
) -> UiNode {
    let children = Some(transform_children(&element.children, ctx, head));
    let mut attributes = allowed_attributes(element);

    match classify(&element.attributes) {
        LinkKind::Internal(target) => {
            attributes.insert("title".to_string(), target.clone());
            let highlighted = ctx.is_open(&target);
            UiNode::Element(UiElement {
                tag: element.tag.clone(),
                attributes,
                children,
                on_activate: Some(Activation::InsertAfter {
                    anchor: ctx.anchor_title.to_string(),
                    target,
                }),
                highlighted,
            })
        }
        // No href is carried over, so the anchor goes nowhere
        LinkKind::External => UiNode::Element(UiElement {
            tag: element.tag.clone(),
            attributes,
            children,
            on_activate: None,
            highlighted: false,
        }),
    }
}

fn allowed_attributes(element: &Element) -> BTreeMap<String, String> {
    let tag_extra = TAG_ATTRIBUTES
        .iter()
        .find(|(tag, _)| *tag == element.tag)
        .map(|(_, names)| *names)
        .unwrap_or(&[]);

    element
        .attributes
        .iter()
        .filter(|(name, _)| {
            ALLOWED_ATTRIBUTES.contains(&name.as_str()) || tag_extra.contains(&name.as_str())
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_head::{NullHead, PageHead};

    fn ctx<'a>(open: &'a [String]) -> LinkContext<'a> {
        LinkContext::new("Cat", open)
    }

    fn doc(body: Vec<Node>) -> Document {
        Document::new("Cat", body)
    }

    #[test]
    fn whitespace_text_is_omitted() {
        let open = Vec::new();
        let node = transform_node(&Node::text("  \n\t "), &ctx(&open), &mut NullHead);
        assert_eq!(node, UiNode::Omitted);

        let out = transform(Some(&doc(vec![Node::text("\n   \n")])), &ctx(&open), &mut NullHead);
        assert!(out.is_empty());
    }

    #[test]
    fn text_with_content_is_kept_verbatim() {
        let open = Vec::new();
        let node = transform_node(&Node::text("  a  "), &ctx(&open), &mut NullHead);
        assert_eq!(node, UiNode::Text("  a  ".to_string()));
    }

    #[test]
    fn pending_document_gives_empty_forest() {
        let open = Vec::new();
        assert!(transform(None, &ctx(&open), &mut NullHead).is_empty());
    }

    #[test]
    fn ignored_tags_are_dropped() {
        let open = Vec::new();
        let body = vec![
            Element::new("link").with_attr("rel", "stylesheet").into(),
            Element::new("meta").into(),
            Element::new("base").with_attr("href", "/").into(),
            Element::new("p").with_child(Node::text("kept")).into(),
        ];
        let out = transform(Some(&doc(body)), &ctx(&open), &mut NullHead);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_element().unwrap().tag, "p");
    }

    #[test]
    fn style_goes_to_head() {
        let open = Vec::new();
        let mut head = PageHead::new(false);
        let body = vec![Element::new("style").with_child(Node::text(".x{}")).into()];
        let out = transform(Some(&doc(body)), &ctx(&open), &mut head);

        assert!(out.is_empty());
        assert_eq!(head.styles(), [".x{}".to_string()]);
    }

    #[test]
    fn script_is_loaded_not_rendered() {
        let open = Vec::new();
        let mut head = PageHead::new(true);
        let body = vec![
            Element::new("script").with_attr("src", "/a.js").into(),
            Element::new("script").with_child(Node::text("var x;")).into(),
        ];
        let out = transform(Some(&doc(body)), &ctx(&open), &mut head);

        assert!(out.is_empty());
        assert_eq!(
            head.scripts(),
            [
                ScriptSource::Src("/a.js".to_string()),
                ScriptSource::Inline("var x;".to_string())
            ]
        );
    }

    #[test]
    fn attributes_outside_allow_list_are_dropped() {
        let open = Vec::new();
        let body = vec![
            Element::new("div")
                .with_attr("class", "infobox")
                .with_attr("onclick", "evil()")
                .with_attr("id", "x")
                .with_attr("src", "nope")
                .into(),
        ];
        let out = transform(Some(&doc(body)), &ctx(&open), &mut NullHead);
        let div = out[0].as_element().unwrap();

        assert_eq!(div.attr("class"), Some("infobox"));
        assert_eq!(div.attributes.len(), 1);
    }

    #[test]
    fn img_keeps_src_and_has_no_children() {
        let open = Vec::new();
        let body = vec![
            Element::new("img")
                .with_attr("src", "//upload/cat.png")
                .with_attr("alt", "cat")
                .with_child(Node::text("stray"))
                .into(),
        ];
        let out = transform(Some(&doc(body)), &ctx(&open), &mut NullHead);
        let img = out[0].as_element().unwrap();

        assert_eq!(img.attr("src"), Some("//upload/cat.png"));
        assert!(img.attr("alt").is_none());
        assert!(img.is_void());
    }

    #[test]
    fn internal_link_gets_activation() {
        let open = vec!["Cat".to_string()];
        let body = vec![
            Element::new("a")
                .with_attr("rel", "mw:WikiLink")
                .with_attr("title", "Dog")
                .with_attr("href", "./Dog")
                .with_child(Node::text("dogs"))
                .into(),
        ];
        let out = transform(Some(&doc(body)), &ctx(&open), &mut NullHead);
        let anchor = out[0].as_element().unwrap();

        assert_eq!(
            anchor.on_activate,
            Some(Activation::InsertAfter {
                anchor: "Cat".to_string(),
                target: "Dog".to_string()
            })
        );
        assert!(!anchor.highlighted);
        assert!(anchor.attr("href").is_none());
        assert_eq!(anchor.children(), [UiNode::Text("dogs".to_string())]);
    }

    #[test]
    fn link_to_open_page_is_highlighted() {
        let open = vec!["Cat".to_string(), "Dog".to_string()];
        let body = vec![
            Element::new("a")
                .with_attr("rel", "mw:WikiLink")
                .with_attr("title", "Dog")
                .into(),
        ];
        let out = transform(Some(&doc(body)), &ctx(&open), &mut NullHead);
        assert!(out[0].as_element().unwrap().highlighted);
    }

    #[test]
    fn external_link_is_inert() {
        let open = Vec::new();
        let body = vec![
            Element::new("a")
                .with_attr("rel", "mw:ExtLink")
                .with_attr("href", "https://example.com")
                .with_attr("title", "Example")
                .with_child(Node::text("example"))
                .into(),
        ];
        let out = transform(Some(&doc(body)), &ctx(&open), &mut NullHead);
        let anchor = out[0].as_element().unwrap();

        assert!(anchor.on_activate.is_none());
        assert!(anchor.attr("href").is_none());
        assert!(!anchor.highlighted);
    }

    #[test]
    fn transform_is_repeatable() {
        let open = vec!["Cat".to_string()];
        let parsed = Document::parse(
            r#"<html><head><title>Cat</title></head><body>
                <section><p>The <b>cat</b> is a <a rel="mw:WikiLink" title="Mammal">mammal</a>.</p>
                <br></section></body></html>"#,
        );

        let first = transform(Some(&parsed), &ctx(&open), &mut NullHead);
        let second = transform(Some(&parsed), &ctx(&open), &mut NullHead);
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }
}
