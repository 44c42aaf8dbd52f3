use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::collections::BTreeMap;

/// A parsed article page.
///
/// The html5ever DOM is reference counted and not `Send`, so it is copied into
/// this owned tree right after parsing. That lets a worker thread parse the
/// page and hand the result to the UI thread, where it is shared behind an
/// `Arc` and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    /// Text of `<head><title>`, empty when the page has none
    pub title: String,
    /// Children of `<body>`, in document order
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Element(Element),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        collect_text(&self.children, &mut text);
        text
    }
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(content.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(content) => out.push_str(content),
            Node::Element(element) => collect_text(&element.children, out),
        }
    }
}

impl Document {
    pub fn new(title: impl Into<String>, body: Vec<Node>) -> Self {
        Self {
            title: title.into(),
            body,
        }
    }

    /// Parses a full HTML page. html5ever recovers from any malformed input,
    /// so this never fails; an empty string gives an empty document.
    pub fn parse(html: &str) -> Self {
        let dom = parse_document(RcDom::default(), Default::default()).one(html);

        let mut roots = Vec::new();
        for child in dom.document.children.borrow().iter() {
            if let Some(node) = convert_node(child) {
                roots.push(node);
            }
        }

        let html_element = roots
            .iter()
            .filter_map(Node::as_element)
            .find(|element| element.tag == "html");

        let Some(html_element) = html_element else {
            return Self::default();
        };

        let title = find_child(html_element, "head")
            .and_then(|head| find_child(head, "title"))
            .map(Element::text_content)
            .unwrap_or_default();

        let body = find_child(html_element, "body")
            .map(|body| body.children.clone())
            .unwrap_or_default();

        Self { title, body }
    }
}

fn find_child<'a>(element: &'a Element, tag: &str) -> Option<&'a Element> {
    element
        .children
        .iter()
        .filter_map(Node::as_element)
        .find(|child| child.tag == tag)
}

fn convert_node(handle: &Handle) -> Option<Node> {
    match handle.data {
        NodeData::Text { ref contents } => Some(Node::Text(contents.borrow().to_string())),
        NodeData::Element {
            ref name,
            ref attrs,
            ..
        } => {
            let mut attributes = BTreeMap::new();
            for attr in attrs.borrow().iter() {
                // First occurrence wins, matching how browsers treat duplicates
                attributes
                    .entry(attr.name.local.to_string())
                    .or_insert_with(|| attr.value.to_string());
            }

            let children = handle
                .children
                .borrow()
                .iter()
                .filter_map(convert_node)
                .collect();

            Some(Node::Element(Element {
                tag: name.local.to_string(),
                attributes,
                children,
            }))
        }
        // Comments, doctypes and processing instructions carry nothing renderable
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_title_and_body_children() {
        let doc = Document::parse(
            "<html><head><title>Cat</title></head><body><p>Hello</p><p>World</p></body></html>",
        );

        assert_eq!(doc.title, "Cat");
        assert_eq!(doc.body.len(), 2);
        let first = doc.body[0].as_element().unwrap();
        assert_eq!(first.tag, "p");
        assert_eq!(first.text_content(), "Hello");
    }

    #[test]
    fn empty_input_gives_empty_document() {
        let doc = Document::parse("");
        assert_eq!(doc.title, "");
        assert!(doc.body.is_empty());
    }

    #[test]
    fn keeps_attributes_and_drops_comments() {
        let doc = Document::parse(
            r#"<body><!-- note --><a rel="mw:WikiLink" title="Dog" href="./Dog">dog</a></body>"#,
        );

        assert_eq!(doc.body.len(), 1);
        let anchor = doc.body[0].as_element().unwrap();
        assert_eq!(anchor.tag, "a");
        assert_eq!(anchor.attr("rel"), Some("mw:WikiLink"));
        assert_eq!(anchor.attr("title"), Some("Dog"));
    }

    #[test]
    fn preserves_whitespace_text_nodes() {
        let doc = Document::parse("<body><p>a</p>\n  <p>b</p></body>");

        assert_eq!(doc.body.len(), 3);
        assert_eq!(doc.body[1], Node::text("\n  "));
    }
}
