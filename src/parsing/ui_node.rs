use std::collections::BTreeMap;

/// What activating a navigable element should do.
///
/// Activations are plain data rather than closures: the view reports the
/// activation back to the app, which applies it to the pane stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Open `target` in a pane directly to the right of `anchor`
    InsertAfter { anchor: String, target: String },
}

impl Activation {
    pub fn target(&self) -> &str {
        match self {
            Activation::InsertAfter { target, .. } => target,
        }
    }
}

/// Output of one transform pass. Nothing here outlives a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiNode {
    Text(String),
    Element(UiElement),
    Omitted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiElement {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// `None` for void elements, which never get a children container
    pub children: Option<Vec<UiNode>>,
    pub on_activate: Option<Activation>,
    /// Set on internal links whose target is already open in some pane
    pub highlighted: bool,
}

impl UiElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn children(&self) -> &[UiNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn is_void(&self) -> bool {
        self.children.is_none()
    }
}

impl UiNode {
    pub fn is_omitted(&self) -> bool {
        matches!(self, UiNode::Omitted)
    }

    pub fn as_element(&self) -> Option<&UiElement> {
        match self {
            UiNode::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Depth-first walk collecting every activation in document order
    pub fn activations<'a>(&'a self, out: &mut Vec<&'a Activation>) {
        if let UiNode::Element(element) = self {
            if let Some(activation) = &element.on_activate {
                out.push(activation);
            }
            for child in element.children() {
                child.activations(out);
            }
        }
    }
}
