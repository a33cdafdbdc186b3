pub mod fragment;

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub use fragment::{escape, fragment};

/// Handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Click,
    DoubleClick,
}

/// Interaction handler bound to an element. Receives the whole document so it
/// can mutate any node, the way a page script would.
pub type Listener = Rc<dyn Fn(&mut Document)>;

/// The minimal capability the report needs from a UI tree. The filter toggles
/// only go through this; the renderer and stats bar build on [`Document`].
pub trait Container {
    /// Attach `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    fn append_child(&mut self, parent: NodeId, child: NodeId);

    fn set_visible(&mut self, node: NodeId, visible: bool);

    fn is_visible(&self, node: NodeId) -> bool;

    /// Add (`on == true`) or remove a class token.
    fn set_class(&mut self, node: NodeId, class: &str, on: bool);

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    /// Descendants of `scope` carrying every class in `classes`, in document
    /// order.
    fn elements_with_classes(&self, scope: NodeId, classes: &[&str]) -> Vec<NodeId>;
}

#[derive(Debug, Clone)]
enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    /// Attributes in insertion order; the class list lives in `class`.
    attrs: Vec<(String, String)>,
    visible: bool,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(k, _)| k != name);
    }

    fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// In-memory document: an arena of element and text nodes under a `<body>`.
pub struct Document {
    nodes: Vec<Node>,
    body: NodeId,
    listeners: HashMap<(NodeId, Trigger), Vec<Listener>>,
    location: Option<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            body: NodeId(0),
            listeners: HashMap::new(),
            location: None,
        };
        doc.body = doc.create_element("body");
        doc
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.add_node(NodeData::Element(Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            visible: true,
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.add_node(NodeData::Text(text.into()))
    }

    fn add_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn element(&self, id: NodeId) -> Option<&Element> {
        match self.node(id)?.data {
            NodeData::Element(ref el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id.0)?.data {
            NodeData::Element(ref mut el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            el.set_attr(name, value);
        }
    }

    pub fn classes(&self, id: NodeId) -> Vec<&str> {
        self.element(id)
            .map(|el| el.classes().collect())
            .unwrap_or_default()
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            if node == ancestor {
                return true;
            }
            cursor = self.parent(node);
        }
        false
    }

    /// Whether the node is reachable from `<body>`.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.body, id)
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if self.parent(child) != Some(parent) {
            return;
        }
        self.nodes[parent.0].children.retain(|&c| c != child);
        self.nodes[child.0].parent = None;
    }

    /// Replace the node's children with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if self.element(id).is_none() {
            return;
        }
        for child in self.nodes[id.0].children.clone() {
            self.nodes[child.0].parent = None;
        }
        self.nodes[id.0].children.clear();
        let text = self.create_text(text);
        self.append_child(id, text);
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        match node.data {
            NodeData::Text(ref text) => out.push_str(text),
            NodeData::Element(_) => {
                for &child in &node.children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Depth-first descendants of `scope`, excluding `scope` itself.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Connected element with the given id attribute.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        std::iter::once(self.body)
            .chain(self.descendants(self.body))
            .find(|&n| self.attr(n, "id") == Some(id))
    }

    pub fn first_by_tag(&self, scope: NodeId, tag: &str) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|&n| self.tag(n) == Some(tag))
    }

    pub fn on(&mut self, id: NodeId, trigger: Trigger, listener: Listener) {
        self.listeners.entry((id, trigger)).or_default().push(listener);
    }

    pub fn click(&mut self, id: NodeId) {
        self.dispatch(id, Trigger::Click);
    }

    pub fn double_click(&mut self, id: NodeId) {
        self.dispatch(id, Trigger::DoubleClick);
    }

    /// Run listeners on the target, then bubble through its ancestors.
    pub fn dispatch(&mut self, target: NodeId, trigger: Trigger) {
        let mut cursor = Some(target);
        while let Some(id) = cursor {
            let bound = self.listeners.get(&(id, trigger)).cloned();
            for listener in bound.into_iter().flatten() {
                listener(self);
            }
            cursor = self.parent(id);
        }
    }

    /// Record a navigation request. The document never leaves the page; the
    /// host decides what to do with the location.
    pub fn navigate(&mut self, url: impl Into<String>) {
        let url = url.into();
        tracing::debug!(%url, "navigation requested");
        self.location = Some(url);
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_html(child, &mut out);
        }
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        match node.data {
            NodeData::Text(ref text) => out.push_str(&escape(text)),
            NodeData::Element(ref el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attrs {
                    out.push_str(&format!(" {}=\"{}\"", name, escape(value)));
                }
                if !el.visible && el.attr("style").is_none() {
                    out.push_str(" style=\"display: none\"");
                }
                out.push('>');
                if fragment::is_void(&el.tag) {
                    return;
                }
                for &child in &node.children {
                    self.write_html(child, out);
                }
                out.push_str(&format!("</{}>", el.tag));
            }
        }
    }
}

impl Container for Document {
    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.element(parent).is_none() || self.node(child).is_none() {
            tracing::debug!(?parent, ?child, "append_child on invalid node ignored");
            return;
        }
        if self.contains(child, parent) {
            tracing::debug!(?parent, ?child, "append_child would create a cycle");
            return;
        }
        if let Some(old) = self.parent(child) {
            self.nodes[old.0].children.retain(|&c| c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) {
        if let Some(el) = self.element_mut(node) {
            el.visible = visible;
        }
    }

    fn is_visible(&self, node: NodeId) -> bool {
        self.element(node).is_none_or(|el| el.visible)
    }

    fn set_class(&mut self, node: NodeId, class: &str, on: bool) {
        let Some(el) = self.element_mut(node) else { return };
        let mut tokens: Vec<String> = el.classes().map(str::to_string).collect();
        let present = tokens.iter().any(|t| t == class);
        match (on, present) {
            (true, false) => tokens.push(class.to_string()),
            (false, true) => tokens.retain(|t| t != class),
            _ => return,
        }
        if tokens.is_empty() {
            el.remove_attr("class");
        } else {
            el.set_attr("class", &tokens.join(" "));
        }
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node)
            .is_some_and(|el| el.classes().any(|c| c == class))
    }

    fn elements_with_classes(&self, scope: NodeId, classes: &[&str]) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&n| classes.iter().all(|c| self.has_class(n, c)))
            .collect()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.len())
            .field("listeners", &self.listeners.len())
            .field("location", &self.location)
            .finish()
    }
}
