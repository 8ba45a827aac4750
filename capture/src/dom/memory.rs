//! In-memory [`Document`] for tests and offline tooling.
//!
//! There is no selector engine: a document answers only the selectors it
//! was seeded with, and a node answers only the child selectors attached
//! to it. That is enough to replay what a browser would return for the
//! platform selectors.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use super::{Document, Element, InputField};

#[derive(Debug, Default)]
pub struct MemoryDocument {
    selections: RefCell<HashMap<String, Vec<MemoryNode>>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, selector: &str, nodes: Vec<MemoryNode>) -> Self {
        self.set(selector, nodes);
        self
    }

    /// Replace what `selector` matches, e.g. after a simulated scroll.
    pub fn set(&self, selector: &str, nodes: Vec<MemoryNode>) {
        self.selections
            .borrow_mut()
            .insert(selector.to_string(), nodes);
    }

    pub fn clear(&self) {
        self.selections.borrow_mut().clear();
    }
}

impl Document for MemoryDocument {
    type Node = MemoryNode;

    fn select_all(&self, selector: &str) -> Vec<MemoryNode> {
        self.selections
            .borrow()
            .get(selector)
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct NodeState {
    text: String,
    attrs: BTreeMap<String, String>,
    children: HashMap<String, MemoryNode>,
    editable: bool,
    value: String,
    events: Vec<String>,
    focused: bool,
    caret: Option<usize>,
}

/// Shared handle to an in-memory element.
#[derive(Debug, Clone, Default)]
pub struct MemoryNode(Rc<RefCell<NodeState>>);

impl MemoryNode {
    pub fn text_node(text: impl Into<String>) -> Self {
        let node = Self::default();
        node.0.borrow_mut().text = text.into();
        node
    }

    /// A rich editable region holding `text`.
    pub fn editable(text: impl Into<String>) -> Self {
        let node = Self::text_node(text);
        node.0.borrow_mut().editable = true;
        node
    }

    /// A plain value-holding field such as a textarea.
    pub fn plain_field(value: impl Into<String>) -> Self {
        let node = Self::default();
        node.0.borrow_mut().value = value.into();
        node
    }

    pub fn with_attr(self, name: &str, value: &str) -> Self {
        self.0
            .borrow_mut()
            .attrs
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_child(self, selector: &str, child: MemoryNode) -> Self {
        self.0
            .borrow_mut()
            .children
            .insert(selector.to_string(), child);
        self
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.0.borrow_mut().text = text.into();
    }

    pub fn events(&self) -> Vec<String> {
        self.0.borrow().events.clone()
    }

    pub fn is_focused(&self) -> bool {
        self.0.borrow().focused
    }

    /// Caret offset in characters, once placed.
    pub fn caret(&self) -> Option<usize> {
        self.0.borrow().caret
    }
}

impl Element for MemoryNode {
    fn text(&self) -> String {
        self.0.borrow().text.clone()
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.0.borrow().attrs.get(name).cloned()
    }

    fn select(&self, selector: &str) -> Option<Self> {
        self.0.borrow().children.get(selector).cloned()
    }
}

impl InputField for MemoryNode {
    fn is_content_editable(&self) -> bool {
        self.0.borrow().editable
    }

    fn inner_text(&self) -> String {
        self.0.borrow().text.clone()
    }

    fn value(&self) -> String {
        self.0.borrow().value.clone()
    }

    fn set_inner_text(&self, text: &str) {
        self.0.borrow_mut().text = text.to_string();
    }

    fn set_value(&self, text: &str) {
        self.0.borrow_mut().value = text.to_string();
    }

    fn dispatch_event(&self, name: &str) {
        self.0.borrow_mut().events.push(name.to_string());
    }

    fn focus(&self) {
        self.0.borrow_mut().focused = true;
    }

    fn place_caret_at_end(&self) {
        let mut state = self.0.borrow_mut();
        let content = if state.editable {
            &state.text
        } else {
            &state.value
        };
        let end = content.chars().count();
        state.caret = Some(end);
    }
}
