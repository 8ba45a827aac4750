//! Host seam over the live page.
//!
//! The capture core never owns a DOM. A browser host implements these
//! traits over real element handles; [`memory::MemoryDocument`] is the
//! in-process implementation used by tests and offline tooling.
//!
//! All lookups are infallible: a selector that matches nothing yields an
//! empty list or `None`, and callers treat that as "nothing to do".

pub mod memory;

/// Read access to an element handle. Handles are cheap to clone.
pub trait Element: Clone {
    /// Rendered text content of the element and its descendants.
    fn text(&self) -> String;

    fn attr(&self, name: &str) -> Option<String>;

    /// First descendant matching `selector`.
    fn select(&self, selector: &str) -> Option<Self>;
}

/// The writable surface of a chat input box.
///
/// Two field flavours exist on the supported platforms: rich editable
/// regions (content lives in the rendered text) and plain value-holding
/// fields such as `<textarea>`.
pub trait InputField {
    fn is_content_editable(&self) -> bool;

    /// Rendered text of a rich editable region.
    fn inner_text(&self) -> String;

    /// Current value of a plain field.
    fn value(&self) -> String;

    fn set_inner_text(&self, text: &str);

    fn set_value(&self, text: &str);

    /// Fire a bubbling DOM event (`input`, `change`) so page scripts see the edit.
    fn dispatch_event(&self, name: &str);

    fn focus(&self);

    /// Collapse the selection to the end of the field's content.
    fn place_caret_at_end(&self);
}

pub trait Document {
    type Node: Element + InputField;

    /// Every element matching `selector`, in document order.
    fn select_all(&self, selector: &str) -> Vec<Self::Node>;

    fn select(&self, selector: &str) -> Option<Self::Node> {
        self.select_all(selector).into_iter().next()
    }
}
