//! Headless document model.
//!
//! Stands in for the browser DOM: an ordered registry of elements, each with
//! its `data-*` attributes and the few properties the cart controls touch
//! (label, value, disabled, faded), plus page-wide state: drawer visibility,
//! scroll lock, badge counts, focus and navigation.
//!
//! Cloning a [`Document`] yields another handle to the same page. The lock is
//! never held across an await point.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use theme_cart_core::LineKey;

/// Attribute marking an item-count badge.
pub const ATTR_CART_COUNT: &str = "data-cart-count";
/// Attribute marking elements rendered from a cart snapshot.
pub const ATTR_DRAWER_CONTENT: &str = "data-drawer-content";
/// Committed value of a quantity input, as last confirmed by the server.
pub const ATTR_ORIGINAL_VALUE: &str = "data-original-value";

/// One element of the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub attrs: BTreeMap<String, String>,
    /// Text content (button label, badge count).
    pub label: String,
    /// Form value for inputs.
    pub value: Option<String>,
    pub disabled: bool,
    /// Set while a removal is pending.
    pub faded: bool,
    /// Inline error message attached to this control.
    pub error: Option<String>,
    /// Whether the element lives inside the cart drawer root.
    pub in_drawer: bool,
}

impl Element {
    /// Create an element with the given text content.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    /// Add a boolean (valueless) attribute.
    #[must_use]
    pub fn with_flag(self, name: &str) -> Self {
        self.with_attr(name, "")
    }

    /// Set the form value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Mark the element as part of the drawer.
    #[must_use]
    pub const fn inside_drawer(mut self) -> Self {
        self.in_drawer = true;
        self
    }

    /// Get an attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Whether an attribute is present.
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    /// The line this control belongs to, from `data-key`.
    #[must_use]
    pub fn line_key(&self) -> Option<LineKey> {
        self.attr("data-key")
            .filter(|k| !k.is_empty())
            .map(LineKey::new)
    }
}

/// Drawer visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawerState {
    #[default]
    Closed,
    Open,
}

#[derive(Debug, Default)]
struct DocumentState {
    elements: Vec<(String, Element)>,
    drawer: DrawerState,
    drawer_hidden: bool,
    scroll_locked: bool,
    drawer_html: String,
    drawer_error: Option<String>,
    focused: Option<String>,
    location: Option<String>,
}

impl DocumentState {
    fn position(&self, id: &str) -> Option<usize> {
        self.elements.iter().position(|(el_id, _)| el_id == id)
    }
}

/// Handle to the page.
#[derive(Debug, Clone, Default)]
pub struct Document {
    inner: Arc<Mutex<DocumentState>>,
}

impl Document {
    /// An empty page.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, DocumentState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Elements
    // =========================================================================

    /// Insert or replace an element, keeping document order on replace.
    pub fn insert(&self, id: impl Into<String>, element: Element) {
        let id = id.into();
        let mut state = self.state();
        match state.position(&id) {
            Some(pos) => state.elements[pos].1 = element,
            None => state.elements.push((id, element)),
        }
    }

    /// Snapshot of an element.
    #[must_use]
    pub fn element(&self, id: &str) -> Option<Element> {
        let state = self.state();
        state.position(id).map(|pos| state.elements[pos].1.clone())
    }

    /// Mutate an element in place. Returns `false` when it does not exist.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut Element)) -> bool {
        let mut state = self.state();
        match state.position(id) {
            Some(pos) => {
                f(&mut state.elements[pos].1);
                true
            }
            None => false,
        }
    }

    /// Mutate every element matching `predicate`. Returns the number touched.
    pub fn update_where(
        &self,
        predicate: impl Fn(&Element) -> bool,
        f: impl Fn(&mut Element),
    ) -> usize {
        let mut state = self.state();
        let mut touched = 0;
        for (_, element) in &mut state.elements {
            if predicate(element) {
                f(element);
                touched += 1;
            }
        }
        touched
    }

    /// Ids of elements matching `predicate`, in document order.
    #[must_use]
    pub fn query(&self, predicate: impl Fn(&Element) -> bool) -> Vec<String> {
        self.state()
            .elements
            .iter()
            .filter(|(_, element)| predicate(element))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Set an input's value (keystroke-level, nothing is committed).
    pub fn set_value(&self, id: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        self.update(id, |el| el.value = Some(value))
    }

    // =========================================================================
    // Badges
    // =========================================================================

    /// Write `count` into every item-count badge.
    pub fn set_badges(&self, count: u32) -> usize {
        let text = count.to_string();
        self.update_where(|el| el.has_attr(ATTR_CART_COUNT), |el| el.label.clone_from(&text))
    }

    /// Text of every item-count badge, in document order.
    #[must_use]
    pub fn badge_texts(&self) -> Vec<String> {
        self.state()
            .elements
            .iter()
            .filter(|(_, el)| el.has_attr(ATTR_CART_COUNT))
            .map(|(_, el)| el.label.clone())
            .collect()
    }

    // =========================================================================
    // Drawer
    // =========================================================================

    #[must_use]
    pub fn drawer_state(&self) -> DrawerState {
        self.state().drawer
    }

    /// Set drawer visibility and the matching scroll lock.
    pub fn set_drawer_state(&self, drawer: DrawerState) {
        let mut state = self.state();
        state.drawer = drawer;
        state.scroll_locked = drawer == DrawerState::Open;
    }

    #[must_use]
    pub fn is_drawer_hidden(&self) -> bool {
        self.state().drawer_hidden
    }

    /// Hide the drawer entirely (page-style cart).
    pub fn set_drawer_hidden(&self, hidden: bool) {
        self.state().drawer_hidden = hidden;
    }

    #[must_use]
    pub fn is_scroll_locked(&self) -> bool {
        self.state().scroll_locked
    }

    #[must_use]
    pub fn drawer_html(&self) -> String {
        self.state().drawer_html.clone()
    }

    #[must_use]
    pub fn drawer_error(&self) -> Option<String> {
        self.state().drawer_error.clone()
    }

    pub fn set_drawer_error(&self, message: Option<String>) {
        self.state().drawer_error = message;
    }

    /// Swap the drawer content for a freshly rendered snapshot.
    ///
    /// Previously rendered elements are dropped and `elements` appended. Focus
    /// stays on the focused control when the new content has one with the
    /// same id.
    ///
    /// An input holding an uncommitted edit keeps it when the new snapshot
    /// commits the same value the edit started from.
    pub fn replace_drawer_content(&self, html: String, mut elements: Vec<(String, Element)>) {
        let mut state = self.state();
        let (previous, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.elements)
            .into_iter()
            .partition(|(_, el)| el.has_attr(ATTR_DRAWER_CONTENT));

        for (id, element) in &mut elements {
            let Some((_, old)) = previous.iter().find(|(old_id, _)| old_id == id) else {
                continue;
            };
            let committed = old.attr(ATTR_ORIGINAL_VALUE).unwrap_or_default();
            let edited = old.value.as_deref().is_some_and(|v| v != committed);
            if edited && element.attr(ATTR_ORIGINAL_VALUE).unwrap_or_default() == committed {
                element.value.clone_from(&old.value);
            }
        }

        state.elements = kept;
        state.elements.extend(elements);
        state.drawer_html = html;

        if let Some(focused) = state.focused.take()
            && state.position(&focused).is_some()
        {
            state.focused = Some(focused);
        }
    }

    // =========================================================================
    // Focus and navigation
    // =========================================================================

    pub fn focus(&self, id: &str) -> bool {
        let mut state = self.state();
        if state.position(id).is_some() {
            state.focused = Some(id.to_string());
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn focused(&self) -> Option<String> {
        self.state().focused.clone()
    }

    /// Record a navigation to `url`.
    pub fn navigate(&self, url: impl Into<String>) {
        self.state().location = Some(url.into());
    }

    /// The last navigation target, if any.
    #[must_use]
    pub fn location(&self) -> Option<String> {
        self.state().location.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn badge() -> Element {
        Element::new("0").with_flag(ATTR_CART_COUNT)
    }

    #[test]
    fn test_insert_keeps_order_and_replaces_in_place() {
        let doc = Document::new();
        doc.insert("a", Element::new("A"));
        doc.insert("b", Element::new("B"));
        doc.insert("a", Element::new("A2"));

        assert_eq!(doc.query(|_| true), vec!["a", "b"]);
        assert_eq!(doc.element("a").unwrap().label, "A2");
    }

    #[test]
    fn test_set_badges_updates_every_badge() {
        let doc = Document::new();
        doc.insert("header-count", badge());
        doc.insert("button", Element::new("Add to cart"));
        doc.insert("footer-count", badge());

        assert_eq!(doc.set_badges(4), 2);
        assert_eq!(doc.badge_texts(), vec!["4", "4"]);
        assert_eq!(doc.element("button").unwrap().label, "Add to cart");
    }

    #[test]
    fn test_drawer_state_drives_scroll_lock() {
        let doc = Document::new();
        assert_eq!(doc.drawer_state(), DrawerState::Closed);
        assert!(!doc.is_scroll_locked());

        doc.set_drawer_state(DrawerState::Open);
        assert!(doc.is_scroll_locked());

        doc.set_drawer_state(DrawerState::Closed);
        assert!(!doc.is_scroll_locked());
    }

    #[test]
    fn test_replace_drawer_content_drops_previous_render() {
        let doc = Document::new();
        doc.insert("close", Element::new("x").inside_drawer());
        doc.insert(
            "line-1",
            Element::new("").with_flag(ATTR_DRAWER_CONTENT).inside_drawer(),
        );

        doc.replace_drawer_content(
            "<div></div>".to_string(),
            vec![(
                "line-2".to_string(),
                Element::new("").with_flag(ATTR_DRAWER_CONTENT).inside_drawer(),
            )],
        );

        assert!(doc.element("line-1").is_none());
        assert!(doc.element("line-2").is_some());
        assert!(doc.element("close").is_some());
        assert_eq!(doc.drawer_html(), "<div></div>");
    }

    #[test]
    fn test_focus_survives_rerender_when_control_still_exists() {
        let doc = Document::new();
        let input = || Element::new("").with_flag(ATTR_DRAWER_CONTENT);
        doc.insert("qty-a", input());
        doc.insert("qty-b", input());
        assert!(doc.focus("qty-a"));

        doc.replace_drawer_content(String::new(), vec![("qty-a".to_string(), input())]);
        assert_eq!(doc.focused().as_deref(), Some("qty-a"));

        doc.replace_drawer_content(String::new(), vec![("qty-b".to_string(), input())]);
        assert_eq!(doc.focused(), None);
    }

    #[test]
    fn test_rerender_keeps_uncommitted_edit() {
        let doc = Document::new();
        let input = |committed: &str| {
            Element::new("")
                .with_flag(ATTR_DRAWER_CONTENT)
                .with_attr(ATTR_ORIGINAL_VALUE, committed)
                .with_value(committed)
        };
        doc.insert("qty-a", input("1"));
        doc.insert("qty-b", input("1"));
        doc.set_value("qty-b", "7");

        let rerender = |a: &str, b: &str| {
            vec![
                ("qty-a".to_string(), input(a)),
                ("qty-b".to_string(), input(b)),
            ]
        };

        // Another line changed; the edit in progress survives.
        doc.replace_drawer_content(String::new(), rerender("2", "1"));
        assert_eq!(doc.element("qty-a").unwrap().value.as_deref(), Some("2"));
        assert_eq!(doc.element("qty-b").unwrap().value.as_deref(), Some("7"));

        // The server moved the line itself; its value wins.
        doc.replace_drawer_content(String::new(), rerender("2", "3"));
        assert_eq!(doc.element("qty-b").unwrap().value.as_deref(), Some("3"));
    }

    #[test]
    fn test_line_key_from_data_key() {
        let el = Element::new("+").with_attr("data-key", "1:a");
        assert_eq!(el.line_key(), Some(LineKey::new("1:a")));
        assert_eq!(Element::new("+").with_attr("data-key", "").line_key(), None);
    }
}
