//! Parse events produced by the tokenizing stream adapter.

use std::collections::HashMap;

/// Attributes of an opened element, keyed by lower-case name.
///
/// When a tag repeats an attribute the first occurrence wins, as in HTML.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(HashMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Inserts an attribute unless one with the same name is already present.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.entry(name.to_ascii_lowercase()).or_insert_with(|| value.into());
    }

    /// Looks up an attribute by name, ignoring ASCII case of the name.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(value) => Some(value.as_str()),
            None if name.bytes().any(|b| b.is_ascii_uppercase()) => {
                self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
            }
            None => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (name, value) in iter {
            attributes.insert(name.as_ref(), value);
        }
        attributes
    }
}

/// An opened element as seen by the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    /// Lower-case tag name.
    pub name: String,
    pub attributes: Attributes,
    /// Void elements (`img`, `br`, ...) never receive a matching [`ParseEvent::ElementClose`].
    pub void: bool,
}

impl StartTag {
    pub fn new(name: &str, attributes: Attributes) -> Self {
        Self { name: name.to_ascii_lowercase(), attributes, void: false }
    }

    pub fn void(name: &str, attributes: Attributes) -> Self {
        Self { void: true, ..Self::new(name, attributes) }
    }
}

/// One step of a forward traversal over an HTML stream.
///
/// The stream adapter guarantees the events are well nested: each non-void
/// `ElementOpen` is followed by exactly one `ElementClose` for it, and
/// `StreamEnd` is always the last event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    ElementOpen(StartTag),
    ElementClose { name: String },
    TextFragment { text: String, last_in_text_node: bool },
    StreamEnd,
}

impl ParseEvent {
    pub fn text(text: &str, last_in_text_node: bool) -> Self {
        ParseEvent::TextFragment { text: text.to_string(), last_in_text_node }
    }
}

/// Consumer of parse events, driven once per traversal.
pub trait EventHandler {
    fn handle(&mut self, event: &ParseEvent);
}

impl<H: EventHandler> EventHandler for Vec<H> {
    fn handle(&mut self, event: &ParseEvent) {
        for handler in self.iter_mut() {
            handler.handle(event);
        }
    }
}

impl<A: EventHandler, B: EventHandler> EventHandler for (A, B) {
    fn handle(&mut self, event: &ParseEvent) {
        self.0.handle(event);
        self.1.handle(event);
    }
}
