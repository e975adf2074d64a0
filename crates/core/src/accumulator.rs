//! Per-selector state machines driven by parse events.
//!
//! A [`BlockAccumulator`] splits the text found inside elements matching one
//! selector into discrete blocks, one per matching element. An
//! [`AttributeProbe`] records the first non-empty value of one attribute
//! among matching elements.
//! Both are created for a single traversal and consumed when it ends.

use crate::event::{EventHandler, ParseEvent};
use crate::selector::{SelectorList, SelectorSpec};
use crate::text::{has_content, normalize};

#[derive(Debug, Clone, PartialEq, Eq)]
enum BlockState {
    /// No matching element seen yet.
    Idle,
    /// A collection window is open; the buffer may be empty.
    Accumulating(String),
    /// The stream ended.
    Done,
}

/// Collects the text blocks of one selector during one traversal.
#[derive(Debug, Clone)]
pub struct BlockAccumulator {
    key: String,
    spec: SelectorSpec,
    spaced: bool,
    state: BlockState,
    /// One entry per open element: whether it matched.
    open: Vec<bool>,
    /// Number of matching elements currently open.
    inside: usize,
    blocks: Vec<String>,
}

impl BlockAccumulator {
    /// Creates an accumulator whose blocks are reported under the selector string.
    pub fn new(spec: SelectorSpec, spaced: bool) -> Self {
        Self::with_key(spec.as_str().to_string(), spec, spaced)
    }

    /// Creates an accumulator whose blocks are reported under `key`.
    pub fn with_key(key: impl Into<String>, spec: SelectorSpec, spaced: bool) -> Self {
        Self {
            key: key.into(),
            spec,
            spaced,
            state: BlockState::Idle,
            open: Vec::new(),
            inside: 0,
            blocks: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn selector(&self) -> &SelectorSpec {
        &self.spec
    }

    /// Whether a collection window is currently open.
    pub fn is_accumulating(&self) -> bool {
        matches!(self.state, BlockState::Accumulating(_))
    }

    pub fn is_done(&self) -> bool {
        self.state == BlockState::Done
    }

    /// Raw blocks completed so far, before normalization.
    pub fn completed(&self) -> &[String] {
        &self.blocks
    }

    /// Starts a fresh collection window, closing the previous one into a
    /// block when it holds anything besides whitespace.
    fn open_window(&mut self) {
        match std::mem::replace(&mut self.state, BlockState::Accumulating(String::new())) {
            BlockState::Accumulating(buffer) if has_content(&buffer) => self.blocks.push(buffer),
            BlockState::Done => self.state = BlockState::Done,
            _ => {}
        }
    }

    fn flush(&mut self) {
        if let BlockState::Accumulating(buffer) = std::mem::replace(&mut self.state, BlockState::Done)
            && has_content(&buffer)
        {
            self.blocks.push(buffer);
        }
    }

    /// Consumes the accumulator, returning its normalized, non-empty blocks
    /// in document order.
    ///
    /// An accumulator that never saw [`ParseEvent::StreamEnd`] is flushed first.
    pub fn into_blocks(mut self) -> (String, Vec<String>) {
        self.flush();
        let blocks = self
            .blocks
            .iter()
            .map(|raw| normalize(raw))
            .filter(|block| !block.is_empty())
            .collect();
        (self.key, blocks)
    }
}

impl EventHandler for BlockAccumulator {
    fn handle(&mut self, event: &ParseEvent) {
        if self.is_done() {
            return;
        }

        match event {
            ParseEvent::ElementOpen(tag) => {
                let matched = self.spec.matches(&tag.name, &tag.attributes);
                if matched {
                    self.open_window();
                }
                if !tag.void {
                    self.open.push(matched);
                    if matched {
                        self.inside += 1;
                    }
                }
            }
            ParseEvent::ElementClose { .. } => {
                if let Some(true) = self.open.pop() {
                    self.inside -= 1;
                }
            }
            ParseEvent::TextFragment { text, last_in_text_node } => {
                if self.inside == 0 {
                    return;
                }
                if let BlockState::Accumulating(buffer) = &mut self.state {
                    buffer.push_str(text);
                    if *last_in_text_node && self.spaced {
                        buffer.push(' ');
                    }
                }
            }
            ParseEvent::StreamEnd => self.flush(),
        }
    }
}

/// Reads one attribute from elements matching any selector of a list.
///
/// Matches that lack the attribute, or carry it empty, are skipped; the
/// first non-empty value settles the probe.
#[derive(Debug, Clone)]
pub struct AttributeProbe {
    key: String,
    selectors: SelectorList,
    attribute: String,
    found: Option<String>,
}

impl AttributeProbe {
    /// Probe keyed by the attribute name.
    pub fn new(selectors: SelectorList, attribute: &str) -> Self {
        Self::with_key(attribute.to_ascii_lowercase(), selectors, attribute)
    }

    /// Probe whose result is stored under `key`, such as a profile field name.
    pub fn with_key(key: impl Into<String>, selectors: SelectorList, attribute: &str) -> Self {
        Self { key: key.into(), selectors, attribute: attribute.to_ascii_lowercase(), found: None }
    }

    /// Whether a value has been found and matching has stopped.
    pub fn is_settled(&self) -> bool {
        self.found.is_some()
    }

    /// The attribute value, or an empty string when no match carried it.
    pub fn into_value(self) -> String {
        self.found.unwrap_or_default()
    }

    /// The key with the value as a single block, or no block when nothing
    /// was found.
    pub fn into_entry(self) -> (String, Vec<String>) {
        (self.key, self.found.into_iter().collect())
    }
}

impl EventHandler for AttributeProbe {
    fn handle(&mut self, event: &ParseEvent) {
        if self.found.is_some() {
            return;
        }
        if let ParseEvent::ElementOpen(tag) = event
            && self.selectors.iter().any(|spec| spec.matches(&tag.name, &tag.attributes))
            && let Some(value) = tag.attributes.get(&self.attribute)
            && !value.is_empty()
        {
            self.found = Some(value.to_string());
        }
    }
}
