//! Extraction sessions: one forward traversal of an HTML stream against a
//! fixed set of selectors.
//!
//! # Example
//!
//! ```rust
//! use ladle_core::Extractor;
//!
//! let extractor = Extractor::new("h1, li").unwrap();
//! let extraction = extractor.extract_str("<h1>Spicy  Noodle\nSoup</h1><li>A</li><li>B</li>").unwrap();
//!
//! assert_eq!(extraction.get("h1").unwrap(), ["Spicy Noodle Soup"]);
//! assert_eq!(extraction.get("li").unwrap(), ["A", "B"]);
//! ```
//!
//! Sessions can also be driven chunk by chunk, for example from a network
//! body. [`ExtractionSession::finish`] is the explicit drain step: it must be
//! called once every chunk has been fed, and it consumes the session.
//!
//! ```rust
//! use ladle_core::Extractor;
//!
//! let mut session = Extractor::new("p").unwrap().session();
//! session.feed(b"<p>Hel").unwrap();
//! session.feed(b"lo</p>").unwrap();
//! let extraction = session.finish().unwrap();
//! assert_eq!(extraction.first("p"), Some("Hello"));
//! ```

use std::io::{ErrorKind, Read};

use serde::Serialize;
use serde::ser::SerializeMap;

use crate::accumulator::{AttributeProbe, BlockAccumulator};
use crate::error::{LadleError, Result};
use crate::event::{EventHandler, ParseEvent};
use crate::profile::{AttributeField, Profile};
use crate::selector::{SelectorList, SelectorSpec};
use crate::stream::TokenStream;

/// Size of the buffer used when draining readers.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Options applied to every selector of an extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Append a space after every text node, so inline siblings such as
    /// `<span>Foo</span><span>Bar</span>` do not run together (default: false).
    pub spaced: bool,
}

impl ExtractOptions {
    pub fn builder() -> ExtractOptionsBuilder {
        ExtractOptionsBuilder::new()
    }
}

/// Builder for ExtractOptions.
#[derive(Debug, Default)]
pub struct ExtractOptionsBuilder {
    options: ExtractOptions,
}

impl ExtractOptionsBuilder {
    pub fn new() -> Self {
        Self { options: ExtractOptions::default() }
    }

    /// Sets whether text nodes are separated by a space.
    pub fn spaced(mut self, value: bool) -> Self {
        self.options.spaced = value;
        self
    }

    pub fn build(self) -> ExtractOptions {
        self.options
    }
}

/// Drives one [`TokenStream`] and hands every event to a handler.
///
/// A traversal reads its input exactly once, front to back, and is consumed
/// by [`Traversal::finish`]; handlers therefore never carry state from one
/// document to the next.
pub struct Traversal<H> {
    stream: TokenStream,
    handler: H,
    events: usize,
}

impl<H: EventHandler> Traversal<H> {
    pub fn new(handler: H) -> Self {
        Self { stream: TokenStream::new(), handler, events: 0 }
    }

    /// Feeds one chunk of input.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        let events = self.stream.write(chunk)?;
        tracing::trace!(bytes = chunk.len(), events = events.len(), "fed chunk");
        self.dispatch(&events);
        Ok(())
    }

    /// Ends the input, flushes the handler and returns it.
    pub fn finish(self) -> Result<H> {
        let Traversal { stream, mut handler, mut events } = self;
        let bytes = stream.bytes_written();

        for event in stream.end()? {
            handler.handle(&event);
            events += 1;
        }

        tracing::debug!(bytes, events, "traversal finished");
        Ok(handler)
    }

    /// Reads `reader` to the end, feeding every chunk, then finishes.
    ///
    /// The reader is always drained completely, even when the handler has
    /// nothing left to learn from the rest of the document. A read error
    /// aborts the traversal.
    pub fn drain_reader<R: Read>(mut self, mut reader: R, chunk_size: usize) -> Result<H> {
        let mut buffer = vec![0; chunk_size.max(1)];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => self.feed(&buffer[..read])?,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.finish()
    }

    /// Async counterpart of [`Traversal::drain_reader`].
    ///
    /// The only suspension point is the wait for the next chunk. Dropping the
    /// returned future stops the traversal and drops the reader with it.
    #[cfg(feature = "async")]
    pub async fn drain_async<R>(mut self, mut reader: R, chunk_size: usize) -> Result<H>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        use tokio::io::AsyncReadExt;

        let mut buffer = vec![0; chunk_size.max(1)];
        loop {
            let read = reader.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            self.feed(&buffer[..read])?;
        }
        self.finish()
    }

    fn dispatch(&mut self, events: &[ParseEvent]) {
        for event in events {
            self.handler.handle(event);
        }
        self.events += events.len();
    }
}

/// Ordered result of an extraction: key → normalized text blocks.
///
/// Keys are the selector strings (or profile field names) in registration
/// order. A key whose selector matched nothing maps to an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    entries: Vec<(String, Vec<String>)>,
}

impl Extraction {
    /// Blocks found for `key`, or `None` if the key was never registered.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, blocks)| blocks.as_slice())
    }

    /// First block for `key`, if any.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|blocks| blocks.first()).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(key, blocks)| (key.as_str(), blocks.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of blocks over all keys.
    pub fn block_count(&self) -> usize {
        self.entries.iter().map(|(_, blocks)| blocks.len()).sum()
    }

    pub fn into_entries(self) -> Vec<(String, Vec<String>)> {
        self.entries
    }
}

impl FromIterator<(String, Vec<String>)> for Extraction {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

impl Serialize for Extraction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, blocks) in &self.entries {
            map.serialize_entry(key, blocks)?;
        }
        map.end()
    }
}

/// Text accumulators and attribute probes sharing one traversal.
type FieldHandlers = (Vec<BlockAccumulator>, Vec<AttributeProbe>);

/// One extraction over one document, fed incrementally.
pub struct ExtractionSession {
    traversal: Traversal<FieldHandlers>,
}

impl ExtractionSession {
    fn new(handlers: FieldHandlers) -> Self {
        Self { traversal: Traversal::new(handlers) }
    }

    /// Feeds the next chunk of the document.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        self.traversal.feed(chunk)
    }

    /// Drains the traversal to completion and returns the blocks of every
    /// selector.
    pub fn finish(self) -> Result<Extraction> {
        let handlers = self.traversal.finish()?;
        Ok(into_extraction(handlers))
    }
}

/// Text fields first, then attribute fields, each in registration order.
fn into_extraction((accumulators, probes): FieldHandlers) -> Extraction {
    let extraction: Extraction = accumulators
        .into_iter()
        .map(BlockAccumulator::into_blocks)
        .chain(probes.into_iter().map(AttributeProbe::into_entry))
        .collect();
    tracing::debug!(keys = extraction.len(), blocks = extraction.block_count(), "extraction finished");
    extraction
}

/// A validated selector set plus options, reusable across documents.
///
/// Every extraction gets a fresh set of accumulators.
#[derive(Debug, Clone)]
pub struct Extractor {
    fields: Vec<(String, SelectorSpec)>,
    attribute_fields: Vec<(String, AttributeField)>,
    options: ExtractOptions,
    chunk_size: usize,
}

impl Extractor {
    /// Parses a comma-separated selector list.
    ///
    /// Fails before any input is read if one of the selectors is invalid.
    pub fn new(selectors: &str) -> Result<Self> {
        Ok(Self::from_list(SelectorList::parse(selectors)?))
    }

    /// Uses an already parsed selector list; blocks are keyed by selector.
    pub fn from_list(selectors: SelectorList) -> Self {
        let fields = selectors.iter().map(|spec| (spec.as_str().to_string(), spec.clone())).collect();
        Self {
            fields,
            attribute_fields: Vec::new(),
            options: ExtractOptions::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Uses the fields of a profile; blocks are keyed by field name.
    ///
    /// A profile without fields is rejected, since it would match nothing.
    pub fn from_profile(profile: &Profile) -> Result<Self> {
        if profile.is_empty() {
            return Err(LadleError::ProfileError(format!("Profile `{}` defines no fields", profile.name())));
        }
        let fields = profile.fields().map(|(name, spec)| (name.to_string(), spec.clone())).collect();
        let attribute_fields =
            profile.attribute_fields().map(|(name, attribute)| (name.to_string(), attribute.clone())).collect();
        Ok(Self { fields, attribute_fields, options: ExtractOptions::default(), chunk_size: DEFAULT_CHUNK_SIZE })
    }

    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Shorthand for setting [`ExtractOptions::spaced`].
    pub fn spaced(mut self, value: bool) -> Self {
        self.options.spaced = value;
        self
    }

    /// Sets the read buffer size used by the reader-driven methods.
    pub fn chunk_size(mut self, value: usize) -> Self {
        self.chunk_size = value.max(1);
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Registered keys in result order: text fields, then attribute fields.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        let attribute_keys = self.attribute_fields.iter().map(|(key, _)| key.as_str());
        self.fields.iter().map(|(key, _)| key.as_str()).chain(attribute_keys)
    }

    /// Starts a new session with fresh accumulators.
    pub fn session(&self) -> ExtractionSession {
        tracing::debug!(selectors = self.fields.len(), spaced = self.options.spaced, "starting extraction session");
        ExtractionSession::new(self.handlers())
    }

    fn handlers(&self) -> FieldHandlers {
        let accumulators = self
            .fields
            .iter()
            .map(|(key, spec)| BlockAccumulator::with_key(key.clone(), spec.clone(), self.options.spaced))
            .collect();
        let probes = self
            .attribute_fields
            .iter()
            .map(|(key, field)| AttributeProbe::with_key(key.clone(), field.selectors.clone(), &field.attribute))
            .collect();
        (accumulators, probes)
    }

    /// Extracts from a complete document held in memory.
    pub fn extract_str(&self, html: &str) -> Result<Extraction> {
        let mut session = self.session();
        session.feed(html.as_bytes())?;
        session.finish()
    }

    /// Extracts from any reader, reading it to the end.
    pub fn extract_reader<R: Read>(&self, reader: R) -> Result<Extraction> {
        tracing::debug!(selectors = self.fields.len(), spaced = self.options.spaced, "starting extraction session");
        let handlers = Traversal::new(self.handlers()).drain_reader(reader, self.chunk_size)?;
        Ok(into_extraction(handlers))
    }

    /// Extracts from an async reader, reading it to the end.
    #[cfg(feature = "async")]
    pub async fn extract_async<R>(&self, reader: R) -> Result<Extraction>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        tracing::debug!(selectors = self.fields.len(), spaced = self.options.spaced, "starting extraction session");
        let handlers = Traversal::new(self.handlers()).drain_async(reader, self.chunk_size).await?;
        Ok(into_extraction(handlers))
    }

    /// Extracts from an HTTP response body as it arrives.
    #[cfg(feature = "fetch")]
    pub async fn extract_response(&self, response: reqwest::Response) -> Result<Extraction> {
        tracing::debug!(
            selectors = self.fields.len(),
            spaced = self.options.spaced,
            url = %response.url(),
            "starting extraction session"
        );
        let handlers = Traversal::new(self.handlers()).drain_response(response).await?;
        Ok(into_extraction(handlers))
    }
}

/// One attribute lookup over one document, fed incrementally.
pub struct AttributeSession {
    traversal: Traversal<AttributeProbe>,
}

impl AttributeSession {
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        self.traversal.feed(chunk)
    }

    /// Drains the traversal and returns the attribute value (empty when no
    /// match carried a non-empty value).
    pub fn finish(self) -> Result<String> {
        Ok(self.traversal.finish()?.into_value())
    }
}

/// Returns the named attribute of the first matching element that carries
/// it with a non-empty value.
///
/// ```rust
/// use ladle_core::AttributeQuery;
///
/// let query = AttributeQuery::new("img", "src").unwrap();
/// let src = query.extract_str(r#"<img data-src="lazy.jpg"><img src="a.jpg"><img src="b.jpg">"#).unwrap();
/// assert_eq!(src, "a.jpg");
/// ```
#[derive(Debug, Clone)]
pub struct AttributeQuery {
    selectors: SelectorList,
    attribute: String,
    chunk_size: usize,
}

impl AttributeQuery {
    pub fn new(selectors: &str, attribute: &str) -> Result<Self> {
        Ok(Self::from_list(SelectorList::parse(selectors)?, attribute))
    }

    pub fn from_list(selectors: SelectorList, attribute: &str) -> Self {
        Self { selectors, attribute: attribute.to_string(), chunk_size: DEFAULT_CHUNK_SIZE }
    }

    pub fn chunk_size(mut self, value: usize) -> Self {
        self.chunk_size = value.max(1);
        self
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn session(&self) -> AttributeSession {
        AttributeSession { traversal: Traversal::new(self.probe()) }
    }

    fn probe(&self) -> AttributeProbe {
        AttributeProbe::new(self.selectors.clone(), &self.attribute)
    }

    pub fn extract_str(&self, html: &str) -> Result<String> {
        let mut session = self.session();
        session.feed(html.as_bytes())?;
        session.finish()
    }

    pub fn extract_reader<R: Read>(&self, reader: R) -> Result<String> {
        Ok(Traversal::new(self.probe()).drain_reader(reader, self.chunk_size)?.into_value())
    }

    #[cfg(feature = "async")]
    pub async fn extract_async<R>(&self, reader: R) -> Result<String>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        Ok(Traversal::new(self.probe()).drain_async(reader, self.chunk_size).await?.into_value())
    }

    #[cfg(feature = "fetch")]
    pub async fn extract_response(&self, response: reqwest::Response) -> Result<String> {
        Ok(Traversal::new(self.probe()).drain_response(response).await?.into_value())
    }
}
