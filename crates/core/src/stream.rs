//! Tokenizing stream adapter.
//!
//! Feeds raw HTML bytes through a `lol_html` rewriter and turns its callbacks
//! into an ordered sequence of [`ParseEvent`]s. Nothing is buffered beyond
//! the events produced by the current chunk, and the rewritten output is
//! thrown away.
//!
//! The rewriter only reports end tags that are actually present in the
//! markup, so the adapter keeps its own stack of open elements: an end tag
//! closes the nearest open element with that name together with everything
//! opened after it, and whatever is still open when the input ends is closed
//! before [`ParseEvent::StreamEnd`].

use std::sync::{Arc, Mutex, PoisonError};

use lol_html::html_content::EndTag;
use lol_html::send::{EndTagHandler, HtmlRewriter, Settings};
use lol_html::{HandlerResult, doc_text, element};

use crate::error::Result;
use crate::event::{Attributes, ParseEvent, StartTag};

/// Raw callbacks as reported by the rewriter, before nesting is repaired.
enum Token {
    Open(StartTag),
    Close(String),
    Text { text: String, last_in_text_node: bool },
}

type TokenQueue = Arc<Mutex<Vec<Token>>>;

fn push(queue: &TokenQueue, token: Token) {
    queue.lock().unwrap_or_else(PoisonError::into_inner).push(token);
}

fn discard(_: &[u8]) {}

/// A single forward pass over an HTML byte stream.
pub struct TokenStream {
    rewriter: HtmlRewriter<'static, fn(&[u8])>,
    queue: TokenQueue,
    open: Vec<String>,
    bytes_written: usize,
}

impl TokenStream {
    pub fn new() -> Self {
        let queue: TokenQueue = Arc::new(Mutex::new(Vec::new()));
        let elements = Arc::clone(&queue);
        let texts = Arc::clone(&queue);

        let rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: vec![element!("*", move |el| {
                    let name = el.tag_name();
                    let attributes: Attributes = el.attributes().iter().map(|a| (a.name(), a.value())).collect();

                    match el.end_tag_handlers() {
                        Some(handlers) => {
                            push(&elements, Token::Open(StartTag::new(&name, attributes)));
                            let closes = Arc::clone(&elements);
                            handlers.push(Box::new(move |end: &mut EndTag<'_>| -> HandlerResult {
                                push(&closes, Token::Close(end.name()));
                                Ok(())
                            }) as EndTagHandler<'static>);
                        }
                        None => push(&elements, Token::Open(StartTag::void(&name, attributes))),
                    }
                    Ok(())
                })],
                document_content_handlers: vec![doc_text!(move |chunk| {
                    push(
                        &texts,
                        Token::Text { text: chunk.as_str().to_string(), last_in_text_node: chunk.last_in_text_node() },
                    );
                    Ok(())
                })],
                ..Settings::new_send()
            },
            discard as fn(&[u8]),
        );

        Self { rewriter, queue, open: Vec::new(), bytes_written: 0 }
    }

    /// Feeds the next chunk and returns the events it completed.
    ///
    /// Chunks may split tags, words or multi-byte characters anywhere.
    pub fn write(&mut self, chunk: &[u8]) -> Result<Vec<ParseEvent>> {
        self.bytes_written += chunk.len();
        self.rewriter.write(chunk)?;
        Ok(drain(&self.queue, &mut self.open))
    }

    /// Signals end of input and returns the final events, ending with
    /// [`ParseEvent::StreamEnd`].
    pub fn end(self) -> Result<Vec<ParseEvent>> {
        let TokenStream { rewriter, queue, mut open, .. } = self;
        rewriter.end()?;

        let mut events = drain(&queue, &mut open);
        events.extend(open.drain(..).rev().map(|name| ParseEvent::ElementClose { name }));
        events.push(ParseEvent::StreamEnd);
        Ok(events)
    }

    /// Total number of bytes fed so far.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Number of elements currently open.
    pub fn depth(&self) -> usize {
        self.open.len()
    }
}

impl Default for TokenStream {
    fn default() -> Self {
        Self::new()
    }
}

fn drain(queue: &TokenQueue, open: &mut Vec<String>) -> Vec<ParseEvent> {
    let tokens = std::mem::take(&mut *queue.lock().unwrap_or_else(PoisonError::into_inner));
    let mut events = Vec::with_capacity(tokens.len());

    for token in tokens {
        match token {
            Token::Open(tag) => {
                if !tag.void {
                    open.push(tag.name.clone());
                }
                events.push(ParseEvent::ElementOpen(tag));
            }
            Token::Close(name) => {
                if let Some(index) = open.iter().rposition(|open| open.eq_ignore_ascii_case(&name)) {
                    events.extend(open.drain(index..).rev().map(|name| ParseEvent::ElementClose { name }));
                }
            }
            Token::Text { text, last_in_text_node } => {
                events.push(ParseEvent::TextFragment { text, last_in_text_node });
            }
        }
    }

    events
}
