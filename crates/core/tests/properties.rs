//! Property-based tests for extraction
//!
//! These tests check properties that must hold for any document:
//! - Results do not depend on how the input is split into chunks
//! - Emitted blocks are normalized and never empty
//! - A selector never yields more blocks than it has matching elements

use ladle_core::{AttributeQuery, Extractor, normalize};
use proptest::prelude::*;

/// Generate text content, including whitespace-only runs
fn text_strategy() -> impl Strategy<Value = String> {
    prop_oneof!["[a-z]{1,8}( [a-z]{1,8}){0,3}", "[ \n\t]{0,4}", "[a-zA-Z0-9 .,\n]{0,16}",]
}

/// Generate a flat element, optionally wrapping a span
fn element_strategy() -> impl Strategy<Value = String> {
    (prop_oneof!["p", "li", "div"], text_strategy(), proptest::option::of(text_strategy()), any::<bool>()).prop_map(
        |(tag, text, inner, marked)| {
            let class = if marked { r#" class="pick""# } else { "" };
            match inner {
                Some(inner) => format!("<{tag}{class}>{text}<span>{inner}</span></{tag}>"),
                None => format!("<{tag}{class}>{text}</{tag}>"),
            }
        },
    )
}

/// Generate a document body from a list of elements
fn document_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(element_strategy(), 0..12)
        .prop_map(|elements| format!("<html><body>{}</body></html>", elements.concat()))
}

fn chunked(extractor: &Extractor, html: &str, size: usize) -> ladle_core::Extraction {
    let mut session = extractor.session();
    for chunk in html.as_bytes().chunks(size) {
        session.feed(chunk).unwrap();
    }
    session.finish().unwrap()
}

proptest! {
    #[test]
    fn test_chunking_does_not_change_results(
        html in document_strategy(),
        size in 1usize..64,
        spaced in any::<bool>(),
    ) {
        let extractor = Extractor::new("p, li, span, .pick").unwrap().spaced(spaced);
        let whole = extractor.extract_str(&html).unwrap();
        prop_assert_eq!(chunked(&extractor, &html, size), whole);
    }

    #[test]
    fn test_reader_chunk_size_does_not_change_results(
        html in document_strategy(),
        size in 1usize..64,
        spaced in any::<bool>(),
    ) {
        let extractor = Extractor::new("div, span").unwrap().spaced(spaced);
        let whole = extractor.extract_str(&html).unwrap();
        let read = extractor.clone().chunk_size(size).extract_reader(html.as_bytes()).unwrap();
        prop_assert_eq!(read, whole);
    }

    #[test]
    fn test_blocks_are_normalized_and_non_empty(html in document_strategy(), spaced in any::<bool>()) {
        let extraction = Extractor::new("p, li, div, span").unwrap().spaced(spaced).extract_str(&html).unwrap();
        for (_, blocks) in extraction.iter() {
            for block in blocks {
                prop_assert!(!block.is_empty());
                prop_assert_eq!(&normalize(block), block);
            }
        }
    }

    #[test]
    fn test_block_count_bounded_by_matches(html in document_strategy()) {
        let extraction = Extractor::new("p, .pick").unwrap().extract_str(&html).unwrap();
        prop_assert!(extraction.get("p").unwrap().len() <= html.matches("<p").count());
        prop_assert!(extraction.get(".pick").unwrap().len() <= html.matches(r#"class="pick""#).count());
    }

    #[test]
    fn test_unmatched_selector_is_empty(html in document_strategy()) {
        let extraction = Extractor::new("h3").unwrap().extract_str(&html).unwrap();
        prop_assert!(extraction.get("h3").unwrap().is_empty());
        prop_assert_eq!(AttributeQuery::new("h3", "id").unwrap().extract_str(&html).unwrap(), "");
    }

    #[test]
    fn test_normalize_is_idempotent(raw in "\\PC{0,40}") {
        let once = normalize(&raw);
        prop_assert_eq!(normalize(&once), once.clone());
        prop_assert!(!once.starts_with(char::is_whitespace));
        prop_assert!(!once.ends_with(char::is_whitespace));
    }
}
