pub mod accumulator;
pub mod error;
pub mod event;
#[cfg(feature = "fetch")]
pub mod fetch;
pub mod profile;
pub mod selector;
pub mod session;
pub mod stream;
pub mod text;

pub use accumulator::{AttributeProbe, BlockAccumulator};
pub use error::{LadleError, Result};
pub use event::{Attributes, EventHandler, ParseEvent, StartTag};
#[cfg(feature = "fetch")]
pub use fetch::{FetchConfig, is_infrastructure_failure, normalize_url, open_file, open_url};
pub use profile::{AttributeField, Profile, ProfileLoader, ProfileLoaderBuilder, ProfileParser, Recipe};
pub use selector::{AttributeConstraint, SelectorList, SelectorSpec};
pub use session::{
    AttributeQuery, AttributeSession, DEFAULT_CHUNK_SIZE, ExtractOptions, ExtractOptionsBuilder, Extraction,
    ExtractionSession, Extractor, Traversal,
};
#[doc(hidden)]
pub use stream::TokenStream;
pub use text::normalize;
