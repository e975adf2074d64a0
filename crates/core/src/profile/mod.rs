//! Recipe profiles: named fields mapped to selectors for a known site.
//!
//! A profile turns a page into a [`Recipe`] by extracting every field in one
//! traversal and keeping the first block of each. Text fields take the
//! normalized text of matching elements; attribute fields take one attribute
//! of the first match that carries it.

mod loader;
mod parser;

pub use loader::{ProfileLoader, ProfileLoaderBuilder};
pub use parser::ProfileParser;

use serde::Serialize;

use crate::error::Result;
use crate::selector::{SelectorList, SelectorSpec};
use crate::session::Extraction;

pub const TITLE: &str = "title";
pub const EXCERPT: &str = "excerpt";
pub const INGREDIENTS: &str = "ingredients_raw";
pub const STEPS: &str = "steps_raw";
pub const STRUCTURED_DATA: &str = "structured_data";
pub const IMAGE: &str = "image_url";

/// A field read from an attribute instead of element text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeField {
    pub selectors: SelectorList,
    pub attribute: String,
}

/// Ordered field → selector mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    name: String,
    fields: Vec<(String, SelectorSpec)>,
    attribute_fields: Vec<(String, AttributeField)>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new(), attribute_fields: Vec::new() }
    }

    /// Profile for epicurious.com recipe pages.
    pub fn epicurious() -> Self {
        let fields = [
            (TITLE, "h1"),
            (EXCERPT, r#"[data-testid="BodyWrapper"]"#),
            (INGREDIENTS, r#"[data-testid="IngredientList"]"#),
            (STEPS, r#"[data-testid="InstructionsWrapper"]"#),
            (STRUCTURED_DATA, r#"script[type="application/ld+json"]"#),
        ];

        let mut profile = Profile::new("epicurious.com");
        for (field, selector) in fields {
            // Literal selectors above are always valid.
            if let Ok(spec) = SelectorSpec::parse(selector) {
                profile.insert(field, spec);
            }
        }
        if let Ok(selectors) = SelectorList::parse(r#"meta[property="og:image"]"#) {
            profile.insert_attribute(IMAGE, AttributeField { selectors, attribute: "content".to_string() });
        }
        profile
    }

    /// Built-in profile for a host, if there is one.
    pub fn builtin_for_host(host: &str) -> Option<Self> {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        if host == "epicurious.com" || host.ends_with(".epicurious.com") {
            Some(Self::epicurious())
        } else {
            None
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a field, replacing any existing field with the same name.
    pub fn add_field(&mut self, field: &str, selector: &str) -> Result<()> {
        let spec = SelectorSpec::parse(selector)?;
        self.insert(field, spec);
        Ok(())
    }

    /// Adds a field read from `attribute` of the first element matching
    /// `selectors` that carries a non-empty value.
    ///
    /// A field name is either a text field or an attribute field; adding one
    /// kind replaces the other.
    pub fn add_attribute_field(&mut self, field: &str, selectors: &str, attribute: &str) -> Result<()> {
        let selectors = SelectorList::parse(selectors)?;
        self.insert_attribute(field, AttributeField { selectors, attribute: attribute.to_ascii_lowercase() });
        Ok(())
    }

    fn insert(&mut self, field: &str, spec: SelectorSpec) {
        self.attribute_fields.retain(|(name, _)| name != field);
        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, existing)) => *existing = spec,
            None => self.fields.push((field.to_string(), spec)),
        }
    }

    fn insert_attribute(&mut self, field: &str, attribute: AttributeField) {
        self.fields.retain(|(name, _)| name != field);
        match self.attribute_fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, existing)) => *existing = attribute,
            None => self.attribute_fields.push((field.to_string(), attribute)),
        }
    }

    pub fn field(&self, field: &str) -> Option<&SelectorSpec> {
        self.fields.iter().find(|(name, _)| name == field).map(|(_, spec)| spec)
    }

    pub fn attribute_field(&self, field: &str) -> Option<&AttributeField> {
        self.attribute_fields.iter().find(|(name, _)| name == field).map(|(_, attribute)| attribute)
    }

    /// Text fields in order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &SelectorSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// Attribute fields in order.
    pub fn attribute_fields(&self) -> impl Iterator<Item = (&str, &AttributeField)> {
        self.attribute_fields.iter().map(|(name, attribute)| (name.as_str(), attribute))
    }

    fn defines(&self, field: &str) -> bool {
        self.field(field).is_some() || self.attribute_field(field).is_some()
    }

    /// Number of fields of both kinds.
    pub fn len(&self) -> usize {
        self.fields.len() + self.attribute_fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds the fields of `other` that this profile does not define yet.
    pub fn merge(&mut self, other: &Profile) {
        for (field, spec) in &other.fields {
            if !self.defines(field) {
                self.fields.push((field.clone(), spec.clone()));
            }
        }
        for (field, attribute) in &other.attribute_fields {
            if !self.defines(field) {
                self.attribute_fields.push((field.clone(), attribute.clone()));
            }
        }
    }
}

/// Flat recipe record projected from a profile extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Recipe {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub ingredients_raw: Option<String>,
    pub steps_raw: Option<String>,
    pub source_url: String,
    pub image_url: Option<String>,
}

impl Recipe {
    /// Takes the first block of each recipe field.
    pub fn from_extraction(extraction: &Extraction, source_url: &str) -> Self {
        let first = |field: &str| extraction.first(field).map(str::to_string);
        Self {
            title: first(TITLE),
            excerpt: first(EXCERPT),
            ingredients_raw: first(INGREDIENTS),
            steps_raw: first(STEPS),
            source_url: source_url.to_string(),
            image_url: first(IMAGE),
        }
    }
}
