//! Simple CSS selectors and the matcher that evaluates them on open tags.
//!
//! Only compound selectors are supported: an optional type selector (`h1`,
//! `*`) followed by any number of `#id`, `.class`, `[attr]` and
//! `[attr=value]` parts. Combinators, pseudo-classes and the other attribute
//! operators are rejected when the selector is parsed, so a selector set is
//! known to be valid before any input is read.
//!
//! ```rust
//! use ladle_core::{Attributes, SelectorSpec};
//!
//! let spec = SelectorSpec::parse(r#"div[data-testid="IngredientList"]"#).unwrap();
//! let attrs: Attributes = [("data-testid", "IngredientList")].into_iter().collect();
//! assert!(spec.matches("div", &attrs));
//! assert!(!spec.matches("ul", &attrs));
//! ```

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::{LadleError, Result};
use crate::event::Attributes;

/// A required attribute, optionally with the exact value it must have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeConstraint {
    pub name: String,
    pub value: Option<String>,
}

/// A parsed compound selector.
///
/// Identity is the literal (trimmed) selector string it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorSpec {
    source: String,
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeConstraint>,
}

impl SelectorSpec {
    /// Parses a single compound selector.
    pub fn parse(selector: &str) -> Result<Self> {
        let source = selector.trim();
        if source.is_empty() {
            return Err(LadleError::invalid_selector(selector, "selector is empty"));
        }

        let mut spec = SelectorSpec {
            source: source.to_string(),
            tag: None,
            id: None,
            classes: Vec::new(),
            attributes: Vec::new(),
        };
        let mut chars = source.char_indices().peekable();

        match chars.peek() {
            Some((_, '*')) => {
                chars.next();
            }
            Some(&(_, c)) if is_ident_char(c) => {
                spec.tag = Some(read_ident(&mut chars).to_ascii_lowercase());
            }
            _ => {}
        }

        while let Some((_, c)) = chars.next() {
            match c {
                '#' => {
                    let id = read_ident(&mut chars);
                    if id.is_empty() {
                        return Err(LadleError::invalid_selector(source, "expected an id after `#`"));
                    }
                    if spec.id.is_some() {
                        return Err(LadleError::invalid_selector(source, "only one id is allowed"));
                    }
                    spec.id = Some(id);
                }
                '.' => {
                    let class = read_ident(&mut chars);
                    if class.is_empty() {
                        return Err(LadleError::invalid_selector(source, "expected a class name after `.`"));
                    }
                    spec.classes.push(class);
                }
                '[' => spec.attributes.push(parse_attribute(source, &mut chars)?),
                ':' => return Err(LadleError::invalid_selector(source, "pseudo-classes are not supported")),
                '>' | '+' | '~' => return Err(LadleError::invalid_selector(source, "combinators are not supported")),
                c if c.is_whitespace() => {
                    return Err(LadleError::invalid_selector(source, "combinators are not supported"));
                }
                ',' => {
                    return Err(LadleError::invalid_selector(
                        source,
                        "selector lists must be split into single selectors",
                    ));
                }
                '*' => return Err(LadleError::invalid_selector(source, "`*` is only allowed as the type selector")),
                c => return Err(LadleError::invalid_selector(source, format!("unexpected character `{c}`"))),
            }
        }

        Ok(spec)
    }

    /// The selector string this spec was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether an element with this tag name and these attributes matches.
    pub fn matches(&self, tag: &str, attributes: &Attributes) -> bool {
        if let Some(expected) = &self.tag
            && !expected.eq_ignore_ascii_case(tag)
        {
            return false;
        }

        if let Some(id) = &self.id
            && attributes.get("id") != Some(id.as_str())
        {
            return false;
        }

        if !self.classes.is_empty() {
            let Some(class) = attributes.get("class") else {
                return false;
            };
            if !self.classes.iter().all(|wanted| class.split_ascii_whitespace().any(|c| c == wanted)) {
                return false;
            }
        }

        self.attributes.iter().all(|constraint| match (&constraint.value, attributes.get(&constraint.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => expected == actual,
        })
    }
}

impl fmt::Display for SelectorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for SelectorSpec {
    type Err = LadleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(chars: &mut Peekable<CharIndices<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    ident
}

fn skip_whitespace(chars: &mut Peekable<CharIndices<'_>>) {
    while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
}

/// Parses the inside of `[...]`; the opening bracket is already consumed.
fn parse_attribute(source: &str, chars: &mut Peekable<CharIndices<'_>>) -> Result<AttributeConstraint> {
    skip_whitespace(chars);
    let name = read_ident(chars).to_ascii_lowercase();
    if name.is_empty() {
        return Err(LadleError::invalid_selector(source, "expected an attribute name after `[`"));
    }
    skip_whitespace(chars);

    let value = match chars.next() {
        Some((_, ']')) => return Ok(AttributeConstraint { name, value: None }),
        Some((_, '=')) => {
            skip_whitespace(chars);
            match chars.peek() {
                Some(&(_, quote @ ('"' | '\''))) => {
                    chars.next();
                    let mut value = String::new();
                    loop {
                        match chars.next() {
                            Some((_, c)) if c == quote => break,
                            Some((_, c)) => value.push(c),
                            None => return Err(LadleError::invalid_selector(source, "unterminated quoted value")),
                        }
                    }
                    value
                }
                _ => {
                    let value = read_ident(chars);
                    if value.is_empty() {
                        return Err(LadleError::invalid_selector(source, "expected an attribute value after `=`"));
                    }
                    value
                }
            }
        }
        Some((_, op @ ('~' | '|' | '^' | '$' | '*'))) => {
            return Err(LadleError::invalid_selector(
                source,
                format!("attribute operator `{op}=` is not supported"),
            ));
        }
        _ => return Err(LadleError::invalid_selector(source, "malformed attribute selector")),
    };

    skip_whitespace(chars);
    match chars.next() {
        Some((_, ']')) => Ok(AttributeConstraint { name, value: Some(value) }),
        _ => Err(LadleError::invalid_selector(source, "expected `]` to close the attribute selector")),
    }
}

/// An ordered, de-duplicated set of selectors registered for one extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    specs: Vec<SelectorSpec>,
}

impl SelectorList {
    /// Parses a comma-separated selector list such as `"h1, .summary"`.
    ///
    /// Entries are trimmed and repeated selectors are kept once, at their
    /// first position.
    pub fn parse(list: &str) -> Result<Self> {
        if list.trim().is_empty() {
            return Err(LadleError::invalid_selector(list, "selector list is empty"));
        }
        Self::from_selectors(split_list(list))
    }

    /// Builds a list from individual selector strings.
    pub fn from_selectors<I, S>(selectors: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut specs: Vec<SelectorSpec> = Vec::new();
        for selector in selectors {
            let spec = SelectorSpec::parse(selector.as_ref())?;
            if !specs.iter().any(|existing| existing.as_str() == spec.as_str()) {
                specs.push(spec);
            }
        }

        if specs.is_empty() {
            return Err(LadleError::invalid_selector("", "selector list is empty"));
        }

        Ok(Self { specs })
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SelectorSpec> {
        self.specs.iter()
    }
}

/// Splits on the commas that separate selectors, leaving commas inside
/// `[...]` and quoted values alone.
fn split_list(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut in_brackets = false;

    for (index, c) in list.char_indices() {
        match quote {
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' if in_brackets => quote = Some(c),
                '[' => in_brackets = true,
                ']' => in_brackets = false,
                ',' if !in_brackets => {
                    parts.push(&list[start..index]);
                    start = index + 1;
                }
                _ => {}
            },
        }
    }

    parts.push(&list[start..]);
    parts
}

impl<'a> IntoIterator for &'a SelectorList {
    type Item = &'a SelectorSpec;
    type IntoIter = std::slice::Iter<'a, SelectorSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs.iter().copied().collect()
    }

    #[rstest]
    #[case("h1", "h1", &[], true)]
    #[case("H1", "h1", &[], true)]
    #[case("h1", "h2", &[], false)]
    #[case("*", "section", &[], true)]
    #[case(r#"[data-testid="BodyWrapper"]"#, "div", &[("data-testid", "BodyWrapper")], true)]
    #[case(r#"[data-testid="BodyWrapper"]"#, "div", &[("data-testid", "bodywrapper")], false)]
    #[case("[data-testid='IngredientList']", "ul", &[("data-testid", "IngredientList")], true)]
    #[case("[data-testid=IngredientList]", "ul", &[("data-testid", "IngredientList")], true)]
    #[case("[hidden]", "p", &[("hidden", "")], true)]
    #[case("[hidden]", "p", &[], false)]
    #[case("#main", "div", &[("id", "main")], true)]
    #[case("#main", "div", &[("id", "main-content")], false)]
    #[case(".step", "li", &[("class", "recipe step  active")], true)]
    #[case(".step", "li", &[("class", "steps")], false)]
    #[case("li.step.active", "li", &[("class", "active step")], true)]
    #[case("li.step.active", "li", &[("class", "step")], false)]
    #[case(r#"script[type="application/ld+json"]"#, "script", &[("type", "application/ld+json")], true)]
    #[case(r#"img#hero.wide[src="a.jpg"]"#, "img", &[("id", "hero"), ("class", "wide"), ("src", "a.jpg")], true)]
    fn test_matches(#[case] selector: &str, #[case] tag: &str, #[case] pairs: &[(&str, &str)], #[case] expected: bool) {
        let spec = SelectorSpec::parse(selector).unwrap();
        assert_eq!(spec.matches(tag, &attrs(pairs)), expected, "{selector} on <{tag}>");
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("div p")]
    #[case("div > p")]
    #[case("h1 + p")]
    #[case("p:first-child")]
    #[case("[data-testid")]
    #[case("[data-testid=\"x]")]
    #[case("[class~=step]")]
    #[case("[=x]")]
    #[case("#")]
    #[case(".")]
    #[case("#a#b")]
    #[case("h1,h2")]
    #[case("div*")]
    fn test_rejects_unsupported(#[case] selector: &str) {
        let result = SelectorSpec::parse(selector);
        assert!(
            matches!(result, Err(LadleError::InvalidSelector { .. })),
            "expected `{selector}` to be rejected"
        );
    }

    #[test]
    fn test_identity_is_trimmed_literal() {
        let spec = SelectorSpec::parse("  [data-testid=\"X\"] ").unwrap();
        assert_eq!(spec.as_str(), "[data-testid=\"X\"]");
        assert_eq!(spec.to_string(), "[data-testid=\"X\"]");
    }

    #[test]
    fn test_quoted_value_keeps_spaces() {
        let spec = SelectorSpec::parse(r#"[title="Spicy Soup"]"#).unwrap();
        assert!(spec.matches("a", &attrs(&[("title", "Spicy Soup")])));
    }

    #[test]
    fn test_list_splits_trims_and_dedups() {
        let list = SelectorList::parse("h1, p ,h1,  .note").unwrap();
        let selectors: Vec<&str> = list.iter().map(SelectorSpec::as_str).collect();
        assert_eq!(selectors, vec!["h1", "p", ".note"]);
    }

    #[test]
    fn test_list_keeps_commas_inside_attribute_values() {
        let list = SelectorList::parse(r#"h1, [title="a,b"], meta[content='x, y']"#).unwrap();
        let selectors: Vec<&str> = list.iter().map(SelectorSpec::as_str).collect();
        assert_eq!(selectors, vec!["h1", r#"[title="a,b"]"#, "meta[content='x, y']"]);

        let spec = list.iter().nth(1).unwrap();
        assert!(spec.matches("abbr", &attrs(&[("title", "a,b")])));
        assert!(!spec.matches("abbr", &attrs(&[("title", "a")])));
    }

    #[test]
    fn test_list_rejects_empty_entries() {
        assert!(SelectorList::parse("").is_err());
        assert!(SelectorList::parse("h1,,p").is_err());
        assert!(SelectorList::from_selectors(Vec::<&str>::new()).is_err());
    }

    #[test]
    fn test_list_reports_offending_selector() {
        match SelectorList::parse("h1, div p") {
            Err(LadleError::InvalidSelector { selector, .. }) => assert_eq!(selector, "div p"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
