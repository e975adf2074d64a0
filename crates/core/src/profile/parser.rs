use crate::error::{LadleError, Result};
use crate::profile::Profile;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Profile file parser.
///
/// Files hold one `field: selector` pair per line. Blank lines and lines
/// starting with `#` are skipped. A line ending in `@name` reads the `name`
/// attribute instead of text, and its selector may be a comma-separated list:
///
/// ```text
/// title: h1
/// image_url: meta[property="og:image"], img.hero @content
/// ```
#[derive(Debug)]
pub struct ProfileParser;

impl ProfileParser {
    /// Parse a single profile file, named after the file stem
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Profile> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| LadleError::ProfileError(format!("Cannot open file {}: {}", path.display(), e)))?;

        let name = path.file_stem().map(|stem| stem.to_string_lossy().trim_start_matches('.').to_string());
        Self::parse_reader(name.unwrap_or_default(), BufReader::new(file))
    }

    /// Parse a profile from a reader
    pub fn parse_reader<R: BufRead>(name: impl Into<String>, reader: R) -> Result<Profile> {
        let mut profile = Profile::new(name);

        for (index, line) in reader.lines().enumerate() {
            let line_number = index + 1;
            let line =
                line.map_err(|e| LadleError::ProfileError(format!("Read error at line {}: {}", line_number, e)))?;
            parse_line(&mut profile, &line, line_number)?;
        }

        ensure_fields(profile)
    }

    /// Parse a profile from a string
    pub fn parse_string(name: impl Into<String>, content: &str) -> Result<Profile> {
        let mut profile = Profile::new(name);

        for (index, line) in content.lines().enumerate() {
            parse_line(&mut profile, line, index + 1)?;
        }

        ensure_fields(profile)
    }
}

fn ensure_fields(profile: Profile) -> Result<Profile> {
    if profile.is_empty() {
        return Err(LadleError::ProfileError(format!("Profile `{}` defines no fields", profile.name())));
    }
    Ok(profile)
}

fn parse_line(profile: &mut Profile, line: &str, line_number: usize) -> Result<()> {
    let line = line.trim();

    if line.is_empty() || line.starts_with('#') {
        return Ok(());
    }

    let Some((field, selector)) = line.split_once(':') else {
        return Err(LadleError::ProfileError(format!(
            "Parse error at line {}: expected `field: selector`",
            line_number
        )));
    };

    let field = field.trim();
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(LadleError::ProfileError(format!(
            "Parse error at line {}: invalid field name `{}`",
            line_number, field
        )));
    }

    let added = match attribute_suffix(selector) {
        Some((selectors, attribute)) => profile.add_attribute_field(field, selectors, attribute),
        None => profile.add_field(field, selector),
    };
    added.map_err(|e| LadleError::ProfileError(format!("Parse error at line {}: {}", line_number, e)))
}

/// Splits `selectors @attribute`; an `@` inside an attribute selector such as
/// `[href="a@b"]` leaves quotes or brackets in the tail and is not a suffix.
fn attribute_suffix(selector: &str) -> Option<(&str, &str)> {
    let (selectors, attribute) = selector.rsplit_once('@')?;
    let attribute = attribute.trim();
    let is_name = !attribute.is_empty()
        && attribute.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'));
    is_name.then_some((selectors, attribute))
}
