use crate::error::{LadleError, Result};
use crate::profile::Profile;
use crate::profile::parser::ProfileParser;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Finds the profile to use for a page by its host name.
///
/// Profile files are looked up in the custom directory first and the
/// standard directory second; fields from higher-priority files win. Hosts
/// with no profile file fall back to the built-in profiles.
#[derive(Debug, Clone)]
pub struct ProfileLoader {
    /// Custom profile directory path
    custom_dir: Option<PathBuf>,
    /// Standard profile directory path
    standard_dir: Option<PathBuf>,
    /// Per-host cache, including misses
    cache: HashMap<String, Option<Profile>>,
}

impl ProfileLoader {
    /// Create a loader with no directories; only built-in profiles resolve
    pub fn new() -> Self {
        Self { custom_dir: None, standard_dir: None, cache: HashMap::new() }
    }

    pub fn builder() -> ProfileLoaderBuilder {
        ProfileLoaderBuilder::new()
    }

    /// Load the profile for a URL
    pub fn load_for_url(&mut self, url: &str) -> Result<Option<Profile>> {
        let host = extract_host(url)?;
        self.load_for_host(&host)
    }

    /// Load the profile for a host name
    pub fn load_for_host(&mut self, host: &str) -> Result<Option<Profile>> {
        let host = host.to_ascii_lowercase();
        if let Some(profile) = self.cache.get(&host) {
            return Ok(profile.clone());
        }

        let mut merged: Option<Profile> = None;

        for file_path in self.find_profile_files(&host) {
            match ProfileParser::parse_file(&file_path) {
                Ok(profile) => match merged.as_mut() {
                    Some(existing) => existing.merge(&profile),
                    None => merged = Some(profile),
                },
                Err(e) => tracing::warn!(path = %file_path.display(), error = %e, "skipping unreadable profile"),
            }
        }

        let profile = merged.or_else(|| Profile::builtin_for_host(&host));
        tracing::debug!(
            host = %host,
            profile = profile.as_ref().map(Profile::name).unwrap_or("none"),
            "resolved profile"
        );

        self.cache.insert(host, profile.clone());
        Ok(profile)
    }

    /// Find all profile files for a host in priority order
    fn find_profile_files(&self, host: &str) -> Vec<PathBuf> {
        let names = self.generate_profile_names(host);
        let mut files = Vec::new();

        for dir in [&self.custom_dir, &self.standard_dir].into_iter().flatten() {
            for name in &names {
                let file_path = dir.join(name);
                if file_path.exists() && !files.contains(&file_path) {
                    files.push(file_path);
                }
            }
        }

        files
    }

    /// Generate possible profile file names for a host, most specific first
    fn generate_profile_names(&self, host: &str) -> Vec<String> {
        let mut names = vec![format!("{}.txt", host)];

        if let Some(without_www) = host.strip_prefix("www.") {
            names.push(format!("{}.txt", without_www));
        }

        let parts: Vec<&str> = host.split('.').collect();
        for i in 0..parts.len().saturating_sub(1) {
            let parent = parts[i..].join(".");
            if parent.contains('.') {
                names.push(format!(".{}.txt", parent));
            }
        }

        names
    }

    /// Clear the profile cache
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

fn extract_host(url: &str) -> Result<String> {
    let url = url::Url::parse(url).map_err(|e| LadleError::InvalidUrl(e.to_string()))?;

    url.host_str()
        .map(str::to_string)
        .ok_or_else(|| LadleError::InvalidUrl("No host found in URL".to_string()))
}

/// Builder for ProfileLoader
#[derive(Debug, Default)]
pub struct ProfileLoaderBuilder {
    custom_dir: Option<PathBuf>,
    standard_dir: Option<PathBuf>,
}

impl ProfileLoaderBuilder {
    pub fn new() -> Self {
        Self { custom_dir: None, standard_dir: None }
    }

    /// Set custom profile directory
    pub fn custom_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.custom_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set standard profile directory
    pub fn standard_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.standard_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn build(self) -> ProfileLoader {
        ProfileLoader { custom_dir: self.custom_dir, standard_dir: self.standard_dir, cache: HashMap::new() }
    }
}

impl Default for ProfileLoader {
    /// Uses `<config dir>/ladle/profiles` and `<data dir>/ladle/profiles`.
    fn default() -> Self {
        let mut builder = ProfileLoaderBuilder::new();

        if let Some(config_dir) = dirs::config_dir() {
            builder = builder.custom_dir(config_dir.join("ladle").join("profiles"));
        }

        if let Some(data_dir) = dirs::data_dir() {
            builder = builder.standard_dir(data_dir.join("ladle").join("profiles"));
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_dirs() {
        let loader = ProfileLoader::default();
        assert_eq!(loader.custom_dir, dirs::config_dir().map(|dir| dir.join("ladle").join("profiles")));
        assert_eq!(loader.standard_dir, dirs::data_dir().map(|dir| dir.join("ladle").join("profiles")));
    }

    #[test]
    fn test_generate_profile_names() {
        let loader = ProfileLoader::new();
        let names = loader.generate_profile_names("www.example.com");
        assert_eq!(
            names,
            vec!["www.example.com.txt", "example.com.txt", ".www.example.com.txt", ".example.com.txt"]
        );
    }

    #[test]
    fn test_generate_profile_names_stops_before_tld() {
        let loader = ProfileLoader::new();
        let names = loader.generate_profile_names("news.bbc.co.uk");

        assert!(names.contains(&"news.bbc.co.uk.txt".to_string()));
        assert!(names.contains(&".bbc.co.uk.txt".to_string()));
        assert!(!names.iter().any(|n| n == "uk.txt" || n == ".uk.txt"));
    }

    #[test]
    fn test_extract_host() {
        assert_eq!(extract_host("https://www.epicurious.com/recipes/x").unwrap(), "www.epicurious.com");
        assert!(matches!(extract_host("not a url"), Err(LadleError::InvalidUrl(_))));
    }

    #[test]
    fn test_load_from_custom_dir() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("example.com.txt"), "title: h1.title\nsteps_raw: ol\n").unwrap();

        let mut loader = ProfileLoader::builder().custom_dir(temp_dir.path()).build();
        let profile = loader.load_for_url("https://www.example.com/pasta").unwrap().unwrap();

        assert_eq!(profile.field("title").unwrap().as_str(), "h1.title");
        assert_eq!(profile.field("steps_raw").unwrap().as_str(), "ol");
    }

    #[test]
    fn test_wildcard_profile_matches_subdomains() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".example.com.txt"), "title: h1\n").unwrap();

        let mut loader = ProfileLoader::builder().custom_dir(temp_dir.path()).build();
        assert!(loader.load_for_host("cooking.example.com").unwrap().is_some());
    }

    #[test]
    fn test_custom_overrides_standard() {
        let temp_dir = TempDir::new().unwrap();
        let custom = temp_dir.path().join("custom");
        let standard = temp_dir.path().join("standard");
        fs::create_dir_all(&custom).unwrap();
        fs::create_dir_all(&standard).unwrap();
        fs::write(custom.join("example.com.txt"), "title: .headline\n").unwrap();
        fs::write(standard.join("example.com.txt"), "title: h1\nexcerpt: .dek\n").unwrap();

        let mut loader = ProfileLoader::builder().custom_dir(&custom).standard_dir(&standard).build();
        let profile = loader.load_for_host("example.com").unwrap().unwrap();

        assert_eq!(profile.field("title").unwrap().as_str(), ".headline");
        assert_eq!(profile.field("excerpt").unwrap().as_str(), ".dek");
    }

    #[test]
    fn test_falls_back_to_builtin() {
        let temp_dir = TempDir::new().unwrap();
        let mut loader = ProfileLoader::builder().custom_dir(temp_dir.path()).build();

        let profile = loader.load_for_url("https://www.epicurious.com/recipes/food/views/soup").unwrap();
        assert_eq!(profile.unwrap().name(), "epicurious.com");
        assert!(loader.load_for_host("example.org").unwrap().is_none());
    }

    #[test]
    fn test_broken_file_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("example.com.txt"), "title h1\n").unwrap();

        let mut loader = ProfileLoader::builder().custom_dir(temp_dir.path()).build();
        assert!(loader.load_for_host("example.com").unwrap().is_none());
    }

    #[test]
    fn test_profile_caching() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("example.com.txt");
        fs::write(&path, "title: h1\n").unwrap();

        let mut loader = ProfileLoader::builder().custom_dir(temp_dir.path()).build();
        let first = loader.load_for_host("example.com").unwrap();
        fs::remove_file(&path).unwrap();
        let second = loader.load_for_host("example.com").unwrap();

        assert_eq!(first, second);
        assert_eq!(loader.cache.len(), 1);

        loader.clear_cache();
        assert!(loader.load_for_host("example.com").unwrap().is_none());
    }
}
