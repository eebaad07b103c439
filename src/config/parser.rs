use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at start-up so runs can be matched to the settings they used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[credentials]
username = "harvester"
email = "harvester@example.com"
password = "hunter2"

[browser]
webdriver-url = "http://localhost:4444"
headless = true

[scraping]
scroll-delay-min-ms = 100
scroll-delay-max-ms = 200
max-items-per-session = 0
overlap-threshold = 3

[timeouts]
page-load = 1000

[output]
data-dir = "./harvest-data"

[filters]
languages = ["en", "de"]
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.credentials.username, "harvester");
        assert_eq!(config.browser.webdriver_url, "http://localhost:4444");
        assert!(config.browser.headless);
        assert_eq!(config.scraping.overlap_threshold, 3);
        assert_eq!(config.scraping.session_cap(), None);
        assert_eq!(config.timeouts.page_load, 1000);
        // untouched keys keep their defaults
        assert_eq!(config.timeouts.short_wait, 5000);
        assert_eq!(config.scraping.max_attempts_without_new, 50);
        assert_eq!(config.output.data_dir, "./harvest-data");
        assert_eq!(config.filters.languages, vec!["en", "de"]);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let file = create_temp_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.scraping.session_cap(), Some(800));
        assert_eq!(config.browser.base_url, "https://x.com");
        assert_eq!(config.retry.max_attempts, 4);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/harvest.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[scraping]
scroll-delay-min-ms = 5000
scroll-delay-max-ms = 1000
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let file = create_temp_config("[credentials]\nusername = \"a\"\npassword = \"secret\"\n");
        let config = load_config(file.path()).unwrap();
        let debug = format!("{:?}", config.credentials);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("REDACTED"));
    }
}
