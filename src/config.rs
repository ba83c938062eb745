//! Configuration file parser (`config.toml` by default).
//!
//! Only `source` is required. Unknown keys are accepted by serde and logged
//! as warnings so typos do not go unnoticed.
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::category::Category;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Config is missing required key: source")]
    MissingSource,

    #[error("Invalid output format {0:?} (expected \"rss\" or \"atom\")")]
    InvalidFormat(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Serialisation used for every category endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Rss,
    Atom,
}

impl OutputFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Rss => "application/rss+xml; charset=utf-8",
            OutputFormat::Atom => "application/atom+xml; charset=utf-8",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Rss => "rss",
            OutputFormat::Atom => "atom",
        }
    }
}

/// Per-category channel overrides. Blank values keep the upstream field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CategoryMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// On-disk layout; converted to [`Config`] after validation.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct FileConfig {
    source: String,
    format: String,
    addr: String,
    timeout_secs: u64,
    user_agent: String,
    refresh_secs: u64,
    max_feed_bytes: usize,
    categories: HashMap<String, CategoryMeta>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            source: String::new(),
            format: String::new(),
            addr: String::new(),
            timeout_secs: Config::DEFAULT_TIMEOUT_SECS,
            user_agent: String::new(),
            refresh_secs: 0,
            max_feed_bytes: Config::DEFAULT_MAX_FEED_BYTES,
            categories: HashMap::new(),
        }
    }
}

/// Validated, immutable service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream locator: `http(s)://` URL, `file://` URL or plain path.
    pub source: String,
    pub format: OutputFormat,
    /// Listen address for the HTTP server.
    pub addr: String,
    /// Upstream fetch timeout.
    pub timeout: Duration,
    pub user_agent: String,
    /// Background refresh interval. Zero disables caching: every request fetches.
    pub refresh: Duration,
    /// Upper bound on upstream response bodies.
    pub max_feed_bytes: usize,
    pub categories: HashMap<Category, CategoryMeta>,
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    pub const DEFAULT_ADDR: &'static str = "0.0.0.0:8080";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
    pub const DEFAULT_USER_AGENT: &'static str = "rsssplit/1.5 (+https://example.com)";
    pub const DEFAULT_MAX_FEED_BYTES: usize = 10 * 1024 * 1024;

    /// A config with defaults for everything except the source.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            format: OutputFormat::Rss,
            addr: Self::DEFAULT_ADDR.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: Self::DEFAULT_USER_AGENT.to_string(),
            refresh: Duration::ZERO,
            max_feed_bytes: Self::DEFAULT_MAX_FEED_BYTES,
            categories: HashMap::new(),
        }
    }

    /// Overrides configured for `category`, if any.
    pub fn meta(&self, category: Category) -> Option<&CategoryMeta> {
        self.categories.get(&category)
    }

    /// True when background refresh (and therefore caching) is enabled.
    pub fn refresh_enabled(&self) -> bool {
        !self.refresh.is_zero()
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing/unreadable file → `Err(ConfigError::Io)`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Blank `source` → `Err(ConfigError::MissingSource)`
    /// - `format` other than rss/atom → `Err(ConfigError::InvalidFormat)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let meta = std::fs::metadata(path)?;
        if meta.len() > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "Config file is {} bytes (max {} bytes)",
                meta.len(),
                Self::MAX_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::info!(
            path = %path.display(),
            source = %config.source,
            format = config.format.as_str(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        // Parse as a raw table first to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "source",
                "format",
                "addr",
                "timeout_secs",
                "user_agent",
                "refresh_secs",
                "max_feed_bytes",
                "categories",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let file: FileConfig = toml::from_str(content)?;

        let source = file.source.trim();
        if source.is_empty() {
            return Err(ConfigError::MissingSource);
        }

        let format = match file.format.trim().to_ascii_lowercase().as_str() {
            "" | "rss" => OutputFormat::Rss,
            "atom" => OutputFormat::Atom,
            _ => return Err(ConfigError::InvalidFormat(file.format)),
        };

        let mut categories = HashMap::new();
        for (name, meta) in file.categories {
            match name.parse::<Category>() {
                Ok(category) => {
                    categories.insert(category, meta);
                }
                Err(_) => tracing::warn!(category = %name, "Unknown category in config file, ignoring"),
            }
        }

        let user_agent = if file.user_agent.trim().is_empty() {
            Self::DEFAULT_USER_AGENT.to_string()
        } else {
            file.user_agent
        };

        Ok(Self {
            source: source.to_string(),
            format,
            addr: normalize_addr(&file.addr),
            timeout: Duration::from_secs(file.timeout_secs),
            user_agent,
            refresh: Duration::from_secs(file.refresh_secs),
            max_feed_bytes: file.max_feed_bytes,
            categories,
        })
    }
}

/// Accepts the `:8080` shorthand for "all interfaces".
fn normalize_addr(addr: &str) -> String {
    let addr = addr.trim();
    if addr.is_empty() {
        Config::DEFAULT_ADDR.to_string()
    } else if let Some(port) = addr.strip_prefix(':') {
        format!("0.0.0.0:{port}")
    } else {
        addr.to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml("source = \"https://example.com/feed.xml\"\n").unwrap();
        assert_eq!(config.source, "https://example.com/feed.xml");
        assert_eq!(config.format, OutputFormat::Rss);
        assert_eq!(config.addr, "0.0.0.0:8080");
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert_eq!(config.user_agent, Config::DEFAULT_USER_AGENT);
        assert_eq!(config.refresh, Duration::ZERO);
        assert!(!config.refresh_enabled());
        assert_eq!(config.max_feed_bytes, 10 * 1024 * 1024);
        assert!(config.categories.is_empty());
    }

    #[test]
    fn test_full_config() {
        let content = r#"
source = "file:///srv/feed.xml"
format = "ATOM"
addr = ":9000"
timeout_secs = 5
user_agent = "test-agent"
refresh_secs = 300
max_feed_bytes = 1024

[categories.sdz]
title = "СДЗ"
description = "Только СДЗ"
image = "https://example.com/sdz.jpg"

[categories.photo]
title = "Фотодушнила"
"#;
        let config = Config::from_toml(content).unwrap();
        assert_eq!(config.format, OutputFormat::Atom);
        assert_eq!(config.addr, "0.0.0.0:9000");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.refresh, Duration::from_secs(300));
        assert!(config.refresh_enabled());
        assert_eq!(config.max_feed_bytes, 1024);

        let sdz = config.meta(Category::Sdz).unwrap();
        assert_eq!(sdz.title.as_deref(), Some("СДЗ"));
        assert_eq!(sdz.image.as_deref(), Some("https://example.com/sdz.jpg"));
        let photo = config.meta(Category::Photo).unwrap();
        assert_eq!(photo.description, None);
        assert!(config.meta(Category::Zavtracast).is_none());
    }

    #[test]
    fn test_missing_source_rejected() {
        assert!(matches!(
            Config::from_toml("format = \"rss\"\n"),
            Err(ConfigError::MissingSource)
        ));
        assert!(matches!(
            Config::from_toml("source = \"   \"\n"),
            Err(ConfigError::MissingSource)
        ));
    }

    #[test]
    fn test_invalid_format_rejected() {
        let err = Config::from_toml("source = \"x\"\nformat = \"json\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFormat(ref f) if f == "json"));
        assert!(err.to_string().contains("json"));
    }

    #[test]
    fn test_blank_user_agent_uses_default() {
        let config = Config::from_toml("source = \"x\"\nuser_agent = \"  \"\n").unwrap();
        assert_eq!(config.user_agent, Config::DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_unknown_keys_and_categories_accepted() {
        let content = r#"
source = "x"
totally_fake_key = 1

[categories.bogus]
title = "ignored"
"#;
        let config = Config::from_toml(content).unwrap();
        assert!(config.categories.is_empty());
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let result = Config::from_toml("source = \"x\"\nrefresh_secs = \"soon\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let err = Config::from_toml("this is not [valid toml").unwrap_err();
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let path = Path::new("/tmp/rsssplit_test_nonexistent_config.toml");
        assert!(matches!(Config::load(path), Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = std::env::temp_dir().join("rsssplit_config_test_load");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "source = \"feed.xml\"\nrefresh_secs = 60\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.source, "feed.xml");
        assert_eq!(config.refresh, Duration::from_secs(60));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("rsssplit_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_content_types() {
        assert_eq!(
            OutputFormat::Rss.content_type(),
            "application/rss+xml; charset=utf-8"
        );
        assert_eq!(
            OutputFormat::Atom.content_type(),
            "application/atom+xml; charset=utf-8"
        );
    }
}
