//! Configuration management
//!
//! Configuration is read from a YAML file (`config.yml` by default) and can be
//! overridden with `QUILLBLOG_*` environment variables. Every key has a
//! default, so a missing or empty file yields a runnable configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Connection URL or SQLite file path
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/quillblog.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    #[default]
    Sqlite,
    Mysql,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Maximum number of cached entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_ttl() -> u64 {
    300
}

fn default_max_capacity() -> u64 {
    10_000
}

/// Site-wide presentation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_name")]
    pub name: String,
    /// Absolute URL the site is served under, used for sitemap and feed links
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_site_description")]
    pub description: String,
    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: u32,
    #[serde(default = "default_sidebar_count")]
    pub latest_posts_count: u32,
    #[serde(default = "default_sidebar_count")]
    pub most_commented_count: u32,
    #[serde(default = "default_similar_posts_count")]
    pub similar_posts_count: u32,
    #[serde(default = "default_feed_items")]
    pub feed_items: u32,
    #[serde(default = "default_feed_summary_words")]
    pub feed_summary_words: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            base_url: default_base_url(),
            description: default_site_description(),
            posts_per_page: default_posts_per_page(),
            latest_posts_count: default_sidebar_count(),
            most_commented_count: default_sidebar_count(),
            similar_posts_count: default_similar_posts_count(),
            feed_items: default_feed_items(),
            feed_summary_words: default_feed_summary_words(),
        }
    }
}

fn default_site_name() -> String {
    "My Blog".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_site_description() -> String {
    "New posts of my blog.".to_string()
}

fn default_posts_per_page() -> u32 {
    3
}

fn default_sidebar_count() -> u32 {
    5
}

fn default_similar_posts_count() -> u32 {
    4
}

fn default_feed_items() -> u32 {
    5
}

fn default_feed_summary_words() -> usize {
    30
}

impl SiteConfig {
    /// Join a root-relative path onto `base_url`.
    pub fn absolute_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Outgoing mail settings
///
/// Without `smtp_host` mail is written to the log instead of being sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    #[serde(default = "default_from_address")]
    pub from_address: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            from_address: default_from_address(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_address() -> String {
    "noreply@localhost".to_string()
}

/// Template configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Directory whose templates override the built-in ones
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Staff session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_session_days")]
    pub session_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_days: default_session_days(),
        }
    }
}

fn default_session_days() -> i64 {
    7
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file.
    ///
    /// A missing or blank file yields the defaults. Malformed YAML is an error
    /// that reports the line and column.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file, then apply environment overrides:
    ///
    /// - QUILLBLOG_SERVER_HOST, QUILLBLOG_SERVER_PORT
    /// - QUILLBLOG_DATABASE_DRIVER, QUILLBLOG_DATABASE_URL
    /// - QUILLBLOG_CACHE_TTL_SECONDS
    /// - QUILLBLOG_SITE_NAME, QUILLBLOG_SITE_BASE_URL
    /// - QUILLBLOG_EMAIL_SMTP_HOST, QUILLBLOG_EMAIL_SMTP_PORT,
    ///   QUILLBLOG_EMAIL_SMTP_USERNAME, QUILLBLOG_EMAIL_SMTP_PASSWORD,
    ///   QUILLBLOG_EMAIL_FROM_ADDRESS
    /// - QUILLBLOG_THEME_PATH
    pub fn load_with_env(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("QUILLBLOG_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("QUILLBLOG_SERVER_PORT") {
            self.server.port = port;
        }

        if let Ok(driver) = std::env::var("QUILLBLOG_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {}
            }
        }
        if let Ok(url) = std::env::var("QUILLBLOG_DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(ttl) = env_parse::<u64>("QUILLBLOG_CACHE_TTL_SECONDS") {
            self.cache.ttl_seconds = ttl;
        }

        if let Ok(name) = std::env::var("QUILLBLOG_SITE_NAME") {
            self.site.name = name;
        }
        if let Ok(base_url) = std::env::var("QUILLBLOG_SITE_BASE_URL") {
            self.site.base_url = base_url;
        }

        if let Ok(host) = std::env::var("QUILLBLOG_EMAIL_SMTP_HOST") {
            self.email.smtp_host = Some(host);
        }
        if let Some(port) = env_parse::<u16>("QUILLBLOG_EMAIL_SMTP_PORT") {
            self.email.smtp_port = port;
        }
        if let Ok(username) = std::env::var("QUILLBLOG_EMAIL_SMTP_USERNAME") {
            self.email.smtp_username = Some(username);
        }
        if let Ok(password) = std::env::var("QUILLBLOG_EMAIL_SMTP_PASSWORD") {
            self.email.smtp_password = Some(password);
        }
        if let Ok(from) = std::env::var("QUILLBLOG_EMAIL_FROM_ADDRESS") {
            self.email.from_address = from;
        }

        if let Ok(path) = std::env::var("QUILLBLOG_THEME_PATH") {
            self.theme.path = Some(PathBuf::from(path));
        }
    }

    /// Reject settings the blog cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site.posts_per_page == 0 {
            return Err(ConfigError::ValidationError(
                "site.posts_per_page must be at least 1".to_string(),
            ));
        }
        if self.site.feed_items == 0 {
            return Err(ConfigError::ValidationError(
                "site.feed_items must be at least 1".to_string(),
            ));
        }
        if self.site.latest_posts_count == 0 {
            return Err(ConfigError::ValidationError(
                "site.latest_posts_count must be at least 1".to_string(),
            ));
        }
        let base = self.site.base_url.as_str();
        let has_host = base
            .strip_prefix("http://")
            .or_else(|| base.strip_prefix("https://"))
            .map_or(false, |rest| !rest.trim_matches('/').is_empty());
        if !has_host {
            return Err(ConfigError::ValidationError(format!(
                "site.base_url must be an absolute http(s) URL, got '{}'",
                base
            )));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Format YAML parsing error with location
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    match e.location() {
        Some(location) => format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        ),
        None => e.to_string(),
    }
}

// Tests touching QUILLBLOG_* variables share this lock.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
