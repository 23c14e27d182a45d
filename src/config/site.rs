//! Site configuration (_config.yml)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable overriding `cms.endpoint`
pub const ENDPOINT_ENV: &str = "PRISMIC_ENDPOINT";
/// Environment variable overriding `cms.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub language: String,

    // Date / Time format (Moment.js style)
    pub date_format: String,
    pub time_format: String,
    /// chrono locale name used for month/day names
    pub locale: String,

    // URL
    pub root: String,

    #[serde(default)]
    pub cms: CmsConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            language: "pt-BR".to_string(),

            date_format: "DD MMM YYYY".to_string(),
            time_format: "HH:mm".to_string(),
            locale: "pt_BR".to_string(),

            root: "/".to_string(),

            cms: CmsConfig::default(),
            comments: CommentsConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        Ok(config)
    }

    /// Apply `PRISMIC_ENDPOINT` / `PRISMIC_ACCESS_TOKEN` from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(ACCESS_TOKEN_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            tracing::debug!("CMS endpoint overridden from {}", ENDPOINT_ENV);
            self.cms.endpoint = endpoint;
        }
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            tracing::debug!("CMS access token overridden from {}", ACCESS_TOKEN_ENV);
            self.cms.access_token = Some(token);
        }
    }

    /// Reject configurations that cannot reach a CMS
    pub fn validate(&self) -> Result<()> {
        if self.cms.endpoint.trim().is_empty() {
            return Err(Error::Config(format!(
                "cms.endpoint is empty (set it in _config.yml or {})",
                ENDPOINT_ENV
            )));
        }
        if !self.cms.endpoint.starts_with("http://") && !self.cms.endpoint.starts_with("https://")
        {
            return Err(Error::Config(format!(
                "cms.endpoint must be an http(s) URL, got {}",
                self.cms.endpoint
            )));
        }
        if self.cms.page_size == 0 {
            return Err(Error::Config("cms.page_size must be at least 1".to_string()));
        }
        if self.cms.document_type.trim().is_empty() {
            return Err(Error::Config("cms.document_type is empty".to_string()));
        }
        Ok(())
    }
}

/// Headless CMS connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// Prismic API v2 root, e.g. `https://repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Custom type holding the blog posts
    pub document_type: String,
    /// Posts per listing page
    pub page_size: usize,
    pub timeout_secs: u64,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "posts".to_string(),
            page_size: 1,
            timeout_secs: 10,
        }
    }
}

impl CmsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// utterances comment widget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    pub enable: bool,
    pub repo: String,
    pub issue_term: String,
    pub theme: String,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            enable: false,
            repo: String::new(),
            issue_term: "pathname".to_string(),
            theme: "github-dark".to_string(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub ip: String,
    pub port: u16,
    /// Listing page views kept in memory before the oldest is dropped
    pub max_views: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: "localhost".to_string(),
            port: 3000,
            max_views: 256,
        }
    }
}
