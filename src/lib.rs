//! spacetraveling: a blog front-end for a Prismic repository
//!
//! Posts are read from the CMS on demand and rendered with Tera templates.
//! The listing pages through the CMS with a cursor; each post page shows its
//! reading time and links to the neighbouring posts.

pub mod cms;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod helpers;
pub mod pages;
pub mod pagination;
pub mod server;
pub mod templates;

use std::path::Path;
use std::sync::Arc;

use crate::cms::{ContentSource, PrismicClient};
use crate::error::Result;

/// The blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: std::path::PathBuf,
}

impl Blog {
    /// Load `_config.yml` from `base_dir` (defaults when absent), then the environment
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No _config.yml in {:?}, using defaults", base_dir);
            config::SiteConfig::default()
        };
        config.apply_env();
        config.validate()?;

        Ok(Self { config, base_dir })
    }

    /// A CMS client for the configured repository
    pub fn source(&self) -> Result<Arc<dyn ContentSource>> {
        Ok(Arc::new(PrismicClient::new(&self.config.cms)?))
    }
}
