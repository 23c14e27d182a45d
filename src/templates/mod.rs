//! Page templates using the Tera template engine
//!
//! Templates are embedded in the binary. Autoescaping is on; rendered post
//! bodies and URLs built by the helpers are marked safe in the templates.

use serde::Serialize;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::error::Result;
use crate::pages::{HomeView, PostView};

/// Template renderer with the embedded pages loaded
pub struct TemplateRenderer {
    tera: Tera,
    site: SiteData,
}

/// Site-wide values available to every template as `site`
#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub language: String,
    pub root: String,
    pub version: String,
}

/// An error page
#[derive(Debug, Clone, Serialize)]
pub struct ErrorData {
    pub status: u16,
    pub message: String,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("layout.html")),
            ("home.html", include_str!("home.html")),
            ("post.html", include_str!("post.html")),
            ("error.html", include_str!("error.html")),
        ])?;

        let site = SiteData {
            title: config.title.clone(),
            language: config.language.clone(),
            root: crate::helpers::url_for(config, "/"),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        Ok(Self { tera, site })
    }

    fn context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site);
        context
    }

    /// Render the listing page
    pub fn render_home(&self, home: &HomeView) -> Result<String> {
        let mut context = self.context();
        context.insert("home", home);
        Ok(self.tera.render("home.html", &context)?)
    }

    /// Render a post page
    pub fn render_post(&self, post: &PostView) -> Result<String> {
        let mut context = self.context();
        context.insert("post", post);
        Ok(self.tera.render("post.html", &context)?)
    }

    /// Render an error page
    pub fn render_error(&self, status: u16, message: &str) -> Result<String> {
        let mut context = self.context();
        context.insert(
            "error",
            &ErrorData {
                status,
                message: message.to_string(),
            },
        );
        Ok(self.tera.render("error.html", &context)?)
    }
}
