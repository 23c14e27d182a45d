//! List published posts

use anyhow::Result;
use std::io::Write;
use std::sync::Arc;

use crate::cms::ContentSource;
use crate::config::SiteConfig;
use crate::content::PostSummary;
use crate::helpers::format_date;
use crate::pages::load_home;
use crate::Blog;

/// Print the listing; with `all`, keep loading pages until the CMS runs out
pub async fn run(blog: &Blog, all: bool) -> Result<()> {
    let stdout = std::io::stdout();
    list_posts(blog.source()?, &blog.config, all, &mut stdout.lock()).await
}

pub async fn list_posts<W: Write>(
    source: Arc<dyn ContentSource>,
    config: &SiteConfig,
    all: bool,
    out: &mut W,
) -> Result<()> {
    let controller = load_home(source, config).await?;
    if all {
        while controller.has_more() {
            controller.load_more().await?;
        }
    }

    let posts = controller.posts();
    writeln!(out, "Posts ({}):", posts.len())?;
    for post in &posts {
        writeln!(out, "  {}", describe(config, post))?;
    }
    if controller.has_more() {
        writeln!(out, "More posts available (use --all to list them)")?;
    }
    Ok(())
}

fn describe(config: &SiteConfig, post: &PostSummary) -> String {
    let date = post
        .first_publication_date
        .as_ref()
        .map(|d| format_date(d, &config.date_format, &config.locale))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} - {} [{}] by {}",
        date,
        post.title,
        post.uid.as_deref().unwrap_or("-"),
        if post.author.is_empty() { "-" } else { &post.author }
    )
}
