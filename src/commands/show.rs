//! Print one post to the terminal

use anyhow::Result;
use std::io::Write;

use crate::cms::ContentSource;
use crate::config::SiteConfig;
use crate::pages::{load_post, post_view};
use crate::Blog;

/// Show the post with the given uid, optionally from a preview ref
pub async fn run(blog: &Blog, uid: &str, preview_ref: Option<&str>) -> Result<()> {
    let source = blog.source()?;
    let stdout = std::io::stdout();
    show_post(source.as_ref(), &blog.config, uid, preview_ref, &mut stdout.lock()).await
}

pub async fn show_post<W: Write>(
    source: &dyn ContentSource,
    config: &SiteConfig,
    uid: &str,
    preview_ref: Option<&str>,
    out: &mut W,
) -> Result<()> {
    let page = load_post(source, config, uid, preview_ref).await?;
    let view = post_view(config, &page);

    writeln!(out, "{}", view.title)?;
    if !view.subtitle.is_empty() {
        writeln!(out, "{}", view.subtitle)?;
    }
    writeln!(
        out,
        "{} | {} | {} min",
        view.date.as_deref().unwrap_or("-"),
        if view.author.is_empty() { "-" } else { &view.author },
        view.reading_minutes
    )?;
    if let (Some(date), Some(time)) = (&view.edited_date, &view.edited_time) {
        writeln!(out, "* editado em {}, às {}", date, time)?;
    }
    if view.preview {
        writeln!(out, "[preview]")?;
    }

    for section in &page.post.content {
        writeln!(out)?;
        if !section.heading.is_empty() {
            writeln!(out, "## {}", section.heading)?;
        }
        for block in &section.body {
            if !block.text().is_empty() {
                writeln!(out, "{}", block.text())?;
            }
        }
    }

    writeln!(out)?;
    if let Some(prev) = &view.prev_post {
        writeln!(out, "Post anterior: {} ({})", prev.title, prev.url)?;
    }
    if let Some(next) = &view.next_post {
        writeln!(out, "Próximo post: {} ({})", next.title, next.url)?;
    }
    Ok(())
}
