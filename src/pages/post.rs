//! Post detail page

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::cms::{self, ContentSource, QueryOptions, ORDER_NEWEST_FIRST, ORDER_OLDEST_FIRST};
use crate::config::SiteConfig;
use crate::content::{
    normalize_detail, normalize_summary, reading_minutes, render_content, NavLink, Navigation,
    PostDetail, RenderedSection,
};
use crate::error::Result;
use crate::helpers::{date_xml, format_date, post_url, url_for};

/// A post with its neighbours
#[derive(Debug, Clone)]
pub struct PostPage {
    pub post: PostDetail,
    pub navigation: Navigation,
    /// Loaded from a preview ref rather than the published content
    pub preview: bool,
}

/// Fetch a post by uid, plus its previous and next posts by publication date
///
/// `preview_ref` is forwarded verbatim to the CMS.
pub async fn load_post(
    source: &dyn ContentSource,
    config: &SiteConfig,
    uid: &str,
    preview_ref: Option<&str>,
) -> Result<PostPage> {
    let cms_config = &config.cms;
    let raw = cms::with_timeout(
        cms_config.timeout(),
        uid,
        source.get_by_uid(&cms_config.document_type, uid, preview_ref),
    )
    .await?;
    let post = normalize_detail(&raw)?;

    let navigation = match post.id.as_deref() {
        Some(id) => {
            let (prev_post, next_post) = tokio::join!(
                neighbour(source, config, id, ORDER_NEWEST_FIRST),
                neighbour(source, config, id, ORDER_OLDEST_FIRST),
            );
            Navigation {
                prev_post: prev_post?,
                next_post: next_post?,
            }
        }
        None => Navigation::default(),
    };

    tracing::debug!(
        "Loaded post {} (prev: {:?}, next: {:?})",
        uid,
        navigation.prev_post.uid,
        navigation.next_post.uid
    );

    Ok(PostPage {
        post,
        navigation,
        preview: preview_ref.is_some(),
    })
}

/// The first post after `id` in `orderings`, if any
async fn neighbour(
    source: &dyn ContentSource,
    config: &SiteConfig,
    id: &str,
    orderings: &str,
) -> Result<NavLink> {
    let options = QueryOptions::new(&config.cms.document_type, 1)
        .orderings(orderings)
        .after(id);
    let response = cms::with_timeout(
        config.cms.timeout(),
        &options.query_string(),
        source.query(&options),
    )
    .await?;

    let Some(raw) = response.results.first() else {
        return Ok(NavLink::none());
    };
    let summary = normalize_summary(raw)?;
    Ok(NavLink {
        uid: summary.uid,
        title: Some(summary.title).filter(|t| !t.is_empty()),
    })
}

/// Link to a neighbouring post
#[derive(Debug, Clone, Serialize)]
pub struct NavView {
    pub title: String,
    pub url: String,
}

impl NavView {
    fn new(config: &SiteConfig, link: &NavLink) -> Option<Self> {
        if !link.is_present() {
            return None;
        }
        let uid = link.uid.as_deref().unwrap_or_default();
        Some(Self {
            title: link.title.clone().unwrap_or_default(),
            url: post_url(config, uid),
        })
    }
}

/// utterances settings for the page
#[derive(Debug, Clone, Serialize)]
pub struct CommentsView {
    pub repo: String,
    pub issue_term: String,
    pub theme: String,
}

/// Everything the post template needs
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub uid: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: Option<String>,
    pub date: Option<String>,
    pub datetime: Option<String>,
    pub edited_date: Option<String>,
    pub edited_time: Option<String>,
    pub reading_minutes: usize,
    pub sections: Vec<RenderedSection>,
    pub prev_post: Option<NavView>,
    pub next_post: Option<NavView>,
    pub preview: bool,
    pub exit_preview_url: Option<String>,
    pub comments: Option<CommentsView>,
}

/// Display model of a post page
pub fn post_view(config: &SiteConfig, page: &PostPage) -> PostView {
    let post = &page.post;
    let sections = render_content(&post.content);
    let format =
        |pattern: &str, date: &DateTime<FixedOffset>| format_date(date, pattern, &config.locale);

    let comments = (config.comments.enable && !config.comments.repo.is_empty()).then(|| {
        CommentsView {
            repo: config.comments.repo.clone(),
            issue_term: config.comments.issue_term.clone(),
            theme: config.comments.theme.clone(),
        }
    });

    let exit_preview_url = page.preview.then(|| match post.uid.as_deref() {
        Some(uid) => post_url(config, uid),
        None => url_for(config, "/"),
    });

    PostView {
        uid: post.uid.clone(),
        title: post.title.clone(),
        subtitle: post.subtitle.clone(),
        author: post.author.clone(),
        banner_url: post.banner_url.clone(),
        date: post
            .first_publication_date
            .as_ref()
            .map(|d| format(&config.date_format, d)),
        datetime: post.first_publication_date.as_ref().map(date_xml),
        edited_date: post
            .last_publication_date
            .as_ref()
            .map(|d| format(&config.date_format, d)),
        edited_time: post
            .last_publication_date
            .as_ref()
            .map(|d| format(&config.time_format, d)),
        reading_minutes: reading_minutes(&sections),
        sections,
        prev_post: NavView::new(config, &page.navigation.prev_post),
        next_post: NavView::new(config, &page.navigation.next_post),
        preview: page.preview,
        exit_preview_url,
        comments,
    }
}
