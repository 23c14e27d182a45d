//! Home listing page

use serde::Serialize;
use std::sync::Arc;

use crate::cms::{self, ContentSource, QueryOptions};
use crate::config::SiteConfig;
use crate::content::{normalize_summary, PostSummary};
use crate::error::Result;
use crate::helpers::{format_date, post_url, url_for};
use crate::pagination::PaginationController;

/// Run the initial listing query and seed a controller with it
///
/// A failure here is fatal for the page; there is nothing to show yet.
pub async fn load_home(
    source: Arc<dyn ContentSource>,
    config: &SiteConfig,
) -> Result<PaginationController> {
    let cms_config = &config.cms;
    let options = QueryOptions::new(&cms_config.document_type, cms_config.page_size);
    let response = cms::with_timeout(
        cms_config.timeout(),
        &options.query_string(),
        source.query(&options),
    )
    .await?;

    let posts = response
        .results
        .iter()
        .map(normalize_summary)
        .collect::<Result<Vec<_>>>()?;

    let controller = PaginationController::new(source, posts, response.next_page)
        .with_timeout(cms_config.timeout());
    tracing::info!(
        "Loaded {} posts for the listing (more: {})",
        controller.len(),
        controller.has_more()
    );
    Ok(controller)
}

/// One entry of the listing
#[derive(Debug, Clone, Serialize)]
pub struct PostCard {
    pub uid: Option<String>,
    pub url: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: Option<String>,
}

impl PostCard {
    fn new(config: &SiteConfig, post: &PostSummary) -> Self {
        Self {
            uid: post.uid.clone(),
            url: post.uid.as_deref().map(|uid| post_url(config, uid)),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date: post
                .first_publication_date
                .map(|d| format_date(&d, &config.date_format, &config.locale)),
        }
    }
}

/// Everything the listing template needs
#[derive(Debug, Clone, Serialize)]
pub struct HomeView {
    pub posts: Vec<PostCard>,
    pub has_more: bool,
    /// Form target of the "load more" button, when served
    pub load_more_url: Option<String>,
    /// Message of the last failed "load more"
    pub error: Option<String>,
}

/// Display model of a listing page view
pub fn home_view(
    config: &SiteConfig,
    controller: &PaginationController,
    view_id: Option<u64>,
) -> HomeView {
    let has_more = controller.has_more();
    HomeView {
        posts: controller
            .posts()
            .iter()
            .map(|post| PostCard::new(config, post))
            .collect(),
        has_more,
        load_more_url: view_id
            .filter(|_| has_more)
            .map(|id| url_for(config, &format!("views/{}/more", id))),
        error: controller.last_error(),
    }
}
