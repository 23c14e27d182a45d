//! Headless CMS access
//!
//! [`ContentSource`] is the seam between the blog and the CMS. The production
//! implementation is [`PrismicClient`]; tests use an in-memory fake.

mod prismic;

pub use prismic::{link_resolver, PrismicClient};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::error::{ContentFetchError, Result};

/// Orders by publication date, newest first
pub const ORDER_NEWEST_FIRST: &str = "[document.first_publication_date desc]";
/// Orders by publication date, oldest first
pub const ORDER_OLDEST_FIRST: &str = "[document.first_publication_date]";

/// One document as returned by the CMS. `data` stays untyped until normalized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type", default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub last_publication_date: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// A page of search results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub total_pages: usize,
    #[serde(default)]
    pub total_results_size: usize,
    pub results: Vec<RawRecord>,
    /// Complete URL of the next page, `None` on the last page
    #[serde(default)]
    pub next_page: Option<String>,
}

/// A single query predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `at(path, "value")`
    At { path: String, value: String },
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::At {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Render in the Prismic query language
    pub fn render(&self) -> String {
        match self {
            Self::At { path, value } => {
                let value = value.replace('\\', "\\\\").replace('"', "\\\"");
                format!("[at({}, \"{}\")]", path, value)
            }
        }
    }
}

/// Options for [`ContentSource::query`]
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub document_type: String,
    pub page_size: usize,
    pub orderings: Option<String>,
    /// Document id; results start strictly after it in `orderings`
    pub after: Option<String>,
    /// Content release to read; the master ref when absent
    pub ref_: Option<String>,
    /// Extra predicates besides the document type filter
    pub predicates: Vec<Predicate>,
}

impl QueryOptions {
    pub fn new(document_type: impl Into<String>, page_size: usize) -> Self {
        Self {
            document_type: document_type.into(),
            page_size,
            ..Default::default()
        }
    }

    pub fn orderings(mut self, orderings: impl Into<String>) -> Self {
        self.orderings = Some(orderings.into());
        self
    }

    pub fn after(mut self, id: impl Into<String>) -> Self {
        self.after = Some(id.into());
        self
    }

    pub fn with_ref(mut self, ref_: Option<String>) -> Self {
        self.ref_ = ref_;
        self
    }

    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// The full `q` parameter: the type filter followed by extra predicates
    pub fn query_string(&self) -> String {
        let mut q = String::from("[");
        q.push_str(&Predicate::at("document.type", &self.document_type).render());
        for predicate in &self.predicates {
            q.push_str(&predicate.render());
        }
        q.push(']');
        q
    }
}

/// Read access to the CMS
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Run a search and return one page of results
    async fn query(&self, options: &QueryOptions) -> Result<QueryResponse>;

    /// Fetch a page by its cursor URL, exactly as the CMS handed it out
    async fn fetch_page(&self, url: &str) -> Result<QueryResponse>;

    /// Fetch the single document of `document_type` with the given uid
    async fn get_by_uid(
        &self,
        document_type: &str,
        uid: &str,
        ref_: Option<&str>,
    ) -> Result<RawRecord>;
}

/// Run a CMS call, failing with [`ContentFetchError::Timeout`] once `limit` passes
pub async fn with_timeout<T>(
    limit: Duration,
    what: &str,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, call).await.map_err(|_| {
        ContentFetchError::Timeout {
            url: what.to_string(),
            after: limit,
        }
    })?
}

/// Short form of a CMS URL for logs and errors
///
/// Query parameters are dropped, since cursors repeat the request's
/// `access_token`; only the page number is kept.
pub fn describe_url(url: &str) -> String {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return "<invalid url>".to_string();
    };
    let base = format!("{}{}", parsed.host_str().unwrap_or_default(), parsed.path());
    match parsed.query_pairs().find(|(key, _)| key == "page") {
        Some((_, page)) => format!("{} page {}", base, page),
        None => base,
    }
}
