//! Prismic REST API v2 client

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{describe_url, ContentSource, Predicate, QueryOptions, QueryResponse, RawRecord};
use crate::config::CmsConfig;
use crate::error::{ContentFetchError, Error, Result};

/// Document types whose pages live under `/post/`
const POST_TYPES: &[&str] = &["posts", "spacetravelling"];

/// How long a looked-up master ref is reused
const MASTER_REF_TTL: Duration = Duration::from_secs(5);

/// Client for one Prismic repository
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
    timeout: Duration,
    master_cache: Mutex<Option<(String, Instant)>>,
}

/// The part of the API root document we need
#[derive(Debug, Deserialize)]
struct ApiInfo {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    ref_: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

impl PrismicClient {
    /// Build a client from the CMS settings
    pub fn new(config: &CmsConfig) -> Result<Self> {
        let timeout = config.timeout();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            timeout,
            master_cache: Mutex::new(None),
        })
    }

    /// URL of the search endpoint
    pub fn search_url(&self) -> String {
        format!("{}/documents/search", self.endpoint)
    }

    /// Query parameters for a search read at `ref_`
    fn search_params(&self, options: &QueryOptions, ref_: String) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("ref", ref_),
            ("q", options.query_string()),
            ("pageSize", options.page_size.max(1).to_string()),
        ];
        if let Some(orderings) = &options.orderings {
            params.push(("orderings", orderings.clone()));
        }
        if let Some(after) = &options.after {
            params.push(("after", after.clone()));
        }
        if let Some(token) = &self.access_token {
            params.push(("access_token", token.clone()));
        }
        params
    }

    /// Resolve the ref to read: the caller's preview ref, or the master ref
    async fn resolve_ref(&self, ref_: Option<&str>) -> Result<String> {
        match ref_ {
            Some(ref_) => Ok(ref_.to_string()),
            None => self.master_ref().await,
        }
    }

    async fn master_ref(&self) -> Result<String> {
        if let Some(ref_) = self.cached_master_ref() {
            return Ok(ref_);
        }

        let mut params = Vec::new();
        if let Some(token) = &self.access_token {
            params.push(("access_token", token.clone()));
        }
        let info: ApiInfo = self.get_json(&self.endpoint, Some(params.as_slice())).await?;
        let ref_ = info
            .refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.ref_)
            .ok_or_else(|| ContentFetchError::Decode {
                url: describe_url(&self.endpoint),
                message: "API root lists no master ref".to_string(),
            })?;

        let mut cache = self.master_cache.lock().unwrap_or_else(|e| e.into_inner());
        *cache = Some((ref_.clone(), Instant::now()));
        Ok(ref_)
    }

    fn cached_master_ref(&self) -> Option<String> {
        let cache = self.master_cache.lock().unwrap_or_else(|e| e.into_inner());
        cache
            .as_ref()
            .filter(|(_, fetched)| fetched.elapsed() < MASTER_REF_TTL)
            .map(|(ref_, _)| ref_.clone())
    }

    /// GET a URL and decode its JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: Option<&[(&str, String)]>,
    ) -> Result<T> {
        let mut request = self.http.get(url);
        if let Some(params) = params {
            request = request.query(params);
        }

        let shown = describe_url(url);
        tracing::debug!("GET {}", shown);
        let response = request
            .send()
            .await
            .map_err(|e| ContentFetchError::from_reqwest(&shown, e.without_url(), self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContentFetchError::Status {
                url: shown,
                status: status.as_u16(),
            }
            .into());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ContentFetchError::from_reqwest(&shown, e.without_url(), self.timeout))?;

        serde_json::from_slice(&body).map_err(|e| {
            ContentFetchError::Decode {
                url: shown,
                message: e.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn query(&self, options: &QueryOptions) -> Result<QueryResponse> {
        let ref_ = self.resolve_ref(options.ref_.as_deref()).await?;
        let params = self.search_params(options, ref_);
        let response: QueryResponse = self.get_json(&self.search_url(), Some(params.as_slice())).await?;
        tracing::debug!(
            "Query {} returned {} results (next page: {})",
            options.query_string(),
            response.results.len(),
            response.next_page.is_some()
        );
        Ok(response)
    }

    async fn fetch_page(&self, url: &str) -> Result<QueryResponse> {
        self.get_json(url, None).await
    }

    async fn get_by_uid(
        &self,
        document_type: &str,
        uid: &str,
        ref_: Option<&str>,
    ) -> Result<RawRecord> {
        let options = QueryOptions::new(document_type, 1)
            .with_ref(ref_.map(str::to_string))
            .predicate(Predicate::at(format!("my.{}.uid", document_type), uid));

        let response = self.query(&options).await?;
        response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("{} {}", document_type, uid)))
    }
}

/// Site path for a CMS document
pub fn link_resolver(doc_type: &str, uid: Option<&str>) -> String {
    match uid {
        Some(uid) if POST_TYPES.contains(&doc_type) => format!("/post/{}", uid),
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::fake::serve;
    use axum::extract::{Query, RawQuery};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn client(token: Option<&str>) -> PrismicClient {
        let config = CmsConfig {
            endpoint: "https://blog.cdn.prismic.io/api/v2/".to_string(),
            access_token: token.map(str::to_string),
            ..Default::default()
        };
        PrismicClient::new(&config).unwrap()
    }

    #[test]
    fn test_search_url() {
        assert_eq!(
            client(None).search_url(),
            "https://blog.cdn.prismic.io/api/v2/documents/search"
        );
    }

    #[test]
    fn test_search_params() {
        let options = QueryOptions::new("posts", 1)
            .orderings(crate::cms::ORDER_NEWEST_FIRST)
            .after("YFTk");
        let params = client(Some("tok")).search_params(&options, "master".to_string());
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("ref"), Some("master"));
        assert_eq!(get("pageSize"), Some("1"));
        assert_eq!(get("orderings"), Some("[document.first_publication_date desc]"));
        assert_eq!(get("after"), Some("YFTk"));
        assert_eq!(get("access_token"), Some("tok"));
    }

    #[test]
    fn test_search_params_without_token() {
        let params = client(None).search_params(&QueryOptions::new("posts", 3), "r".to_string());
        assert!(params.iter().all(|(k, _)| *k != "access_token"));
        assert!(params.iter().all(|(k, _)| *k != "after"));
    }

    #[test]
    fn test_api_info_decode() {
        let body = r#"{"refs":[
            {"id":"preview","ref":"abc","isMasterRef":false},
            {"id":"master","ref":"YFTl","label":"Master","isMasterRef":true}
        ]}"#;
        let info: ApiInfo = serde_json::from_str(body).unwrap();
        let master = info.refs.into_iter().find(|r| r.is_master_ref).unwrap();
        assert_eq!(master.ref_, "YFTl");
    }

    async fn client_at(app: Router, timeout_secs: u64) -> PrismicClient {
        let base = serve(app).await;
        let config = CmsConfig {
            endpoint: format!("{}/api/v2", base),
            timeout_secs,
            ..Default::default()
        };
        PrismicClient::new(&config).unwrap()
    }

    fn api_root(has_master: bool) -> Json<Value> {
        Json(json!({"refs": [{"id": "master", "ref": "YFTl", "isMasterRef": has_master}]}))
    }

    #[tokio::test]
    async fn test_query_reads_master_ref_once() {
        let lookups = Arc::new(AtomicUsize::new(0));
        let counter = lookups.clone();
        let app = Router::new()
            .route(
                "/api/v2",
                get(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { api_root(true) }
                }),
            )
            .route(
                "/api/v2/documents/search",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    Json(json!({
                        "results": [{"id": "YFTk", "uid": "hooks", "type": "posts",
                                     "data": {"title": params.get("q")}}],
                        "next_page": format!("ref={}", params.get("ref").cloned().unwrap_or_default()),
                    }))
                }),
            );
        let client = client_at(app, 10).await;

        let response = client.query(&QueryOptions::new("posts", 1)).await.unwrap();
        assert_eq!(response.next_page.as_deref(), Some("ref=YFTl"));
        assert_eq!(
            response.results[0].data.as_ref().unwrap()["title"],
            r#"[[at(document.type, "posts")]]"#
        );

        client.query(&QueryOptions::new("posts", 1)).await.unwrap();
        assert_eq!(lookups.load(Ordering::SeqCst), 1);

        let preview = QueryOptions::new("posts", 1).with_ref(Some("preview~1".to_string()));
        let response = client.query(&preview).await.unwrap();
        assert_eq!(response.next_page.as_deref(), Some("ref=preview~1"));
        assert_eq!(lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_by_uid_not_found() {
        let app = Router::new()
            .route("/api/v2", get(|| async { api_root(true) }))
            .route(
                "/api/v2/documents/search",
                get(|| async { Json(json!({"results": [], "next_page": null})) }),
            );
        let client = client_at(app, 10).await;

        let err = client.get_by_uid("posts", "missing", None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_error_status() {
        let app = Router::new().route(
            "/api/v2",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let client = client_at(app, 10).await;

        let err = client.query(&QueryOptions::new("posts", 1)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ContentFetch(ContentFetchError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let app = Router::new().route("/api/v2", get(|| async { "<html>not json</html>" }));
        let client = client_at(app, 10).await;

        let err = client.query(&QueryOptions::new("posts", 1)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ContentFetch(ContentFetchError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_master_ref() {
        let app = Router::new().route("/api/v2", get(|| async { api_root(false) }));
        let client = client_at(app, 10).await;

        match client.query(&QueryOptions::new("posts", 1)).await {
            Err(Error::ContentFetch(ContentFetchError::Decode { message, .. })) => {
                assert!(message.contains("master ref"));
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.results.len())),
        }
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let app = Router::new().route(
            "/api/v2",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                api_root(true)
            }),
        );
        let client = client_at(app, 1).await;

        let err = client.query(&QueryOptions::new("posts", 1)).await.unwrap_err();
        match err {
            Error::ContentFetch(ContentFetchError::Timeout { after, .. }) => {
                assert_eq!(after, Duration::from_secs(1));
            }
            other => panic!("expected a timeout, got {}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_page_keeps_cursor_query() {
        let app = Router::new().route(
            "/api/v2/documents/search",
            get(|RawQuery(query): RawQuery| async move {
                Json(json!({"results": [], "next_page": query}))
            }),
        );
        let base = serve(app).await;
        let client = PrismicClient::new(&CmsConfig {
            endpoint: format!("{}/api/v2", base),
            ..Default::default()
        })
        .unwrap();

        let query = "ref=YFTl~x&q=%5B%5Bat(document.type%2C+%22posts%22)%5D%5D&page=2&pageSize=1";
        let cursor = format!("{}/api/v2/documents/search?{}", base, query);
        let response = client.fetch_page(&cursor).await.unwrap();
        assert_eq!(response.next_page.as_deref(), Some(query));
    }

    #[tokio::test]
    async fn test_errors_hide_access_token() {
        let app = Router::new().route(
            "/api/v2/documents/search",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let base = serve(app).await;
        let client = PrismicClient::new(&CmsConfig {
            endpoint: format!("{}/api/v2", base),
            ..Default::default()
        })
        .unwrap();

        let cursor = format!("{}/api/v2/documents/search?access_token=secret&page=3", base);
        let err = client.fetch_page(&cursor).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("page 3"));
        assert!(!message.contains("secret"));
    }

    #[test]
    fn test_link_resolver() {
        assert_eq!(link_resolver("posts", Some("hello")), "/post/hello");
        assert_eq!(link_resolver("homepage", Some("hello")), "/");
        assert_eq!(link_resolver("posts", None), "/");
    }
}
