//! HTTP server for the listing and post pages
//!
//! Each visit to `/` starts a page view: the initial listing is fetched and
//! its [`PaginationController`] is kept in a bounded registry so that "load
//! more" requests can extend it.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use indexmap::IndexMap;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tower_http::trace::TraceLayer;

use crate::cms::ContentSource;
use crate::config::SiteConfig;
use crate::error::Error;
use crate::helpers::url_for;
use crate::pages::{home_view, load_home, load_post, post_view};
use crate::pagination::PaginationController;
use crate::templates::TemplateRenderer;
use crate::Blog;

/// Live listing page views, oldest first
pub struct ViewStore {
    next_id: AtomicU64,
    views: Mutex<IndexMap<u64, Arc<PaginationController>>>,
    capacity: usize,
}

impl ViewStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            views: Mutex::new(IndexMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register a view, dropping the oldest ones beyond capacity
    pub fn insert(&self, controller: PaginationController) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut views = self.views.lock().unwrap_or_else(|e| e.into_inner());
        views.insert(id, Arc::new(controller));
        while views.len() > self.capacity {
            if let Some((old, _)) = views.shift_remove_index(0) {
                tracing::debug!("Dropped page view {}", old);
            }
        }
        id
    }

    pub fn get(&self, id: u64) -> Option<Arc<PaginationController>> {
        let views = self.views.lock().unwrap_or_else(|e| e.into_inner());
        views.get(&id).cloned()
    }

    fn len(&self) -> usize {
        self.views.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Server state
pub struct AppState {
    config: SiteConfig,
    source: Arc<dyn ContentSource>,
    renderer: TemplateRenderer,
    views: ViewStore,
}

impl AppState {
    pub fn new(config: SiteConfig, source: Arc<dyn ContentSource>) -> crate::error::Result<Self> {
        let renderer = TemplateRenderer::new(&config)?;
        let views = ViewStore::new(config.server.max_views);
        Ok(Self {
            config,
            source,
            renderer,
            views,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PostQuery {
    #[serde(rename = "ref")]
    ref_: Option<String>,
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/views/:id", get(view_handler))
        .route("/views/:id/more", post(load_more_handler))
        .route("/post/:uid", get(post_handler))
        .route("/health", get(|| async { "ok" }))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16) -> Result<()> {
    let state = Arc::new(AppState::new(blog.config.clone(), blog.source()?)?);
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn home_handler(State(state): State<Arc<AppState>>) -> Response {
    let controller = match load_home(state.source.clone(), &state.config).await {
        Ok(controller) => controller,
        Err(e) => {
            tracing::error!("Failed to load the listing: {}", e);
            return error_page(&state, &e);
        }
    };
    let id = state.views.insert(controller);
    tracing::debug!("Opened page view {} ({} live)", id, state.views.len());
    render_view(&state, id)
}

async fn view_handler(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> Response {
    render_view(&state, id)
}

async fn load_more_handler(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> Response {
    let Some(controller) = state.views.get(id) else {
        return missing_view(&state);
    };
    match controller.load_more().await {
        Ok(outcome) => {
            tracing::debug!("Page view {}: {:?}", id, outcome);
            Redirect::to(&url_for(&state.config, &format!("views/{}", id))).into_response()
        }
        // The controller keeps the error; the view shows it with the button intact
        Err(_) => render_view(&state, id),
    }
}

async fn post_handler(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Query(query): Query<PostQuery>,
) -> Response {
    let preview_ref = query.ref_.as_deref().filter(|r| !r.is_empty());
    match load_post(state.source.as_ref(), &state.config, &uid, preview_ref).await {
        Ok(page) => {
            let view = post_view(&state.config, &page);
            html_response(StatusCode::OK, state.renderer.render_post(&view))
        }
        Err(e) => {
            if !matches!(e, Error::NotFound(_)) {
                tracing::error!("Failed to load post {}: {}", uid, e);
            }
            error_page(&state, &e)
        }
    }
}

async fn not_found_handler(State(state): State<Arc<AppState>>) -> Response {
    status_page(&state, StatusCode::NOT_FOUND, "Página não encontrada")
}

fn render_view(state: &AppState, id: u64) -> Response {
    let Some(controller) = state.views.get(id) else {
        return missing_view(state);
    };
    let view = home_view(&state.config, &controller, Some(id));
    html_response(StatusCode::OK, state.renderer.render_home(&view))
}

fn missing_view(state: &AppState) -> Response {
    status_page(
        state,
        StatusCode::NOT_FOUND,
        "Esta listagem expirou. Volte para a home.",
    )
}

/// Map a load failure to its page
fn error_page(state: &AppState, err: &Error) -> Response {
    match err {
        Error::NotFound(_) => status_page(state, StatusCode::NOT_FOUND, "Post não encontrado"),
        Error::ContentFetch(_) | Error::MalformedContent(_) => status_page(
            state,
            StatusCode::BAD_GATEWAY,
            "Não foi possível carregar o conteúdo. Tente novamente mais tarde.",
        ),
        _ => status_page(
            state,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Erro interno. Tente novamente mais tarde.",
        ),
    }
}

fn status_page(state: &AppState, status: StatusCode, message: &str) -> Response {
    html_response(status, state.renderer.render_error(status.as_u16(), message))
}

fn html_response(status: StatusCode, rendered: crate::error::Result<String>) -> Response {
    match rendered {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Template rendering failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
        }
    }
}
