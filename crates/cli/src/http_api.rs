use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{Response as HttpResponse, StatusCode},
    response::Response,
    routing::{get, post},
    Router,
};
use nexus_library::{Library, ResolveError, ResourceKind};
use nexus_protocol::{ErrorBody, HealthResponse, RescanResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

const BOOK_NOT_FOUND: &str = "Book not found";
const GRAPH_NOT_AVAILABLE: &str = "Graph not available for this book";
const GRAPH_READ_FAILED: &str = "Error reading graph data";
const DASHBOARD_NOT_AVAILABLE: &str = "Dashboard not available for this book";
const DASHBOARD_READ_FAILED: &str = "Error reading dashboard data";
const CHAPTER_NOT_AVAILABLE: &str = "Chapter not available for this book";
const CHAPTER_READ_FAILED: &str = "Error reading chapter data";

pub struct HttpState {
    pub library: Arc<Library>,
    pub environment: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChapterQuery {
    chapter: Option<String>,
}

pub fn router(state: Arc<HttpState>, cors: bool) -> Router {
    let router = Router::new()
        .route("/api/books", get(list_books))
        .route("/api/books/:book_id/graphs", get(list_graphs))
        .route("/api/books/:book_id/resources", get(list_resources))
        .route("/api/books/:book_id/graph/:graph_type", get(fetch_graph))
        .route("/api/books/:book_id/dashboard", get(fetch_dashboard))
        .route("/api/books/:book_id/chapters/:chapter", get(fetch_chapter))
        .route("/api/rescan", post(rescan))
        .route("/api/health", get(health))
        .with_state(state);

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

async fn list_books(State(state): State<Arc<HttpState>>) -> Result<Response, StatusCode> {
    let books = state.library.list_entries().await;
    json_response(StatusCode::OK, &books)
}

async fn list_graphs(
    State(state): State<Arc<HttpState>>,
    Path(book_id): Path<String>,
) -> Result<Response, StatusCode> {
    match state.library.list_graphs(&book_id).await {
        Ok(listing) => json_response(StatusCode::OK, &listing),
        Err(err) => resolve_error_response(&err, GRAPH_NOT_AVAILABLE, GRAPH_READ_FAILED),
    }
}

async fn list_resources(
    State(state): State<Arc<HttpState>>,
    Path(book_id): Path<String>,
) -> Result<Response, StatusCode> {
    match state.library.list_resources(&book_id).await {
        Ok(listing) => json_response(StatusCode::OK, &listing),
        Err(err) => resolve_error_response(&err, GRAPH_NOT_AVAILABLE, GRAPH_READ_FAILED),
    }
}

async fn fetch_graph(
    State(state): State<Arc<HttpState>>,
    Path((book_id, graph_type)): Path<(String, String)>,
    Query(query): Query<ChapterQuery>,
) -> Result<Response, StatusCode> {
    let kind = ResourceKind::Graph(graph_type);
    fetch(
        &state,
        &book_id,
        &kind,
        query.chapter.as_deref(),
        (GRAPH_NOT_AVAILABLE, GRAPH_READ_FAILED),
    )
    .await
}

async fn fetch_dashboard(
    State(state): State<Arc<HttpState>>,
    Path(book_id): Path<String>,
    Query(query): Query<ChapterQuery>,
) -> Result<Response, StatusCode> {
    fetch(
        &state,
        &book_id,
        &ResourceKind::Dashboard,
        query.chapter.as_deref(),
        (DASHBOARD_NOT_AVAILABLE, DASHBOARD_READ_FAILED),
    )
    .await
}

async fn fetch_chapter(
    State(state): State<Arc<HttpState>>,
    Path((book_id, chapter)): Path<(String, String)>,
) -> Result<Response, StatusCode> {
    let kind = ResourceKind::Chapter(chapter);
    fetch(
        &state,
        &book_id,
        &kind,
        None,
        (CHAPTER_NOT_AVAILABLE, CHAPTER_READ_FAILED),
    )
    .await
}

async fn fetch(
    state: &HttpState,
    book_id: &str,
    kind: &ResourceKind,
    selector: Option<&str>,
    (not_found, read_failed): (&str, &str),
) -> Result<Response, StatusCode> {
    let resolver = state.library.resolver().await;
    match resolver.fetch_resource(book_id, kind, selector).await {
        Ok(payload) => json_response(StatusCode::OK, &payload),
        Err(err) => resolve_error_response(&err, not_found, read_failed),
    }
}

async fn rescan(State(state): State<Arc<HttpState>>) -> Result<Response, StatusCode> {
    match state.library.rebuild().await {
        Ok(stats) => json_response(
            StatusCode::OK,
            &RescanResponse {
                message: "Library rescanned".to_string(),
                book_count: stats.entry_count,
                skipped: stats.skipped,
                warnings: stats.warnings.len(),
            },
        ),
        Err(err) => {
            log::error!("Library rescan failed: {err}");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorBody::new("Error rescanning library"),
            )
        }
    }
}

async fn health(State(state): State<Arc<HttpState>>) -> Result<Response, StatusCode> {
    let books = state.library.snapshot().await.len();
    json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "ok".to_string(),
            books,
            environment: state.environment.clone(),
        },
    )
}

/// Map a resolution failure onto the wire. Read failures never carry the
/// underlying reason; it is logged by the resolver instead.
fn resolve_error_response(
    err: &ResolveError,
    not_found: &str,
    read_failed: &str,
) -> Result<Response, StatusCode> {
    let (status, message) = match err {
        ResolveError::EntryNotFound { .. } => (StatusCode::NOT_FOUND, BOOK_NOT_FOUND.to_string()),
        ResolveError::ResourceNotFound { .. } => (StatusCode::NOT_FOUND, not_found.to_string()),
        ResolveError::ReadError { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, read_failed.to_string())
        }
        ResolveError::InvalidKind(_) => (StatusCode::BAD_REQUEST, err.to_string()),
    };
    json_response(status, &ErrorBody::new(message))
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response, StatusCode> {
    let bytes = serde_json::to_vec(body).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    HttpResponse::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(bytes))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
