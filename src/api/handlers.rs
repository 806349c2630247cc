use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

use crate::api::AppState;
use crate::auth::Viewer;
use crate::console::{ActionInput, ActionOutcome, AdminView, ConsoleContext, Record, SearchResult};
use crate::media::{DeliveryMode, MediaVerdict, ResolvedFile};

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
/// The full error is logged server-side; clients only see a generic
/// message to avoid leaking internal details.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Console pages
// ============================================================

#[derive(Debug, Serialize)]
pub struct RealmSummary {
    pub id: String,
    pub title: String,
    pub entity_types: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct IndexPage {
    pub context: ConsoleContext,
    pub realms: Vec<RealmSummary>,
    pub entity_types: Vec<String>,
}

pub async fn index(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Json<IndexPage> {
    let console = &state.console;

    let realms = console
        .realms()
        .iter()
        .map(|realm| RealmSummary {
            id: realm.id.clone(),
            title: realm.title.clone(),
            entity_types: realm
                .entity_types
                .iter()
                .filter(|et| console.handler(et).is_some())
                .cloned()
                .collect(),
        })
        .collect();

    let entity_types = console
        .handlers()
        .iter()
        .map(|h| h.entity_type().to_string())
        .collect();

    Json(IndexPage {
        context: console.each_request_context(&viewer),
        realms,
        entity_types,
    })
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

pub async fn search(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<SearchResult>> {
    Json(state.console.search(&viewer, &query.q))
}

#[derive(Debug, Serialize)]
pub struct RecordsPage {
    pub context: ConsoleContext,
    pub entity_type: String,
    pub records: Vec<Record>,
}

pub async fn list_entity(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(entity_type): Path<String>,
) -> Result<Json<RecordsPage>, (StatusCode, String)> {
    let console = &state.console;
    let handler = console
        .handler(&entity_type)
        .ok_or((StatusCode::NOT_FOUND, "Unknown entity type".to_string()))?;

    if !handler.capabilities().list {
        return Err((
            StatusCode::BAD_REQUEST,
            "Entity type does not support listing".to_string(),
        ));
    }

    let records = handler.list(&viewer).map_err(internal_error)?;

    Ok(Json(RecordsPage {
        context: console.each_request_context(&viewer),
        entity_type,
        records,
    }))
}

#[derive(Debug, Serialize)]
pub struct DetailPage {
    pub context: ConsoleContext,
    pub entity_type: String,
    pub record: Record,
}

pub async fn entity_detail(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path((entity_type, key)): Path<(String, String)>,
) -> Result<Json<DetailPage>, (StatusCode, String)> {
    let console = &state.console;
    let handler = console
        .handler(&entity_type)
        .ok_or((StatusCode::NOT_FOUND, "Unknown entity type".to_string()))?;

    let record = handler
        .list(&viewer)
        .map_err(internal_error)?
        .into_iter()
        .find(|r| r.key == key)
        .ok_or((StatusCode::NOT_FOUND, "Record not found".to_string()))?;

    Ok(Json(DetailPage {
        context: console.each_request_context(&viewer),
        entity_type,
        record,
    }))
}

// ============================================================
// Actions and custom views
// ============================================================

pub async fn run_action(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(name): Path<String>,
    Json(input): Json<ActionInput>,
) -> Result<Json<ActionOutcome>, (StatusCode, String)> {
    let console = &state.console;
    let action = console
        .action(&name)
        .ok_or((StatusCode::NOT_FOUND, "Unknown action".to_string()))?;

    let outcome = action
        .run(console, &viewer, &input)
        .map_err(internal_error)?;

    Ok(Json(outcome))
}

pub fn render_view(
    state: AppState,
    viewer: Viewer,
    view: Arc<dyn AdminView>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let context = state.console.each_request_context(&viewer);
    let body = view.render(&state.console, &viewer).map_err(internal_error)?;

    Ok(Json(serde_json::json!({
        "context": context,
        "title": view.title(),
        "body": body,
    })))
}

// ============================================================
// Media gateway
// ============================================================

fn media_not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "File not found".to_string())
}

fn media_headers(builder: axum::http::response::Builder, file: &ResolvedFile) -> axum::http::response::Builder {
    builder
        .header(header::CONTENT_TYPE, file.content_type())
        .header(header::CONTENT_DISPOSITION, file.content_disposition())
        .header(header::CACHE_CONTROL, "private, max-age=3600")
}

/// Serve one file from the media root. Authentication happened in the
/// route layer, before any filesystem access. All rejections answer a
/// uniform 404 so crafted paths cannot probe for files outside the root.
pub async fn serve_media(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    method: Method,
    Path(path): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    let file = match state.media.resolve(&path) {
        MediaVerdict::Ok(file) => file,
        MediaVerdict::NotFound => return Err(media_not_found()),
        MediaVerdict::OutsideRoot => {
            tracing::warn!(
                requested = %path,
                viewer = %viewer.username,
                "Rejected media path outside the configured root"
            );
            return Err(media_not_found());
        }
    };

    match state.media.delivery() {
        DeliveryMode::Direct => {
            let metadata = tokio::fs::metadata(&file.absolute)
                .await
                .map_err(|_| media_not_found())?;

            let builder = media_headers(Response::builder(), &file)
                .header(header::CONTENT_LENGTH, metadata.len());

            let response = if method == Method::HEAD {
                builder.body(Body::empty())
            } else {
                let opened = tokio::fs::File::open(&file.absolute)
                    .await
                    .map_err(|_| media_not_found())?;
                builder.body(Body::from_stream(ReaderStream::new(opened)))
            };
            response.map_err(internal_error)
        }
        DeliveryMode::Offload => {
            // The front-end proxy streams the bytes; this process reads
            // nothing.
            media_headers(Response::builder(), &file)
                .header("X-Accel-Redirect", state.media.internal_path(&file))
                .body(Body::empty())
                .map_err(internal_error)
        }
    }
}
