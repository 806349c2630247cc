mod handlers;
mod middleware;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{AuthConfig, Viewer};
use crate::console::AdminConsole;
use crate::media::MediaConfig;

/// Shared request state: the immutable console plus the auth and media
/// configuration. Cheap to clone; the console is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub console: Arc<AdminConsole>,
    pub auth: AuthConfig,
    pub media: MediaConfig,
}

pub fn create_router(console: Arc<AdminConsole>, auth: AuthConfig, media: MediaConfig) -> Router {
    let state = AppState {
        console: console.clone(),
        auth,
        media,
    };

    let mut admin = Router::new()
        .route("/", get(handlers::index))
        .route("/search", get(handlers::search))
        .route("/actions/{name}", post(handlers::run_action))
        .route("/{entity}/", get(handlers::list_entity))
        .route("/{entity}/{key}/", get(handlers::entity_detail));

    // Custom views registered through the queue are mounted as concrete
    // routes; static paths win over the `{entity}` captures above.
    for view in console.views() {
        let path = view
            .path
            .strip_prefix("/admin")
            .unwrap_or(&view.path)
            .to_string();
        let view = view.view.clone();
        admin = admin.route(
            &path,
            get(
                move |axum::extract::State(state): axum::extract::State<AppState>,
                      Extension(viewer): Extension<Viewer>| {
                    let view = view.clone();
                    async move { handlers::render_view(state, viewer, view) }
                },
            ),
        );
    }

    let admin = admin.route_layer(axum::middleware::from_fn(middleware::require_staff));

    let files = Router::new()
        .route("/{*path}", get(handlers::serve_media))
        .route_layer(axum::middleware::from_fn(middleware::require_authenticated));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/admin/", admin)
        .nest("/files", files)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_viewer,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
