//! Request middleware: viewer resolution and access gates.
//!
//! `resolve_viewer` runs on every request and attaches a [`Viewer`] to
//! the request extensions; the gates below it only read that extension.
//! The admin surface requires staff; the media gateway requires any
//! authenticated caller, rejected before any filesystem access happens.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::api::AppState;
use crate::auth::Viewer;

/// Resolve the caller from the bearer token and stash the viewer in the
/// request extensions. Never rejects; unknown callers become anonymous.
pub async fn resolve_viewer(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let viewer = state.auth.authenticate(request.headers());
    request.extensions_mut().insert(viewer);
    next.run(request).await
}

/// Admin gate: 401 for anonymous callers, 403 for authenticated
/// non-staff.
pub async fn require_staff(
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let viewer = request
        .extensions()
        .get::<Viewer>()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    if !viewer.is_authenticated {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if !viewer.is_staff {
        tracing::warn!(viewer = %viewer.username, "Non-staff viewer denied admin access");
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(next.run(request).await)
}

/// Media gate: any authenticated caller passes.
pub async fn require_authenticated(
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let viewer = request
        .extensions()
        .get::<Viewer>()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    if !viewer.is_authenticated {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(request).await)
}
