//! Request middleware for the public site

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::AppState;

/// Answer a 404 with the configured redirect, if one matches the path
pub async fn redirect_mappings(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);

    let response = next.run(request).await;
    if response.status() != StatusCode::NOT_FOUND || !(method == Method::GET || method == Method::HEAD)
    {
        return response;
    }

    let mapping = match state.data.resolve_url(&path) {
        Ok(Some(mapping)) => mapping,
        Ok(None) => return response,
        Err(e) => {
            tracing::error!("Failed to look up redirect for {}: {}", path, e);
            return response;
        }
    };

    let Ok(status) = StatusCode::from_u16(mapping.status) else {
        return response;
    };
    let location = match query {
        Some(query) if !mapping.to.contains('?') => format!("{}?{}", mapping.to, query),
        _ => mapping.to.clone(),
    };
    tracing::debug!("Redirecting {} -> {} ({})", path, location, status);
    (status, [(header::LOCATION, location)]).into_response()
}
