//! Admin panel
//!
//! Every route except the login form requires an [`AdminSession`]. Forms
//! carry the session's CSRF token, checked before any state change.

mod auth;
mod dashboard;
mod entries;
mod media;
mod navigation;
mod redirects;
mod settings;
mod users;

use axum::{
    extract::{DefaultBodyLimit, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use tera::Context;

use super::{AppError, AppState};
use crate::auth::{cookie_value, verify_csrf, Session};
use crate::content::EntryKind;

/// Room for multipart framing around an upload
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: &AppState) -> Router<AppState> {
    let upload_limit = state.media.max_upload_bytes() + MULTIPART_OVERHEAD;

    Router::new()
        .route("/", get(dashboard::show))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", post(auth::logout))
        .nest("/pages", entries::router(EntryKind::Page))
        .nest("/posts", entries::router(EntryKind::Post))
        .route(
            "/media",
            get(media::list)
                .post(media::upload)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/media/:name/delete", post(media::delete))
        .route("/users", get(users::list).post(users::create))
        .route("/users/new", get(users::new_form))
        .route("/users/:id", post(users::update))
        .route("/users/:id/edit", get(users::edit_form))
        .route("/users/:id/delete", post(users::delete))
        .route("/navigation", get(navigation::list).post(navigation::create))
        .route("/navigation/:id", post(navigation::update))
        .route("/navigation/:id/delete", post(navigation::delete))
        .route("/settings", get(settings::show).post(settings::update))
        .route("/redirects", get(redirects::list).post(redirects::create))
        .route("/redirects/:id/delete", post(redirects::delete))
}

/// The logged-in user behind an admin request
///
/// Requests without a live session are redirected to the login form.
#[derive(Debug, Clone)]
pub struct AdminSession(pub Session);

impl AdminSession {
    /// Users, settings and redirects are for admins only
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.0.is_admin() {
            Ok(())
        } else {
            tracing::warn!(
                event = "auth_failure",
                reason = "insufficient_role",
                user = %self.0.username,
                "Editor attempted an admin-only action"
            );
            Err(AppError::forbidden())
        }
    }

    /// Check the CSRF token submitted with a form
    pub fn verify_csrf(&self, submitted: &str) -> Result<(), AppError> {
        if verify_csrf(Some(submitted), &self.0.csrf_token) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "The form has expired. Reload the page and try again.".to_string(),
            ))
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let cookie_name = &state.site.config.admin.cookie_name;
        let session = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|h| cookie_value(h, cookie_name))
            .and_then(|token| state.sessions.get(token));

        match session {
            Some(session) => Ok(AdminSession(session)),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/admin");
                let location = format!(
                    "/admin/login?next={}",
                    utf8_percent_encode(next, NON_ALPHANUMERIC)
                );
                Err(Redirect::to(&location).into_response())
            }
        }
    }
}

/// A form that only carries its CSRF token
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CsrfForm {
    csrf_token: String,
}

/// Query string of list pages after a redirect
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct NoticeQuery {
    notice: String,
}

impl NoticeQuery {
    fn message(&self) -> Option<&'static str> {
        match self.notice.as_str() {
            "saved" => Some("Changes saved."),
            "created" => Some("Created."),
            "deleted" => Some("Deleted."),
            "uploaded" => Some("File uploaded."),
            _ => None,
        }
    }
}

/// Context shared by admin templates
pub(crate) fn admin_context(
    state: &AppState,
    session: Option<&Session>,
    section: &str,
) -> Result<Context, AppError> {
    let mut context = Context::new();
    context.insert("site", &state.data.settings()?);
    context.insert("section", section);
    if let Some(session) = session {
        context.insert("session", session);
        context.insert("csrf_token", &session.csrf_token);
    }
    Ok(context)
}

/// Render an admin template
pub(crate) async fn render(
    state: &AppState,
    template: &str,
    context: &Context,
    status: StatusCode,
) -> Result<Response, AppError> {
    let html = state.theme.read().await.render(template, context)?;
    Ok((status, Html(html)).into_response())
}

/// 303 to a list page with a notice
pub(crate) fn see_other(path: &str, notice: &str) -> Response {
    Redirect::to(&format!("{}?notice={}", path, notice)).into_response()
}
