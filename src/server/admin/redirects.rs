//! URL mapping editor (admins only)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    Form,
};
use serde::{Deserialize, Serialize};

use super::{admin_context, render, see_other, AdminSession, CsrfForm, NoticeQuery};
use crate::data::{DataError, UrlMapping, REDIRECT_STATUSES};
use crate::server::{AppError, AppState};

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectForm {
    #[serde(skip_serializing)]
    csrf_token: String,
    from: String,
    to: String,
    status: String,
}

impl Default for RedirectForm {
    fn default() -> Self {
        Self {
            csrf_token: String::new(),
            from: String::new(),
            to: String::new(),
            status: "301".to_string(),
        }
    }
}

async fn render_list(
    state: &AppState,
    session: &AdminSession,
    form: &RedirectForm,
    notice: Option<&str>,
    error: Option<String>,
) -> Result<Response, AppError> {
    let mut context = admin_context(state, Some(&session.0), "redirects")?;
    context.insert("mappings", &state.data.url_mappings()?);
    context.insert("form", form);
    context.insert(
        "statuses",
        &REDIRECT_STATUSES.iter().map(u16::to_string).collect::<Vec<_>>(),
    );
    context.insert("notice", &notice);
    let status = match &error {
        Some(_) => StatusCode::UNPROCESSABLE_ENTITY,
        None => StatusCode::OK,
    };
    context.insert("error", &error);
    render(state, "admin/redirects.html", &context, status).await
}

/// GET /admin/redirects
pub async fn list(
    State(state): State<AppState>,
    session: AdminSession,
    Query(query): Query<NoticeQuery>,
) -> Result<Response, AppError> {
    session.require_admin()?;
    render_list(&state, &session, &RedirectForm::default(), query.message(), None).await
}

/// POST /admin/redirects
pub async fn create(
    State(state): State<AppState>,
    session: AdminSession,
    Form(form): Form<RedirectForm>,
) -> Result<Response, AppError> {
    session.require_admin()?;
    session.verify_csrf(&form.csrf_token)?;

    let Ok(status) = form.status.trim().parse::<u16>() else {
        let message = format!("Invalid status '{}'", form.status.trim());
        return render_list(&state, &session, &form, None, Some(message)).await;
    };
    if form.from.trim().is_empty() || form.to.trim().is_empty() {
        let message = "Both paths are required.".to_string();
        return render_list(&state, &session, &form, None, Some(message)).await;
    }

    let mapping = UrlMapping::new(&form.from, &form.to, status);
    match state.data.add_url_mapping(&mapping) {
        Ok(_) => {
            tracing::info!(
                "{} added redirect {} -> {} ({})",
                session.0.username,
                mapping.from,
                mapping.to,
                status
            );
            Ok(see_other("/admin/redirects", "created"))
        }
        Err(DataError::Invalid { message, .. }) => {
            render_list(&state, &session, &form, None, Some(message)).await
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /admin/redirects/:id/delete
pub async fn delete(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
    Form(form): Form<CsrfForm>,
) -> Result<Response, AppError> {
    session.require_admin()?;
    session.verify_csrf(&form.csrf_token)?;
    state.data.delete_url_mapping(id)?;
    Ok(see_other("/admin/redirects", "deleted"))
}
