//! Media library screens

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
    Form,
};

use super::{admin_context, render, see_other, AdminSession, CsrfForm, NoticeQuery};
use crate::media::MediaError;
use crate::server::{AppError, AppState};

async fn render_list(
    state: &AppState,
    session: &AdminSession,
    notice: Option<&str>,
    error: Option<String>,
    status: StatusCode,
) -> Result<Response, AppError> {
    let mut context = admin_context(state, Some(&session.0), "media")?;
    context.insert("items", &state.media.list()?);
    context.insert("max_upload_bytes", &state.media.max_upload_bytes());
    context.insert("notice", &notice);
    context.insert("error", &error);
    render(state, "admin/media.html", &context, status).await
}

/// GET /admin/media
pub async fn list(
    State(state): State<AppState>,
    session: AdminSession,
    Query(query): Query<NoticeQuery>,
) -> Result<Response, AppError> {
    render_list(&state, &session, query.message(), None, StatusCode::OK).await
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("The upload is too large.".to_string())
    } else {
        AppError::BadRequest(format!("Invalid upload: {}", e.body_text()))
    }
}

/// POST /admin/media (multipart: `csrf_token`, `file`)
pub async fn upload(
    State(state): State<AppState>,
    session: AdminSession,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut csrf_token = String::new();
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("csrf_token") => {
                csrf_token = field.text().await.map_err(multipart_error)?;
            }
            Some("file") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                upload = Some((name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    session.verify_csrf(&csrf_token)?;

    let Some((name, bytes)) = upload else {
        return render_list(
            &state,
            &session,
            None,
            Some("Choose a file to upload.".to_string()),
            StatusCode::UNPROCESSABLE_ENTITY,
        )
        .await;
    };

    match state.media.store(&name, &bytes) {
        Ok(item) => {
            tracing::info!("{} uploaded '{}'", session.0.username, item.name);
            Ok(see_other("/admin/media", "uploaded"))
        }
        Err(e @ MediaError::TooLarge { .. }) => {
            render_list(&state, &session, None, Some(e.to_string()), StatusCode::PAYLOAD_TOO_LARGE)
                .await
        }
        Err(e @ (MediaError::Empty | MediaError::ExtensionNotAllowed(_) | MediaError::InvalidName(_))) => {
            render_list(&state, &session, None, Some(e.to_string()), StatusCode::UNPROCESSABLE_ENTITY)
                .await
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /admin/media/:name/delete
pub async fn delete(
    State(state): State<AppState>,
    session: AdminSession,
    Path(name): Path<String>,
    Form(form): Form<CsrfForm>,
) -> Result<Response, AppError> {
    session.verify_csrf(&form.csrf_token)?;
    state.media.delete(&name)?;
    tracing::info!("{} deleted media '{}'", session.0.username, name);
    Ok(see_other("/admin/media", "deleted"))
}
