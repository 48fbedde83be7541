//! Page and post editor
//!
//! Pages and posts share one set of handlers, parameterized by kind.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;

use super::{admin_context, render, see_other, AdminSession, CsrfForm, NoticeQuery};
use crate::content::{ContentError, EntryDraft, EntryKind};
use crate::data::UrlMapping;
use crate::server::{AppError, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct EntryForm {
    #[serde(default)]
    csrf_token: String,
    #[serde(flatten)]
    draft: EntryDraft,
}

pub fn router(kind: EntryKind) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(move |state: State<AppState>, session: AdminSession, query: Query<NoticeQuery>| {
                list(kind, state, session, query)
            })
            .post(move |state: State<AppState>, session: AdminSession, form: Form<EntryForm>| {
                create(kind, state, session, form)
            }),
        )
        .route(
            "/new",
            get(move |state: State<AppState>, session: AdminSession| new_form(kind, state, session)),
        )
        .route(
            "/:slug",
            post(
                move |state: State<AppState>,
                      session: AdminSession,
                      slug: Path<String>,
                      form: Form<EntryForm>| { update(kind, state, session, slug, form) },
            ),
        )
        .route(
            "/:slug/edit",
            get(
                move |state: State<AppState>, session: AdminSession, slug: Path<String>| {
                    edit_form(kind, state, session, slug)
                },
            ),
        )
        .route(
            "/:slug/delete",
            post(
                move |state: State<AppState>,
                      session: AdminSession,
                      slug: Path<String>,
                      form: Form<CsrfForm>| { delete(kind, state, session, slug, form) },
            ),
        )
}

fn base(kind: EntryKind) -> String {
    format!("/admin/{}", kind.root())
}

async fn list(
    kind: EntryKind,
    State(state): State<AppState>,
    session: AdminSession,
    Query(query): Query<NoticeQuery>,
) -> Result<Response, AppError> {
    let entries = state.blocking(move |s| s.content.list(kind)).await?;

    let mut context = admin_context(&state, Some(&session.0), kind.root())?;
    context.insert("label", kind.label());
    context.insert("kind", &kind);
    context.insert("base", &base(kind));
    context.insert("entries", &entries);
    context.insert("notice", &query.message());
    render(&state, "admin/entries.html", &context, StatusCode::OK).await
}

async fn render_form(
    kind: EntryKind,
    state: &AppState,
    session: &AdminSession,
    draft: &EntryDraft,
    original_slug: Option<&str>,
    error: Option<String>,
) -> Result<Response, AppError> {
    let mut context = admin_context(state, Some(&session.0), kind.root())?;
    context.insert("label", kind.label());
    context.insert("kind", &kind);
    context.insert("base", &base(kind));
    context.insert("draft", draft);
    context.insert("original_slug", &original_slug);
    let status = match &error {
        Some(_) => StatusCode::UNPROCESSABLE_ENTITY,
        None => StatusCode::OK,
    };
    context.insert("error", &error);
    render(state, "admin/entry_form.html", &context, status).await
}

async fn new_form(
    kind: EntryKind,
    State(state): State<AppState>,
    session: AdminSession,
) -> Result<Response, AppError> {
    let draft = EntryDraft {
        status: "published".to_string(),
        ..EntryDraft::default()
    };
    render_form(kind, &state, &session, &draft, None, None).await
}

async fn edit_form(
    kind: EntryKind,
    State(state): State<AppState>,
    session: AdminSession,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let entry = state.content.get(kind, &slug)?.ok_or(AppError::NotFound)?;
    render_form(kind, &state, &session, &EntryDraft::from_entry(&entry), Some(&slug), None).await
}

/// Validation errors go back to the form; anything else is a server error
fn validation_error(error: anyhow::Error) -> Result<String, AppError> {
    match error.downcast_ref::<ContentError>() {
        Some(ContentError::NotFound(..)) => Err(AppError::NotFound),
        Some(e) => Ok(e.to_string()),
        None => Err(error.into()),
    }
}

async fn create(
    kind: EntryKind,
    State(state): State<AppState>,
    session: AdminSession,
    Form(form): Form<EntryForm>,
) -> Result<Response, AppError> {
    session.verify_csrf(&form.csrf_token)?;

    match state.content.save(kind, &form.draft, None) {
        Ok(saved) => {
            tracing::info!(
                "{} created {} '{}'",
                session.0.username,
                kind.root(),
                saved.entry.slug
            );
            Ok(see_other(&base(kind), "created"))
        }
        Err(e) => {
            let message = validation_error(e)?;
            render_form(kind, &state, &session, &form.draft, None, Some(message)).await
        }
    }
}

async fn update(
    kind: EntryKind,
    State(state): State<AppState>,
    session: AdminSession,
    Path(slug): Path<String>,
    Form(form): Form<EntryForm>,
) -> Result<Response, AppError> {
    session.verify_csrf(&form.csrf_token)?;
    let previous = state.content.get(kind, &slug)?.ok_or(AppError::NotFound)?;

    let saved = match state.content.save(kind, &form.draft, Some(&slug)) {
        Ok(saved) => saved,
        Err(e) => {
            let message = validation_error(e)?;
            return render_form(kind, &state, &session, &form.draft, Some(&slug), Some(message)).await;
        }
    };

    if let Some(old_slug) = &saved.renamed_from {
        if previous.is_published() {
            let mapping = UrlMapping::new(&kind.public_path(old_slug), &saved.entry.path, 301);
            if let Err(e) = state.data.add_url_mapping(&mapping) {
                tracing::error!("Failed to add redirect for renamed {}: {}", kind.root(), e);
            }
        }
        if kind == EntryKind::Page && state.data.setting("home_page")?.as_deref() == Some(old_slug.as_str()) {
            state.data.set_setting("home_page", &saved.entry.slug)?;
        }
    }

    Ok(see_other(&base(kind), "saved"))
}

async fn delete(
    kind: EntryKind,
    State(state): State<AppState>,
    session: AdminSession,
    Path(slug): Path<String>,
    Form(form): Form<CsrfForm>,
) -> Result<Response, AppError> {
    session.verify_csrf(&form.csrf_token)?;
    state.content.delete(kind, &slug)?;

    if kind == EntryKind::Page && state.data.setting("home_page")?.as_deref() == Some(slug.as_str()) {
        state.data.set_setting("home_page", "")?;
    }
    tracing::info!("{} deleted {} '{}'", session.0.username, kind.root(), slug);
    Ok(see_other(&base(kind), "deleted"))
}
