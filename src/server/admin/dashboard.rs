//! Admin dashboard

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};
use serde::Serialize;

use super::{admin_context, render, AdminSession, NoticeQuery};
use crate::content::EntryKind;
use crate::server::{AppError, AppState};

#[derive(Debug, Serialize)]
struct Counts {
    pages: usize,
    posts: usize,
    drafts: usize,
    media: usize,
    users: usize,
}

#[derive(Debug, Serialize)]
struct TableRow {
    name: String,
    live: usize,
    dead: usize,
    bytes: u64,
}

/// GET /admin
pub async fn show(
    State(state): State<AppState>,
    session: AdminSession,
    Query(query): Query<NoticeQuery>,
) -> Result<Response, AppError> {
    let (pages, posts) = state
        .blocking(|s| Ok((s.content.list(EntryKind::Page)?, s.content.list(EntryKind::Post)?)))
        .await?;
    let drafts = pages
        .iter()
        .chain(posts.iter())
        .filter(|e| !e.is_published())
        .count();

    let counts = Counts {
        pages: pages.len(),
        posts: posts.len(),
        drafts,
        media: state.media.count()?,
        users: state.data.users()?.len(),
    };

    let tables: Vec<TableRow> = state
        .data
        .stats()?
        .into_iter()
        .map(|(name, stats)| TableRow {
            name,
            live: stats.live,
            dead: stats.dead,
            bytes: stats.bytes,
        })
        .collect();

    let mut context = admin_context(&state, Some(&session.0), "dashboard")?;
    context.insert("counts", &counts);
    context.insert("recent", &posts.iter().take(5).collect::<Vec<_>>());
    context.insert("tables", &tables);
    context.insert("notice", &query.message());
    render(&state, "admin/dashboard.html", &context, StatusCode::OK).await
}
