//! Public site handlers

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use chrono::{Datelike, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tera::Context;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use super::{AppError, AppState};
use crate::content::{Entry, EntryKind};
use crate::data::NavNode;

#[derive(Debug, Deserialize)]
pub struct BlogQuery {
    page: Option<String>,
}

/// Pagination links for list pages
#[derive(Debug, Serialize)]
struct Pager {
    current: usize,
    total_pages: usize,
    prev_url: Option<String>,
    next_url: Option<String>,
}

impl Pager {
    fn new(base: &str, current: usize, total_pages: usize) -> Self {
        let url = |page: usize| {
            if page == 1 {
                base.to_string()
            } else {
                format!("{}?page={}", base, page)
            }
        };
        Self {
            current,
            total_pages,
            prev_url: (current > 1).then(|| url(current - 1)),
            next_url: (current < total_pages).then(|| url(current + 1)),
        }
    }
}

/// Neighbouring post link
#[derive(Debug, Serialize)]
struct PostLink {
    title: String,
    path: String,
}

impl From<&Entry> for PostLink {
    fn from(entry: &Entry) -> Self {
        Self {
            title: entry.title.clone(),
            path: entry.path.clone(),
        }
    }
}

/// Values every public template receives
pub(crate) fn base_context(state: &AppState, current_path: &str) -> Result<Context, AppError> {
    let config = &state.site.config;
    let mut site: IndexMap<String, String> = state.data.settings()?;
    site.insert("url".to_string(), config.url.clone());
    site.insert("language".to_string(), config.language.clone());
    site.insert("date_format".to_string(), config.date_format.clone());

    let nav = NavNode::tree(&state.data.visible_navigation()?, current_path);

    let mut context = Context::new();
    context.insert("site", &site);
    context.insert("nav", &nav);
    context.insert("current_path", current_path);
    context.insert("year", &Utc::now().with_timezone(&config.tz()).year());
    Ok(context)
}

fn posts_per_page(state: &AppState) -> Result<usize, AppError> {
    Ok(state
        .data
        .setting("posts_per_page")?
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(state.site.config.posts_per_page))
}

async fn render(
    state: &AppState,
    template: &str,
    context: &Context,
    status: StatusCode,
) -> Result<Response, AppError> {
    let html = state.theme.read().await.render(template, context)?;
    Ok((status, Html(html)).into_response())
}

/// Render the themed 404 page
pub(crate) async fn render_not_found(state: &AppState, path: &str) -> Response {
    let result = async {
        let mut context = base_context(state, path)?;
        context.insert("path", path);
        render(state, "404.html", &context, StatusCode::NOT_FOUND).await
    }
    .await;

    match result {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Failed to render 404 page: {}", e);
            AppError::NotFound.into_response()
        }
    }
}

async fn render_entry(state: &AppState, entry: &Entry) -> Result<Response, AppError> {
    let mut context = base_context(state, &entry.path)?;
    context.insert("entry", entry);

    if entry.kind == EntryKind::Post {
        let posts = state
            .blocking(|s| s.content.published(EntryKind::Post))
            .await?;
        if let Some(index) = posts.iter().position(|p| p.slug == entry.slug) {
            // Posts are newest first: `next` is newer, `prev` is older
            let next = index.checked_sub(1).and_then(|i| posts.get(i)).map(PostLink::from);
            let prev = posts.get(index + 1).map(PostLink::from);
            context.insert("next", &next);
            context.insert("prev", &prev);
        }
    }

    let template = {
        let theme = state.theme.read().await;
        theme.select_template(entry.template.as_deref(), entry.kind.template())
    };
    render(state, &template, &context, StatusCode::OK).await
}

/// GET /
pub async fn home(State(state): State<AppState>) -> Result<Response, AppError> {
    if let Some(slug) = state.data.setting("home_page")?.filter(|s| !s.is_empty()) {
        match state.content.get(EntryKind::Page, &slug)? {
            Some(page) if page.is_published() => {
                let mut page = page;
                page.path = "/".to_string();
                return render_entry(&state, &page).await;
            }
            _ => tracing::warn!("Home page '{}' is missing or unpublished", slug),
        }
    }

    let per_page = posts_per_page(&state)?;
    let (posts, tags) = state
        .blocking(move |s| {
            let posts: Vec<Entry> = s
                .content
                .published(EntryKind::Post)?
                .into_iter()
                .take(per_page)
                .collect();
            Ok((posts, s.content.tags()?))
        })
        .await?;

    let mut context = base_context(&state, "/")?;
    context.insert("posts", &posts);
    context.insert("tags", &tags);
    render(&state, "home.html", &context, StatusCode::OK).await
}

/// GET /blog?page=N
pub async fn blog(
    State(state): State<AppState>,
    Query(query): Query<BlogQuery>,
) -> Result<Response, AppError> {
    let page = match query.page.as_deref().map(str::trim) {
        None | Some("") => 1,
        Some(value) => match value.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => return Ok(render_not_found(&state, "/blog").await),
        },
    };

    let per_page = posts_per_page(&state)?;
    let posts = state
        .blocking(|s| s.content.published(EntryKind::Post))
        .await?;
    let total_pages = posts.len().div_ceil(per_page).max(1);
    if page > total_pages {
        return Ok(render_not_found(&state, "/blog").await);
    }

    let page_posts: Vec<&Entry> = posts.iter().skip((page - 1) * per_page).take(per_page).collect();

    let mut context = base_context(&state, "/blog")?;
    context.insert("posts", &page_posts);
    context.insert("pager", &Pager::new("/blog", page, total_pages));
    render(&state, "blog.html", &context, StatusCode::OK).await
}

/// GET /blog/:slug
pub async fn post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    match state.content.get(EntryKind::Post, &slug)? {
        Some(post) if post.is_published() => render_entry(&state, &post).await,
        _ => Ok(render_not_found(&state, &EntryKind::Post.public_path(&slug)).await),
    }
}

/// GET /:slug
pub async fn page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    match state.content.get(EntryKind::Page, &slug)? {
        Some(page) if page.is_published() => render_entry(&state, &page).await,
        _ => Ok(render_not_found(&state, &EntryKind::Page.public_path(&slug)).await),
    }
}

/// GET /tag/:tag
pub async fn tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<Response, AppError> {
    let posts = {
        let tag = tag.clone();
        state.blocking(move |s| s.content.posts_with_tag(&tag)).await?
    };
    let current_path = format!("/tag/{}", tag);
    if posts.is_empty() {
        return Ok(render_not_found(&state, &current_path).await);
    }

    // Show the tag as authors wrote it
    let wanted = slug::slugify(&tag);
    let name = posts
        .iter()
        .flat_map(|p| p.tags.iter())
        .find(|t| slug::slugify(t) == wanted)
        .cloned()
        .unwrap_or(tag);

    let mut context = base_context(&state, &current_path)?;
    context.insert("tag", &name);
    context.insert("posts", &posts);
    render(&state, "tag.html", &context, StatusCode::OK).await
}

/// GET /theme/*path: assets of the active theme
pub async fn theme_asset(
    State(state): State<AppState>,
    Path(path): Path<String>,
    request: Request<Body>,
) -> Response {
    let assets_dir = state.theme.read().await.assets_dir();

    let Ok(uri) = format!("/{}", path.trim_start_matches('/')).parse::<Uri>() else {
        return render_not_found(&state, request.uri().path()).await;
    };
    let (mut parts, body) = request.into_parts();
    let original = parts.uri.path().to_string();
    parts.uri = uri;

    match ServeDir::new(assets_dir)
        .oneshot(Request::from_parts(parts, body))
        .await
    {
        Ok(response) if response.status() == StatusCode::NOT_FOUND => {
            render_not_found(&state, &original).await
        }
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// Fallback: the themed 404 page
pub async fn not_found(State(state): State<AppState>, uri: Uri) -> Response {
    render_not_found(&state, uri.path()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pager_links() {
        let first = Pager::new("/blog", 1, 3);
        assert_eq!(first.prev_url, None);
        assert_eq!(first.next_url.as_deref(), Some("/blog?page=2"));

        let second = Pager::new("/blog", 2, 3);
        assert_eq!(second.prev_url.as_deref(), Some("/blog"));
        assert_eq!(second.next_url.as_deref(), Some("/blog?page=3"));

        let last = Pager::new("/blog", 3, 3);
        assert_eq!(last.next_url, None);
    }
}
