//! Site settings (admins only)

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    Form,
};
use serde::{Deserialize, Serialize};
use std::fs;

use super::{admin_context, render, see_other, AdminSession, NoticeQuery};
use crate::content::EntryKind;
use crate::server::{AppError, AppState};

const MAX_POSTS_PER_PAGE: usize = 100;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsForm {
    #[serde(skip_serializing)]
    csrf_token: String,
    site_title: String,
    tagline: String,
    description: String,
    theme: String,
    posts_per_page: String,
    footer_text: String,
    home_page: String,
}

impl SettingsForm {
    fn from_settings(state: &AppState) -> Result<Self, AppError> {
        let settings = state.data.settings()?;
        let value = |key: &str| settings.get(key).cloned().unwrap_or_default();
        Ok(Self {
            site_title: value("site_title"),
            tagline: value("tagline"),
            description: value("description"),
            theme: value("theme"),
            posts_per_page: value("posts_per_page"),
            footer_text: value("footer_text"),
            home_page: value("home_page"),
            ..Self::default()
        })
    }

    fn pairs(&self) -> [(&'static str, &str); 7] {
        [
            ("site_title", self.site_title.trim()),
            ("tagline", self.tagline.trim()),
            ("description", self.description.trim()),
            ("theme", self.theme.trim()),
            ("posts_per_page", self.posts_per_page.trim()),
            ("footer_text", self.footer_text.trim()),
            ("home_page", self.home_page.trim()),
        ]
    }
}

/// `default` plus every directory under the themes dir
fn available_themes(state: &AppState) -> Vec<String> {
    let mut themes = vec!["default".to_string()];
    if let Ok(entries) = fs::read_dir(&state.site.theme_dir) {
        let mut found: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|name| name != "default" && !name.starts_with('.'))
            .collect();
        found.sort();
        themes.extend(found);
    }
    themes
}

async fn render_form(
    state: &AppState,
    session: &AdminSession,
    form: &SettingsForm,
    notice: Option<&str>,
    error: Option<String>,
) -> Result<Response, AppError> {
    let pages = state
        .blocking(|s| s.content.published(EntryKind::Page))
        .await?;

    let mut context = admin_context(state, Some(&session.0), "settings")?;
    context.insert("form", form);
    context.insert("themes", &available_themes(state));
    context.insert("pages", &pages);
    context.insert("notice", &notice);
    let status = match &error {
        Some(_) => StatusCode::UNPROCESSABLE_ENTITY,
        None => StatusCode::OK,
    };
    context.insert("error", &error);
    render(state, "admin/settings.html", &context, status).await
}

/// GET /admin/settings
pub async fn show(
    State(state): State<AppState>,
    session: AdminSession,
    Query(query): Query<NoticeQuery>,
) -> Result<Response, AppError> {
    session.require_admin()?;
    let form = SettingsForm::from_settings(&state)?;
    render_form(&state, &session, &form, query.message(), None).await
}

async fn validate(state: &AppState, form: &SettingsForm) -> Result<Option<String>, AppError> {
    if form.site_title.trim().is_empty() {
        return Ok(Some("Site title is required.".to_string()));
    }
    match form.posts_per_page.trim().parse::<usize>() {
        Ok(n) if (1..=MAX_POSTS_PER_PAGE).contains(&n) => {}
        _ => {
            return Ok(Some(format!(
                "Posts per page must be a number from 1 to {}.",
                MAX_POSTS_PER_PAGE
            )));
        }
    }
    if !available_themes(state).iter().any(|t| t == form.theme.trim()) {
        return Ok(Some(format!("Unknown theme '{}'.", form.theme.trim())));
    }
    let home_page = form.home_page.trim();
    if !home_page.is_empty()
        && !state
            .blocking(|s| s.content.published(EntryKind::Page))
            .await?
            .iter()
            .any(|p| p.slug == home_page)
    {
        return Ok(Some(format!("'{}' is not a published page.", home_page)));
    }
    Ok(None)
}

/// POST /admin/settings
pub async fn update(
    State(state): State<AppState>,
    session: AdminSession,
    Form(form): Form<SettingsForm>,
) -> Result<Response, AppError> {
    session.require_admin()?;
    session.verify_csrf(&form.csrf_token)?;

    if let Some(message) = validate(&state, &form).await? {
        return render_form(&state, &session, &form, None, Some(message)).await;
    }

    let theme = form.theme.trim();
    {
        let mut renderer = state.theme.write().await;
        if renderer.theme() != theme {
            if let Err(e) = renderer.reload(theme) {
                drop(renderer);
                tracing::error!("Theme '{}' failed to load: {}", theme, e);
                let message = format!("Theme '{}' could not be loaded: {}", theme, e);
                return render_form(&state, &session, &form, None, Some(message)).await;
            }
        }
    }

    state.data.set_settings(form.pairs())?;
    tracing::info!("{} updated site settings", session.0.username);
    Ok(see_other("/admin/settings", "saved"))
}
