//! Navigation menu editor

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    Form,
};
use serde::{Deserialize, Serialize};

use super::{admin_context, render, see_other, AdminSession, CsrfForm, NoticeQuery};
use crate::data::{DataError, NavItem};
use crate::server::{AppError, AppState};

/// A menu item as submitted; numbers arrive as text from the form
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NavForm {
    #[serde(skip_serializing)]
    csrf_token: String,
    label: String,
    url: String,
    position: String,
    parent_id: String,
    visible: Option<String>,
}

impl NavForm {
    fn to_item(&self) -> Result<NavItem, String> {
        let label = self.label.trim();
        let url = self.url.trim();
        if label.is_empty() {
            return Err("Label is required.".to_string());
        }
        if url.is_empty() {
            return Err("URL is required.".to_string());
        }
        let position = match self.position.trim() {
            "" => 0,
            p => p
                .parse::<i64>()
                .map_err(|_| format!("Invalid position '{}'", p))?,
        };
        let parent_id = match self.parent_id.trim() {
            "" => None,
            p => Some(
                p.parse::<u64>()
                    .map_err(|_| format!("Invalid parent '{}'", p))?,
            ),
        };

        Ok(NavItem {
            label: label.to_string(),
            url: url.to_string(),
            position,
            parent_id,
            visible: self.visible.is_some(),
        })
    }
}

async fn render_list(
    state: &AppState,
    session: &AdminSession,
    form: &NavForm,
    notice: Option<&str>,
    error: Option<String>,
) -> Result<Response, AppError> {
    let items = state.data.navigation()?;
    let roots: Vec<_> = items.iter().filter(|i| i.parent_id.is_none()).collect();

    let mut context = admin_context(state, Some(&session.0), "navigation")?;
    context.insert("items", &items);
    context.insert("roots", &roots);
    context.insert("form", form);
    context.insert("notice", &notice);
    let status = match &error {
        Some(_) => StatusCode::UNPROCESSABLE_ENTITY,
        None => StatusCode::OK,
    };
    context.insert("error", &error);
    render(state, "admin/navigation.html", &context, status).await
}

/// GET /admin/navigation
pub async fn list(
    State(state): State<AppState>,
    session: AdminSession,
    Query(query): Query<NoticeQuery>,
) -> Result<Response, AppError> {
    let form = NavForm {
        position: state.data.navigation()?.len().to_string(),
        ..NavForm::default()
    };
    render_list(&state, &session, &form, query.message(), None).await
}

/// Parent problems are reported by the data layer as invalid records
fn invalid_message(error: DataError) -> Result<String, AppError> {
    match error {
        DataError::Invalid { message, .. } => Ok(message),
        other => Err(other.into()),
    }
}

/// POST /admin/navigation
pub async fn create(
    State(state): State<AppState>,
    session: AdminSession,
    Form(form): Form<NavForm>,
) -> Result<Response, AppError> {
    session.verify_csrf(&form.csrf_token)?;

    let item = match form.to_item() {
        Ok(item) => item,
        Err(message) => return render_list(&state, &session, &form, None, Some(message)).await,
    };
    if let Err(e) = state.data.add_nav_item(&item) {
        let message = invalid_message(e)?;
        return render_list(&state, &session, &form, None, Some(message)).await;
    }

    tracing::info!("{} added menu item '{}'", session.0.username, item.label);
    Ok(see_other("/admin/navigation", "created"))
}

/// POST /admin/navigation/:id
pub async fn update(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
    Form(form): Form<NavForm>,
) -> Result<Response, AppError> {
    session.verify_csrf(&form.csrf_token)?;
    state.data.nav_item(id)?.ok_or(AppError::NotFound)?;

    let blank = NavForm::default();
    let item = match form.to_item() {
        Ok(item) => item,
        Err(message) => return render_list(&state, &session, &blank, None, Some(message)).await,
    };
    if let Err(e) = state.data.update_nav_item(id, &item) {
        let message = invalid_message(e)?;
        return render_list(&state, &session, &blank, None, Some(message)).await;
    }

    Ok(see_other("/admin/navigation", "saved"))
}

/// POST /admin/navigation/:id/delete
pub async fn delete(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
    Form(form): Form<CsrfForm>,
) -> Result<Response, AppError> {
    session.verify_csrf(&form.csrf_token)?;
    state.data.delete_nav_item(id)?;
    tracing::info!("{} deleted menu item {}", session.0.username, id);
    Ok(see_other("/admin/navigation", "deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(label: &str, url: &str, position: &str, parent_id: &str) -> NavForm {
        NavForm {
            label: label.to_string(),
            url: url.to_string(),
            position: position.to_string(),
            parent_id: parent_id.to_string(),
            visible: Some("on".to_string()),
            ..NavForm::default()
        }
    }

    #[test]
    fn test_form_to_item() {
        let item = form(" About ", "/about", "3", "1").to_item().unwrap();
        assert_eq!(item.label, "About");
        assert_eq!(item.position, 3);
        assert_eq!(item.parent_id, Some(1));
        assert!(item.visible);

        let hidden = NavForm {
            visible: None,
            ..form("Docs", "/docs", "", "")
        };
        let item = hidden.to_item().unwrap();
        assert_eq!(item.position, 0);
        assert_eq!(item.parent_id, None);
        assert!(!item.visible);
    }

    #[test]
    fn test_form_rejects_bad_input() {
        assert!(form("", "/x", "0", "").to_item().is_err());
        assert!(form("X", " ", "0", "").to_item().is_err());
        assert!(form("X", "/x", "first", "").to_item().is_err());
        assert!(form("X", "/x", "0", "root").to_item().is_err());
    }
}
