//! User management (admins only)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    Form,
};
use serde::{Deserialize, Serialize};

use super::{admin_context, render, see_other, AdminSession, CsrfForm, NoticeQuery};
use crate::auth::{hash_password, validate_password, validate_username};
use crate::data::{DataError, Role, Stored, User};
use crate::server::{AppError, AppState};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserForm {
    #[serde(skip_serializing)]
    csrf_token: String,
    username: String,
    display_name: String,
    email: String,
    role: String,
    #[serde(skip_serializing)]
    password: String,
}

impl UserForm {
    fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            role: user.role.to_string(),
            ..Self::default()
        }
    }
}

/// A user as shown in the list, without the password hash
#[derive(Debug, Serialize)]
struct UserRow<'a> {
    id: u64,
    username: &'a str,
    display_name: &'a str,
    email: &'a str,
    role: Role,
}

impl<'a> From<&'a Stored<User>> for UserRow<'a> {
    fn from(user: &'a Stored<User>) -> Self {
        Self {
            id: user.id,
            username: &user.username,
            display_name: &user.display_name,
            email: &user.email,
            role: user.role,
        }
    }
}

/// GET /admin/users
pub async fn list(
    State(state): State<AppState>,
    session: AdminSession,
    Query(query): Query<NoticeQuery>,
) -> Result<Response, AppError> {
    session.require_admin()?;
    let users = state.data.users()?;
    let rows: Vec<UserRow> = users.iter().map(UserRow::from).collect();

    let mut context = admin_context(&state, Some(&session.0), "users")?;
    context.insert("users", &rows);
    context.insert("notice", &query.message());
    render(&state, "admin/users.html", &context, StatusCode::OK).await
}

async fn render_form(
    state: &AppState,
    session: &AdminSession,
    form: &UserForm,
    user_id: Option<u64>,
    error: Option<String>,
) -> Result<Response, AppError> {
    let mut context = admin_context(state, Some(&session.0), "users")?;
    context.insert("form", form);
    context.insert("user_id", &user_id);
    let status = match &error {
        Some(_) => StatusCode::UNPROCESSABLE_ENTITY,
        None => StatusCode::OK,
    };
    context.insert("error", &error);
    render(state, "admin/user_form.html", &context, status).await
}

/// GET /admin/users/new
pub async fn new_form(
    State(state): State<AppState>,
    session: AdminSession,
) -> Result<Response, AppError> {
    session.require_admin()?;
    let form = UserForm {
        role: Role::Editor.to_string(),
        ..UserForm::default()
    };
    render_form(&state, &session, &form, None, None).await
}

/// GET /admin/users/:id/edit
pub async fn edit_form(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
) -> Result<Response, AppError> {
    session.require_admin()?;
    let user = state.data.user(id)?.ok_or(AppError::NotFound)?;
    render_form(&state, &session, &UserForm::from_user(&user), Some(id), None).await
}

/// Duplicate usernames and schema violations go back to the form
fn data_validation_error(error: DataError) -> Result<String, AppError> {
    match error {
        DataError::Duplicate { .. } => Ok("That username is already taken.".to_string()),
        DataError::Invalid { message, .. } => Ok(message),
        other => Err(other.into()),
    }
}

/// POST /admin/users
pub async fn create(
    State(state): State<AppState>,
    session: AdminSession,
    Form(form): Form<UserForm>,
) -> Result<Response, AppError> {
    session.require_admin()?;
    session.verify_csrf(&form.csrf_token)?;

    let username = form.username.trim();
    let checked = validate_username(username)
        .and_then(|_| validate_password(&form.password))
        .and_then(|_| form.role.parse::<Role>().map_err(anyhow::Error::msg));
    let role = match checked {
        Ok(role) => role,
        Err(e) => return render_form(&state, &session, &form, None, Some(e.to_string())).await,
    };

    let user = User {
        username: username.to_string(),
        display_name: form.display_name.trim().to_string(),
        email: form.email.trim().to_string(),
        role,
        password_hash: hash_password(&form.password)?,
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    if let Err(e) = state.data.add_user(&user) {
        let message = data_validation_error(e)?;
        return render_form(&state, &session, &form, None, Some(message)).await;
    }

    tracing::info!("{} created {} '{}'", session.0.username, role, user.username);
    Ok(see_other("/admin/users", "created"))
}

/// POST /admin/users/:id
pub async fn update(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
    Form(form): Form<UserForm>,
) -> Result<Response, AppError> {
    session.require_admin()?;
    session.verify_csrf(&form.csrf_token)?;
    let existing = state.data.user(id)?.ok_or(AppError::NotFound)?;

    let username = form.username.trim();
    let mut checked = validate_username(username)
        .and_then(|_| form.role.parse::<Role>().map_err(anyhow::Error::msg));
    if checked.is_ok() && !form.password.is_empty() {
        if let Err(e) = validate_password(&form.password) {
            checked = Err(e);
        }
    }
    let role = match checked {
        Ok(role) => role,
        Err(e) => return render_form(&state, &session, &form, Some(id), Some(e.to_string())).await,
    };

    if existing.role == Role::Admin && role != Role::Admin && state.data.count_admins()? <= 1 {
        let message = "The last admin cannot be demoted.".to_string();
        return render_form(&state, &session, &form, Some(id), Some(message)).await;
    }

    let password_changed = !form.password.is_empty();
    let user = User {
        username: username.to_string(),
        display_name: form.display_name.trim().to_string(),
        email: form.email.trim().to_string(),
        role,
        password_hash: if password_changed {
            hash_password(&form.password)?
        } else {
            existing.password_hash.clone()
        },
        created_at: existing.created_at.clone(),
    };
    if let Err(e) = state.data.update_user(id, &user) {
        let message = data_validation_error(e)?;
        return render_form(&state, &session, &form, Some(id), Some(message)).await;
    }

    if password_changed {
        let ended = state.sessions.destroy_user(id);
        tracing::info!("Password for '{}' changed, ended {} session(s)", user.username, ended);
    } else if role != existing.role {
        state.sessions.update_role(id, role);
    }

    Ok(see_other("/admin/users", "saved"))
}

/// POST /admin/users/:id/delete
pub async fn delete(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
    Form(form): Form<CsrfForm>,
) -> Result<Response, AppError> {
    session.require_admin()?;
    session.verify_csrf(&form.csrf_token)?;

    if id == session.0.user_id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account.".to_string(),
        ));
    }
    let user = state.data.user(id)?.ok_or(AppError::NotFound)?;
    if user.role == Role::Admin && state.data.count_admins()? <= 1 {
        return Err(AppError::BadRequest(
            "The last admin cannot be deleted.".to_string(),
        ));
    }

    state.data.delete_user(id)?;
    state.sessions.destroy_user(id);
    tracing::info!("{} deleted user '{}'", session.0.username, user.username);
    Ok(see_other("/admin/users", "deleted"))
}
