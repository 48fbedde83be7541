//! Login and logout

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use std::time::Duration;

use super::{admin_context, render, AdminSession};
use crate::auth::{
    clear_cookie, clear_login_csrf_cookie, cookie_value, login_csrf_cookie, random_token,
    session_cookie, verify_csrf, verify_password, LOGIN_CSRF_COOKIE,
};
use crate::server::{AppError, AppState};

/// Delay after a failed login
const FAILED_LOGIN_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginQuery {
    next: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    username: String,
    password: String,
    csrf_token: String,
    next: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogoutForm {
    csrf_token: String,
}

/// Only local admin paths are valid login destinations
fn safe_next(next: &str) -> &str {
    let is_local_admin = (next == "/admin" || next.starts_with("/admin/") || next.starts_with("/admin?"))
        && !next.starts_with("/admin/login")
        && !next.contains("//")
        && !next.contains('\\');
    if is_local_admin {
        next
    } else {
        "/admin"
    }
}

async fn render_login(
    state: &AppState,
    csrf_token: &str,
    username: &str,
    next: &str,
    error: Option<&str>,
    status: StatusCode,
) -> Result<Response, AppError> {
    let mut context = admin_context(state, None, "login")?;
    context.insert("csrf_token", csrf_token);
    context.insert("username", username);
    context.insert("next", safe_next(next));
    if let Some(error) = error {
        context.insert("error", error);
    }
    let response = render(state, "admin/login.html", &context, status).await?;
    let cookie = login_csrf_cookie(csrf_token, state.site.config.admin.secure_cookies);
    Ok(([(header::SET_COOKIE, cookie)], response).into_response())
}

/// GET /admin/login
pub async fn login_form(
    State(state): State<AppState>,
    session: Option<AdminSession>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AppError> {
    if session.is_some() {
        return Ok(Redirect::to(safe_next(&query.next)).into_response());
    }
    render_login(&state, &random_token(16), "", &query.next, None, StatusCode::OK).await
}

/// POST /admin/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let expected = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|h| cookie_value(h, LOGIN_CSRF_COOKIE))
        .unwrap_or_default();
    if !verify_csrf(Some(form.csrf_token.as_str()), expected) {
        return Err(AppError::Forbidden(
            "The login form has expired. Reload the page and try again.".to_string(),
        ));
    }

    let user = match state.data.user_by_username(form.username.trim())? {
        Some(user) => {
            let password = form.password.clone();
            let hash = user.password_hash.clone();
            let ok = state
                .blocking(move |_| Ok(verify_password(&password, &hash)))
                .await?;
            ok.then_some(user)
        }
        None => None,
    };

    let Some(user) = user else {
        tracing::warn!(
            event = "auth_failure",
            reason = "invalid_credentials",
            username = %form.username.trim(),
            "Failed login"
        );
        tokio::time::sleep(FAILED_LOGIN_DELAY).await;
        return render_login(
            &state,
            &form.csrf_token,
            form.username.trim(),
            &form.next,
            Some("Invalid username or password."),
            StatusCode::UNAUTHORIZED,
        )
        .await;
    };

    let session = state.sessions.create(&user);
    tracing::info!("User '{}' logged in", user.username);

    let config = &state.site.config.admin;
    Ok((
        AppendHeaders([
            (header::SET_COOKIE, session_cookie(config, &session.token)),
            (header::SET_COOKIE, clear_login_csrf_cookie()),
        ]),
        Redirect::to(safe_next(&form.next)),
    )
        .into_response())
}

/// POST /admin/logout
pub async fn logout(
    State(state): State<AppState>,
    session: AdminSession,
    Form(form): Form<LogoutForm>,
) -> Result<Response, AppError> {
    session.verify_csrf(&form.csrf_token)?;
    state.sessions.destroy(&session.0.token);
    tracing::info!("User '{}' logged out", session.0.username);

    Ok((
        [(
            header::SET_COOKIE,
            clear_cookie(&state.site.config.admin.cookie_name),
        )],
        Redirect::to("/admin/login"),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next("/admin/posts"), "/admin/posts");
        assert_eq!(safe_next("/admin"), "/admin");
        assert_eq!(safe_next("/admin?notice=saved"), "/admin?notice=saved");
        assert_eq!(safe_next("https://evil.example/admin"), "/admin");
        assert_eq!(safe_next("//evil.example"), "/admin");
        assert_eq!(safe_next("/administrator"), "/admin");
        assert_eq!(safe_next("/admin/login"), "/admin");
        assert_eq!(safe_next("/blog"), "/admin");
    }
}
