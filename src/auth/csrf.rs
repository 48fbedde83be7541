//! CSRF token checks

use super::constant_time_eq;

/// Double-submit cookie used by the login form before a session exists
pub const LOGIN_CSRF_COOKIE: &str = "marques_login_csrf";

/// `Set-Cookie` value for the login form token
pub fn login_csrf_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/admin; HttpOnly; SameSite=Strict; Max-Age=3600",
        LOGIN_CSRF_COOKIE, token
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the login form token
///
/// Must carry the same `Path` the cookie was set with.
pub fn clear_login_csrf_cookie() -> String {
    format!(
        "{}=; Path=/admin; HttpOnly; SameSite=Strict; Max-Age=0",
        LOGIN_CSRF_COOKIE
    )
}

/// Compare a submitted token with the expected one
///
/// Missing or empty tokens never match. Failures are logged.
pub fn verify_csrf(submitted: Option<&str>, expected: &str) -> bool {
    let ok = match submitted {
        Some(submitted) if !submitted.is_empty() && !expected.is_empty() => {
            constant_time_eq(submitted, expected)
        }
        _ => false,
    };
    if !ok {
        let reason = if submitted.map_or(true, str::is_empty) {
            "missing_token"
        } else {
            "token_mismatch"
        };
        tracing::warn!(
            event = "csrf_failure",
            reason,
            "Rejected request with invalid CSRF token"
        );
    }
    ok
}
