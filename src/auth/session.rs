//! In-memory admin sessions

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;

use super::random_token;
use crate::config::{AdminConfig, MAX_SESSION_TTL_MINUTES};
use crate::data::{Role, Stored, User};

/// A logged-in user
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    #[serde(skip_serializing)]
    pub token: String,
    pub user_id: u64,
    pub username: String,
    pub role: Role,
    pub csrf_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Sessions keyed by token, with a sliding expiry
#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(ttl_minutes: u64) -> Self {
        Self {
            // Clamped, so the conversion and `now + ttl` cannot overflow
            ttl: Duration::try_minutes(ttl_minutes.min(MAX_SESSION_TTL_MINUTES) as i64)
                .unwrap_or_else(|| Duration::minutes(MAX_SESSION_TTL_MINUTES as i64)),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn create(&self, user: &Stored<User>) -> Session {
        let session = Session {
            token: random_token(32),
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            csrf_token: random_token(32),
            expires_at: Utc::now() + self.ttl,
        };
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(session.token.clone(), session.clone());
        }
        tracing::debug!("Created session for '{}'", user.username);
        session
    }

    /// Look up a live session and extend its expiry
    pub fn get(&self, token: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().ok()?;
        let now = Utc::now();
        let session = sessions.get_mut(token)?;
        if session.expires_at <= now {
            sessions.remove(token);
            return None;
        }
        session.expires_at = now + self.ttl;
        Some(session.clone())
    }

    pub fn destroy(&self, token: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(token);
        }
    }

    /// Drop every session of a user, returning how many were removed
    pub fn destroy_user(&self, user_id: u64) -> usize {
        let Ok(mut sessions) = self.sessions.write() else {
            return 0;
        };
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        before - sessions.len()
    }

    /// Keep the role of live sessions in step with the users table
    pub fn update_role(&self, user_id: u64, role: Role) {
        if let Ok(mut sessions) = self.sessions.write() {
            for session in sessions.values_mut().filter(|s| s.user_id == user_id) {
                session.role = role;
            }
        }
    }

    pub fn purge_expired(&self) -> usize {
        let Ok(mut sessions) = self.sessions.write() else {
            return 0;
        };
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(config: &AdminConfig, token: &str) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        config.cookie_name, token
    );
    if config.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes a cookie
pub fn clear_cookie(name: &str) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", name)
}

/// Value of the named cookie in a `Cookie` request header
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64, role: Role) -> Stored<User> {
        Stored {
            id,
            record: User {
                username: format!("user{}", id),
                display_name: String::new(),
                email: String::new(),
                role,
                password_hash: String::new(),
                created_at: String::new(),
            },
        }
    }

    #[test]
    fn test_create_and_get() {
        let store = SessionStore::new(30);
        let session = store.create(&user(1, Role::Editor));
        assert_eq!(session.token.len(), 64);
        assert_ne!(session.token, session.csrf_token);

        let found = store.get(&session.token).unwrap();
        assert_eq!(found.username, "user1");
        assert!(!found.is_admin());
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_expired_sessions_are_removed() {
        let store = SessionStore::new(0);
        let session = store.create(&user(1, Role::Admin));
        assert!(store.get(&session.token).is_none());
        assert!(store.is_empty());

        store.create(&user(2, Role::Admin));
        assert_eq!(store.purge_expired(), 1);
    }

    #[test]
    fn test_oversized_ttl_is_clamped() {
        let store = SessionStore::new(u64::MAX);
        let session = store.create(&user(1, Role::Editor));
        assert!(store.get(&session.token).is_some());
        let limit = Utc::now() + Duration::minutes(MAX_SESSION_TTL_MINUTES as i64 + 1);
        assert!(session.expires_at < limit);
    }

    #[test]
    fn test_serialized_session_omits_token() {
        let store = SessionStore::new(30);
        let session = store.create(&user(1, Role::Admin));
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("token").is_none());
        assert_eq!(json["username"], "user1");
    }

    #[test]
    fn test_destroy_user() {
        let store = SessionStore::new(30);
        let a = store.create(&user(1, Role::Admin));
        store.create(&user(1, Role::Admin));
        let b = store.create(&user(2, Role::Editor));

        assert_eq!(store.destroy_user(1), 2);
        assert!(store.get(&a.token).is_none());
        assert!(store.get(&b.token).is_some());

        store.update_role(2, Role::Admin);
        assert!(store.get(&b.token).unwrap().is_admin());

        store.destroy(&b.token);
        assert!(store.is_empty());
    }

    #[test]
    fn test_cookies() {
        let mut config = AdminConfig::default();
        assert_eq!(
            session_cookie(&config, "abc"),
            "marques_session=abc; Path=/; HttpOnly; SameSite=Lax"
        );
        config.secure_cookies = true;
        assert!(session_cookie(&config, "abc").ends_with("; Secure"));
        assert!(clear_cookie("marques_session").contains("Max-Age=0"));

        let header = "theme=dark; marques_session=tok123; other=1";
        assert_eq!(cookie_value(header, "marques_session"), Some("tok123"));
        assert_eq!(cookie_value(header, "missing"), None);
    }
}
