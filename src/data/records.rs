//! Typed records stored in the data tables

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::schema::{NAVIGATION, SETTINGS, URL_MAPPINGS, USERS};
use super::{DataError, Result};

/// A raw table row
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A typed record that maps onto one table
pub trait Record: Serialize + DeserializeOwned {
    /// Name of the backing table
    const TABLE: &'static str;

    /// Convert into a raw row
    fn to_row(&self) -> Result<Row> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(DataError::Invalid {
                table: Self::TABLE.to_string(),
                message: format!("expected an object, got {}", other),
            }),
        }
    }

    /// Build from a raw row
    fn from_row(row: &Row) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(
            row.clone(),
        ))?)
    }
}

/// A record together with its table id
#[derive(Debug, Clone, Serialize)]
pub struct Stored<T> {
    pub id: u64,
    #[serde(flatten)]
    pub record: T,
}

impl<T> std::ops::Deref for Stored<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.record
    }
}

/// A key/value site setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl Record for Setting {
    const TABLE: &'static str = SETTINGS;
}

/// A navigation menu entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavItem {
    pub label: String,
    pub url: String,
    pub position: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,
    pub visible: bool,
}

impl Record for NavItem {
    const TABLE: &'static str = NAVIGATION;
}

impl NavItem {
    pub fn new(label: &str, url: &str, position: i64) -> Self {
        Self {
            label: label.to_string(),
            url: url.to_string(),
            position,
            parent_id: None,
            visible: true,
        }
    }
}

/// A navigation entry arranged for rendering
#[derive(Debug, Clone, Serialize)]
pub struct NavNode {
    pub id: u64,
    pub label: String,
    pub url: String,
    pub active: bool,
    pub children: Vec<NavNode>,
}

impl NavNode {
    /// Arrange visible items into a one-level tree, marking the entry that
    /// matches `current_path`.
    ///
    /// Children whose parent is hidden or missing are promoted to the top level.
    pub fn tree(items: &[Stored<NavItem>], current_path: &str) -> Vec<NavNode> {
        let visible: Vec<&Stored<NavItem>> = items.iter().filter(|i| i.visible).collect();
        let is_root = |item: &Stored<NavItem>| match item.parent_id {
            None => true,
            Some(parent) => !visible.iter().any(|p| p.id == parent && p.parent_id.is_none()),
        };

        let node = |item: &Stored<NavItem>| NavNode {
            id: item.id,
            label: item.label.clone(),
            url: item.url.clone(),
            active: is_active(&item.url, current_path),
            children: Vec::new(),
        };

        let mut roots: Vec<NavNode> = visible.iter().filter(|i| is_root(i)).map(|i| node(i)).collect();
        for root in &mut roots {
            root.children = visible
                .iter()
                .filter(|i| i.parent_id == Some(root.id) && !is_root(i))
                .map(|i| node(i))
                .collect();
            if root.children.iter().any(|c| c.active) {
                root.active = true;
            }
        }
        roots
    }
}

fn is_active(url: &str, current_path: &str) -> bool {
    if url == "/" {
        return current_path == "/";
    }
    let url = url.trim_end_matches('/');
    current_path == url || current_path.starts_with(&format!("{}/", url))
}

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Editor => write!(f, "editor"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// A back-office account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
    pub password_hash: String,
    pub created_at: String,
}

impl Record for User {
    const TABLE: &'static str = USERS;
}

/// A redirect from a legacy or renamed path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlMapping {
    pub from: String,
    pub to: String,
    pub status: u16,
}

impl Record for UrlMapping {
    const TABLE: &'static str = URL_MAPPINGS;
}

impl UrlMapping {
    pub fn new(from: &str, to: &str, status: u16) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            status,
        }
    }
}

/// Normalize a site-local path: leading slash, no trailing slash except root
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return trimmed.to_string();
    }
    let trimmed = trimmed.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}
