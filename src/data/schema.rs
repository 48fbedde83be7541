//! Table schemas and default rows

use serde_json::Value;

use super::records::{NavItem, Row, UrlMapping};
use super::{DataError, Result};
use crate::config::SiteConfig;

pub const SETTINGS: &str = "settings";
pub const NAVIGATION: &str = "navigation";
pub const USERS: &str = "users";
pub const URL_MAPPINGS: &str = "url_mappings";

/// Kind of value a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Bool,
}

impl FieldKind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::Text => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Bool => value.is_boolean(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Bool => "bool",
        }
    }
}

/// A single column definition
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub unique: bool,
}

impl FieldDef {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            unique: false,
        }
    }

    fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Schema of one table
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: &'static str,
    pub fields: Vec<FieldDef>,
}

impl TableSchema {
    pub fn settings() -> Self {
        Self {
            name: SETTINGS,
            fields: vec![
                FieldDef::text("key").required().unique(),
                FieldDef::text("value"),
            ],
        }
    }

    pub fn navigation() -> Self {
        Self {
            name: NAVIGATION,
            fields: vec![
                FieldDef::text("label").required(),
                FieldDef::text("url").required(),
                FieldDef::integer("position").required(),
                FieldDef::integer("parent_id"),
                FieldDef::boolean("visible").required(),
            ],
        }
    }

    pub fn users() -> Self {
        Self {
            name: USERS,
            fields: vec![
                FieldDef::text("username").required().unique(),
                FieldDef::text("display_name"),
                FieldDef::text("email"),
                FieldDef::text("role").required(),
                FieldDef::text("password_hash").required(),
                FieldDef::text("created_at").required(),
            ],
        }
    }

    pub fn url_mappings() -> Self {
        Self {
            name: URL_MAPPINGS,
            fields: vec![
                FieldDef::text("from").required().unique(),
                FieldDef::text("to").required(),
                FieldDef::integer("status").required(),
            ],
        }
    }

    /// Every table the CMS uses
    pub fn all() -> Vec<Self> {
        vec![
            Self::settings(),
            Self::navigation(),
            Self::users(),
            Self::url_mappings(),
        ]
    }

    /// Fields that must hold distinct values across the table
    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.unique)
    }

    /// Check a row against this schema
    pub fn validate(&self, row: &Row) -> Result<()> {
        for key in row.keys() {
            if !self.fields.iter().any(|f| f.name == key) {
                return Err(self.invalid(format!("unknown field '{}'", key)));
            }
        }

        for field in &self.fields {
            match row.get(field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        return Err(self.invalid(format!("missing field '{}'", field.name)));
                    }
                }
                Some(value) => {
                    if !field.kind.matches(value) {
                        return Err(self.invalid(format!(
                            "field '{}' must be {}",
                            field.name,
                            field.kind.name()
                        )));
                    }
                    if field.required && value.as_str().is_some_and(|s| s.trim().is_empty()) {
                        return Err(self.invalid(format!("field '{}' is empty", field.name)));
                    }
                }
            }
        }

        Ok(())
    }

    fn invalid(&self, message: String) -> DataError {
        DataError::Invalid {
            table: self.name.to_string(),
            message,
        }
    }
}

/// Rows seeded into fresh tables
#[derive(Debug, Clone)]
pub struct Defaults {
    pub settings: Vec<(String, String)>,
    pub navigation: Vec<NavItem>,
    pub url_mappings: Vec<UrlMapping>,
}

impl Defaults {
    /// Defaults taken from the site configuration
    pub fn from_site(config: &SiteConfig) -> Self {
        let settings = [
            ("site_title", config.title.clone()),
            ("tagline", config.tagline.clone()),
            ("description", config.description.clone()),
            ("theme", config.theme.clone()),
            ("posts_per_page", config.posts_per_page.to_string()),
            ("footer_text", format!("© {}", config.title)),
            ("home_page", String::new()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            settings,
            navigation: vec![NavItem::new("Home", "/", 0), NavItem::new("Blog", "/blog", 1)],
            url_mappings: vec![
                UrlMapping::new("/index.html", "/", 301),
                UrlMapping::new("/feed", "/blog", 302),
            ],
        }
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self::from_site(&SiteConfig::default())
    }
}
