//! Page and post models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Publication status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Published,
    Draft,
}

impl Status {
    pub fn from_form(value: &str) -> Self {
        if value.eq_ignore_ascii_case("draft") {
            Status::Draft
        } else {
            Status::Published
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Published => write!(f, "published"),
            Status::Draft => write!(f, "draft"),
        }
    }
}

/// Which collection an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Page,
    Post,
}

impl EntryKind {
    /// Path root holding this kind of entry
    pub fn root(&self) -> &'static str {
        match self {
            EntryKind::Page => "pages",
            EntryKind::Post => "posts",
        }
    }

    /// Default theme template
    pub fn template(&self) -> &'static str {
        match self {
            EntryKind::Page => "page",
            EntryKind::Post => "post",
        }
    }

    /// Public URL of an entry with this slug
    pub fn public_path(&self, slug: &str) -> String {
        match self {
            EntryKind::Page => format!("/{}", slug),
            EntryKind::Post => format!("/blog/{}", slug),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Page => "Page",
            EntryKind::Post => "Post",
        }
    }
}

/// A page or blog post loaded from disk
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub kind: EntryKind,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub date: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub template: Option<String>,
    pub tags: Vec<String>,
    pub author: Option<String>,
    /// Markdown source (without front-matter)
    pub body: String,
    /// Rendered HTML
    pub html: String,
    /// Rendered excerpt HTML
    pub excerpt_html: String,
    /// Public URL path
    pub path: String,
}

impl Entry {
    pub fn is_published(&self) -> bool {
        self.status == Status::Published
    }
}

/// Values submitted from the admin editor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryDraft {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub status: String,
    pub template: String,
    pub tags: String,
    pub author: String,
    pub body: String,
}

impl EntryDraft {
    /// Prefill the editor from an existing entry
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            title: entry.title.clone(),
            slug: entry.slug.clone(),
            description: entry.description.clone(),
            status: entry.status.to_string(),
            template: entry.template.clone().unwrap_or_default(),
            tags: entry.tags.join(", "),
            author: entry.author.clone().unwrap_or_default(),
            body: entry.body.clone(),
        }
    }
}
