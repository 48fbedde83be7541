//! Content repository - page and post CRUD on markdown files

use anyhow::Result;
use chrono::Utc;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;

use super::entry::{Entry, EntryDraft, EntryKind, Status};
use super::frontmatter::{split_tags, FrontMatter};
use super::MarkdownRenderer;
use crate::paths::{FileManager, PathRegistry};

lazy_static! {
    static ref SLUG_PATTERN: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

/// Page slugs that would shadow built-in routes
const RESERVED_PAGE_SLUGS: [&str; 5] = ["admin", "blog", "tag", "media", "theme"];

/// Validation failures reported back to the editor
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("Title is required")]
    MissingTitle,

    #[error("Slug '{0}' may only contain lowercase letters, digits and single hyphens")]
    InvalidSlug(String),

    #[error("Slug '{0}' is reserved")]
    ReservedSlug(String),

    #[error("Slug '{0}' is already in use")]
    SlugTaken(String),

    #[error("{0} '{1}' not found")]
    NotFound(&'static str, String),
}

/// Result of a save: the stored entry and the slug it replaced, if renamed
#[derive(Debug, Clone)]
pub struct Saved {
    pub entry: Entry,
    pub renamed_from: Option<String>,
}

/// Loads, saves and deletes pages and posts
#[derive(Clone)]
pub struct ContentRepository {
    pages: FileManager,
    posts: FileManager,
    renderer: Arc<MarkdownRenderer>,
}

impl ContentRepository {
    pub fn new(registry: &PathRegistry) -> Result<Self> {
        Ok(Self {
            pages: registry.files("pages")?,
            posts: registry.files("posts")?,
            renderer: Arc::new(MarkdownRenderer::new()),
        })
    }

    fn files(&self, kind: EntryKind) -> &FileManager {
        match kind {
            EntryKind::Page => &self.pages,
            EntryKind::Post => &self.posts,
        }
    }

    /// All entries of a kind: posts newest first, pages by title
    pub fn list(&self, kind: EntryKind) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for file in self.files(kind).glob("*.md")? {
            let slug = file.trim_end_matches(".md");
            match self.load(kind, slug) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Failed to load {} {:?}: {}", kind.root(), file, e),
            }
        }

        match kind {
            EntryKind::Post => entries.sort_by(|a, b| b.date.cmp(&a.date).then(a.slug.cmp(&b.slug))),
            EntryKind::Page => {
                entries.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
            }
        }
        Ok(entries)
    }

    /// Published entries only
    pub fn published(&self, kind: EntryKind) -> Result<Vec<Entry>> {
        Ok(self
            .list(kind)?
            .into_iter()
            .filter(Entry::is_published)
            .collect())
    }

    pub fn get(&self, kind: EntryKind, slug: &str) -> Result<Option<Entry>> {
        if !SLUG_PATTERN.is_match(slug) {
            return Ok(None);
        }
        if !self.files(kind).exists(&file_name(slug))? {
            return Ok(None);
        }
        self.load(kind, slug).map(Some)
    }

    fn load(&self, kind: EntryKind, slug: &str) -> Result<Entry> {
        let files = self.files(kind);
        let name = file_name(slug);
        let raw = files.read_to_string(&name)?;
        let (fm, body) = FrontMatter::parse(&raw)?;

        let modified = files
            .modified(&name)
            .map(chrono::DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let date = fm.parse_date().unwrap_or(modified);
        let updated = fm.parse_updated().unwrap_or(date);

        let html = self.renderer.render(body)?;
        let excerpt_html = match kind {
            EntryKind::Post => self.renderer.render(&MarkdownRenderer::excerpt_source(body))?,
            EntryKind::Page => String::new(),
        };

        Ok(Entry {
            kind,
            slug: slug.to_string(),
            title: fm.title.clone().unwrap_or_else(|| slug.to_string()),
            description: fm.description.clone().unwrap_or_default(),
            status: fm.status,
            date,
            updated,
            template: fm.template.clone().filter(|t| !t.is_empty()),
            tags: fm.tags.clone(),
            author: fm.author.clone(),
            body: body.to_string(),
            html,
            excerpt_html,
            path: kind.public_path(slug),
        })
    }

    /// Create or update an entry
    ///
    /// `original_slug` is the slug being edited, `None` when creating.
    pub fn save(
        &self,
        kind: EntryKind,
        draft: &EntryDraft,
        original_slug: Option<&str>,
    ) -> Result<Saved> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(ContentError::MissingTitle.into());
        }

        let slug = match draft.slug.trim() {
            "" => slug::slugify(title),
            given => given.to_string(),
        };
        validate_slug(kind, &slug)?;

        let files = self.files(kind);
        let existing = match original_slug {
            Some(original) => Some(
                self.get(kind, original)?
                    .ok_or_else(|| ContentError::NotFound(kind.label(), original.to_string()))?,
            ),
            None => None,
        };

        let renamed_from = original_slug.filter(|o| *o != slug).map(str::to_string);
        if (existing.is_none() || renamed_from.is_some()) && files.exists(&file_name(&slug))? {
            return Err(ContentError::SlugTaken(slug).into());
        }

        // Keep fields this editor does not manage
        let mut fm = match original_slug {
            Some(original) => {
                let raw = files.read_to_string(&file_name(original))?;
                FrontMatter::parse(&raw)?.0
            }
            None => FrontMatter::default(),
        };

        let now = Utc::now();
        fm.title = Some(title.to_string());
        fm.description = non_empty(&draft.description);
        fm.status = Status::from_form(&draft.status);
        fm.date = Some(existing.as_ref().map(|e| e.date).unwrap_or(now).to_rfc3339());
        fm.updated = Some(now.to_rfc3339());
        fm.template = non_empty(&draft.template);
        match kind {
            EntryKind::Post => {
                fm.tags = split_tags(&draft.tags);
                fm.author = non_empty(&draft.author);
            }
            EntryKind::Page => {
                fm.tags.clear();
                fm.author = None;
            }
        }

        let body = draft.body.replace("\r\n", "\n");
        files.write(&file_name(&slug), fm.render(&body)?)?;
        if let Some(old) = &renamed_from {
            files.delete(&file_name(old))?;
        }

        tracing::info!(
            "Saved {} '{}'{}",
            kind.root(),
            slug,
            renamed_from
                .as_ref()
                .map(|old| format!(" (renamed from '{}')", old))
                .unwrap_or_default()
        );

        Ok(Saved {
            entry: self.load(kind, &slug)?,
            renamed_from,
        })
    }

    pub fn delete(&self, kind: EntryKind, slug: &str) -> Result<()> {
        if self.get(kind, slug)?.is_none() {
            return Err(ContentError::NotFound(kind.label(), slug.to_string()).into());
        }
        self.files(kind).delete(&file_name(slug))?;
        tracing::info!("Deleted {} '{}'", kind.root(), slug);
        Ok(())
    }

    /// Tag usage across published posts, sorted by tag name
    pub fn tags(&self) -> Result<IndexMap<String, usize>> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for post in self.published(EntryKind::Post)? {
            for tag in post.tags {
                match counts
                    .iter_mut()
                    .find(|(t, _)| slug::slugify(t) == slug::slugify(&tag))
                {
                    Some((_, count)) => *count += 1,
                    None => counts.push((tag, 1)),
                }
            }
        }
        counts.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));
        Ok(counts.into_iter().collect())
    }

    /// Published posts carrying a tag, compared by slug
    pub fn posts_with_tag(&self, tag: &str) -> Result<Vec<Entry>> {
        let wanted = slug::slugify(tag);
        Ok(self
            .published(EntryKind::Post)?
            .into_iter()
            .filter(|p| p.tags.iter().any(|t| slug::slugify(t) == wanted))
            .collect())
    }
}

fn file_name(slug: &str) -> String {
    format!("{}.md", slug)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check a slug for format and reserved names
pub fn validate_slug(kind: EntryKind, slug: &str) -> std::result::Result<(), ContentError> {
    if !SLUG_PATTERN.is_match(slug) {
        return Err(ContentError::InvalidSlug(slug.to_string()));
    }
    if kind == EntryKind::Page && RESERVED_PAGE_SLUGS.contains(&slug) {
        return Err(ContentError::ReservedSlug(slug.to_string()));
    }
    Ok(())
}
