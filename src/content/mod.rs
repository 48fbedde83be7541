//! Content module - pages, posts and markdown processing

mod entry;
mod frontmatter;
mod markdown;
mod repository;

pub use entry::{Entry, EntryDraft, EntryKind, Status};
pub use frontmatter::{parse_date_string, split_tags, FrontMatter};
pub use markdown::MarkdownRenderer;
pub use repository::{validate_slug, ContentError, ContentRepository, Saved};
