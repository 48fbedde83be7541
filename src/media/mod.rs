//! Media library - uploaded files under the media root

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use thiserror::Error;

use crate::config::MediaConfig;
use crate::paths::{FileManager, PathError};

/// Characters kept as-is in media URLs
const URL_SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "svg"];

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("The uploaded file is empty")]
    Empty,

    #[error("The file is {size} bytes; the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("Files of type '{0}' are not allowed")]
    ExtensionNotAllowed(String),

    #[error("Invalid file name '{0}'")]
    InvalidName(String),

    #[error("File '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Path(#[from] PathError),
}

/// One file in the library
#[derive(Debug, Clone, Serialize)]
pub struct MediaItem {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub url: String,
    pub is_image: bool,
}

/// Stores, lists and deletes uploads
#[derive(Debug, Clone)]
pub struct MediaLibrary {
    files: FileManager,
    config: MediaConfig,
}

impl MediaLibrary {
    pub fn new(files: FileManager, config: MediaConfig) -> Self {
        Self { files, config }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.config.max_upload_bytes
    }

    /// All files, newest first
    pub fn list(&self) -> Result<Vec<MediaItem>, MediaError> {
        let mut items = Vec::new();
        for name in self.files.list("")? {
            items.push(self.item(&name)?);
        }
        items.sort_by(|a, b| b.modified.cmp(&a.modified).then(a.name.cmp(&b.name)));
        Ok(items)
    }

    fn item(&self, name: &str) -> Result<MediaItem, MediaError> {
        Ok(MediaItem {
            name: name.to_string(),
            size: self.files.size(name)?,
            modified: self.files.modified(name)?.into(),
            url: media_url(name),
            is_image: extension(name)
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
                .unwrap_or(false),
        })
    }

    /// Store an upload under a sanitized, collision-free name
    pub fn store(&self, original_name: &str, bytes: &[u8]) -> Result<MediaItem, MediaError> {
        if bytes.is_empty() {
            return Err(MediaError::Empty);
        }
        if bytes.len() > self.config.max_upload_bytes {
            return Err(MediaError::TooLarge {
                size: bytes.len(),
                limit: self.config.max_upload_bytes,
            });
        }

        let base = original_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(original_name);
        let ext = extension(base).ok_or_else(|| MediaError::ExtensionNotAllowed(String::new()))?;
        if !self
            .config
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&ext))
        {
            return Err(MediaError::ExtensionNotAllowed(ext));
        }

        let stem = base[..base.len() - ext.len() - 1].to_string();
        let stem = match slug::slugify(&stem) {
            s if s.is_empty() => "file".to_string(),
            s => s,
        };

        let mut name = format!("{}.{}", stem, ext);
        let mut counter = 1;
        while self.files.exists(&name)? {
            name = format!("{}-{}.{}", stem, counter, ext);
            counter += 1;
        }

        self.files.write(&name, bytes)?;
        tracing::info!("Stored media '{}' ({} bytes)", name, bytes.len());
        self.item(&name)
    }

    pub fn delete(&self, name: &str) -> Result<(), MediaError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(MediaError::InvalidName(name.to_string()));
        }
        if !self.files.exists(name)? {
            return Err(MediaError::NotFound(name.to_string()));
        }
        self.files.delete(name)?;
        tracing::info!("Deleted media '{}'", name);
        Ok(())
    }

    pub fn count(&self) -> Result<usize, MediaError> {
        Ok(self.files.list("")?.len())
    }
}

/// Lowercased extension of a file name
fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Public URL of a media file
pub fn media_url(name: &str) -> String {
    format!("/media/{}", utf8_percent_encode(name, URL_SAFE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::PathResolver;
    use tempfile::TempDir;

    fn library(dir: &TempDir) -> MediaLibrary {
        let config = MediaConfig {
            max_upload_bytes: 16,
            ..MediaConfig::default()
        };
        MediaLibrary::new(FileManager::new(PathResolver::new(dir.path())), config)
    }

    #[test]
    fn test_store_sanitizes_and_dedupes() {
        let dir = TempDir::new().unwrap();
        let media = library(&dir);

        let first = media.store("My Photo.PNG", b"png").unwrap();
        assert_eq!(first.name, "my-photo.png");
        assert!(first.is_image);
        assert_eq!(first.url, "/media/my-photo.png");

        let second = media.store("C:\\Users\\me\\My Photo.png", b"png").unwrap();
        assert_eq!(second.name, "my-photo-1.png");
        assert_eq!(media.list().unwrap().len(), 2);
    }

    #[test]
    fn test_store_rejections() {
        let dir = TempDir::new().unwrap();
        let media = library(&dir);
        assert!(matches!(media.store("a.png", b""), Err(MediaError::Empty)));
        assert!(matches!(
            media.store("a.png", &[0u8; 17]),
            Err(MediaError::TooLarge { size: 17, limit: 16 })
        ));
        assert!(matches!(
            media.store("run.exe", b"x"),
            Err(MediaError::ExtensionNotAllowed(ext)) if ext == "exe"
        ));
        assert!(media.store("noextension", b"x").is_err());
    }

    #[test]
    fn test_delete_guards_names() {
        let dir = TempDir::new().unwrap();
        let media = library(&dir);
        media.store("doc.pdf", b"%PDF").unwrap();
        assert!(matches!(
            media.delete("../doc.pdf"),
            Err(MediaError::InvalidName(_))
        ));
        assert!(matches!(
            media.delete("missing.pdf"),
            Err(MediaError::NotFound(_))
        ));
        media.delete("doc.pdf").unwrap();
        assert_eq!(media.count().unwrap(), 0);
    }

    #[test]
    fn test_media_url_encodes() {
        assert_eq!(media_url("a b.png"), "/media/a%20b.png");
    }
}
