//! Path helpers - root-anchored resolution and guarded file access

mod files;
mod registry;
mod resolver;

use std::path::PathBuf;
use thiserror::Error;

pub use files::FileManager;
pub use registry::PathRegistry;
pub use resolver::PathResolver;

/// Errors raised while resolving or touching site paths
#[derive(Debug, Error)]
pub enum PathError {
    #[error("path escapes its root: {0}")]
    Traversal(String),

    #[error("unknown path root '{0}'")]
    UnknownRoot(String),

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PathError {
    pub(crate) fn io(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> PathError + '_ {
        move |source| PathError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether this error means the file does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, PathError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

pub type Result<T> = std::result::Result<T, PathError>;
