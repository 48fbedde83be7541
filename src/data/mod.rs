//! Flat-file data layer
//!
//! Schema'd tables (settings, navigation, users, URL mappings) stored as
//! append-only JSON-lines files. [`Handler`] is the entry point: it opens the
//! tables with retry, seeds default rows, and compacts the logs over time.

mod config;
mod handler;
pub mod records;
pub mod schema;
pub mod store;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use config::Config;
pub use handler::{spawn_compactor, Handler, REDIRECT_STATUSES};
pub use records::{NavItem, NavNode, Record, Role, Row, Setting, Stored, UrlMapping, User};
pub use schema::{Defaults, TableSchema};
pub use store::{Table, TableStats};

/// Errors raised by the data layer
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid record for table '{table}': {message}")]
    Invalid { table: String, message: String },

    #[error("value '{value}' for unique field '{field}' already exists in table '{table}'")]
    Duplicate {
        table: String,
        field: String,
        value: String,
    },

    #[error("record {id} not found in table '{table}'")]
    NotFound { table: String, id: u64 },

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("data store lock poisoned")]
    Poisoned,

    #[error("failed to initialize data store after {attempts} attempts: {last}")]
    InitFailed { attempts: u32, last: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DataError>;

/// Build a mapper from `io::Error` to [`DataError::Io`] for the given path
pub(crate) fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DataError + '_ {
    move |source| DataError::Io {
        path: path.to_path_buf(),
        source,
    }
}
