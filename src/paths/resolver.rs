//! Lexical path resolution under a fixed root

use std::path::{Component, Path, PathBuf};

use super::{PathError, Result};

/// Resolves root-relative paths, refusing anything that climbs out of the root
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `relative` against the root
    ///
    /// Works on paths that do not exist yet. `.` segments are dropped and
    /// `..` pops a segment; popping past the root is a traversal error.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let reject = || {
            tracing::warn!(
                event = "path_traversal",
                root = %self.root.display(),
                "Rejected path {:?}",
                relative
            );
            PathError::Traversal(relative.to_string())
        };

        if relative.contains('\0') || relative.contains('\\') {
            return Err(reject());
        }

        let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => parts.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if parts.pop().is_none() {
                        return Err(reject());
                    }
                }
                Component::RootDir | Component::Prefix(_) => return Err(reject()),
            }
        }

        let mut resolved = self.root.clone();
        resolved.extend(parts);
        Ok(resolved)
    }

    /// Express an absolute path under the root as a `/`-separated relative path
    pub fn relative_to_root(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}
