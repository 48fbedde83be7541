//! Named site roots

use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{FileManager, PathError, PathResolver, Result};

/// Maps root names (`pages`, `media`, ...) to directories
#[derive(Debug, Clone, Default)]
pub struct PathRegistry {
    roots: IndexMap<String, PathBuf>,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the standard CMS roots
    pub fn for_site(
        content_dir: &Path,
        media_dir: &Path,
        theme_dir: &Path,
        data_dir: &Path,
    ) -> Self {
        let mut registry = Self::new();
        registry.register("content", content_dir);
        registry.register("pages", content_dir.join("pages"));
        registry.register("posts", content_dir.join("posts"));
        registry.register("media", media_dir);
        registry.register("themes", theme_dir);
        registry.register("data", data_dir);
        registry
    }

    pub fn register<P: AsRef<Path>>(&mut self, name: &str, dir: P) {
        self.roots.insert(name.to_string(), dir.as_ref().to_path_buf());
    }

    pub fn root(&self, name: &str) -> Result<&Path> {
        self.roots
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| PathError::UnknownRoot(name.to_string()))
    }

    pub fn resolver(&self, name: &str) -> Result<PathResolver> {
        Ok(PathResolver::new(self.root(name)?))
    }

    pub fn files(&self, name: &str) -> Result<FileManager> {
        Ok(FileManager::new(self.resolver(name)?))
    }

    /// Create every registered directory
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in self.roots.values() {
            fs::create_dir_all(dir).map_err(PathError::io(dir))?;
        }
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_site_roots() {
        let dir = TempDir::new().unwrap();
        let base = dir.path();
        let registry = PathRegistry::for_site(
            &base.join("content"),
            &base.join("media"),
            &base.join("themes"),
            &base.join("data"),
        );
        assert_eq!(registry.root("posts").unwrap(), base.join("content/posts"));
        assert!(matches!(
            registry.root("cache"),
            Err(PathError::UnknownRoot(_))
        ));

        registry.ensure_dirs().unwrap();
        assert!(base.join("content/pages").is_dir());
        assert!(base.join("data").is_dir());
        assert_eq!(registry.names().count(), 6);
    }
}
