//! Guarded filesystem primitives

use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;
use walkdir::WalkDir;

use super::{PathError, PathResolver, Result};

/// Reads and writes files under one root; every path goes through the resolver
#[derive(Debug, Clone)]
pub struct FileManager {
    resolver: PathResolver,
}

impl FileManager {
    pub fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn path(&self, relative: &str) -> Result<PathBuf> {
        self.resolver.resolve(relative)
    }

    pub fn exists(&self, relative: &str) -> Result<bool> {
        Ok(self.path(relative)?.is_file())
    }

    pub fn read_to_string(&self, relative: &str) -> Result<String> {
        let path = self.path(relative)?;
        fs::read_to_string(&path).map_err(PathError::io(&path))
    }

    pub fn read(&self, relative: &str) -> Result<Vec<u8>> {
        let path = self.path(relative)?;
        fs::read(&path).map_err(PathError::io(&path))
    }

    /// Write through a temporary sibling and rename into place
    pub fn write(&self, relative: &str, contents: impl AsRef<[u8]>) -> Result<()> {
        let path = self.path(relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(PathError::io(parent))?;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PathError::Traversal(relative.to_string()))?;
        let tmp = path.with_file_name(format!(".{}.tmp", file_name));

        fs::write(&tmp, contents).map_err(PathError::io(&tmp))?;
        fs::rename(&tmp, &path).map_err(PathError::io(&path))?;
        Ok(())
    }

    pub fn delete(&self, relative: &str) -> Result<()> {
        let path = self.path(relative)?;
        fs::remove_file(&path).map_err(PathError::io(&path))
    }

    pub fn size(&self, relative: &str) -> Result<u64> {
        let path = self.path(relative)?;
        Ok(fs::metadata(&path).map_err(PathError::io(&path))?.len())
    }

    pub fn modified(&self, relative: &str) -> Result<SystemTime> {
        let path = self.path(relative)?;
        fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(PathError::io(&path))
    }

    /// Files directly inside `dir`, sorted by name; hidden files are skipped
    pub fn list(&self, dir: &str) -> Result<Vec<String>> {
        let path = self.path(dir)?;
        if !path.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&path).map_err(PathError::io(&path))? {
            let entry = entry.map_err(PathError::io(&path))?;
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Root-relative paths matching a glob pattern, sorted
    pub fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        // Validate the literal part of the pattern like any other path
        self.path(pattern.replace(['*', '?', '[', ']'], "x").as_str())?;

        let full = self.resolver.root().join(pattern);
        let mut matches: Vec<String> = glob::glob(&full.to_string_lossy())?
            .filter_map(|entry| entry.ok())
            .filter(|p| p.is_file())
            .filter_map(|p| self.resolver.relative_to_root(&p))
            .collect();
        matches.sort();
        Ok(matches)
    }

    /// Every file under the root, recursively, as root-relative paths
    pub fn walk(&self) -> Vec<String> {
        let mut files: Vec<String> = WalkDir::new(self.resolver.root())
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| self.resolver.relative_to_root(e.path()))
            .filter(|p| !p.split('/').any(|part| part.starts_with('.')))
            .collect();
        files.sort();
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> FileManager {
        FileManager::new(PathResolver::new(dir.path()))
    }

    #[test]
    fn test_write_read_delete() {
        let dir = TempDir::new().unwrap();
        let files = manager(&dir);
        files.write("nested/a.md", "hello").unwrap();
        assert!(files.exists("nested/a.md").unwrap());
        assert_eq!(files.read_to_string("nested/a.md").unwrap(), "hello");
        assert_eq!(files.size("nested/a.md").unwrap(), 5);
        // No temp file left behind
        assert_eq!(files.list("nested").unwrap(), vec!["a.md"]);

        files.delete("nested/a.md").unwrap();
        assert!(!files.exists("nested/a.md").unwrap());
        let err = files.read_to_string("nested/a.md").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_traversal_rejected() {
        let dir = TempDir::new().unwrap();
        let files = manager(&dir);
        assert!(matches!(
            files.write("../escape.txt", "x"),
            Err(PathError::Traversal(_))
        ));
        assert!(files.read("../../etc/passwd").is_err());
        assert!(files.glob("../*").is_err());
    }

    #[test]
    fn test_glob_and_walk() {
        let dir = TempDir::new().unwrap();
        let files = manager(&dir);
        files.write("posts/b.md", "").unwrap();
        files.write("posts/a.md", "").unwrap();
        files.write("posts/c.txt", "").unwrap();
        files.write("media/x.png", "").unwrap();

        assert_eq!(
            files.glob("posts/*.md").unwrap(),
            vec!["posts/a.md", "posts/b.md"]
        );
        assert_eq!(files.walk().len(), 4);
        assert!(files.list("missing").unwrap().is_empty());
    }
}
