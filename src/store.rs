//! Whole-file text resources.  The proxy configuration code only ever reads a
//! file in full and writes it back in full, so that's mostly all this
//! exposes; the one extra is asking whether a link is already in place.

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::errors::{ErrorLayer, Result, ToolError};

pub trait TextStore {
    /// Current contents, or `None` if the resource doesn't exist.  An existing
    /// empty file is `Some("")`.
    fn read(&self, path: &Path) -> Result<Option<String>>;

    /// Replace the contents, creating the resource (and any parent
    /// directories) if needed.
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.read(path)?.is_some())
    }

    /// Whether anything at all, including a dangling symlink, occupies
    /// `path`.
    fn link_exists(&self, path: &Path) -> Result<bool>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsTextStore;

impl TextStore for FsTextStore {
    fn read(&self, path: &Path) -> Result<Option<String>> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ToolError::sticky(
                ErrorLayer::DataLayer,
                format!("Problem reading '{}': {}", path.display(), e),
            )),
        }
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        write_file_ensuring_parent_dir(path, contents)
    }

    fn link_exists(&self, path: &Path) -> Result<bool> {
        match std::fs::symlink_metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ToolError::sticky(
                ErrorLayer::DataLayer,
                format!("Problem checking '{}': {}", path.display(), e),
            )),
        }
    }
}

pub fn write_file_ensuring_parent_dir(file_path: &Path, contents: &str) -> Result<()> {
    let parent_path = match file_path.parent() {
        Some(p) => p,
        None => {
            return Err(ToolError::sticky(
                ErrorLayer::DataLayer,
                format!("Problem getting parent of '{}'", file_path.display()),
            ));
        }
    };
    if !parent_path.as_os_str().is_empty() {
        if let Err(e) = std::fs::create_dir_all(parent_path) {
            return Err(ToolError::sticky(
                ErrorLayer::DataLayer,
                format!("Problem creating parent of '{}': {}", file_path.display(), e),
            ));
        }
    }
    if let Err(e) = std::fs::write(file_path, contents) {
        return Err(ToolError::sticky(
            ErrorLayer::DataLayer,
            format!("Problem writing '{}': {}", file_path.display(), e),
        ));
    }
    Ok(())
}

/// In-memory store, for tests.
#[derive(Debug, Default)]
pub struct MemoryTextStore {
    files: RefCell<BTreeMap<PathBuf, String>>,
    links: BTreeSet<PathBuf>,
}

impl MemoryTextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files.borrow_mut().insert(path.into(), contents.into());
        self
    }

    /// Pretend a symlink already sits at `path`.
    pub fn with_link(mut self, path: impl Into<PathBuf>) -> Self {
        self.links.insert(path.into());
        self
    }

    pub fn get(&self, path: &Path) -> Option<String> {
        self.files.borrow().get(path).cloned()
    }
}

impl TextStore for MemoryTextStore {
    fn read(&self, path: &Path) -> Result<Option<String>> {
        Ok(self.get(path))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn link_exists(&self, path: &Path) -> Result<bool> {
        Ok(self.links.contains(path) || self.files.borrow().contains_key(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::temp_dir::TempDir;

    #[test]
    fn missing_file_is_none_and_empty_file_is_some() {
        let dir = TempDir::new("opstools-store");
        let missing = dir.join("missing.conf");
        let empty = dir.join("empty.conf");
        std::fs::write(&empty, "").unwrap();

        assert_eq!(FsTextStore.read(&missing).unwrap(), None);
        assert_eq!(FsTextStore.read(&empty).unwrap(), Some(String::new()));
    }

    #[test]
    fn write_creates_parent_directories() {
        let dir = TempDir::new("opstools-store");
        let nested = dir.join("a/b/c.conf");
        FsTextStore.write(&nested, "hello\n").unwrap();
        assert_eq!(FsTextStore.read(&nested).unwrap().as_deref(), Some("hello\n"));
    }

    #[test]
    fn dangling_symlink_counts_as_a_link() {
        let dir = TempDir::new("opstools-store");
        let link = dir.join("n8n-clients");
        assert!(!FsTextStore.link_exists(&link).unwrap());

        std::os::unix::fs::symlink(dir.join("does-not-exist"), &link).unwrap();
        assert!(FsTextStore.link_exists(&link).unwrap());
        assert!(!FsTextStore.exists(&link).unwrap());
    }

    #[test]
    fn memory_store_links_are_separate_from_files() {
        let store = MemoryTextStore::new().with_link("/etc/nginx/sites-enabled/a");
        let link = Path::new("/etc/nginx/sites-enabled/a");
        assert!(store.link_exists(link).unwrap());
        assert!(!store.exists(link).unwrap());
        assert!(!store.link_exists(Path::new("/etc/nginx/sites-enabled/b")).unwrap());
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryTextStore::new().with_file("/etc/x", "a");
        assert!(store.exists(Path::new("/etc/x")).unwrap());
        assert!(!store.exists(Path::new("/etc/y")).unwrap());
        store.write(Path::new("/etc/y"), "b").unwrap();
        assert_eq!(store.get(Path::new("/etc/y")).as_deref(), Some("b"));
    }
}
