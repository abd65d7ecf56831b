use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use walkdir::{DirEntry, WalkDir};

use crate::io::recovery::atomic_write;

/// Error type for vault access
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("file already exists: {0}")]
    AlreadyExists(String),
    #[error("could not access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Whole-file access to a tree of markdown documents.
///
/// Paths are vault-relative and always use `/`. Every write replaces the
/// full content of one file in a single step.
pub trait Vault {
    fn read(&self, path: &str) -> Result<String, VaultError>;

    /// Replace the content of an existing file.
    fn write(&self, path: &str, content: &str) -> Result<(), VaultError>;

    /// Create a new file. Fails if the file exists.
    fn create(&self, path: &str, content: &str) -> Result<(), VaultError>;

    fn exists(&self, path: &str) -> bool;

    /// Create a folder and its parents. Succeeds if it already exists.
    fn create_folder(&self, path: &str) -> Result<(), VaultError>;

    /// Every `.md` file, sorted.
    fn list_markdown_files(&self) -> Result<Vec<String>, VaultError>;
}

/// Parent folder of a vault path, if it has one
pub fn parent_folder(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(dir, _)| dir).filter(|d| !d.is_empty())
}

// ---------------------------------------------------------------------------
// Filesystem vault
// ---------------------------------------------------------------------------

/// Vault over a directory on disk. Writes go through a temp file + rename.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsVault { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }

    fn io_error(path: &str, source: io::Error) -> VaultError {
        if source.kind() == io::ErrorKind::NotFound {
            VaultError::NotFound(path.to_string())
        } else {
            VaultError::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

impl Vault for FsVault {
    fn read(&self, path: &str) -> Result<String, VaultError> {
        fs::read_to_string(self.resolve(path)).map_err(|e| Self::io_error(path, e))
    }

    fn write(&self, path: &str, content: &str) -> Result<(), VaultError> {
        let full = self.resolve(path);
        if !full.is_file() {
            return Err(VaultError::NotFound(path.to_string()));
        }
        atomic_write(&full, content.as_bytes()).map_err(|e| Self::io_error(path, e))
    }

    fn create(&self, path: &str, content: &str) -> Result<(), VaultError> {
        let full = self.resolve(path);
        if full.exists() {
            return Err(VaultError::AlreadyExists(path.to_string()));
        }
        atomic_write(&full, content.as_bytes()).map_err(|e| Self::io_error(path, e))
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn create_folder(&self, path: &str) -> Result<(), VaultError> {
        fs::create_dir_all(self.resolve(path)).map_err(|e| Self::io_error(path, e))
    }

    fn list_markdown_files(&self) -> Result<Vec<String>, VaultError> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !is_hidden(e));
        for entry in walker {
            let entry = entry.map_err(|e| VaultError::Io {
                path: e
                    .path()
                    .map_or_else(|| self.root.display().to_string(), |p| p.display().to_string()),
                source: e.into(),
            })?;
            if !entry.file_type().is_file()
                || entry.path().extension().and_then(|e| e.to_str()) != Some("md")
            {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&self.root) {
                files.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
        files.sort();
        Ok(files)
    }
}

// ---------------------------------------------------------------------------
// In-memory vault
// ---------------------------------------------------------------------------

/// Vault held in memory. Individual paths can be made to reject writes,
/// which is how partial failures of cross-file moves are exercised.
#[derive(Debug, Default)]
pub struct MemoryVault {
    files: Mutex<BTreeMap<String, String>>,
    folders: Mutex<BTreeSet<String>>,
    failing: Mutex<BTreeSet<String>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style seeding for tests and fixtures
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string(), content.to_string());
        self
    }

    /// Make every later write or create of `path` fail.
    pub fn fail_writes_to(&self, path: &str) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string());
    }

    pub fn allow_writes_to(&self, path: &str) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path);
    }

    /// Current content, if the file exists
    pub fn content(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
    }

    pub fn has_folder(&self, path: &str) -> bool {
        self.folders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(path)
    }

    fn check_writable(&self, path: &str) -> Result<(), VaultError> {
        let failing = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if failing.contains(path) {
            return Err(VaultError::Rejected(path.to_string()));
        }
        Ok(())
    }
}

impl Vault for MemoryVault {
    fn read(&self, path: &str) -> Result<String, VaultError> {
        self.content(path)
            .ok_or_else(|| VaultError::NotFound(path.to_string()))
    }

    fn write(&self, path: &str, content: &str) -> Result<(), VaultError> {
        self.check_writable(path)?;
        let mut files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        match files.get_mut(path) {
            Some(existing) => {
                *existing = content.to_string();
                Ok(())
            }
            None => Err(VaultError::NotFound(path.to_string())),
        }
    }

    fn create(&self, path: &str, content: &str) -> Result<(), VaultError> {
        self.check_writable(path)?;
        let mut files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        if files.contains_key(path) {
            return Err(VaultError::AlreadyExists(path.to_string()));
        }
        files.insert(path.to_string(), content.to_string());
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(path)
    }

    fn create_folder(&self, path: &str) -> Result<(), VaultError> {
        self.folders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string());
        Ok(())
    }

    fn list_markdown_files(&self) -> Result<Vec<String>, VaultError> {
        Ok(self
            .files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .filter(|p| p.ends_with(".md"))
            .cloned()
            .collect())
    }
}
