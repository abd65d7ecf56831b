use crate::io::vault::{Vault, VaultError};
use crate::model::config::TaskboardConfig;
use crate::model::task::{Task, split_task_id};
use crate::ops::task_ops::TaskError;
use crate::parse::{parse_task, parse_tasks};

/// Collects task records from the vault according to the config.
pub struct TaskScanner<'a, V: Vault + ?Sized> {
    vault: &'a V,
    config: &'a TaskboardConfig,
}

impl<'a, V: Vault + ?Sized> TaskScanner<'a, V> {
    pub fn new(vault: &'a V, config: &'a TaskboardConfig) -> Self {
        TaskScanner { vault, config }
    }

    /// Excluded folders always win. A non-empty include list limits
    /// scanning to those folders.
    pub fn is_excluded(&self, path: &str) -> bool {
        let scan = &self.config.scan;
        if scan.exclude_folders.iter().any(|f| in_folder(path, f)) {
            return true;
        }
        !scan.include_folders.is_empty()
            && !scan.include_folders.iter().any(|f| in_folder(path, f))
    }

    pub fn scan_file(&self, path: &str) -> Result<Vec<Task>, VaultError> {
        let content = self.vault.read(path)?;
        Ok(parse_tasks(&content, path))
    }

    pub fn scan_vault(&self) -> Result<Vec<Task>, VaultError> {
        let mut tasks = Vec::new();
        let mut files = 0;
        for path in self.vault.list_markdown_files()? {
            if self.is_excluded(&path) {
                continue;
            }
            match self.scan_file(&path) {
                Ok(found) => {
                    tasks.extend(found);
                    files += 1;
                }
                Err(e) => tracing::warn!(path = %path, error = %e, "unreadable file, skipped"),
            }
        }
        tracing::debug!(files, tasks = tasks.len(), "scanned vault");
        Ok(tasks)
    }

    /// Recurring templates plus active todos. Missing files are skipped.
    pub fn scan_configured_files(&self) -> Result<Vec<Task>, VaultError> {
        let files = &self.config.files;
        let mut tasks = Vec::new();
        for path in [&files.recurring, &files.todo] {
            if self.vault.exists(path) {
                tasks.extend(self.scan_file(path)?);
            } else {
                tracing::debug!(path = %path, "configured file missing, skipped");
            }
        }
        Ok(tasks)
    }

    /// Board tasks, from the configured files or the whole vault.
    pub fn tasks(&self) -> Result<Vec<Task>, VaultError> {
        if self.config.files.three_file_system {
            self.scan_configured_files()
        } else {
            self.scan_vault()
        }
    }

    pub fn scan_archive_file(&self) -> Result<Vec<Task>, VaultError> {
        let path = &self.config.files.archive;
        if !self.vault.exists(path) {
            return Ok(Vec::new());
        }
        self.scan_file(path)
    }

    /// Re-read the task a `path:line` id points at.
    pub fn find_by_id(&self, id: &str) -> Result<Task, TaskError> {
        let (path, line_number) =
            split_task_id(id).ok_or_else(|| TaskError::FileNotFound(id.to_string()))?;
        let content = self.vault.read(path).map_err(|e| match e {
            VaultError::NotFound(p) => TaskError::FileNotFound(p),
            other => TaskError::Vault(other),
        })?;
        content
            .split('\n')
            .nth(line_number - 1)
            .and_then(|line| parse_task(line, path, line_number))
            .ok_or_else(|| TaskError::LineNotFound {
                path: path.to_string(),
                line: line_number,
            })
    }
}

/// `path` is the folder itself or lies somewhere beneath it.
fn in_folder(path: &str, folder: &str) -> bool {
    let folder = folder.trim_end_matches('/');
    path == folder
        || path
            .strip_prefix(folder)
            .is_some_and(|rest| rest.starts_with('/'))
}
