use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Status tag written when a task is added, restored or regenerated
pub const DEFAULT_STATUS: &str = "todo";

/// Column that also collects every checked task
pub const DONE_STATUS: &str = "done";

/// Column id reserved for the archive view
pub const RESERVED_COLUMN_ID: &str = "archived";

static COLUMN_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w-]+$").unwrap());

/// Configuration from taskboard.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskboardConfig {
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Status tag given to added, restored and regenerated tasks
    #[serde(default = "default_status")]
    pub default_status: String,
    /// Show checked tasks outside the done column
    #[serde(default)]
    pub include_completed: bool,
    #[serde(default = "default_columns")]
    pub columns: Vec<ColumnConfig>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            default_status: default_status(),
            include_completed: false,
            columns: default_columns(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub id: String,
    pub name: String,
}

impl ColumnConfig {
    pub fn new(id: &str, name: &str) -> Self {
        ColumnConfig {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Folders never scanned, with everything beneath them
    #[serde(default = "default_exclude_folders")]
    pub exclude_folders: Vec<String>,
    /// When non-empty, only these folders are scanned
    #[serde(default)]
    pub include_folders: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            exclude_folders: default_exclude_folders(),
            include_folders: Vec::new(),
        }
    }
}

/// The three-file layout: recurring templates, active todos, and an archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    #[serde(default)]
    pub three_file_system: bool,
    #[serde(default = "default_recurring_file")]
    pub recurring: String,
    #[serde(default = "default_todo_file")]
    pub todo: String,
    #[serde(default = "default_archive_file")]
    pub archive: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        FilesConfig {
            three_file_system: false,
            recurring: default_recurring_file(),
            todo: default_todo_file(),
            archive: default_archive_file(),
        }
    }
}

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

fn default_columns() -> Vec<ColumnConfig> {
    vec![
        ColumnConfig::new("todo", "To Do"),
        ColumnConfig::new("doing", "Doing"),
        ColumnConfig::new("done", "Done"),
    ]
}

fn default_exclude_folders() -> Vec<String> {
    vec![".obsidian".to_string(), "templates".to_string()]
}

fn default_recurring_file() -> String {
    "Tasks/recurring.md".to_string()
}

fn default_todo_file() -> String {
    "Tasks/todo.md".to_string()
}

fn default_archive_file() -> String {
    "Tasks/archive.md".to_string()
}

// ---------------------------------------------------------------------------
// Column id validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColumnIdError {
    #[error("Column ID cannot be empty")]
    Empty,
    #[error("Column ID can only contain letters, numbers, underscores, and hyphens")]
    InvalidCharacters,
    #[error("\"archived\" is a reserved ID")]
    Reserved,
    #[error("Column ID must be unique: {0}")]
    Duplicate(String),
}

/// Validate a column id against the other ids on the board. Returns the
/// normalized (trimmed, lowercased) id. `current` is the id being edited,
/// which may keep its own value.
pub fn validate_column_id(
    id: &str,
    existing: &[&str],
    current: Option<&str>,
) -> Result<String, ColumnIdError> {
    let normalized = id.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(ColumnIdError::Empty);
    }
    if !COLUMN_ID_RE.is_match(&normalized) {
        return Err(ColumnIdError::InvalidCharacters);
    }
    if normalized == RESERVED_COLUMN_ID {
        return Err(ColumnIdError::Reserved);
    }
    let taken = existing
        .iter()
        .any(|e| e.trim().to_lowercase() == normalized && Some(*e) != current);
    if taken {
        return Err(ColumnIdError::Duplicate(normalized));
    }
    Ok(normalized)
}

impl TaskboardConfig {
    /// Check every configured column id against the others.
    pub fn validate(&self) -> Result<(), ColumnIdError> {
        let columns = &self.board.columns;
        for (i, column) in columns.iter().enumerate() {
            let others: Vec<&str> = columns
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, c)| c.id.as_str())
                .collect();
            validate_column_id(&column.id, &others, None)?;
        }
        Ok(())
    }

    pub fn column(&self, id: &str) -> Option<&ColumnConfig> {
        self.board.columns.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: TaskboardConfig = toml::from_str("").unwrap();
        assert_eq!(config.board.default_status, "todo");
        assert!(!config.board.include_completed);
        let ids: Vec<&str> = config.board.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["todo", "doing", "done"]);
        assert_eq!(config.scan.exclude_folders, vec![".obsidian", "templates"]);
        assert!(config.scan.include_folders.is_empty());
        assert!(!config.files.three_file_system);
        assert_eq!(config.files.todo, "Tasks/todo.md");
        assert_eq!(config.files.archive, "Tasks/archive.md");
        assert_eq!(config.files.recurring, "Tasks/recurring.md");
    }

    #[test]
    fn test_partial_toml() {
        let config: TaskboardConfig = toml::from_str(
            r#"
[board]
include_completed = true

[[board.columns]]
id = "backlog"
name = "Backlog"

[files]
three_file_system = true
archive = "Archive.md"
"#,
        )
        .unwrap();
        assert!(config.board.include_completed);
        assert_eq!(config.board.columns, vec![ColumnConfig::new("backlog", "Backlog")]);
        assert!(config.files.three_file_system);
        assert_eq!(config.files.archive, "Archive.md");
        assert_eq!(config.files.todo, "Tasks/todo.md");
    }

    #[test]
    fn test_validate_column_id() {
        let existing = ["todo", "doing"];
        assert_eq!(validate_column_id("  Review ", &existing, None), Ok("review".to_string()));
        assert_eq!(validate_column_id("   ", &existing, None), Err(ColumnIdError::Empty));
        assert_eq!(
            validate_column_id("in progress", &existing, None),
            Err(ColumnIdError::InvalidCharacters)
        );
        assert_eq!(validate_column_id("Archived", &existing, None), Err(ColumnIdError::Reserved));
        assert_eq!(
            validate_column_id("todo", &existing, None),
            Err(ColumnIdError::Duplicate("todo".to_string()))
        );
        assert_eq!(validate_column_id("todo", &existing, Some("todo")), Ok("todo".to_string()));
        assert_eq!(validate_column_id("in_progress-2", &existing, None), Ok("in_progress-2".to_string()));
    }

    #[test]
    fn test_validate_config_duplicate_columns() {
        let mut config = TaskboardConfig::default();
        assert!(config.validate().is_ok());
        config.board.columns.push(ColumnConfig::new("Doing", "Doing again"));
        assert_eq!(config.validate(), Err(ColumnIdError::Duplicate("doing".to_string())));
    }
}
