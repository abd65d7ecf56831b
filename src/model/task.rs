use chrono::NaiveDate;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Reserved tag marking a task as archived in place
pub const ARCHIVED_TAG: &str = "#archived";

/// Reserved tag namespace carrying the board column
pub const STATUS_PREFIX: &str = "#status/";

/// A checkbox line parsed out of a markdown file.
///
/// Records are snapshots. They are never trusted as pointers into a file:
/// every mutation re-reads the file and re-locates `raw_text` first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Vault-relative path with `/` separators
    pub file_path: String,
    /// 1-based line number at scan time
    pub line_number: usize,
    /// The exact source line at scan time
    pub raw_text: String,
    /// Content with every marker stripped and whitespace collapsed
    pub text: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
    /// Tags including the leading `#`, in first-seen order
    pub tags: IndexSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Task {
    /// Cache key of the form `path:line`
    pub fn id(&self) -> String {
        format!("{}:{}", self.file_path, self.line_number)
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    pub fn is_archived(&self) -> bool {
        self.tags.contains(ARCHIVED_TAG)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        if tag.starts_with('#') {
            self.tags.contains(tag)
        } else {
            self.tags.contains(&format!("#{}", tag))
        }
    }

    /// 0-based index of the line this record was scanned from
    pub fn line_index(&self) -> Option<usize> {
        self.line_number.checked_sub(1)
    }
}

/// Split a `path:line` identifier back into its parts.
///
/// Paths may themselves contain `:`, so the split happens at the last one.
pub fn split_task_id(id: &str) -> Option<(&str, usize)> {
    let (path, line) = id.rsplit_once(':')?;
    if path.is_empty() {
        return None;
    }
    let line: usize = line.parse().ok()?;
    if line == 0 {
        return None;
    }
    Some((path, line))
}
