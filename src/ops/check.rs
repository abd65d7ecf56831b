use serde::Serialize;

use crate::io::vault::Vault;
use crate::model::config::{DONE_STATUS, TaskboardConfig, validate_column_id};
use crate::model::task::Task;
use crate::recurrence::{interpret, normalize_phrase};
use crate::util::dates;

/// Structured result from `tb check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckError {
    /// A configured column id fails validation
    InvalidColumn { column: String, message: String },
    /// A recurrence phrase that cannot produce a next date
    BadRecurrence {
        task_id: String,
        phrase: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckWarning {
    /// Recurring task without a due date; completing it will not recur
    RecurringWithoutDue { task_id: String },
    /// Status tag that matches no configured column
    UnknownStatus { task_id: String, status: String },
    /// Three-file layout is on but a configured file does not exist
    MissingFile { path: String },
}

/// Validate the board config against the tasks it would show. Read-only.
pub fn check_board<V: Vault + ?Sized>(
    vault: &V,
    config: &TaskboardConfig,
    tasks: &[Task],
) -> CheckResult {
    let mut result = CheckResult::default();
    let columns = &config.board.columns;

    for (i, column) in columns.iter().enumerate() {
        let others: Vec<&str> = columns
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, c)| c.id.as_str())
            .collect();
        if let Err(e) = validate_column_id(&column.id, &others, None) {
            result.errors.push(CheckError::InvalidColumn {
                column: column.id.clone(),
                message: e.to_string(),
            });
        }
    }

    let today = dates::today();
    for task in tasks.iter().filter(|t| !t.is_archived()) {
        if let Some(ref phrase) = task.recurrence {
            let anchor = task.due_date.unwrap_or(today);
            if let Err(e) = interpret(&normalize_phrase(phrase), anchor) {
                result.errors.push(CheckError::BadRecurrence {
                    task_id: task.id(),
                    phrase: phrase.clone(),
                    message: e.to_string(),
                });
            } else if task.due_date.is_none() {
                result.warnings.push(CheckWarning::RecurringWithoutDue { task_id: task.id() });
            }
        }
        if let Some(ref status) = task.status
            && status != DONE_STATUS
            && config.column(status).is_none()
        {
            result.warnings.push(CheckWarning::UnknownStatus {
                task_id: task.id(),
                status: status.clone(),
            });
        }
    }

    let files = &config.files;
    if files.three_file_system {
        for path in [&files.recurring, &files.todo, &files.archive] {
            if !vault.exists(path) {
                result.warnings.push(CheckWarning::MissingFile { path: path.clone() });
            }
        }
    }

    result.valid = result.errors.is_empty();
    result
}
