use std::path::PathBuf;

use chrono::NaiveDate;

use crate::io::recovery::log_duplicate;
use crate::io::vault::{Vault, VaultError, parent_folder};
use crate::model::config::{DEFAULT_STATUS, FilesConfig};
use crate::model::recurrence::RecurrenceError;
use crate::model::task::{ARCHIVED_TAG, Task};
use crate::ops::locate::locate;
use crate::parse::line_edit::{
    add_tag, collapse_whitespace, remove_date_marker, remove_tag, set_checkbox, set_date_marker,
    set_due_date, set_status, strip_status,
};
use crate::parse::markers::{CHECKBOX_RE, DateMarker};
use crate::parse::parse_task;
use crate::recurrence::regenerate::next_instance;
use crate::util::dates::{self, resolve_date_arg};

/// Header of a freshly created archive file
pub const ARCHIVE_HEADER: &str = "# Archive\n\nCompleted and archived tasks are stored here.\n";

/// Header of a freshly created todo file
pub const TODO_HEADER: &str = "# To Do\n\nActive tasks go here.\n";

/// Header of a freshly created recurring-tasks file
pub const RECURRING_HEADER: &str = "# Recurring Tasks\n\nTasks with recurrence patterns (🔁) go here.\n";

/// Error type for task mutations
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("task is no longer at {path}:{line} and its text was not found in the file")]
    LineNotFound { path: String, line: usize },
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error("task was written to {destination} but could not be removed from {source_file}")]
    SourceNotRemoved {
        source_file: String,
        destination: String,
        line: String,
    },
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("task text is empty")]
    EmptyText,
}

/// What a `move_to` actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// Completed, with a fresh instance inserted above
    RecurredNext { next_due: NaiveDate },
    /// The recurrence could not be computed; completed without a next instance
    RecurrenceFallback,
}

/// Result of a `move_to`: what happened, and the task's own line as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Moved {
    pub outcome: MoveOutcome,
    pub line: String,
}

/// A single mutation, for callers that only need success or failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOp {
    SetStatus(String),
    SetCompletion(bool),
    MoveTo { status: String, mark_complete: bool },
    SetDueDate(NaiveDate),
    ClearDueDate,
    ArchiveInPlace,
    ArchiveToFile { archive: String },
    UnarchiveToFile { archive: String, todo: String },
}

/// Parse a due-date argument: `none` clears, otherwise a date or one of
/// `today`/`tomorrow`/`yesterday`.
pub fn parse_due_arg(arg: &str, today: NaiveDate) -> Result<Option<NaiveDate>, TaskError> {
    if arg.trim().eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    resolve_date_arg(arg, today)
        .map(Some)
        .ok_or_else(|| TaskError::InvalidDate(arg.trim().to_string()))
}

/// Create whichever of the three layout files are missing, with their
/// headers. Returns `(created, skipped)`.
pub fn create_configured_files<V: Vault + ?Sized>(
    vault: &V,
    files: &FilesConfig,
) -> Result<(usize, usize), VaultError> {
    let layout = [
        (&files.recurring, RECURRING_HEADER),
        (&files.todo, TODO_HEADER),
        (&files.archive, ARCHIVE_HEADER),
    ];
    let (mut created, mut skipped) = (0, 0);
    for (path, header) in layout {
        if vault.exists(path) {
            skipped += 1;
            continue;
        }
        if let Some(folder) = parent_folder(path) {
            vault.create_folder(folder)?;
        }
        vault.create(path, header)?;
        created += 1;
    }
    Ok((created, skipped))
}

// ---------------------------------------------------------------------------
// Line transforms
// ---------------------------------------------------------------------------

fn is_checked(line: &str) -> bool {
    CHECKBOX_RE.captures(line).is_some_and(|c| &c[2] != " ")
}

fn complete_line(line: &str, today: NaiveDate) -> String {
    let checked = set_checkbox(line, true);
    if DateMarker::Done.regex().is_match(&checked) {
        checked
    } else {
        set_date_marker(&checked, DateMarker::Done, today)
    }
}

fn reopen_line(line: &str) -> String {
    remove_date_marker(&set_checkbox(line, false), DateMarker::Done)
}

fn archived_line(line: &str, today: NaiveDate) -> String {
    let tagged = add_tag(&strip_status(line), ARCHIVED_TAG);
    set_date_marker(&tagged, DateMarker::Archived, today)
}

fn restored_line(line: &str, status: &str) -> String {
    let mut out = set_checkbox(line, false);
    out = remove_tag(&out, ARCHIVED_TAG);
    out = remove_date_marker(&out, DateMarker::Archived);
    out = remove_date_marker(&out, DateMarker::Done);
    set_status(&out, status)
}

// ---------------------------------------------------------------------------
// Content transforms
// ---------------------------------------------------------------------------

/// Swap line `index` for `replacement` (possibly empty). Everything else,
/// including a trailing newline, is kept as is.
fn replace_line(content: &str, index: usize, replacement: &[String]) -> String {
    let mut out: Vec<&str> = Vec::new();
    for (i, line) in content.split('\n').enumerate() {
        if i == index {
            out.extend(replacement.iter().map(String::as_str));
        } else {
            out.push(line);
        }
    }
    out.join("\n")
}

fn append_line(content: &str, line: &str) -> String {
    let mut out = content.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(line);
    out.push('\n');
    out
}

// ---------------------------------------------------------------------------
// Mutator
// ---------------------------------------------------------------------------

/// Applies edits to task lines in a vault.
///
/// Every operation reads the file fresh, re-locates the task by its text,
/// transforms that one line and writes the whole file back. A task whose
/// line cannot be found is never edited.
pub struct TaskMutator<'a, V: Vault + ?Sized> {
    vault: &'a V,
    today: NaiveDate,
    default_status: String,
    recovery_dir: Option<PathBuf>,
}

impl<'a, V: Vault + ?Sized> TaskMutator<'a, V> {
    pub fn new(vault: &'a V) -> Self {
        TaskMutator {
            vault,
            today: dates::today(),
            default_status: DEFAULT_STATUS.to_string(),
            recovery_dir: None,
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn with_default_status(mut self, status: &str) -> Self {
        self.default_status = status.to_string();
        self
    }

    /// Record duplicates left by failed cross-file moves under `dir`.
    pub fn with_recovery_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.recovery_dir = Some(dir.into());
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    // -- plumbing --

    fn read_file(&self, path: &str) -> Result<String, TaskError> {
        self.vault.read(path).map_err(|e| match e {
            VaultError::NotFound(p) => TaskError::FileNotFound(p),
            other => TaskError::Vault(other),
        })
    }

    fn find_line<'c>(&self, content: &'c str, task: &Task) -> Result<(usize, &'c str), TaskError> {
        let not_found = || {
            tracing::warn!(task = %task.id(), "task line not found, refusing to edit");
            TaskError::LineNotFound {
                path: task.file_path.clone(),
                line: task.line_number,
            }
        };
        let index = locate(content, task).ok_or_else(not_found)?;
        let line = content.split('\n').nth(index).ok_or_else(not_found)?;
        Ok((index, line))
    }

    fn rewrite_line(&self, task: &Task, edit: impl FnOnce(&str) -> String) -> Result<String, TaskError> {
        let content = self.read_file(&task.file_path)?;
        let (index, line) = self.find_line(&content, task)?;
        let edited = edit(line);
        let updated = replace_line(&content, index, std::slice::from_ref(&edited));
        self.vault.write(&task.file_path, &updated)?;
        Ok(edited)
    }

    fn moved_line(&self, line: &str, status: &str, mark_complete: bool) -> String {
        let line = set_status(line, status);
        if is_checked(&line) == mark_complete {
            line
        } else if mark_complete {
            complete_line(&line, self.today)
        } else {
            reopen_line(&line)
        }
    }

    fn remove_task_line(&self, task: &Task) -> Result<(), TaskError> {
        let content = self.read_file(&task.file_path)?;
        let (index, _) = self.find_line(&content, task)?;
        self.vault.write(&task.file_path, &replace_line(&content, index, &[]))?;
        Ok(())
    }

    /// Append `line` to `path`, creating the file (and its folder) with
    /// `header` when it does not exist yet.
    /// Append `line` to `path`, creating the file under `header` if it is
    /// missing. Returns the 1-based line number it landed on.
    fn append_to(&self, path: &str, line: &str, header: &str) -> Result<usize, TaskError> {
        let updated = match self.vault.read(path) {
            Ok(content) => {
                let updated = append_line(&content, line);
                self.vault.write(path, &updated)?;
                updated
            }
            Err(VaultError::NotFound(_)) => {
                if let Some(folder) = parent_folder(path) {
                    self.vault.create_folder(folder)?;
                }
                let updated = append_line(header, line);
                self.vault.create(path, &updated)?;
                updated
            }
            Err(e) => return Err(e.into()),
        };
        Ok(updated.matches('\n').count())
    }

    /// Second half of a cross-file move. On failure the line now exists in
    /// both files; that is reported, never rolled back.
    fn finish_move(&self, source: &Task, destination: &str, moved: &str) -> Result<(), TaskError> {
        let Err(e) = self.remove_task_line(source) else {
            return Ok(());
        };
        match &self.recovery_dir {
            Some(dir) => log_duplicate(dir, &source.file_path, destination, moved, &e.to_string()),
            None => tracing::warn!(
                source = %source.file_path,
                destination,
                error = %e,
                "task line left in both files"
            ),
        }
        Err(TaskError::SourceNotRemoved {
            source_file: source.file_path.clone(),
            destination: destination.to_string(),
            line: moved.to_string(),
        })
    }

    // -- operations --

    /// Replace every status tag with `#status/<status>`. Completion is left
    /// alone.
    pub fn set_status(&self, task: &Task, status: &str) -> Result<String, TaskError> {
        let line = self.rewrite_line(task, |l| set_status(l, status))?;
        tracing::info!(task = %task.id(), status, "status set");
        Ok(line)
    }

    pub fn set_completion(&self, task: &Task, completed: bool) -> Result<String, TaskError> {
        let today = self.today;
        let line = self.rewrite_line(task, |l| {
            if completed {
                complete_line(l, today)
            } else {
                reopen_line(l)
            }
        })?;
        tracing::info!(task = %task.id(), completed, "completion set");
        Ok(line)
    }

    /// Move a task to a column, completing or reopening it to match
    /// `mark_complete`. Completing a recurring task with a due date also
    /// creates its next instance.
    pub fn move_to(
        &self,
        task: &Task,
        status: &str,
        mark_complete: bool,
    ) -> Result<Moved, TaskError> {
        if mark_complete && task.is_recurring() && task.due_date.is_some() {
            return self.complete_recurring(task, status);
        }
        let line = self.rewrite_line(task, |l| self.moved_line(l, status, mark_complete))?;
        tracing::info!(task = %task.id(), status, "task moved");
        Ok(Moved {
            outcome: MoveOutcome::Moved,
            line,
        })
    }

    /// Complete a recurring task into `status` and insert its next instance
    /// directly above it, in one write.
    pub fn complete_recurring(&self, task: &Task, status: &str) -> Result<Moved, TaskError> {
        let content = self.read_file(&task.file_path)?;
        let (index, current) = self.find_line(&content, task)?;

        // the file is the source of truth, not the possibly older record
        let phrase = parse_task(current, &task.file_path, index + 1).and_then(|t| t.recurrence);
        let due = DateMarker::Due.regex().captures(current).map(|c| c[1].to_string());
        let next = match (phrase, due) {
            (Some(phrase), Some(due)) => next_instance(current, &phrase, &due, &self.default_status),
            (None, _) => Err(RecurrenceError::Unrecognized(String::new())),
            (_, None) => Err(RecurrenceError::InvalidDate("missing due date".to_string())),
        };
        // stamped even when the line was already checked
        let done = complete_line(&set_status(current, status), self.today);

        let (replacement, outcome) = match next {
            Ok((next_line, next_due)) => (
                vec![next_line, done.clone()],
                MoveOutcome::RecurredNext { next_due },
            ),
            Err(e) => {
                tracing::warn!(
                    task = %task.id(),
                    error = %e,
                    "recurrence failed, completing without a next instance"
                );
                (vec![done.clone()], MoveOutcome::RecurrenceFallback)
            }
        };
        self.vault
            .write(&task.file_path, &replace_line(&content, index, &replacement))?;
        tracing::info!(task = %task.id(), ?outcome, "recurring task completed");
        Ok(Moved { outcome, line: done })
    }

    /// Hide a task from the board without moving it.
    pub fn archive_in_place(&self, task: &Task) -> Result<String, TaskError> {
        let line = self.rewrite_line(task, |l| add_tag(&strip_status(l), ARCHIVED_TAG))?;
        tracing::info!(task = %task.id(), "archived in place");
        Ok(line)
    }

    /// Append a new unchecked task to `path`, creating the file if needed.
    pub fn add_task(
        &self,
        path: &str,
        text: &str,
        due: Option<NaiveDate>,
        status: &str,
    ) -> Result<Task, TaskError> {
        let text = collapse_whitespace(text);
        if text.is_empty() {
            return Err(TaskError::EmptyText);
        }
        let mut line = format!("- [ ] {}", text);
        if let Some(due) = due {
            line = set_due_date(&line, due);
        }
        let line = set_status(&line, status);

        let line_number = self.append_to(path, &line, TODO_HEADER)?;
        let task = parse_task(&line, path, line_number).ok_or(TaskError::EmptyText)?;
        tracing::info!(task = %task.id(), "task added");
        Ok(task)
    }

    /// Move a task to the archive file. The archive is written first, then
    /// the line is removed from its source.
    pub fn archive_to_file(&self, task: &Task, archive_path: &str) -> Result<String, TaskError> {
        let content = self.read_file(&task.file_path)?;
        let (_, current) = self.find_line(&content, task)?;
        let archived = archived_line(current, self.today);

        self.append_to(archive_path, &archived, ARCHIVE_HEADER)?;
        self.finish_move(task, archive_path, &archived)?;
        tracing::info!(task = %task.id(), archive = archive_path, "archived to file");
        Ok(archived)
    }

    /// Move an archived task back to the todo file with the default status.
    pub fn unarchive_to_file(
        &self,
        task: &Task,
        archive_path: &str,
        todo_path: &str,
    ) -> Result<String, TaskError> {
        let mut source = task.clone();
        source.file_path = archive_path.to_string();

        let content = self.read_file(archive_path)?;
        let (_, current) = self.find_line(&content, &source)?;
        let restored = restored_line(current, &self.default_status);

        self.append_to(todo_path, &restored, TODO_HEADER)?;
        self.finish_move(&source, todo_path, &restored)?;
        tracing::info!(task = %task.id(), todo = todo_path, "unarchived");
        Ok(restored)
    }

    pub fn set_due_date(&self, task: &Task, date: NaiveDate) -> Result<String, TaskError> {
        let line = self.rewrite_line(task, |l| set_due_date(l, date))?;
        tracing::info!(task = %task.id(), %date, "due date set");
        Ok(line)
    }

    pub fn clear_due_date(&self, task: &Task) -> Result<String, TaskError> {
        let line = self.rewrite_line(task, |l| remove_date_marker(l, DateMarker::Due))?;
        tracing::info!(task = %task.id(), "due date cleared");
        Ok(line)
    }

    /// Run `op` on `task`, reporting only whether it succeeded. A recurring
    /// completion that fell back to a plain completion still succeeds.
    pub fn apply_operation(&self, op: &TaskOp, task: &Task) -> bool {
        let result = match op {
            TaskOp::SetStatus(status) => self.set_status(task, status).map(drop),
            TaskOp::SetCompletion(completed) => self.set_completion(task, *completed).map(drop),
            TaskOp::MoveTo {
                status,
                mark_complete,
            } => self.move_to(task, status, *mark_complete).map(drop),
            TaskOp::SetDueDate(date) => self.set_due_date(task, *date).map(drop),
            TaskOp::ClearDueDate => self.clear_due_date(task).map(drop),
            TaskOp::ArchiveInPlace => self.archive_in_place(task).map(drop),
            TaskOp::ArchiveToFile { archive } => self.archive_to_file(task, archive).map(drop),
            TaskOp::UnarchiveToFile { archive, todo } => {
                self.unarchive_to_file(task, archive, todo).map(drop)
            }
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(task = %task.id(), ?op, error = %e, "operation failed");
                false
            }
        }
    }
}
