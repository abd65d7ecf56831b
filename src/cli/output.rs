use serde::Serialize;

use crate::model::task::Task;
use crate::ops::filter::Column;
use crate::ops::task_ops::MoveOutcome;
use crate::util::dates::format_date;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub id: String,
    pub text: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Serialize)]
pub struct ColumnJson {
    pub id: String,
    pub name: String,
    pub tasks: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct MutationJson {
    pub id: String,
    pub line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_due: Option<String>,
}

pub fn task_to_json(task: &Task) -> TaskJson {
    TaskJson {
        id: task.id(),
        text: task.text.clone(),
        completed: task.completed,
        status: task.status.clone(),
        due: task.due_date.map(format_date),
        scheduled: task.scheduled_date.map(format_date),
        done: task.done_date.map(format_date),
        archived: task.archived_date.map(format_date),
        recurrence: task.recurrence.clone(),
        tags: task.tags.iter().cloned().collect(),
    }
}

pub fn column_to_json(column: &Column<'_>) -> ColumnJson {
    ColumnJson {
        id: column.id.clone(),
        name: column.name.clone(),
        tasks: column.tasks.iter().map(|t| task_to_json(t)).collect(),
    }
}

pub fn outcome_label(outcome: MoveOutcome) -> &'static str {
    match outcome {
        MoveOutcome::Moved => "moved",
        MoveOutcome::RecurredNext { .. } => "recurred",
        MoveOutcome::RecurrenceFallback => "recurrence_fallback",
    }
}

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

/// One-line summary: `[x] text  📅 date  🔁 phrase  #tags  (path:line)`
pub fn format_task_line(task: &Task) -> String {
    let mut out = format!("[{}] {}", if task.completed { "x" } else { " " }, task.text);
    if let Some(due) = task.due_date {
        out.push_str(&format!("  📅 {}", format_date(due)));
    }
    if let Some(ref phrase) = task.recurrence {
        out.push_str(&format!("  🔁 {}", phrase));
    }
    let tags: Vec<&str> = task
        .tags
        .iter()
        .map(String::as_str)
        .filter(|t| !t.starts_with("#status/"))
        .collect();
    if !tags.is_empty() {
        out.push_str("  ");
        out.push_str(&tags.join(" "));
    }
    out.push_str(&format!("  ({})", task.id()));
    out
}

pub fn format_column(column: &Column<'_>) -> Vec<String> {
    let mut lines = vec![format!("== {} ({}) ==", column.name, column.tasks.len())];
    lines.extend(column.tasks.iter().map(|t| format!("  {}", format_task_line(t))));
    lines
}
