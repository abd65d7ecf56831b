use std::collections::BTreeSet;

use chrono::NaiveDate;
use indexmap::IndexSet;
use serde::Serialize;

use crate::model::config::{DONE_STATUS, TaskboardConfig};
use crate::model::task::{ARCHIVED_TAG, STATUS_PREFIX, Task};

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// A task without a status tag sits in no column until it is checked.
fn in_column(task: &Task, column_id: &str, include_completed: bool) -> bool {
    if task.is_archived() {
        return false;
    }
    let is_done_column = column_id == DONE_STATUS;
    if task.completed && !include_completed && !is_done_column {
        return false;
    }
    if is_done_column {
        task.completed || task.status.as_deref() == Some(DONE_STATUS)
    } else {
        task.status.as_deref() == Some(column_id)
    }
}

/// Tasks shown in one column. Archived tasks never show; checked tasks
/// show only in `done` unless `include_completed` is set.
pub fn filter_by_status<'a>(
    tasks: &'a [Task],
    column_id: &str,
    include_completed: bool,
) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| in_column(t, column_id, include_completed))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct Column<'a> {
    pub id: String,
    pub name: String,
    pub tasks: Vec<&'a Task>,
}

/// Lay tasks out over the configured columns, in config order.
pub fn group_into_columns<'a>(tasks: &'a [Task], config: &TaskboardConfig) -> Vec<Column<'a>> {
    let board = &config.board;
    board
        .columns
        .iter()
        .map(|column| Column {
            id: column.id.clone(),
            name: column.name.clone(),
            tasks: tasks
                .iter()
                .filter(|t| in_column(t, &column.id, board.include_completed))
                .collect(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Sorted distinct tags, without the reserved status and archive tags.
pub fn collect_tags(tasks: &[Task]) -> Vec<String> {
    tasks
        .iter()
        .flat_map(|t| t.tags.iter())
        .filter(|tag| !tag.starts_with(STATUS_PREFIX) && tag.as_str() != ARCHIVED_TAG)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Keeps tasks carrying any selected tag. Nothing selected keeps everything.
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    selected: IndexSet<String>,
}

impl TagFilter {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        TagFilter {
            selected: tags.into_iter().map(|t| with_hash(t.as_ref())).collect(),
        }
    }

    pub fn toggle(&mut self, tag: &str) {
        let tag = with_hash(tag);
        if !self.selected.shift_remove(&tag) {
            self.selected.insert(tag);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.selected.is_empty() || self.selected.iter().any(|t| task.tags.contains(t))
    }

    pub fn apply<'a>(&self, tasks: impl IntoIterator<Item = &'a Task>) -> Vec<&'a Task> {
        tasks.into_iter().filter(|t| self.matches(t)).collect()
    }
}

fn with_hash(tag: &str) -> String {
    let tag = tag.trim();
    if tag.starts_with('#') {
        tag.to_string()
    } else {
        format!("#{}", tag)
    }
}

// ---------------------------------------------------------------------------
// Query expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("empty value for {0}")]
    EmptyValue(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueFilter {
    Today,
    Tomorrow,
    /// Today through seven days out
    Week,
    Overdue,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTerm {
    Status(String),
    Tag(String),
    Due(DueFilter),
    Completed(bool),
    Recurring(bool),
    /// Case-insensitive substring of the display text
    Text(String),
}

/// Space-separated terms, all of which must match.
///
/// `status:doing tag:home due:week completed:false recurring:true milk`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskQuery {
    pub terms: Vec<QueryTerm>,
}

impl TaskQuery {
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let terms = input
            .split_whitespace()
            .map(parse_term)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TaskQuery { terms })
    }

    pub fn matches(&self, task: &Task, today: NaiveDate) -> bool {
        self.terms.iter().all(|term| match term {
            QueryTerm::Status(status) if status == DONE_STATUS => {
                task.completed || task.status.as_deref() == Some(DONE_STATUS)
            }
            QueryTerm::Status(status) => task.status.as_deref() == Some(status.as_str()),
            QueryTerm::Tag(tag) => task.tags.contains(tag),
            QueryTerm::Due(due) => due_matches(*due, task.due_date, today),
            QueryTerm::Completed(completed) => task.completed == *completed,
            QueryTerm::Recurring(recurring) => task.is_recurring() == *recurring,
            QueryTerm::Text(text) => task.text.to_lowercase().contains(text),
        })
    }

    pub fn apply<'a>(&self, tasks: &'a [Task], today: NaiveDate) -> Vec<&'a Task> {
        tasks.iter().filter(|t| self.matches(t, today)).collect()
    }
}

fn parse_term(word: &str) -> Result<QueryTerm, QueryError> {
    let Some((key, value)) = word.split_once(':') else {
        return Ok(QueryTerm::Text(word.to_lowercase()));
    };
    let invalid = || QueryError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    };
    let known = matches!(key, "status" | "tag" | "due" | "completed" | "recurring");
    if known && value.is_empty() {
        return Err(QueryError::EmptyValue(key.to_string()));
    }
    let term = match key {
        "status" => QueryTerm::Status(value.to_lowercase()),
        "tag" => QueryTerm::Tag(with_hash(value)),
        "due" => QueryTerm::Due(match value {
            "today" => DueFilter::Today,
            "tomorrow" => DueFilter::Tomorrow,
            "week" => DueFilter::Week,
            "overdue" => DueFilter::Overdue,
            "none" => DueFilter::None,
            _ => return Err(invalid()),
        }),
        "completed" => QueryTerm::Completed(parse_bool(value).ok_or_else(invalid)?),
        "recurring" => QueryTerm::Recurring(parse_bool(value).ok_or_else(invalid)?),
        // `http://...` and other colons in plain text
        _ => QueryTerm::Text(word.to_lowercase()),
    };
    Ok(term)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}

fn due_matches(filter: DueFilter, due: Option<NaiveDate>, today: NaiveDate) -> bool {
    let Some(due) = due else {
        return filter == DueFilter::None;
    };
    let days = (due - today).num_days();
    match filter {
        DueFilter::Today => days == 0,
        DueFilter::Tomorrow => days == 1,
        DueFilter::Week => (0..=7).contains(&days),
        DueFilter::Overdue => days < 0,
        DueFilter::None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::ColumnConfig;
    use crate::parse::parse_tasks;
    use crate::util::dates::parse_date;
    use pretty_assertions::assert_eq;

    const BOARD: &str = "\
- [ ] Plain task
- [ ] Queued #status/todo
- [ ] Started #status/doing #home
- [x] Checked without status
- [x] Checked while doing #status/doing
- [ ] Marked done #status/done
- [x] Shelved #archived #status/done
- [ ] Water plants 🔁 every 3 days 📅 2025-03-15 #home
- [ ] Taxes 📅 2025-03-10 #finance
- [ ] Dentist 📅 2025-03-21";

    fn tasks() -> Vec<Task> {
        parse_tasks(BOARD, "board.md")
    }

    fn texts<'a>(tasks: &[&'a Task]) -> Vec<&'a str> {
        tasks.iter().map(|t| t.text.as_str()).collect()
    }

    fn today() -> NaiveDate {
        parse_date("2025-03-15").unwrap()
    }

    #[test]
    fn test_untagged_tasks_sit_in_no_column() {
        let tasks = tasks();
        assert_eq!(texts(&filter_by_status(&tasks, "todo", false)), vec!["Queued"]);
        for column in ["todo", "doing"] {
            assert!(
                filter_by_status(&tasks, column, true)
                    .iter()
                    .all(|t| t.status.is_some())
            );
        }
    }

    #[test]
    fn test_done_column() {
        let tasks = tasks();
        assert_eq!(
            texts(&filter_by_status(&tasks, "done", false)),
            vec!["Checked without status", "Checked while doing", "Marked done"]
        );
    }

    #[test]
    fn test_completed_hidden_outside_done() {
        let tasks = tasks();
        assert_eq!(texts(&filter_by_status(&tasks, "doing", false)), vec!["Started"]);
        assert_eq!(
            texts(&filter_by_status(&tasks, "doing", true)),
            vec!["Started", "Checked while doing"]
        );
    }

    #[test]
    fn test_archived_never_shown() {
        let tasks = tasks();
        for column in ["todo", "doing", "done"] {
            for include in [false, true] {
                assert!(
                    filter_by_status(&tasks, column, include)
                        .iter()
                        .all(|t| !t.is_archived())
                );
            }
        }
    }

    #[test]
    fn test_group_into_columns_uses_config() {
        let tasks = tasks();
        let mut config = TaskboardConfig::default();
        config.board.columns = vec![
            ColumnConfig::new("todo", "Backlog"),
            ColumnConfig::new("doing", "Doing"),
        ];
        let columns = group_into_columns(&tasks, &config);
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name, "Backlog");
        assert_eq!(texts(&columns[0].tasks), vec!["Queued"]);
        assert_eq!(texts(&columns[1].tasks), vec!["Started"]);

        config.board.include_completed = true;
        let columns = group_into_columns(&tasks, &config);
        assert_eq!(texts(&columns[1].tasks), vec!["Started", "Checked while doing"]);
    }

    #[test]
    fn test_tags() {
        let tasks = tasks();
        assert_eq!(collect_tags(&tasks), vec!["#finance", "#home"]);

        let filter = TagFilter::new(["home"]);
        assert_eq!(texts(&filter.apply(&tasks)), vec!["Started", "Water plants"]);

        let mut filter = TagFilter::default();
        assert_eq!(filter.apply(&tasks).len(), tasks.len());
        filter.toggle("#finance");
        assert_eq!(texts(&filter.apply(&tasks)), vec!["Taxes"]);
        filter.toggle("finance");
        assert!(filter.is_empty());
    }

    #[test]
    fn test_query_terms() {
        let tasks = tasks();
        let run = |q: &str| {
            let query = TaskQuery::parse(q).unwrap();
            texts(&query.apply(&tasks, today()))
        };
        assert_eq!(run("status:doing"), vec!["Started", "Checked while doing"]);
        assert_eq!(run("status:doing completed:false"), vec!["Started"]);
        assert_eq!(run("tag:home recurring:true"), vec!["Water plants"]);
        assert_eq!(run("due:today"), vec!["Water plants"]);
        assert_eq!(run("due:overdue"), vec!["Taxes"]);
        assert_eq!(run("due:week"), vec!["Water plants", "Dentist"]);
        assert_eq!(run("TAXES"), vec!["Taxes"]);
        assert_eq!(run("").len(), tasks.len());
    }

    #[test]
    fn test_query_status_needs_the_tag() {
        let tasks = tasks();
        let query = TaskQuery::parse("status:todo").unwrap();
        assert_eq!(texts(&query.apply(&tasks, today())), vec!["Queued"]);
        let query = TaskQuery::parse("status:done").unwrap();
        assert_eq!(
            texts(&query.apply(&tasks, today())),
            vec!["Checked without status", "Checked while doing", "Marked done", "Shelved"]
        );
    }

    #[test]
    fn test_query_errors() {
        assert_eq!(
            TaskQuery::parse("due:someday"),
            Err(QueryError::InvalidValue {
                key: "due".to_string(),
                value: "someday".to_string()
            })
        );
        assert_eq!(TaskQuery::parse("tag:"), Err(QueryError::EmptyValue("tag".to_string())));
        assert_eq!(
            TaskQuery::parse("see:https://example.com").unwrap().terms,
            vec![QueryTerm::Text("see:https://example.com".to_string())]
        );
    }
}
