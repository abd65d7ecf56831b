use chrono::NaiveDate;
use indexmap::IndexSet;

use crate::model::task::Task;
use crate::parse::line_edit::collapse_whitespace;
use crate::parse::markers::{DateMarker, RECURRENCE_RE, STATUS_RE, TAG_RE, TASK_RE};
use crate::util::dates::parse_date;

/// True if the line is a checkbox list item
pub fn is_task(line: &str) -> bool {
    TASK_RE.is_match(line)
}

/// Parse a single line into a task. Returns `None` for lines that are not
/// checkbox list items.
pub fn parse_task(line: &str, file_path: &str, line_number: usize) -> Option<Task> {
    let caps = TASK_RE.captures(line)?;
    let completed = matches!(&caps[3], "x" | "X");
    let content = caps.get(4).map_or("", |m| m.as_str());

    let due_date = extract_date(content, DateMarker::Due, file_path, line_number);
    let scheduled_date = extract_date(content, DateMarker::Scheduled, file_path, line_number);
    let done_date = extract_date(content, DateMarker::Done, file_path, line_number);
    let archived_date = extract_date(content, DateMarker::Archived, file_path, line_number);

    let recurrence = RECURRENCE_RE
        .captures(content)
        .map(|c| c[1].trim().to_string())
        .filter(|r| !r.is_empty());

    let tags: IndexSet<String> = TAG_RE
        .find_iter(content)
        .map(|m| m.as_str().to_string())
        .collect();

    let status = STATUS_RE.captures(content).map(|c| c[1].to_string());

    Some(Task {
        file_path: file_path.to_string(),
        line_number,
        raw_text: line.to_string(),
        text: display_text(content),
        completed,
        due_date,
        scheduled_date,
        done_date,
        archived_date,
        recurrence,
        tags,
        status,
    })
}

/// Parse every task line in a file's content. Line numbers are 1-based.
pub fn parse_tasks(content: &str, file_path: &str) -> Vec<Task> {
    content
        .split('\n')
        .enumerate()
        .filter_map(|(idx, line)| parse_task(line, file_path, idx + 1))
        .collect()
}

/// Strip every recognized marker from task content.
pub fn display_text(content: &str) -> String {
    let mut text = content.to_string();
    for marker in DateMarker::ALL {
        text = marker.regex().replace_all(&text, "").into_owned();
    }
    text = RECURRENCE_RE.replace_all(&text, "").into_owned();
    text = TAG_RE.replace_all(&text, "").into_owned();
    collapse_whitespace(&text)
}

fn extract_date(
    content: &str,
    marker: DateMarker,
    file_path: &str,
    line_number: usize,
) -> Option<NaiveDate> {
    let caps = marker.regex().captures(content)?;
    let raw = &caps[1];
    let date = parse_date(raw);
    if date.is_none() {
        tracing::debug!(
            file = file_path,
            line = line_number,
            marker = marker.glyph(),
            value = raw,
            "ignoring malformed date"
        );
    }
    date
}
