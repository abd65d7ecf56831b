use crate::model::task::Task;

/// Find the line a task record refers to in the current file content.
///
/// The recorded line number is tried first. When the file has shifted, the
/// first line from the top with the same trimmed text wins. `None` means
/// the record is stale and nothing may be edited.
pub fn locate(content: &str, task: &Task) -> Option<usize> {
    let lines: Vec<&str> = content.split('\n').collect();
    locate_in(&lines, task)
}

/// Same as [`locate`] over content already split on `\n`.
pub fn locate_in(lines: &[&str], task: &Task) -> Option<usize> {
    let wanted = task.raw_text.trim();

    if let Some(index) = task.line_index()
        && lines.get(index).is_some_and(|l| l.trim() == wanted)
    {
        tracing::debug!(task = %task.id(), "located at recorded line");
        return Some(index);
    }

    let found = lines.iter().position(|l| l.trim() == wanted);
    match found {
        Some(index) => tracing::debug!(
            task = %task.id(),
            line = index + 1,
            "located after drift"
        ),
        None => tracing::debug!(task = %task.id(), "task line not found"),
    }
    found
}
