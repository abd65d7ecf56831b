use chrono::NaiveDate;

use crate::model::config::DEFAULT_STATUS;
use crate::model::recurrence::RecurrenceError;
use crate::model::task::ARCHIVED_TAG;
use crate::parse::line_edit::{
    remove_date_marker, remove_tag, replace_status, set_checkbox, set_due_date,
};
use crate::parse::markers::DateMarker;
use crate::recurrence::engine::next_after;
use crate::recurrence::phrase::{interpret, normalize_phrase};
use crate::util::dates::parse_date;

/// Build the next instance of a recurring task line, with the status reset
/// to the default column.
pub fn create_next_recurring_task_line(
    line: &str,
    recurrence: &str,
    current_due: &str,
) -> Result<String, RecurrenceError> {
    create_next_recurring_task_line_with_status(line, recurrence, current_due, DEFAULT_STATUS)
}

/// Build the next instance of a recurring task line.
///
/// The new line is unchecked, due on the next occurrence after
/// `current_due`, has no done/archived dates or archive tag, and carries
/// `#status/<status>` (rewritten in place when the line already had one).
/// Nothing is produced when `current_due` is not a valid date or the phrase
/// cannot be interpreted.
pub fn create_next_recurring_task_line_with_status(
    line: &str,
    recurrence: &str,
    current_due: &str,
    status: &str,
) -> Result<String, RecurrenceError> {
    next_instance(line, recurrence, current_due, status).map(|(out, _)| out)
}

/// The next line together with its new due date.
pub(crate) fn next_instance(
    line: &str,
    recurrence: &str,
    current_due: &str,
    status: &str,
) -> Result<(String, NaiveDate), RecurrenceError> {
    let due = parse_date(current_due)
        .ok_or_else(|| RecurrenceError::InvalidDate(current_due.trim().to_string()))?;
    let spec = interpret(&normalize_phrase(recurrence), due)?;
    let next = next_after(&spec, due, false).ok_or(RecurrenceError::Exhausted(due))?;

    let mut out = set_checkbox(line, false);
    out = set_due_date(&out, next);
    out = remove_date_marker(&out, DateMarker::Done);
    out = remove_date_marker(&out, DateMarker::Archived);
    out = remove_tag(&out, ARCHIVED_TAG);
    out = replace_status(&out, status);
    Ok((out, next))
}
