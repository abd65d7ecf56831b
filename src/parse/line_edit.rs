//! Pure edits over a single task line.
//!
//! Every helper takes the current line and returns the whole new line.
//! Leading indentation is kept and the rest of the line is re-normalized,
//! so applying the same edit twice gives the same line as applying it once.

use chrono::NaiveDate;
use regex::Captures;

use crate::model::task::STATUS_PREFIX;
use crate::parse::markers::{CHECKBOX_RE, DateMarker, STATUS_RE, TAG_RE};
use crate::util::dates::format_date;

/// Collapse runs of whitespace into single spaces and trim both ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep the leading indentation, collapse whitespace in the rest. A line
/// from a CRLF file keeps its carriage return at the end, even when an
/// edit appended text after it.
pub fn normalize(line: &str) -> String {
    let body = line.trim_start();
    let collapsed = collapse_whitespace(body);
    if collapsed.is_empty() {
        return String::new();
    }
    let indent = &line[..line.len() - body.len()];
    let cr = if body.contains('\r') { "\r" } else { "" };
    format!("{}{}{}", indent, collapsed, cr)
}

/// Set the checkbox to `[x]` or `[ ]`. Lines without a checkbox are only
/// normalized.
pub fn set_checkbox(line: &str, checked: bool) -> String {
    let mark = if checked { "x" } else { " " };
    let edited = CHECKBOX_RE.replace(line, |caps: &Captures| format!("{}[{}]", &caps[1], mark));
    normalize(&edited)
}

/// Replace the first `marker` date and drop any further ones, or append
/// the marker if the line has none.
pub fn set_date_marker(line: &str, marker: DateMarker, date: NaiveDate) -> String {
    let rendered = marker.render(&format_date(date));
    let re = marker.regex();
    if !re.is_match(line) {
        return normalize(&format!("{} {}", line, rendered));
    }
    let mut first = true;
    let edited = re.replace_all(line, |_: &Captures| {
        if first {
            first = false;
            rendered.clone()
        } else {
            String::new()
        }
    });
    normalize(&edited)
}

/// Remove every occurrence of `marker` and its date.
pub fn remove_date_marker(line: &str, marker: DateMarker) -> String {
    normalize(&marker.regex().replace_all(line, ""))
}

/// Set the due date. A new due marker goes right before the status tag
/// when there is one, otherwise at the end.
pub fn set_due_date(line: &str, date: NaiveDate) -> String {
    if DateMarker::Due.regex().is_match(line) {
        return set_date_marker(line, DateMarker::Due, date);
    }
    let rendered = DateMarker::Due.render(&format_date(date));
    match STATUS_RE.find(line) {
        Some(m) => normalize(&format!(
            "{}{} {}",
            &line[..m.start()],
            rendered,
            &line[m.start()..]
        )),
        None => normalize(&format!("{} {}", line, rendered)),
    }
}

/// Remove every `#status/...` tag.
pub fn strip_status(line: &str) -> String {
    normalize(&STATUS_RE.replace_all(line, ""))
}

/// Remove every status tag, then append `#status/<status>`.
pub fn set_status(line: &str, status: &str) -> String {
    normalize(&format!("{} {}{}", strip_status(line), STATUS_PREFIX, status))
}

/// Rewrite the first status tag in place and drop the others. Appends the
/// tag when the line has none.
pub fn replace_status(line: &str, status: &str) -> String {
    if !STATUS_RE.is_match(line) {
        return set_status(line, status);
    }
    let rendered = format!("{}{}", STATUS_PREFIX, status);
    let mut first = true;
    let edited = STATUS_RE.replace_all(line, |_: &Captures| {
        if first {
            first = false;
            rendered.clone()
        } else {
            String::new()
        }
    });
    normalize(&edited)
}

/// Append a tag unless the line already carries exactly that tag.
pub fn add_tag(line: &str, tag: &str) -> String {
    let tag = with_hash(tag);
    if TAG_RE.find_iter(line).any(|m| m.as_str() == tag) {
        normalize(line)
    } else {
        normalize(&format!("{} {}", line, tag))
    }
}

/// Remove every exact occurrence of a tag. Longer tags that merely start
/// with it (`#archived-notes`) are kept.
pub fn remove_tag(line: &str, tag: &str) -> String {
    let tag = with_hash(tag);
    let edited = TAG_RE.replace_all(line, |caps: &Captures| {
        if caps[0] == *tag {
            String::new()
        } else {
            caps[0].to_string()
        }
    });
    normalize(&edited)
}

fn with_hash(tag: &str) -> String {
    if tag.starts_with('#') {
        tag.to_string()
    } else {
        format!("#{}", tag)
    }
}
