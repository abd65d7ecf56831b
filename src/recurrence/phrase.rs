use std::sync::LazyLock;

use chrono::{NaiveDate, Weekday};
use regex::Regex;

use crate::model::recurrence::{ByWeekday, Frequency, RecurrenceError, RecurrenceSpec};
use crate::recurrence::engine::next_after;
use crate::recurrence::grammar::parse_phrase;

static INTERVAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*(day|week|month|year)s?$").unwrap());
static WEEKDAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:week\s+on\s+)?(monday|tuesday|wednesday|thursday|friday|saturday|sunday)s?$")
        .unwrap()
});
static MONTH_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^month\s+on\s+the\s+(\d+)(?:st|nd|rd|th)?$").unwrap());
static WEEKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)\s*weeks?$").unwrap());
static LEADING_EVERY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^every\s+").unwrap());

/// Lowercase, drop a leading `every`, collapse whitespace.
pub fn normalize_phrase(phrase: &str) -> String {
    let lowered = phrase.trim().to_lowercase();
    let stripped = LEADING_EVERY_RE.replace(&lowered, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Turn a normalized phrase into a rule anchored at `anchor`.
///
/// The shapes the board itself writes are matched first; anything else goes
/// through the general grammar.
pub fn interpret(text: &str, anchor: NaiveDate) -> Result<RecurrenceSpec, RecurrenceError> {
    if let Some(caps) = INTERVAL_RE.captures(text) {
        let frequency = unit_frequency(&caps[2]);
        return RecurrenceSpec::builder(frequency)
            .interval(parse_count(&caps[1])?)
            .build(anchor);
    }

    if let Some(caps) = WEEKDAY_RE.captures(text)
        && let Some(day) = weekday_from_name(&caps[1])
    {
        return RecurrenceSpec::builder(Frequency::Weekly)
            .weekday(ByWeekday::every(day))
            .build(anchor);
    }

    if let Some(caps) = MONTH_DAY_RE.captures(text) {
        return RecurrenceSpec::builder(Frequency::Monthly)
            .month_day(parse_count(&caps[1])?)
            .build(anchor);
    }

    if let Some(caps) = WEEKS_RE.captures(text) {
        return RecurrenceSpec::builder(Frequency::Weekly)
            .interval(parse_count(&caps[1])?)
            .build(anchor);
    }

    let keyword = match text {
        "day" | "daily" => Some(Frequency::Daily),
        "week" | "weekly" => Some(Frequency::Weekly),
        "month" | "monthly" => Some(Frequency::Monthly),
        "year" | "yearly" => Some(Frequency::Yearly),
        _ => None,
    };
    if let Some(frequency) = keyword {
        return RecurrenceSpec::builder(frequency).build(anchor);
    }

    parse_phrase(text, anchor)
}

/// Next occurrence strictly after `reference` for a phrase as written in a
/// task line. `None` when the phrase cannot be interpreted.
pub fn next_occurrence(phrase: &str, reference: NaiveDate) -> Option<NaiveDate> {
    match interpret(&normalize_phrase(phrase), reference) {
        Ok(spec) => next_after(&spec, reference, false),
        Err(e) => {
            tracing::debug!(phrase, error = %e, "could not interpret recurrence");
            None
        }
    }
}

fn unit_frequency(unit: &str) -> Frequency {
    match unit {
        "day" => Frequency::Daily,
        "week" => Frequency::Weekly,
        "month" => Frequency::Monthly,
        _ => Frequency::Yearly,
    }
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    name.parse().ok()
}

fn parse_count(digits: &str) -> Result<i64, RecurrenceError> {
    digits
        .parse()
        .map_err(|_| RecurrenceError::InvalidSpec(format!("number out of range: {}", digits)))
}
