use chrono::{Datelike, Days, Local, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::model::task::Task;

/// Date format used by every marker in a task line
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Today's date in local time
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a strict `YYYY-MM-DD` date. Calendar-invalid dates (2025-02-30)
/// are rejected rather than rolled over.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(31, |d| d.day())
}

/// Build a date, clamping `day` to the last day of the month.
pub fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let day = day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

/// First day of the week containing `date`, for weeks beginning on `start`
pub fn week_start(date: NaiveDate, start: Weekday) -> NaiveDate {
    let offset = (7 + date.weekday().num_days_from_monday() - start.num_days_from_monday()) % 7;
    date.checked_sub_days(Days::new(u64::from(offset)))
        .unwrap_or(date)
}

/// Resolve a keyword (`today`, `tomorrow`, `yesterday`) or a strict date.
pub fn resolve_date_arg(arg: &str, today: NaiveDate) -> Option<NaiveDate> {
    match arg.trim().to_lowercase().as_str() {
        "today" => Some(today),
        "tomorrow" => today.succ_opt(),
        "yesterday" => today.pred_opt(),
        other => parse_date(other),
    }
}

// ---------------------------------------------------------------------------
// Time filter presets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePreset {
    All,
    Overdue,
    Today,
    ThisWeek,
    ThisMonth,
    ThisQuarter,
    ThisYear,
    Custom,
}

impl TimePreset {
    pub fn parse(s: &str) -> Option<TimePreset> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "all" => Some(TimePreset::All),
            "overdue" => Some(TimePreset::Overdue),
            "today" => Some(TimePreset::Today),
            "this_week" | "week" => Some(TimePreset::ThisWeek),
            "this_month" | "month" => Some(TimePreset::ThisMonth),
            "this_quarter" | "quarter" => Some(TimePreset::ThisQuarter),
            "this_year" | "year" => Some(TimePreset::ThisYear),
            "custom" => Some(TimePreset::Custom),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimePreset::All => "All Time",
            TimePreset::Overdue => "Overdue",
            TimePreset::Today => "Today",
            TimePreset::ThisWeek => "This Week",
            TimePreset::ThisMonth => "This Month",
            TimePreset::ThisQuarter => "This Quarter",
            TimePreset::ThisYear => "This Year",
            TimePreset::Custom => "Custom Range",
        }
    }
}

/// Inclusive date range. A missing bound means "today" when tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        DateRange {
            from: Some(from),
            to: Some(to),
        }
    }

    /// Swap the bounds if they are reversed
    pub fn normalized(self) -> Self {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => DateRange {
                from: Some(to),
                to: Some(from),
            },
            _ => self,
        }
    }
}

/// The range a preset covers as of `today`. `All` has no range.
pub fn preset_range(preset: TimePreset, today: NaiveDate) -> Option<DateRange> {
    let range = match preset {
        TimePreset::All => return None,
        TimePreset::Overdue => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
            DateRange::new(epoch, today.pred_opt()?)
        }
        TimePreset::Today | TimePreset::Custom => DateRange::new(today, today),
        TimePreset::ThisWeek => {
            let to_sunday = 6 - today.weekday().num_days_from_monday();
            DateRange::new(today, today.checked_add_days(Days::new(u64::from(to_sunday)))?)
        }
        TimePreset::ThisMonth => {
            let last = days_in_month(today.year(), today.month());
            DateRange::new(today, NaiveDate::from_ymd_opt(today.year(), today.month(), last)?)
        }
        TimePreset::ThisQuarter => {
            let quarter_end = ((today.month() - 1) / 3 + 1) * 3;
            let last = days_in_month(today.year(), quarter_end);
            DateRange::new(today, NaiveDate::from_ymd_opt(today.year(), quarter_end, last)?)
        }
        TimePreset::ThisYear => {
            DateRange::new(today, NaiveDate::from_ymd_opt(today.year(), 12, 31)?)
        }
    };
    Some(range)
}

/// Inclusive range test
pub fn is_in_range(date: NaiveDate, range: DateRange, today: NaiveDate) -> bool {
    let from = range.from.unwrap_or(today);
    let to = range.to.unwrap_or(today);
    date >= from && date <= to
}

/// Board-level time filter over due dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFilter {
    pub preset: TimePreset,
    pub range: DateRange,
    /// Keep tasks without a due date when a range is active
    pub show_unscheduled: bool,
}

impl Default for TimeFilter {
    fn default() -> Self {
        TimeFilter {
            preset: TimePreset::All,
            range: DateRange::default(),
            show_unscheduled: false,
        }
    }
}

impl TimeFilter {
    /// Filter for a preset, resolving its range as of `today`
    pub fn for_preset(preset: TimePreset, today: NaiveDate) -> Self {
        TimeFilter {
            preset,
            range: preset_range(preset, today).unwrap_or_default(),
            show_unscheduled: false,
        }
    }

    pub fn custom(from: NaiveDate, to: NaiveDate) -> Self {
        TimeFilter {
            preset: TimePreset::Custom,
            range: DateRange::new(from, to).normalized(),
            show_unscheduled: false,
        }
    }

    pub fn matches(&self, task: &Task, today: NaiveDate) -> bool {
        if self.preset == TimePreset::All {
            return true;
        }
        match task.due_date {
            Some(due) => is_in_range(due, self.range, today),
            None => self.show_unscheduled,
        }
    }

    pub fn apply<'a>(&self, tasks: &'a [Task], today: NaiveDate) -> Vec<&'a Task> {
        tasks.iter().filter(|t| self.matches(t, today)).collect()
    }
}
