use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Error type for recurrence interpretation and expansion
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecurrenceError {
    #[error("unrecognized recurrence: {0}")]
    Unrecognized(String),
    #[error("invalid recurrence: {0}")]
    InvalidSpec(String),
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("recurrence has no occurrence after {0}")]
    Exhausted(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn unit(self) -> &'static str {
        match self {
            Frequency::Daily => "day",
            Frequency::Weekly => "week",
            Frequency::Monthly => "month",
            Frequency::Yearly => "year",
        }
    }
}

/// A weekday constraint, optionally pinned to the nth occurrence in the
/// month (or year). Negative `nth` counts from the end: -1 is the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByWeekday {
    pub weekday: Weekday,
    pub nth: Option<i8>,
}

impl ByWeekday {
    pub fn every(weekday: Weekday) -> Self {
        ByWeekday { weekday, nth: None }
    }

    pub fn nth(weekday: Weekday, nth: i8) -> Self {
        ByWeekday {
            weekday,
            nth: Some(nth),
        }
    }
}

/// Structured recurrence rule. Built through [`RecurrenceSpec::builder`],
/// which validates every field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceSpec {
    pub frequency: Frequency,
    pub interval: u32,
    pub by_weekday: Vec<ByWeekday>,
    /// 1..=31 from the start of the month, -31..=-1 from its end
    pub by_month_day: Vec<i8>,
    pub by_month: Vec<u32>,
    pub week_start: Weekday,
    pub count: Option<u32>,
    pub until: Option<NaiveDate>,
    /// First date of the series. Occurrences before it are never produced.
    pub anchor: NaiveDate,
}

impl RecurrenceSpec {
    pub fn builder(frequency: Frequency) -> RecurrenceBuilder {
        RecurrenceBuilder {
            frequency,
            interval: 1,
            by_weekday: Vec::new(),
            by_month_day: Vec::new(),
            by_month: Vec::new(),
            week_start: Weekday::Mon,
            count: None,
            until: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecurrenceBuilder {
    frequency: Frequency,
    interval: i64,
    by_weekday: Vec<ByWeekday>,
    by_month_day: Vec<i64>,
    by_month: Vec<i64>,
    week_start: Weekday,
    count: Option<i64>,
    until: Option<NaiveDate>,
}

impl RecurrenceBuilder {
    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn interval(mut self, interval: i64) -> Self {
        self.interval = interval;
        self
    }

    pub fn weekday(mut self, weekday: ByWeekday) -> Self {
        if !self.by_weekday.contains(&weekday) {
            self.by_weekday.push(weekday);
        }
        self
    }

    pub fn weekdays(self, weekdays: impl IntoIterator<Item = ByWeekday>) -> Self {
        weekdays.into_iter().fold(self, |b, w| b.weekday(w))
    }

    pub fn month_day(mut self, day: i64) -> Self {
        if !self.by_month_day.contains(&day) {
            self.by_month_day.push(day);
        }
        self
    }

    pub fn month(mut self, month: i64) -> Self {
        if !self.by_month.contains(&month) {
            self.by_month.push(month);
        }
        self
    }

    pub fn week_start(mut self, weekday: Weekday) -> Self {
        self.week_start = weekday;
        self
    }

    pub fn count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn until(mut self, until: NaiveDate) -> Self {
        self.until = Some(until);
        self
    }

    /// Validate the collected fields and anchor the rule at `anchor`.
    pub fn build(self, anchor: NaiveDate) -> Result<RecurrenceSpec, RecurrenceError> {
        let interval = u32::try_from(self.interval)
            .ok()
            .filter(|i| *i >= 1)
            .ok_or_else(|| {
                RecurrenceError::InvalidSpec(format!("interval must be positive, got {}", self.interval))
            })?;

        let mut by_month_day = Vec::with_capacity(self.by_month_day.len());
        for day in self.by_month_day {
            if day == 0 || !(-31..=31).contains(&day) {
                return Err(RecurrenceError::InvalidSpec(format!(
                    "day of month must be 1..=31 or -31..=-1, got {}",
                    day
                )));
            }
            by_month_day.push(day as i8);
        }

        let mut by_month = Vec::with_capacity(self.by_month.len());
        for month in self.by_month {
            if !(1..=12).contains(&month) {
                return Err(RecurrenceError::InvalidSpec(format!(
                    "month must be 1..=12, got {}",
                    month
                )));
            }
            by_month.push(month as u32);
        }
        by_month.sort_unstable();

        for wd in &self.by_weekday {
            if let Some(n) = wd.nth {
                if n == 0 || !(-5..=5).contains(&n) {
                    return Err(RecurrenceError::InvalidSpec(format!(
                        "weekday position must be 1..=5 or -5..=-1, got {}",
                        n
                    )));
                }
                if matches!(self.frequency, Frequency::Daily | Frequency::Weekly) {
                    return Err(RecurrenceError::InvalidSpec(format!(
                        "a numbered weekday needs a monthly or yearly rule, got {:?}",
                        self.frequency
                    )));
                }
            }
        }

        let count = match self.count {
            None => None,
            Some(c) => Some(u32::try_from(c).ok().filter(|c| *c >= 1).ok_or_else(|| {
                RecurrenceError::InvalidSpec(format!("count must be positive, got {}", c))
            })?),
        };

        if let Some(until) = self.until
            && until < anchor
        {
            return Err(RecurrenceError::InvalidSpec(format!(
                "until {} is before the start {}",
                until, anchor
            )));
        }

        Ok(RecurrenceSpec {
            frequency: self.frequency,
            interval,
            by_weekday: self.by_weekday,
            by_month_day,
            by_month,
            week_start: self.week_start,
            count,
            until: self.until,
            anchor,
        })
    }
}
