use std::collections::VecDeque;

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::model::recurrence::{ByWeekday, Frequency, RecurrenceSpec};
use crate::util::dates::{clamped_date, days_in_month, week_start};

/// Consecutive periods without a single match before iteration gives up.
/// Bounds rules that can never fire, such as the 31st of every February.
const MAX_EMPTY_PERIODS: u32 = 5_000;

/// Iterator over every occurrence of a rule, in ascending order, starting
/// at the anchor.
///
/// Each step expands one period (a day, week, month or year, `interval`
/// periods apart) into its candidate dates. Month days beyond the end of a
/// shorter month clamp to its last day, always measured from the anchor day
/// so a series that starts on the 31st returns to the 31st when it can.
pub struct Occurrences<'a> {
    spec: &'a RecurrenceSpec,
    period: u64,
    buffer: VecDeque<NaiveDate>,
    emitted: u32,
    finished: bool,
}

impl<'a> Occurrences<'a> {
    pub fn new(spec: &'a RecurrenceSpec) -> Self {
        Occurrences {
            spec,
            period: 0,
            buffer: VecDeque::new(),
            emitted: 0,
            finished: false,
        }
    }

    fn fill(&mut self) {
        let mut empty_run = 0;
        while !self.finished && self.buffer.is_empty() {
            let step = self.period.saturating_mul(u64::from(self.spec.interval));
            self.period += 1;

            let Some((start, mut dates)) = expand_period(self.spec, step) else {
                self.finished = true;
                break;
            };
            if let Some(until) = self.spec.until
                && start > until
            {
                self.finished = true;
                break;
            }

            dates.retain(|d| *d >= self.spec.anchor);
            dates.sort_unstable();
            dates.dedup();
            if dates.is_empty() {
                empty_run += 1;
                if empty_run >= MAX_EMPTY_PERIODS {
                    self.finished = true;
                }
                continue;
            }
            self.buffer.extend(dates);
        }
    }
}

impl Iterator for Occurrences<'_> {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if let Some(count) = self.spec.count
            && self.emitted >= count
        {
            self.finished = true;
            return None;
        }
        if self.buffer.is_empty() {
            self.fill();
        }
        let date = self.buffer.pop_front()?;
        if let Some(until) = self.spec.until
            && date > until
        {
            self.finished = true;
            self.buffer.clear();
            return None;
        }
        self.emitted += 1;
        Some(date)
    }
}

/// First occurrence after `reference`, or on it when `inclusive`.
pub fn next_after(spec: &RecurrenceSpec, reference: NaiveDate, inclusive: bool) -> Option<NaiveDate> {
    Occurrences::new(spec).find(|d| if inclusive { *d >= reference } else { *d > reference })
}

/// Every occurrence in `from..=to`.
pub fn between(spec: &RecurrenceSpec, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    Occurrences::new(spec)
        .take_while(|d| *d <= to)
        .filter(|d| *d >= from)
        .collect()
}

// ---------------------------------------------------------------------------
// Period expansion
// ---------------------------------------------------------------------------

/// Start date of the period `step` units after the anchor's period, and
/// the candidate dates inside it. `None` once the calendar runs out.
fn expand_period(spec: &RecurrenceSpec, step: u64) -> Option<(NaiveDate, Vec<NaiveDate>)> {
    let anchor = spec.anchor;
    match spec.frequency {
        Frequency::Daily => {
            let day = anchor.checked_add_days(Days::new(step))?;
            let keep = passes_filters(spec, day);
            Some((day, if keep { vec![day] } else { Vec::new() }))
        }
        Frequency::Weekly => {
            let start = week_start(anchor, spec.week_start)
                .checked_add_days(Days::new(step.checked_mul(7)?))?;
            let dates = (0..7)
                .filter_map(|i| start.checked_add_days(Days::new(i)))
                .filter(|d| {
                    if spec.by_weekday.is_empty() {
                        d.weekday() == anchor.weekday()
                    } else {
                        spec.by_weekday.iter().any(|w| w.weekday == d.weekday())
                    }
                })
                .filter(|d| month_allowed(spec, *d) && month_day_allowed(spec, *d))
                .collect();
            Some((start, dates))
        }
        Frequency::Monthly => {
            let (year, month) = add_months(anchor.year(), anchor.month(), step)?;
            let start = NaiveDate::from_ymd_opt(year, month, 1)?;
            if !spec.by_month.is_empty() && !spec.by_month.contains(&month) {
                return Some((start, Vec::new()));
            }
            Some((start, month_candidates(spec, year, month)))
        }
        Frequency::Yearly => {
            let year = i32::try_from(i64::from(anchor.year()).checked_add(i64::try_from(step).ok()?)?).ok()?;
            let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
            Some((start, year_candidates(spec, year)))
        }
    }
}

fn add_months(year: i32, month: u32, step: u64) -> Option<(i32, u32)> {
    let index = i64::from(year) * 12 + i64::from(month - 1) + i64::try_from(step).ok()?;
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
    Some((year, month))
}

/// Dates inside one month for a monthly rule (or a yearly rule with months).
fn month_candidates(spec: &RecurrenceSpec, year: i32, month: u32) -> Vec<NaiveDate> {
    if !spec.by_month_day.is_empty() {
        return spec
            .by_month_day
            .iter()
            .filter_map(|d| resolve_month_day(year, month, *d))
            .filter(|d| {
                spec.by_weekday.is_empty()
                    || spec.by_weekday.iter().any(|w| w.weekday == d.weekday())
            })
            .collect();
    }
    if !spec.by_weekday.is_empty() {
        return spec
            .by_weekday
            .iter()
            .flat_map(|w| select_weekdays(weekdays_in_month(year, month, w.weekday), *w))
            .collect();
    }
    clamped_date(year, month, spec.anchor.day()).into_iter().collect()
}

fn year_candidates(spec: &RecurrenceSpec, year: i32) -> Vec<NaiveDate> {
    if spec.by_month.is_empty() && spec.by_month_day.is_empty() && !spec.by_weekday.is_empty() {
        // Weekdays across the whole year; `nth` counts within the year
        return spec
            .by_weekday
            .iter()
            .flat_map(|w| select_weekdays(weekdays_in_year(year, w.weekday), *w))
            .collect();
    }
    let months = if spec.by_month.is_empty() {
        vec![spec.anchor.month()]
    } else {
        spec.by_month.clone()
    };
    months
        .into_iter()
        .flat_map(|m| month_candidates(spec, year, m))
        .collect()
}

/// Positive days clamp to the month end; negative days count back from it
/// and are skipped when they fall before the 1st.
fn resolve_month_day(year: i32, month: u32, day: i8) -> Option<NaiveDate> {
    if day > 0 {
        clamped_date(year, month, day as u32)
    } else {
        let from_end = i64::from(days_in_month(year, month)) + 1 + i64::from(day);
        if from_end < 1 {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, from_end as u32)
    }
}

fn select_weekdays(all: Vec<NaiveDate>, by: ByWeekday) -> Vec<NaiveDate> {
    match by.nth {
        None => all,
        Some(n) if n > 0 => all.get(n as usize - 1).copied().into_iter().collect(),
        Some(n) => {
            let back = n.unsigned_abs() as usize;
            all.len()
                .checked_sub(back)
                .and_then(|i| all.get(i).copied())
                .into_iter()
                .collect()
        }
    }
}

fn weekdays_in_month(year: i32, month: u32, weekday: Weekday) -> Vec<NaiveDate> {
    (1..=days_in_month(year, month))
        .filter_map(|d| NaiveDate::from_ymd_opt(year, month, d))
        .filter(|d| d.weekday() == weekday)
        .collect()
}

fn weekdays_in_year(year: i32, weekday: Weekday) -> Vec<NaiveDate> {
    (1..=12)
        .flat_map(|m| weekdays_in_month(year, m, weekday))
        .collect()
}

fn month_allowed(spec: &RecurrenceSpec, date: NaiveDate) -> bool {
    spec.by_month.is_empty() || spec.by_month.contains(&date.month())
}

fn month_day_allowed(spec: &RecurrenceSpec, date: NaiveDate) -> bool {
    spec.by_month_day.is_empty()
        || spec
            .by_month_day
            .iter()
            .any(|d| resolve_month_day(date.year(), date.month(), *d) == Some(date))
}

fn passes_filters(spec: &RecurrenceSpec, date: NaiveDate) -> bool {
    month_allowed(spec, date)
        && month_day_allowed(spec, date)
        && (spec.by_weekday.is_empty()
            || spec.by_weekday.iter().any(|w| w.weekday == date.weekday()))
}
