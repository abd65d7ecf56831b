//! General recurrence phrases.
//!
//! Handles the richer phrases people type by hand: weekday and month lists,
//! numbered weekdays, several days of the month, `for N times` and `until`.
//! Phrases are split into words, each word becomes one token, and a small
//! recursive-descent parser turns the tokens into a [`RecurrenceSpec`].

use chrono::{NaiveDate, Weekday};

use crate::model::recurrence::{
    ByWeekday, Frequency, RecurrenceBuilder, RecurrenceError, RecurrenceSpec,
};
use crate::util::dates::parse_date;

const WORKDAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(i64),
    /// `1st`, `second`, `last` (-1)
    Ordinal(i64),
    Every,
    Other,
    /// `day`, `weeks`, ...
    Unit(Frequency),
    /// `daily`, `weekly`, ...
    Adverb(Frequency),
    /// `weekday`, `weekdays`
    Workdays,
    DayName(Weekday),
    MonthName(u32),
    On,
    The,
    Of,
    In,
    For,
    Times,
    Until,
    Comma,
    Date(NaiveDate),
}

/// Parse a lowercased phrase (a leading `every` is optional) into a rule
/// anchored at `anchor`.
pub fn parse_phrase(text: &str, anchor: NaiveDate) -> Result<RecurrenceSpec, RecurrenceError> {
    let tokens = tokenize(text)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        text,
    };
    let builder = parser.phrase()?;
    builder.build(anchor)
}

fn tokenize(text: &str) -> Result<Vec<Token>, RecurrenceError> {
    let spaced = text.to_lowercase().replace(',', " , ");
    spaced
        .split_whitespace()
        .map(|word| {
            let word = word.trim_end_matches('.');
            classify(word).ok_or_else(|| {
                RecurrenceError::Unrecognized(format!("{} (unknown word '{}')", text.trim(), word))
            })
        })
        .collect()
}

fn classify(word: &str) -> Option<Token> {
    let token = match word {
        "," | "and" | "or" | "&" => Token::Comma,
        "every" | "each" => Token::Every,
        "other" => Token::Other,
        "on" => Token::On,
        "the" => Token::The,
        "of" => Token::Of,
        "in" => Token::In,
        "for" => Token::For,
        "time" | "times" => Token::Times,
        "until" => Token::Until,
        "day" | "days" => Token::Unit(Frequency::Daily),
        "week" | "weeks" => Token::Unit(Frequency::Weekly),
        "month" | "months" => Token::Unit(Frequency::Monthly),
        "year" | "years" => Token::Unit(Frequency::Yearly),
        "daily" => Token::Adverb(Frequency::Daily),
        "weekly" => Token::Adverb(Frequency::Weekly),
        "monthly" => Token::Adverb(Frequency::Monthly),
        "yearly" | "annually" => Token::Adverb(Frequency::Yearly),
        "weekday" | "weekdays" => Token::Workdays,
        "first" => Token::Ordinal(1),
        "second" => Token::Ordinal(2),
        "third" => Token::Ordinal(3),
        "fourth" => Token::Ordinal(4),
        "fifth" => Token::Ordinal(5),
        "last" => Token::Ordinal(-1),
        _ => return classify_open(word),
    };
    Some(token)
}

fn classify_open(word: &str) -> Option<Token> {
    if let Some(day) = day_name(word) {
        return Some(Token::DayName(day));
    }
    if let Some(month) = month_name(word) {
        return Some(Token::MonthName(month));
    }
    if word.len() == 10 && word.as_bytes()[4] == b'-' {
        return parse_date(word).map(Token::Date);
    }
    if !word.is_empty() && word.bytes().all(|b| b.is_ascii_digit()) {
        return word.parse().ok().map(Token::Number);
    }
    for suffix in ["st", "nd", "rd", "th"] {
        if let Some(digits) = word.strip_suffix(suffix)
            && !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
        {
            return digits.parse().ok().map(Token::Ordinal);
        }
    }
    None
}

fn day_name(word: &str) -> Option<Weekday> {
    let word = word.strip_suffix('s').filter(|w| w.ends_with("day")).unwrap_or(word);
    let day = match word {
        "mon" | "monday" => Weekday::Mon,
        "tue" | "tues" | "tuesday" => Weekday::Tue,
        "wed" | "weds" | "wednesday" => Weekday::Wed,
        "thu" | "thur" | "thurs" | "thursday" => Weekday::Thu,
        "fri" | "friday" => Weekday::Fri,
        "sat" | "saturday" => Weekday::Sat,
        "sun" | "sunday" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

fn month_name(word: &str) -> Option<u32> {
    let month = match word {
        "jan" | "january" => 1,
        "feb" | "february" => 2,
        "mar" | "march" => 3,
        "apr" | "april" => 4,
        "may" => 5,
        "jun" | "june" => 6,
        "jul" | "july" => 7,
        "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" => 10,
        "nov" | "november" => 11,
        "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'t> {
    tokens: Vec<Token>,
    pos: usize,
    text: &'t str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn accept(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unrecognized(&self) -> RecurrenceError {
        RecurrenceError::Unrecognized(self.text.trim().to_string())
    }

    /// phrase := [every] body clause*
    fn phrase(&mut self) -> Result<RecurrenceBuilder, RecurrenceError> {
        self.accept(&Token::Every);
        let mut builder = self.body()?;
        loop {
            match self.peek() {
                Some(Token::On) => {
                    self.pos += 1;
                    builder = self.on_items(builder)?;
                }
                Some(Token::In) => {
                    self.pos += 1;
                    builder = self.months(builder)?;
                }
                Some(Token::For) => {
                    self.pos += 1;
                    let Some(Token::Number(n)) = self.bump() else {
                        return Err(self.unrecognized());
                    };
                    self.accept(&Token::Times);
                    builder = builder.count(n);
                }
                Some(Token::Until) => {
                    self.pos += 1;
                    let until = self.until_date()?;
                    builder = builder.until(until);
                }
                Some(Token::Comma) => self.pos += 1,
                Some(_) => return Err(self.unrecognized()),
                None => break,
            }
        }
        Ok(builder)
    }

    fn body(&mut self) -> Result<RecurrenceBuilder, RecurrenceError> {
        let Some(token) = self.bump() else {
            return Err(self.unrecognized());
        };
        match token {
            Token::Adverb(freq) | Token::Unit(freq) => Ok(RecurrenceSpec::builder(freq)),
            Token::Other => {
                let freq = self.unit()?;
                Ok(RecurrenceSpec::builder(freq).interval(2))
            }
            Token::Number(n) => {
                let freq = self.unit()?;
                Ok(RecurrenceSpec::builder(freq).interval(n))
            }
            Token::Ordinal(n) => match (self.peek(), self.peek_at(1)) {
                (Some(Token::DayName(_)), _) | (Some(Token::Unit(Frequency::Daily)), Some(Token::Of)) => {
                    self.pos -= 1;
                    self.on_items(RecurrenceSpec::builder(Frequency::Monthly))
                }
                (Some(Token::Unit(_)), _) if n > 0 => {
                    let freq = self.unit()?;
                    Ok(RecurrenceSpec::builder(freq).interval(n))
                }
                _ => Err(self.unrecognized()),
            },
            Token::Workdays => Ok(RecurrenceSpec::builder(Frequency::Weekly)
                .weekdays(WORKDAYS.map(ByWeekday::every))),
            Token::DayName(_) => {
                self.pos -= 1;
                let days = self.day_list();
                Ok(RecurrenceSpec::builder(Frequency::Weekly)
                    .weekdays(days.into_iter().map(ByWeekday::every)))
            }
            Token::MonthName(_) => {
                self.pos -= 1;
                self.months(RecurrenceSpec::builder(Frequency::Yearly))
            }
            _ => Err(self.unrecognized()),
        }
    }

    fn unit(&mut self) -> Result<Frequency, RecurrenceError> {
        match self.bump() {
            Some(Token::Unit(freq)) => Ok(freq),
            _ => Err(self.unrecognized()),
        }
    }

    /// Weekday names joined by commas, `and` or `or`
    fn day_list(&mut self) -> Vec<Weekday> {
        let mut days = Vec::new();
        while let Some(Token::DayName(day)) = self.peek() {
            days.push(*day);
            self.pos += 1;
            if self.peek() == Some(&Token::Comma)
                && matches!(self.peek_at(1), Some(Token::DayName(_)))
            {
                self.pos += 1;
            }
        }
        days
    }

    fn months(&mut self, mut builder: RecurrenceBuilder) -> Result<RecurrenceBuilder, RecurrenceError> {
        let mut any = false;
        while let Some(Token::MonthName(month)) = self.peek() {
            builder = builder.month(i64::from(*month));
            any = true;
            self.pos += 1;
            if self.peek() == Some(&Token::Comma)
                && matches!(self.peek_at(1), Some(Token::MonthName(_)))
            {
                self.pos += 1;
            }
        }
        if any { Ok(builder) } else { Err(self.unrecognized()) }
    }

    /// The items after `on`: days of the month, numbered weekdays, plain
    /// weekdays or `weekdays`. Numbers directly followed by a weekday name
    /// (`1st and 3rd monday`) all attach to that weekday.
    fn on_items(&mut self, mut builder: RecurrenceBuilder) -> Result<RecurrenceBuilder, RecurrenceError> {
        let mut pending: Vec<i64> = Vec::new();
        let mut any = false;
        loop {
            self.accept(&Token::The);
            match self.peek().cloned() {
                Some(Token::Ordinal(n)) | Some(Token::Number(n)) => {
                    self.pos += 1;
                    if let Some(Token::DayName(day)) = self.peek().cloned() {
                        self.pos += 1;
                        for nth in pending.drain(..).chain(std::iter::once(n)) {
                            builder = builder.weekday(ByWeekday::nth(day, self.weekday_position(nth)?));
                        }
                    } else {
                        if self.peek() == Some(&Token::Unit(Frequency::Daily)) {
                            self.pos += 1;
                        }
                        pending.push(n);
                    }
                }
                Some(Token::DayName(_)) => {
                    for day in self.day_list() {
                        builder = builder.weekday(ByWeekday::every(day));
                    }
                }
                Some(Token::Workdays) => {
                    self.pos += 1;
                    builder = builder.weekdays(WORKDAYS.map(ByWeekday::every));
                }
                _ => break,
            }
            any = true;
            self.skip_of_the_month();
            let continues = self.peek() == Some(&Token::Comma)
                && matches!(
                    self.peek_at(1),
                    Some(
                        Token::Ordinal(_)
                            | Token::Number(_)
                            | Token::DayName(_)
                            | Token::Workdays
                            | Token::The
                    )
                );
            if !continues {
                break;
            }
            self.pos += 1;
        }
        if !any {
            return Err(self.unrecognized());
        }
        for day in pending {
            builder = builder.month_day(day);
        }
        Ok(builder)
    }

    fn weekday_position(&self, nth: i64) -> Result<i8, RecurrenceError> {
        i8::try_from(nth).map_err(|_| {
            RecurrenceError::InvalidSpec(format!("weekday position out of range: {}", nth))
        })
    }

    /// `of the month`, `of every month`, `of each month`
    fn skip_of_the_month(&mut self) {
        if self.peek() != Some(&Token::Of) {
            return;
        }
        let save = self.pos;
        self.pos += 1;
        if !self.accept(&Token::The) {
            self.accept(&Token::Every);
        }
        if !self.accept(&Token::Unit(Frequency::Monthly)) {
            self.pos = save;
        }
    }

    /// `2025-05-01` or `may 1, 2025` (`may 1st 2025`)
    fn until_date(&mut self) -> Result<NaiveDate, RecurrenceError> {
        self.accept(&Token::The);
        match self.bump() {
            Some(Token::Date(date)) => Ok(date),
            Some(Token::MonthName(month)) => {
                let day = match self.bump() {
                    Some(Token::Number(d)) | Some(Token::Ordinal(d)) => d,
                    _ => return Err(self.unrecognized()),
                };
                self.accept(&Token::Comma);
                let Some(Token::Number(year)) = self.bump() else {
                    return Err(self.unrecognized());
                };
                let date = i32::try_from(year)
                    .ok()
                    .zip(u32::try_from(day).ok())
                    .and_then(|(y, d)| NaiveDate::from_ymd_opt(y, month, d));
                date.ok_or_else(|| {
                    RecurrenceError::InvalidDate(format!("{}-{:02}-{:02}", year, month, day))
                })
            }
            _ => Err(self.unrecognized()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::engine::{Occurrences, next_after};

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn next(phrase: &str, from: &str) -> Option<NaiveDate> {
        let spec = parse_phrase(phrase, d(from)).unwrap();
        next_after(&spec, d(from), false)
    }

    fn series(phrase: &str, from: &str, n: usize) -> Vec<String> {
        let spec = parse_phrase(phrase, d(from)).unwrap();
        Occurrences::new(&spec).take(n).map(|d| d.to_string()).collect()
    }

    #[test]
    fn test_weekday_list() {
        // 2025-03-15 is a Saturday
        assert_eq!(
            series("every monday and friday", "2025-03-15", 3),
            vec!["2025-03-17", "2025-03-21", "2025-03-24"]
        );
        assert_eq!(
            series("mon, wed, fri", "2025-03-17", 3),
            vec!["2025-03-17", "2025-03-19", "2025-03-21"]
        );
    }

    #[test]
    fn test_workdays() {
        assert_eq!(next("weekday", "2025-03-14"), Some(d("2025-03-17")));
        assert_eq!(next("every weekday", "2025-03-17"), Some(d("2025-03-18")));
    }

    #[test]
    fn test_numbered_weekday() {
        assert_eq!(next("2nd tuesday", "2025-03-15"), Some(d("2025-04-08")));
        assert_eq!(next("last friday", "2025-03-01"), Some(d("2025-03-28")));
        assert_eq!(
            next("month on the first monday", "2025-03-15"),
            Some(d("2025-04-07"))
        );
        assert_eq!(
            series("month on the 1st and 3rd monday", "2025-03-01", 3),
            vec!["2025-03-03", "2025-03-17", "2025-04-07"]
        );
    }

    #[test]
    fn test_month_days() {
        assert_eq!(
            series("month on the 1st and 15th", "2025-03-10", 3),
            vec!["2025-03-15", "2025-04-01", "2025-04-15"]
        );
        assert_eq!(
            next("month on the last day", "2025-02-10"),
            Some(d("2025-02-28"))
        );
        assert_eq!(next("last day of the month", "2025-04-30"), Some(d("2025-05-31")));
    }

    #[test]
    fn test_other_and_ordinal_intervals() {
        assert_eq!(next("other week", "2025-03-15"), Some(d("2025-03-29")));
        assert_eq!(next("every 3rd day", "2025-03-15"), Some(d("2025-03-18")));
        assert_eq!(next("2 months on the 10th", "2025-03-15"), Some(d("2025-05-10")));
    }

    #[test]
    fn test_month_lists() {
        assert_eq!(
            series("january and july", "2025-03-15", 2),
            vec!["2025-07-15", "2026-01-15"]
        );
        assert_eq!(
            next("year in june on the 1st", "2025-03-15"),
            Some(d("2025-06-01"))
        );
        assert_eq!(
            series("monday in december", "2025-11-01", 2),
            vec!["2025-12-01", "2025-12-08"]
        );
    }

    #[test]
    fn test_count_and_until() {
        assert_eq!(
            series("day for 3 times", "2025-03-15", 10),
            vec!["2025-03-15", "2025-03-16", "2025-03-17"]
        );
        assert_eq!(
            series("week until 2025-03-29", "2025-03-15", 10),
            vec!["2025-03-15", "2025-03-22", "2025-03-29"]
        );
        assert_eq!(
            series("week until march 22, 2025", "2025-03-15", 10),
            vec!["2025-03-15", "2025-03-22"]
        );
    }

    #[test]
    fn test_unrecognized() {
        for phrase in ["", "fortnightly", "2 blargs", "on the", "day at 9am", "last week"] {
            assert!(
                matches!(
                    parse_phrase(phrase, d("2025-03-15")),
                    Err(RecurrenceError::Unrecognized(_))
                ),
                "{phrase}"
            );
        }
    }

    #[test]
    fn test_invalid_values_are_spec_errors() {
        assert!(matches!(
            parse_phrase("0 days", d("2025-03-15")),
            Err(RecurrenceError::InvalidSpec(_))
        ));
        assert!(matches!(
            parse_phrase("month on the 40th", d("2025-03-15")),
            Err(RecurrenceError::InvalidSpec(_))
        ));
        assert!(matches!(
            parse_phrase("week until feb 30, 2025", d("2025-01-01")),
            Err(RecurrenceError::InvalidDate(_))
        ));
    }
}
