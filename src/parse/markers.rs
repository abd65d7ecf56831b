use std::sync::LazyLock;

use regex::Regex;

pub const DUE_GLYPH: &str = "📅";
pub const SCHEDULED_GLYPH: &str = "⏳";
pub const DONE_GLYPH: &str = "✅";
pub const ARCHIVED_GLYPH: &str = "📥";
pub const RECURRENCE_GLYPH: &str = "🔁";

/// Checkbox list item: indent, list marker, checkbox, content
pub static TASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)([-*+])\s*\[([ xX])\]\s*(.*)$").unwrap());

/// Just the checkbox of a task line, for in-place toggling
pub static CHECKBOX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*[-*+]\s*)\[([ xX])\]").unwrap());

/// Recurrence text runs until the next glyph, the next tag or end of line
pub static RECURRENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"🔁\s*([^📅⏳✅📥🔁#]+)").unwrap());

pub static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#[\w/-]+").unwrap());

pub static STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#status/([\w-]+)").unwrap());

static DUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"📅\s*(\d{4}-\d{2}-\d{2})").unwrap());
static SCHEDULED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"⏳\s*(\d{4}-\d{2}-\d{2})").unwrap());
static DONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"✅\s*(\d{4}-\d{2}-\d{2})").unwrap());
static ARCHIVED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"📥\s*(\d{4}-\d{2}-\d{2})").unwrap());

/// The four date-valued markers a task line can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMarker {
    Due,
    Scheduled,
    Done,
    Archived,
}

impl DateMarker {
    pub const ALL: [DateMarker; 4] = [
        DateMarker::Due,
        DateMarker::Scheduled,
        DateMarker::Done,
        DateMarker::Archived,
    ];

    pub fn glyph(self) -> &'static str {
        match self {
            DateMarker::Due => DUE_GLYPH,
            DateMarker::Scheduled => SCHEDULED_GLYPH,
            DateMarker::Done => DONE_GLYPH,
            DateMarker::Archived => ARCHIVED_GLYPH,
        }
    }

    /// Pattern matching the glyph and its date; group 1 is the date text
    pub fn regex(self) -> &'static Regex {
        match self {
            DateMarker::Due => &*DUE_RE,
            DateMarker::Scheduled => &*SCHEDULED_RE,
            DateMarker::Done => &*DONE_RE,
            DateMarker::Archived => &*ARCHIVED_RE,
        }
    }

    /// `<glyph> <date>` as written into a line
    pub fn render(self, date: &str) -> String {
        format!("{} {}", self.glyph(), date)
    }
}
