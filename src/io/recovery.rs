use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tempfile::NamedTempFile;

/// Directory under the vault root holding taskboard's own files
pub const STATE_DIR: &str = ".taskboard";

/// Entries older than this are dropped by a plain `prune`
pub const PRUNE_AGE_DAYS: i64 = 30;

const LOG_HEADER: &str = "\
<!-- taskboard recovery log
     Lines taskboard could not place cleanly are recorded here.
     View with: tb recovery
     Prune with: tb recovery prune -->

---
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryCategory {
    /// Destination written, source line still present
    Duplicate,
    Write,
    Parser,
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecoveryCategory::Duplicate => "duplicate",
            RecoveryCategory::Write => "write",
            RecoveryCategory::Parser => "parser",
        })
    }
}

impl RecoveryCategory {
    pub fn parse_category(s: &str) -> Option<Self> {
        match s {
            "duplicate" => Some(RecoveryCategory::Duplicate),
            "write" => Some(RecoveryCategory::Write),
            "parser" => Some(RecoveryCategory::Parser),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: RecoveryCategory,
    pub description: String,
    pub fields: Vec<(String, String)>,
    /// Raw task line(s) involved, kept verbatim
    pub body: String,
}

impl RecoveryEntry {
    pub fn new(category: RecoveryCategory, description: impl Into<String>) -> Self {
        RecoveryEntry {
            timestamp: Utc::now(),
            category,
            description: description.into(),
            fields: Vec::new(),
            body: String::new(),
        }
    }

    pub fn field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.push((key.to_string(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "## {} | {} | {}\n\n",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.category,
            self.description,
        );
        for (key, value) in &self.fields {
            out.push_str(&format!("{}: {}\n", key, value));
        }
        if !self.body.is_empty() {
            out.push_str("\n```text\n");
            out.push_str(&self.body);
            if !self.body.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n");
        }
        out.push_str("\n---\n");
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        let fields: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::json!({
            "timestamp": self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            "category": self.category.to_string(),
            "description": self.description,
            "fields": fields,
            "body": self.body,
        })
    }
}

/// `<vault>/.taskboard`
pub fn state_dir(vault_root: &Path) -> PathBuf {
    vault_root.join(STATE_DIR)
}

pub fn recovery_log_path(state_dir: &Path) -> PathBuf {
    state_dir.join("recovery.log")
}

/// Write `content` to `path` through a sibling temp file and a rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Append an entry. Failures only produce a warning: the log is a safety
/// net and must never turn a handled error into a new one.
pub fn log_recovery(state_dir: &Path, entry: RecoveryEntry) {
    if let Err(e) = append_entry(state_dir, &entry) {
        tracing::warn!(
            dir = %state_dir.display(),
            error = %e,
            "could not write recovery log entry"
        );
    }
}

fn append_entry(state_dir: &Path, entry: &RecoveryEntry) -> io::Result<()> {
    fs::create_dir_all(state_dir)?;
    let path = recovery_log_path(state_dir);
    let fresh = fs::metadata(&path).map_or(true, |m| m.len() == 0);
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if fresh {
        file.write_all(LOG_HEADER.as_bytes())?;
    }
    file.write_all(entry.to_markdown().as_bytes())
}

/// Record a task line that now exists in both files of a cross-file move.
pub fn log_duplicate(state_dir: &Path, source: &str, destination: &str, line: &str, error: &str) {
    tracing::warn!(source, destination, "task line left in both files");
    log_recovery(
        state_dir,
        RecoveryEntry::new(RecoveryCategory::Duplicate, "source line not removed")
            .field("Source", source)
            .field("Destination", destination)
            .field("Error", error)
            .body(line),
    );
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Entries newest first, at most `limit` of them. A missing log reads as
/// empty.
pub fn read_recovery_entries(state_dir: &Path, limit: Option<usize>) -> Vec<RecoveryEntry> {
    let Ok(content) = fs::read_to_string(recovery_log_path(state_dir)) else {
        return Vec::new();
    };
    let mut entries = parse_entries(&content);
    entries.reverse();
    if let Some(n) = limit {
        entries.truncate(n);
    }
    entries
}

fn parse_header(header: &str) -> Option<(DateTime<Utc>, RecoveryCategory, String)> {
    let mut parts = header.splitn(3, " | ");
    let timestamp = DateTime::parse_from_rfc3339(parts.next()?)
        .ok()?
        .with_timezone(&Utc);
    let category = RecoveryCategory::parse_category(parts.next()?)?;
    let description = parts.next()?.to_string();
    Some((timestamp, category, description))
}

fn parse_entries(content: &str) -> Vec<RecoveryEntry> {
    let mut entries = Vec::new();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let Some((timestamp, category, description)) =
            line.strip_prefix("## ").and_then(parse_header)
        else {
            continue;
        };

        let mut fields = Vec::new();
        let mut body_lines: Vec<&str> = Vec::new();
        let mut in_fence = false;
        for line in lines.by_ref() {
            if in_fence {
                if line == "```" {
                    in_fence = false;
                } else {
                    body_lines.push(line);
                }
                continue;
            }
            if line == "---" {
                break;
            }
            if line.starts_with("```") {
                in_fence = true;
            } else if let Some((key, value)) = line.trim().split_once(": ") {
                fields.push((key.to_string(), value.to_string()));
            }
        }

        entries.push(RecoveryEntry {
            timestamp,
            category,
            description,
            fields,
            body: body_lines.join("\n"),
        });
    }
    entries
}

// ---------------------------------------------------------------------------
// Pruning
// ---------------------------------------------------------------------------

/// Drop entries older than `before` (default: [`PRUNE_AGE_DAYS`] ago), or
/// every entry when `all` is set. Returns how many were removed.
pub fn prune_recovery(
    state_dir: &Path,
    before: Option<DateTime<Utc>>,
    all: bool,
) -> io::Result<usize> {
    let path = recovery_log_path(state_dir);
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let entries = parse_entries(&content);
    let cutoff = before.unwrap_or_else(|| Utc::now() - chrono::Duration::days(PRUNE_AGE_DAYS));
    let kept: Vec<&RecoveryEntry> = if all {
        Vec::new()
    } else {
        entries.iter().filter(|e| e.timestamp >= cutoff).collect()
    };
    let removed = entries.len() - kept.len();

    let mut out = String::from(LOG_HEADER);
    for entry in kept {
        out.push_str(&entry.to_markdown());
    }
    atomic_write(&path, out.as_bytes())?;
    Ok(removed)
}
