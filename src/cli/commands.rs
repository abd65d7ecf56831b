use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tb", about = concat!("taskboard v", env!("CARGO_PKG_VERSION"), " - a kanban board over markdown checkboxes"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different vault directory
    #[arg(short = 'C', long = "vault-dir", global = true)]
    pub vault_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a taskboard.toml in the current directory
    Init(InitArgs),
    /// Show tasks grouped into board columns
    Board(BoardArgs),
    /// List tasks matching a query
    List(ListArgs),
    /// List archived tasks
    Archived,
    /// Add a task to the todo file
    Add(AddArgs),
    /// Move a task to a column
    Move(MoveArgs),
    /// Mark a task complete
    Done(IdArgs),
    /// Mark a task incomplete
    Undone(IdArgs),
    /// Set or clear a task's due date
    Due(DueArgs),
    /// Archive a task
    Archive(IdArgs),
    /// Move an archived task back to the todo file
    Unarchive(IdArgs),
    /// Preview the next dates of a recurrence phrase
    Next(NextArgs),
    /// Validate the board configuration and recurring tasks
    Check,
    /// View or manage the recovery log
    Recovery(RecoveryCmd),
}

#[derive(Args)]
pub struct InitArgs {
    /// Turn on the recurring/todo/archive layout and create its files
    #[arg(long)]
    pub three_file: bool,
    /// Overwrite an existing taskboard.toml
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct BoardArgs {
    /// Show every task regardless of due date (default)
    #[arg(long, conflicts_with = "preset")]
    pub all_time: bool,
    /// Due-date window: overdue, today, this-week, this-month, this-quarter, this-year
    #[arg(long)]
    pub preset: Option<String>,
    /// Only tasks with this tag (repeatable; any match)
    #[arg(long)]
    pub tag: Vec<String>,
    /// With --preset, also show tasks that have no due date
    #[arg(long)]
    pub unscheduled: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Filter terms, e.g. `status:doing tag:home due:week milk`
    pub query: Vec<String>,
}

#[derive(Args)]
pub struct NextArgs {
    /// Recurrence phrase, e.g. "every 2nd tuesday"
    pub phrase: String,
    /// Anchor date (default: today)
    #[arg(long)]
    pub from: Option<String>,
    /// Number of dates to show
    #[arg(short = 'n', long, default_value = "5")]
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Task text; several words are joined with spaces
    #[arg(required = true)]
    pub text: Vec<String>,
    /// YYYY-MM-DD, today, or tomorrow
    #[arg(long)]
    pub due: Option<String>,
    /// Column id (default: board.default_status)
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Args)]
pub struct IdArgs {
    /// Task id as `path:line`
    pub id: String,
}

#[derive(Args)]
pub struct MoveArgs {
    /// Task id as `path:line`
    pub id: String,
    /// Target column id
    pub status: String,
}

#[derive(Args)]
pub struct DueArgs {
    /// Task id as `path:line`
    pub id: String,
    /// YYYY-MM-DD, today, tomorrow, or none
    pub date: String,
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecoveryCmd {
    #[command(subcommand)]
    pub action: Option<RecoveryAction>,
    /// Maximum number of entries to show
    #[arg(long, default_value = "10")]
    pub limit: usize,
}

#[derive(Subcommand)]
pub enum RecoveryAction {
    /// Remove old entries
    Prune(RecoveryPruneArgs),
}

#[derive(Args)]
pub struct RecoveryPruneArgs {
    /// Remove entries older than this date (default: 30 days ago)
    #[arg(long, conflicts_with = "all")]
    pub before: Option<String>,
    /// Remove all entries
    #[arg(long)]
    pub all: bool,
}
