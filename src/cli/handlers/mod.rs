mod init;
pub use init::cmd_init;

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::recovery::{self, prune_recovery, read_recovery_entries};
use crate::io::vault::FsVault;
use crate::model::config::{DONE_STATUS, TaskboardConfig};
use crate::model::task::{Task, split_task_id};
use crate::ops::check;
use crate::ops::filter::{TagFilter, TaskQuery, group_into_columns};
use crate::ops::scan::TaskScanner;
use crate::ops::task_ops::{MoveOutcome, TaskMutator, parse_due_arg};
use crate::recurrence::{Occurrences, interpret, normalize_phrase};
use crate::util::dates::{self, TimeFilter, TimePreset, format_date, resolve_date_arg};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Everything a command needs from the vault it runs against
struct Context {
    root: PathBuf,
    config: TaskboardConfig,
    vault: FsVault,
    today: NaiveDate,
}

impl Context {
    fn load(vault_dir: Option<&str>) -> Result<Context, Box<dyn std::error::Error>> {
        let start = match vault_dir {
            Some(dir) => std::fs::canonicalize(dir)
                .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?,
            None => std::env::current_dir()?,
        };
        let (root, config) = config_io::open_vault(&start)?;
        tracing::debug!(root = %root.display(), "opened vault");
        Ok(Context {
            vault: FsVault::new(&root),
            root,
            config,
            today: dates::today(),
        })
    }

    fn scanner(&self) -> TaskScanner<'_, FsVault> {
        TaskScanner::new(&self.vault, &self.config)
    }

    fn mutator(&self) -> TaskMutator<'_, FsVault> {
        TaskMutator::new(&self.vault)
            .with_today(self.today)
            .with_default_status(&self.config.board.default_status)
            .with_recovery_dir(recovery::state_dir(&self.root))
    }

    fn task(&self, id: &str) -> Result<Task, Box<dyn std::error::Error>> {
        Ok(self.scanner().find_by_id(id)?)
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let vault_dir = cli.vault_dir.as_deref();

    let command = match cli.command {
        Commands::Init(args) => return cmd_init(args, vault_dir),
        // Preview needs no vault
        Commands::Next(args) => return cmd_next(args, json),
        other => other,
    };

    let ctx = Context::load(vault_dir)?;
    match command {
        // Read commands
        Commands::Board(args) => cmd_board(&ctx, args, json),
        Commands::List(args) => cmd_list(&ctx, args, json),
        Commands::Archived => cmd_archived(&ctx, json),
        Commands::Check => cmd_check(&ctx, json),
        Commands::Recovery(args) => cmd_recovery(&ctx, args, json),

        // Write commands
        Commands::Add(args) => cmd_add(&ctx, args, json),
        Commands::Move(args) => cmd_move(&ctx, args, json),
        Commands::Done(args) => cmd_done(&ctx, args, json),
        Commands::Undone(args) => cmd_undone(&ctx, args, json),
        Commands::Due(args) => cmd_due(&ctx, args, json),
        Commands::Archive(args) => cmd_archive(&ctx, args, json),
        Commands::Unarchive(args) => cmd_unarchive(&ctx, args, json),

        Commands::Init(_) | Commands::Next(_) => unreachable!(),
    }
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn print_tasks(tasks: &[&Task], json: bool) -> CmdResult {
    if json {
        let out: Vec<TaskJson> = tasks.iter().map(|t| task_to_json(t)).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for task in tasks {
            println!("{}", format_task_line(task));
        }
    }
    Ok(())
}

fn cmd_board(ctx: &Context, args: BoardArgs, json: bool) -> CmdResult {
    let preset = if args.all_time { None } else { args.preset.as_deref() };
    let mut time = match preset {
        None => TimeFilter::default(),
        Some(name) => match TimePreset::parse(name) {
            Some(TimePreset::Custom) | None => {
                return Err(format!("unknown preset: {}", name).into());
            }
            Some(preset) => TimeFilter::for_preset(preset, ctx.today),
        },
    };
    time.show_unscheduled = args.unscheduled;
    let tags = TagFilter::new(&args.tag);

    let tasks = ctx.scanner().tasks()?;
    let visible: Vec<Task> = tasks
        .into_iter()
        .filter(|t| time.matches(t, ctx.today) && tags.matches(t))
        .collect();
    let columns = group_into_columns(&visible, &ctx.config);

    if json {
        let out: Vec<ColumnJson> = columns.iter().map(column_to_json).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        if time.preset != TimePreset::All {
            println!("({})", time.preset.label());
        }
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                println!();
            }
            for line in format_column(column) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn cmd_list(ctx: &Context, args: ListArgs, json: bool) -> CmdResult {
    let query = TaskQuery::parse(&args.query.join(" "))?;
    let tasks: Vec<Task> = ctx
        .scanner()
        .tasks()?
        .into_iter()
        .filter(|t| !t.is_archived())
        .collect();
    print_tasks(&query.apply(&tasks, ctx.today), json)
}

fn cmd_archived(ctx: &Context, json: bool) -> CmdResult {
    let scanner = ctx.scanner();
    let tasks = if ctx.config.files.three_file_system {
        scanner.scan_archive_file()?
    } else {
        scanner
            .scan_vault()?
            .into_iter()
            .filter(Task::is_archived)
            .collect()
    };
    let refs: Vec<&Task> = tasks.iter().collect();
    if refs.is_empty() && !json {
        println!("No archived tasks");
        return Ok(());
    }
    print_tasks(&refs, json)
}

fn cmd_next(args: NextArgs, json: bool) -> CmdResult {
    let today = dates::today();
    let anchor = match args.from.as_deref() {
        Some(s) => resolve_date_arg(s, today).ok_or_else(|| format!("invalid date: {}", s))?,
        None => today,
    };
    let spec = interpret(&normalize_phrase(&args.phrase), anchor)?;
    let next: Vec<String> = Occurrences::new(&spec)
        .filter(|d| *d > anchor)
        .take(args.count)
        .map(format_date)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&next)?);
    } else if next.is_empty() {
        println!("no further occurrences after {}", format_date(anchor));
    } else {
        for date in &next {
            println!("{}", date);
        }
    }
    Ok(())
}

fn cmd_check(ctx: &Context, json: bool) -> CmdResult {
    let tasks = ctx.scanner().tasks()?;
    let result = check::check_board(&ctx.vault, &ctx.config, &tasks);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    if !result.errors.is_empty() {
        println!("Errors:");
        for err in &result.errors {
            match err {
                check::CheckError::InvalidColumn { column, message } => {
                    println!("  column \"{}\": {}", column, message);
                }
                check::CheckError::BadRecurrence {
                    task_id,
                    phrase,
                    message,
                } => {
                    println!("  {} recurrence \"{}\": {}", task_id, phrase, message);
                }
            }
        }
    }
    if !result.warnings.is_empty() {
        if !result.errors.is_empty() {
            println!();
        }
        println!("Warnings:");
        for warn in &result.warnings {
            match warn {
                check::CheckWarning::RecurringWithoutDue { task_id } => {
                    println!("  {} is recurring but has no due date", task_id);
                }
                check::CheckWarning::UnknownStatus { task_id, status } => {
                    println!("  {} has status \"{}\" which is not a column", task_id, status);
                }
                check::CheckWarning::MissingFile { path } => {
                    println!("  configured file missing: {}", path);
                }
            }
        }
    }
    if result.valid {
        println!("✓ board is valid");
    } else {
        println!("✗ board has errors");
    }
    Ok(())
}

fn cmd_recovery(ctx: &Context, args: RecoveryCmd, json: bool) -> CmdResult {
    let dir = recovery::state_dir(&ctx.root);
    match args.action {
        Some(RecoveryAction::Prune(prune)) => {
            let before = match prune.before.as_deref() {
                Some(s) => {
                    let date = dates::parse_date(s).ok_or_else(|| format!("invalid date: {}", s))?;
                    Some(date.and_time(NaiveTime::MIN).and_utc())
                }
                None => None,
            };
            let removed = prune_recovery(&dir, before, prune.all)?;
            if json {
                println!("{}", serde_json::json!({ "removed": removed }));
            } else {
                println!("removed {} entr{}", removed, if removed == 1 { "y" } else { "ies" });
            }
        }
        None => {
            let entries = read_recovery_entries(&dir, Some(args.limit));
            if json {
                let out: Vec<serde_json::Value> = entries.iter().map(|e| e.to_json()).collect();
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else if entries.is_empty() {
                println!("recovery log is empty");
            } else {
                for entry in &entries {
                    print!("{}", entry.to_markdown());
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write command handlers
// ---------------------------------------------------------------------------

fn report(id: &str, line: &str, outcome: Option<MoveOutcome>, json: bool) -> CmdResult {
    if json {
        let next_due = match outcome {
            Some(MoveOutcome::RecurredNext { next_due }) => Some(format_date(next_due)),
            _ => None,
        };
        let out = MutationJson {
            id: id.to_string(),
            line: line.to_string(),
            outcome: outcome.map(outcome_label),
            next_due,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    match outcome {
        Some(MoveOutcome::RecurredNext { next_due }) => {
            println!("{}: done, next due {}", id, format_date(next_due));
        }
        Some(MoveOutcome::RecurrenceFallback) => {
            println!("{}: done (could not compute the next occurrence)", id);
        }
        _ => println!("{}", line),
    }
    Ok(())
}

fn cmd_add(ctx: &Context, args: AddArgs, json: bool) -> CmdResult {
    let status = match args.status {
        Some(status) if ctx.config.column(&status).is_none() => {
            return Err(format!("unknown column: {}", status).into());
        }
        Some(status) => status,
        None => ctx.config.board.default_status.clone(),
    };
    let due = match args.due {
        Some(arg) => parse_due_arg(&arg, ctx.today)?,
        None => None,
    };
    let task = ctx
        .mutator()
        .add_task(&ctx.config.files.todo, &args.text.join(" "), due, &status)?;
    if json {
        return report(&task.id(), &task.raw_text, None, json);
    }
    println!("added {}: {}", task.id(), task.raw_text);
    Ok(())
}

fn cmd_move(ctx: &Context, args: MoveArgs, json: bool) -> CmdResult {
    if args.status != DONE_STATUS && ctx.config.column(&args.status).is_none() {
        return Err(format!("unknown column: {}", args.status).into());
    }
    let task = ctx.task(&args.id)?;
    let moved = ctx
        .mutator()
        .move_to(&task, &args.status, args.status == DONE_STATUS)?;
    report(&args.id, &moved.line, Some(moved.outcome), json)
}

fn cmd_done(ctx: &Context, args: IdArgs, json: bool) -> CmdResult {
    let task = ctx.task(&args.id)?;
    let mutator = ctx.mutator();
    if task.is_recurring() && task.due_date.is_some() {
        let moved = mutator.move_to(&task, DONE_STATUS, true)?;
        return report(&args.id, &moved.line, Some(moved.outcome), json);
    }
    let line = mutator.set_completion(&task, true)?;
    report(&args.id, &line, None, json)
}

fn cmd_undone(ctx: &Context, args: IdArgs, json: bool) -> CmdResult {
    let task = ctx.task(&args.id)?;
    let line = ctx.mutator().set_completion(&task, false)?;
    report(&args.id, &line, None, json)
}

fn cmd_due(ctx: &Context, args: DueArgs, json: bool) -> CmdResult {
    let task = ctx.task(&args.id)?;
    let mutator = ctx.mutator();
    let line = match parse_due_arg(&args.date, ctx.today)? {
        Some(date) => mutator.set_due_date(&task, date)?,
        None => mutator.clear_due_date(&task)?,
    };
    report(&args.id, &line, None, json)
}

fn cmd_archive(ctx: &Context, args: IdArgs, json: bool) -> CmdResult {
    let task = ctx.task(&args.id)?;
    let mutator = ctx.mutator();
    let line = if ctx.config.files.three_file_system {
        mutator.archive_to_file(&task, &ctx.config.files.archive)?
    } else {
        mutator.archive_in_place(&task)?
    };
    report(&args.id, &line, None, json)
}

fn cmd_unarchive(ctx: &Context, args: IdArgs, json: bool) -> CmdResult {
    let files = &ctx.config.files;
    let in_archive = split_task_id(&args.id).is_some_and(|(path, _)| path == files.archive);
    if !in_archive {
        return Err(format!("{} is not in the archive file ({})", args.id, files.archive).into());
    }
    let task = ctx.task(&args.id)?;
    let line = ctx.mutator().unarchive_to_file(&task, &files.archive, &files.todo)?;
    report(&args.id, &line, None, json)
}
