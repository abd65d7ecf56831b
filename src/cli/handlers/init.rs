use std::path::PathBuf;

use crate::cli::commands::InitArgs;
use crate::io::config_io::{CONFIG_FILE, discover_vault, parse_config};
use crate::io::recovery::atomic_write;
use crate::io::vault::FsVault;
use crate::ops::task_ops::create_configured_files;

const CONFIG_TEMPLATE: &str = r##"# taskboard configuration

[board]
# Column for tasks without a #status/ tag
default_status = "todo"
# Show checked tasks outside the done column
include_completed = false

[[board.columns]]
id = "todo"
name = "To Do"

[[board.columns]]
id = "doing"
name = "Doing"

[[board.columns]]
id = "done"
name = "Done"

[scan]
# Folders (path prefixes) never scanned
exclude_folders = [".obsidian", "templates"]
# When set, only these folders are scanned
# include_folders = ["Projects"]

[files]
# Scan only the recurring and todo files, and archive into a separate file
three_file_system = {three_file}
recurring = "Tasks/recurring.md"
todo = "Tasks/todo.md"
archive = "Tasks/archive.md"
"##;

fn render_config(three_file: bool) -> String {
    CONFIG_TEMPLATE.replace("{three_file}", if three_file { "true" } else { "false" })
}

pub fn cmd_init(args: InitArgs, vault_dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let root = match vault_dir {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    let config_path = root.join(CONFIG_FILE);
    if config_path.exists() && !args.force {
        return Err(format!("{} already exists (use --force to overwrite)", config_path.display()).into());
    }

    if let Some(parent) = root.parent()
        && let Ok(parent_root) = discover_vault(parent)
    {
        eprintln!("Note: enclosing vault found at {}/", parent_root.display());
    }

    let content = render_config(args.three_file);
    let config = parse_config(&content)?;
    atomic_write(&config_path, content.as_bytes())?;
    println!("Initialized taskboard vault at {}", root.display());

    if args.three_file {
        let vault = FsVault::new(&root);
        let (created, skipped) = create_configured_files(&vault, &config.files)?;
        println!("  created {} file(s), {} already existed", created, skipped);
    }
    Ok(())
}
