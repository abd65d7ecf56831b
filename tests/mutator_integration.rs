//! Mutations against a real vault directory.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use taskboard::io::config_io::open_vault;
use taskboard::io::recovery::{RecoveryCategory, read_recovery_entries, state_dir};
use taskboard::io::{FsVault, Vault, VaultError};
use taskboard::model::TaskboardConfig;
use taskboard::ops::task_ops::ARCHIVE_HEADER;
use taskboard::ops::{MoveOutcome, TaskError, TaskMutator, TaskScanner};

const RECURRING: &str = "Tasks/recurring.md";
const TODO: &str = "Tasks/todo.md";
const ARCHIVE: &str = "Tasks/archive.md";

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn create_three_file_vault(root: &Path) {
    fs::create_dir_all(root.join("Tasks")).unwrap();
    fs::write(
        root.join("taskboard.toml"),
        "[files]\nthree_file_system = true\n",
    )
    .unwrap();
    fs::write(
        root.join(RECURRING),
        "# Recurring Tasks\n\n- [ ] Water plants 🔁 every week 📅 2025-03-10 #home #status/todo\n",
    )
    .unwrap();
    fs::write(
        root.join(TODO),
        "# To Do\n\n- [ ] Write report #status/doing\n- [x] Pay rent ✅ 2025-03-01 #status/done\n",
    )
    .unwrap();
}

fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join(path)).unwrap()
}

/// Passes everything through to a real vault but rejects writes to one path.
struct FlakyVault {
    inner: FsVault,
    reject: &'static str,
}

impl Vault for FlakyVault {
    fn read(&self, path: &str) -> Result<String, VaultError> {
        self.inner.read(path)
    }

    fn write(&self, path: &str, content: &str) -> Result<(), VaultError> {
        if path == self.reject {
            return Err(VaultError::Rejected(path.to_string()));
        }
        self.inner.write(path, content)
    }

    fn create(&self, path: &str, content: &str) -> Result<(), VaultError> {
        self.inner.create(path, content)
    }

    fn exists(&self, path: &str) -> bool {
        self.inner.exists(path)
    }

    fn create_folder(&self, path: &str) -> Result<(), VaultError> {
        self.inner.create_folder(path)
    }

    fn list_markdown_files(&self) -> Result<Vec<String>, VaultError> {
        self.inner.list_markdown_files()
    }
}

#[test]
fn three_file_lifecycle() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_three_file_vault(tmp.path());
    let (root, config) = open_vault(tmp.path()).unwrap();
    assert!(config.files.three_file_system);

    let vault = FsVault::new(&root);
    let mutator = TaskMutator::new(&vault)
        .with_today(d("2025-03-15"))
        .with_default_status(&config.board.default_status)
        .with_recovery_dir(state_dir(&root));

    let tasks = TaskScanner::new(&vault, &config).tasks().unwrap();
    let ids: Vec<String> = tasks.iter().map(|t| t.id()).collect();
    assert_eq!(
        ids,
        vec!["Tasks/recurring.md:3", "Tasks/todo.md:3", "Tasks/todo.md:4"]
    );

    // complete the recurring task
    let moved = mutator.move_to(&tasks[0], "done", true).unwrap();
    assert_eq!(moved.outcome, MoveOutcome::RecurredNext { next_due: d("2025-03-17") });
    assert_eq!(
        read(&root, RECURRING),
        "# Recurring Tasks\n\n\
         - [ ] Water plants 🔁 every week 📅 2025-03-17 #home #status/todo\n\
         - [x] Water plants 🔁 every week 📅 2025-03-10 #home #status/done ✅ 2025-03-15\n"
    );

    // archive the paid rent into a file that does not exist yet
    let archived = mutator.archive_to_file(&tasks[2], ARCHIVE).unwrap();
    assert_eq!(archived, "- [x] Pay rent ✅ 2025-03-01 #archived 📥 2025-03-15");
    assert_eq!(read(&root, TODO), "# To Do\n\n- [ ] Write report #status/doing\n");
    assert_eq!(read(&root, ARCHIVE), format!("{}{}\n", ARCHIVE_HEADER, archived));

    // and bring it back
    let scanner = TaskScanner::new(&vault, &config);
    let in_archive = scanner.scan_archive_file().unwrap();
    assert_eq!(in_archive.len(), 1);
    let restored = mutator.unarchive_to_file(&in_archive[0], ARCHIVE, TODO).unwrap();
    assert_eq!(restored, "- [ ] Pay rent #status/todo");
    assert_eq!(
        read(&root, TODO),
        "# To Do\n\n- [ ] Write report #status/doing\n- [ ] Pay rent #status/todo\n"
    );
    assert_eq!(read(&root, ARCHIVE), ARCHIVE_HEADER);

    assert!(read_recovery_entries(&state_dir(&root), None).is_empty());
}

#[test]
fn failed_source_removal_is_logged() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_three_file_vault(tmp.path());
    let (root, config) = open_vault(tmp.path()).unwrap();

    let vault = FlakyVault {
        inner: FsVault::new(&root),
        reject: TODO,
    };
    let tasks = TaskScanner::new(&vault, &config).tasks().unwrap();
    let rent = tasks.iter().find(|t| t.text == "Pay rent").unwrap();

    let err = TaskMutator::new(&vault)
        .with_today(d("2025-03-15"))
        .with_recovery_dir(state_dir(&root))
        .archive_to_file(rent, ARCHIVE)
        .unwrap_err();
    assert!(matches!(err, TaskError::SourceNotRemoved { .. }));

    // the line now lives in both files
    assert!(read(&root, TODO).contains("- [x] Pay rent ✅ 2025-03-01 #status/done"));
    assert!(read(&root, ARCHIVE).contains("- [x] Pay rent ✅ 2025-03-01 #archived 📥 2025-03-15"));

    let entries = read_recovery_entries(&state_dir(&root), None);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].category, RecoveryCategory::Duplicate);
    assert_eq!(entries[0].body, "- [x] Pay rent ✅ 2025-03-01 #archived 📥 2025-03-15");
    assert!(
        entries[0]
            .fields
            .contains(&("Source".to_string(), TODO.to_string()))
    );
}

#[test]
fn whole_vault_scan_skips_hidden_and_excluded_folders() {
    let tmp = tempfile::TempDir::new().unwrap();
    let root = tmp.path();
    for dir in ["Projects", "templates", ".obsidian", ".taskboard"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
    fs::write(root.join("inbox.md"), "- [ ] Top level\n").unwrap();
    fs::write(root.join("Projects/garden.md"), "# Garden\n- [ ] Buy seeds #garden\n").unwrap();
    fs::write(root.join("templates/daily.md"), "- [ ] Template task\n").unwrap();
    fs::write(root.join(".obsidian/cache.md"), "- [ ] Hidden\n").unwrap();
    fs::write(root.join("notes.txt"), "- [ ] Not markdown\n").unwrap();

    let vault = FsVault::new(root);
    let config = TaskboardConfig::default();
    let tasks = TaskScanner::new(&vault, &config).scan_vault().unwrap();
    let ids: Vec<String> = tasks.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec!["Projects/garden.md:2", "inbox.md:1"]);
}

#[test]
fn edits_to_a_missing_file_fail_cleanly() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_three_file_vault(tmp.path());
    let (root, config) = open_vault(tmp.path()).unwrap();
    let vault = FsVault::new(&root);
    let task = TaskScanner::new(&vault, &config).tasks().unwrap().remove(1);

    fs::remove_file(root.join(TODO)).unwrap();
    let err = TaskMutator::new(&vault).set_status(&task, "done").unwrap_err();
    assert!(matches!(err, TaskError::FileNotFound(p) if p == TODO));
}

#[test]
fn unreadable_file_does_not_abort_the_scan() {
    let tmp = tempfile::TempDir::new().unwrap();
    let root = tmp.path();
    fs::write(root.join("a.md"), "- [ ] Readable\n").unwrap();
    fs::write(root.join("b.md"), b"\xff\xfe").unwrap();

    let vault = FsVault::new(root);
    let config = TaskboardConfig::default();
    let tasks = TaskScanner::new(&vault, &config).scan_vault().unwrap();
    let ids: Vec<String> = tasks.iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec!["a.md:1"]);
}
