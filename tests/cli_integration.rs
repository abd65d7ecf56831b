//! Integration tests for the `tb` CLI.
//!
//! Each test creates a temp vault directory, runs `tb` as a subprocess,
//! and verifies stdout and/or file contents.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Get the path to the built `tb` binary.
fn tb_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("tb");
    path
}

const HOME: &str = "Projects/home.md";

/// Create a small vault that scans every markdown file.
fn create_test_vault(root: &Path) {
    fs::create_dir_all(root.join("Projects")).unwrap();
    fs::create_dir_all(root.join("templates")).unwrap();
    fs::write(root.join("taskboard.toml"), "[board]\ndefault_status = \"todo\"\n").unwrap();
    fs::write(
        root.join(HOME),
        "\
# Home

- [ ] Buy milk #errand #status/todo
- [ ] Fix the fence #status/doing #home
- [x] Pay rent ✅ 2025-03-01
- [ ] Water plants 🔁 every week 📅 2025-03-10 #home #status/todo
- [ ] Call the plumber #home
",
    )
    .unwrap();
    fs::write(root.join("templates/weekly.md"), "- [ ] Template task\n").unwrap();
}

/// Run `tb` with the given args in the given directory, returning (stdout, stderr, success).
fn run_tb(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(tb_bin())
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run tb");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `tb` expecting success, return stdout.
fn run_tb_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_tb(dir, args);
    if !success {
        panic!(
            "tb {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

/// Run `tb` expecting failure, return stderr.
fn run_tb_err(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_tb(dir, args);
    if success {
        panic!("tb {:?} unexpectedly succeeded:\nstdout: {}", args, stdout);
    }
    stderr
}

fn line(root: &Path, path: &str, n: usize) -> String {
    fs::read_to_string(root.join(path))
        .unwrap()
        .split('\n')
        .nth(n - 1)
        .unwrap_or_default()
        .to_string()
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

#[test]
fn test_init_writes_config() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_tb_ok(tmp.path(), &["init"]);
    assert!(out.contains("Initialized taskboard vault"));

    let config = fs::read_to_string(tmp.path().join("taskboard.toml")).unwrap();
    assert!(config.contains("three_file_system = false"));
    assert!(!tmp.path().join("Tasks").exists());

    let err = run_tb_err(tmp.path(), &["init"]);
    assert!(err.contains("already exists"));
    run_tb_ok(tmp.path(), &["init", "--force"]);
}

#[test]
fn test_init_three_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_tb_ok(tmp.path(), &["init", "--three-file"]);
    assert!(out.contains("created 3 file(s)"));
    for file in ["recurring", "todo", "archive"] {
        assert!(tmp.path().join(format!("Tasks/{}.md", file)).is_file());
    }
}

// ---------------------------------------------------------------------------
// Read command tests
// ---------------------------------------------------------------------------

#[test]
fn test_board_text() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());

    let out = run_tb_ok(tmp.path(), &["board"]);
    assert!(out.contains("== To Do (2) =="));
    assert!(out.contains("== Doing (1) =="));
    assert!(out.contains("== Done (1) =="));
    assert!(out.contains("[ ] Buy milk  #errand  (Projects/home.md:3)"));
    assert!(!out.contains("Template task"));
    // no status tag, no column
    assert!(!out.contains("Call the plumber"));
}

#[test]
fn test_board_json() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());

    let out = run_tb_ok(tmp.path(), &["board", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    let columns = parsed.as_array().unwrap();
    assert_eq!(columns.len(), 3);
    assert_eq!(columns[1]["id"], "doing");
    assert_eq!(columns[1]["tasks"][0]["id"], "Projects/home.md:4");
    assert_eq!(columns[0]["tasks"][1]["recurrence"], "every week");
    assert_eq!(columns[0]["tasks"][1]["due"], "2025-03-10");
}

#[test]
fn test_board_tag_filter() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());

    let out = run_tb_ok(tmp.path(), &["board", "--tag", "home"]);
    assert!(out.contains("Water plants"));
    assert!(out.contains("Fix the fence"));
    assert!(!out.contains("Buy milk"));
    assert!(out.contains("== Done (0) =="));
}

#[test]
fn test_board_preset() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());

    let out = run_tb_ok(tmp.path(), &["board", "--preset", "overdue"]);
    assert!(out.contains("(Overdue)"));
    assert!(out.contains("Water plants"));
    assert!(!out.contains("Buy milk"));

    let out = run_tb_ok(tmp.path(), &["board", "--preset", "overdue", "--unscheduled"]);
    assert!(out.contains("Buy milk"));

    let err = run_tb_err(tmp.path(), &["board", "--preset", "someday"]);
    assert!(err.contains("unknown preset"));
}

#[test]
fn test_list_query() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());

    let out = run_tb_ok(tmp.path(), &["list", "status:doing"]);
    assert!(out.contains("Fix the fence"));
    assert!(!out.contains("Buy milk"));

    let out = run_tb_ok(tmp.path(), &["list", "MILK"]);
    assert_eq!(out.lines().count(), 1);
    assert!(out.contains("Buy milk"));

    let out = run_tb_ok(tmp.path(), &["list", "status:todo"]);
    assert!(out.contains("Water plants"));
    assert!(!out.contains("Call the plumber"));
    let out = run_tb_ok(tmp.path(), &["list", "plumber"]);
    assert!(out.contains("Call the plumber"));

    let out = run_tb_ok(tmp.path(), &["list", "tag:home", "recurring:true", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 1);
    assert_eq!(parsed[0]["id"], "Projects/home.md:6");

    let err = run_tb_err(tmp.path(), &["list", "due:someday"]);
    assert!(err.contains("invalid value for due"));
}

#[test]
fn test_next_preview() {
    let tmp = tempfile::TempDir::new().unwrap();

    let out = run_tb_ok(
        tmp.path(),
        &["next", "every 2 weeks", "--from", "2025-03-15", "-n", "3"],
    );
    assert_eq!(out, "2025-03-29\n2025-04-12\n2025-04-26\n");

    let out = run_tb_ok(
        tmp.path(),
        &["next", "every month on the 31st", "--from", "2025-01-31", "-n", "3", "--json"],
    );
    let parsed: Vec<String> = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed, vec!["2025-02-28", "2025-03-31", "2025-04-30"]);

    run_tb_err(tmp.path(), &["next", "now and then"]);
}

#[test]
fn test_check() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());

    let out = run_tb_ok(tmp.path(), &["check"]);
    assert!(out.contains("✓ board is valid"));

    fs::write(
        tmp.path().join("Projects/odd.md"),
        "- [ ] Odd 🔁 now and then 📅 2025-03-10\n- [ ] Review #status/review\n",
    )
    .unwrap();
    let out = run_tb_ok(tmp.path(), &["check", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["valid"], false);
    assert_eq!(parsed["errors"][0]["type"], "bad_recurrence");
    assert_eq!(parsed["warnings"][0]["type"], "unknown_status");
}

#[test]
fn test_recovery_empty() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());

    let out = run_tb_ok(tmp.path(), &["recovery"]);
    assert!(out.contains("recovery log is empty"));
    let out = run_tb_ok(tmp.path(), &["recovery", "prune", "--all"]);
    assert!(out.contains("removed 0 entries"));
}

// ---------------------------------------------------------------------------
// Write command tests
// ---------------------------------------------------------------------------

#[test]
fn test_move() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());

    run_tb_ok(tmp.path(), &["move", "Projects/home.md:3", "doing"]);
    assert_eq!(line(tmp.path(), HOME, 3), "- [ ] Buy milk #errand #status/doing");
    let out = run_tb_ok(tmp.path(), &["move", "Projects/home.md:7", "doing"]);
    assert_eq!(out.trim(), "- [ ] Call the plumber #home #status/doing");

    let out = run_tb_ok(tmp.path(), &["move", "Projects/home.md:3", "done", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["outcome"], "moved");
    assert!(line(tmp.path(), HOME, 3).starts_with("- [x] Buy milk #errand #status/done ✅ "));

    let err = run_tb_err(tmp.path(), &["move", "Projects/home.md:4", "review"]);
    assert!(err.contains("unknown column: review"));
}

#[test]
fn test_done_recurring_creates_next_instance() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());

    let out = run_tb_ok(tmp.path(), &["done", "Projects/home.md:6", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["outcome"], "recurred");
    assert_eq!(parsed["next_due"], "2025-03-17");
    assert!(
        parsed["line"]
            .as_str()
            .unwrap()
            .starts_with("- [x] Water plants 🔁 every week 📅 2025-03-10 #home #status/done ✅ ")
    );

    assert_eq!(
        line(tmp.path(), HOME, 6),
        "- [ ] Water plants 🔁 every week 📅 2025-03-17 #home #status/todo"
    );
    assert!(
        line(tmp.path(), HOME, 7)
            .starts_with("- [x] Water plants 🔁 every week 📅 2025-03-10 #home #status/done ✅ ")
    );
}

#[test]
fn test_done_and_undone() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());

    run_tb_ok(tmp.path(), &["done", "Projects/home.md:3"]);
    assert!(line(tmp.path(), HOME, 3).starts_with("- [x] Buy milk #errand #status/todo ✅ "));

    let out = run_tb_ok(tmp.path(), &["undone", "Projects/home.md:5"]);
    assert_eq!(out.trim(), "- [ ] Pay rent");
    assert_eq!(line(tmp.path(), HOME, 5), "- [ ] Pay rent");
}

#[test]
fn test_due() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());

    run_tb_ok(tmp.path(), &["due", "Projects/home.md:4", "2025-04-01"]);
    assert_eq!(
        line(tmp.path(), HOME, 4),
        "- [ ] Fix the fence 📅 2025-04-01 #status/doing #home"
    );

    run_tb_ok(tmp.path(), &["due", "Projects/home.md:4", "none"]);
    assert_eq!(line(tmp.path(), HOME, 4), "- [ ] Fix the fence #status/doing #home");

    run_tb_err(tmp.path(), &["due", "Projects/home.md:4", "next-ish"]);
}

#[test]
fn test_archive_in_place() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());

    run_tb_ok(tmp.path(), &["archive", "Projects/home.md:5"]);
    assert_eq!(line(tmp.path(), HOME, 5), "- [x] Pay rent ✅ 2025-03-01 #archived");

    let out = run_tb_ok(tmp.path(), &["board"]);
    assert!(out.contains("== Done (0) =="));
    let out = run_tb_ok(tmp.path(), &["archived"]);
    assert!(out.contains("Pay rent"));
}

#[test]
fn test_three_file_archive_round_trip() {
    let tmp = tempfile::TempDir::new().unwrap();
    run_tb_ok(tmp.path(), &["init", "--three-file"]);
    let todo = tmp.path().join("Tasks/todo.md");
    let mut content = fs::read_to_string(&todo).unwrap();
    content.push_str("- [x] Send invoice #status/done\n");
    fs::write(&todo, content).unwrap();

    run_tb_ok(tmp.path(), &["archive", "Tasks/todo.md:4"]);
    assert!(!fs::read_to_string(&todo).unwrap().contains("Send invoice"));
    let out = run_tb_ok(tmp.path(), &["archived"]);
    assert!(out.contains("Send invoice"));
    assert!(out.contains("(Tasks/archive.md:4)"));

    let err = run_tb_err(tmp.path(), &["unarchive", "Tasks/todo.md:1"]);
    assert!(err.contains("not in the archive file"));

    run_tb_ok(tmp.path(), &["unarchive", "Tasks/archive.md:4"]);
    assert_eq!(line(tmp.path(), "Tasks/todo.md", 4), "- [ ] Send invoice #status/todo");
    let out = run_tb_ok(tmp.path(), &["archived"]);
    assert!(out.contains("No archived tasks"));
}

#[test]
fn test_stale_id_is_rejected() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());

    let err = run_tb_err(tmp.path(), &["done", "Projects/home.md:2"]);
    assert!(err.contains("no longer at Projects/home.md:2"));
    let err = run_tb_err(tmp.path(), &["done", "Projects/missing.md:1"]);
    assert!(err.contains("file not found"));
}

#[test]
fn test_vault_dir_flag() {
    let tmp = tempfile::TempDir::new().unwrap();
    let vault = tmp.path().join("vault");
    fs::create_dir_all(&vault).unwrap();
    create_test_vault(&vault);

    let out = run_tb_ok(tmp.path(), &["-C", "vault", "list", "status:doing"]);
    assert!(out.contains("Fix the fence"));

    // discovery walks up from a subfolder
    let out = run_tb_ok(&vault.join("Projects"), &["list", "milk"]);
    assert!(out.contains("Buy milk"));
}

#[test]
fn test_add() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_vault(tmp.path());

    let out = run_tb_ok(tmp.path(), &["add", "Renew", "passport", "--due", "2025-04-01"]);
    assert_eq!(
        out.trim(),
        "added Tasks/todo.md:4: - [ ] Renew passport 📅 2025-04-01 #status/todo"
    );
    assert_eq!(
        fs::read_to_string(tmp.path().join("Tasks/todo.md")).unwrap(),
        "# To Do\n\nActive tasks go here.\n- [ ] Renew passport 📅 2025-04-01 #status/todo\n"
    );

    let out = run_tb_ok(tmp.path(), &["add", "Sand the deck", "--status", "doing", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["id"], "Tasks/todo.md:5");
    assert_eq!(parsed["line"], "- [ ] Sand the deck #status/doing");

    let out = run_tb_ok(tmp.path(), &["board"]);
    assert!(out.contains("Renew passport"));
    assert!(out.contains("== Doing (2) =="));

    let err = run_tb_err(tmp.path(), &["add", "Nap", "--status", "someday"]);
    assert!(err.contains("unknown column: someday"));
    let err = run_tb_err(tmp.path(), &["add", "Nap", "--due", "whenever"]);
    assert!(err.contains("invalid date"));
}
