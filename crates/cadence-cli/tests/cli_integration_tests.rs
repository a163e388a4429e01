//! Black-box tests for the `cadence` binary.

use predicates::prelude::*;

mod helpers;
use helpers::CliTestHarness;

#[test]
fn test_cli_help_and_version() {
    let harness = CliTestHarness::new();

    harness
        .run_success(&["--help"])
        .stdout(predicate::str::contains("recur"));
    harness
        .run_success(&["--version"])
        .stdout(predicate::str::contains("cadence"));
    harness
        .run_failure(&["invalid-command"])
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_add_and_list() {
    let harness = CliTestHarness::new();

    harness
        .run_success(&["list"])
        .stdout(predicate::str::contains("No tasks found."));

    harness
        .run_success(&[
            "add",
            "Write report",
            "--due",
            "2030-05-01",
            "--priority",
            "high",
            "--label",
            "work",
        ])
        .stdout(predicate::str::contains("Created task"))
        .stdout(predicate::str::contains("2030-05-01"));

    harness
        .run_success(&["list"])
        .stdout(predicate::str::contains("Write report"))
        .stdout(predicate::str::contains("work"));

    harness
        .run_failure(&["add", "Bad date", "--due", "someday"])
        .stderr(predicate::str::contains("Failed to parse date"));
    harness
        .run_failure(&["add", "Bad priority", "--priority", "urgent"])
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_completing_recurring_task_creates_next_instance() {
    let harness = CliTestHarness::new();
    let id = harness.add_task(&["Water plants", "--due", "2030-03-10"]);
    let id = id.to_string();

    harness
        .run_success(&["recur", "set", &id, "--every", "daily", "--interval", "2"])
        .stdout(predicate::str::contains("every 2 days"))
        .stdout(predicate::str::contains("2030-03-10"));

    harness
        .run_success(&["do", &id])
        .stdout(predicate::str::contains("Completed task: 'Water plants'"))
        .stdout(predicate::str::contains("2030-03-12"));

    harness
        .run_success(&["list", "--recurring"])
        .stdout(predicate::str::contains("↻ Water plants"));

    // The finished instance no longer carries the rule.
    harness
        .run_success(&["recur", "show", &id])
        .stdout(predicate::str::contains("does not repeat"));
    harness
        .run_failure(&["do", &id])
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_series_ends_after_count() {
    let harness = CliTestHarness::new();
    let id = harness
        .add_task(&["One-off run", "--due", "2030-01-01", "--every", "weekly", "--times", "1"])
        .to_string();

    harness
        .run_success(&["do", &id])
        .stdout(predicate::str::contains("series has ended"));
    harness
        .run_success(&["list", "--recurring"])
        .stdout(predicate::str::contains("No tasks found."));
}

#[test]
fn test_invalid_rule_is_rejected_before_task_is_created() {
    let harness = CliTestHarness::new();

    harness
        .run_failure(&["add", "Never saved", "--every", "weekly", "--interval", "0"])
        .stderr(predicate::str::contains("Invalid recurrence"));
    harness
        .run_failure(&["add", "Never saved", "--every", "monthly", "--day", "32"])
        .stderr(predicate::str::contains("Invalid recurrence"));
    harness
        .run_failure(&["add", "Never saved", "--interval", "3"])
        .stderr(predicate::str::contains("--every"));

    harness
        .run_success(&["list", "--all"])
        .stdout(predicate::str::contains("No tasks found."));
}

#[test]
fn test_recur_preview_update_and_clear() {
    let harness = CliTestHarness::new();
    let id = harness
        .add_task(&["Pay rent", "--due", "2030-01-31", "--every", "monthly"])
        .to_string();

    harness
        .run_success(&["recur", "preview", &id, "--count", "2"])
        .stdout(predicate::str::contains("2030-02-28"))
        .stdout(predicate::str::contains("2030-03-31"));

    harness
        .run_success(&["recur", "update", &id, "--interval", "3"])
        .stdout(predicate::str::contains("every 3 months"));

    harness
        .run_success(&["recur", "show", &id])
        .stdout(predicate::str::contains("Next due: 2030-01-31"))
        .stdout(predicate::str::contains("Completed: 0"));

    harness
        .run_success(&["recur", "clear", &id])
        .stdout(predicate::str::contains("no longer repeats"));
    harness
        .run_success(&["recur", "clear", &id])
        .stdout(predicate::str::contains("no longer repeats"));
    harness
        .run_failure(&["recur", "update", &id, "--interval", "2"])
        .stderr(predicate::str::contains("no recurrence"));
}

#[test]
fn test_projects_and_sections() {
    let harness = CliTestHarness::new();

    harness
        .run_success(&["project", "add", "Home", "--description", "Chores"])
        .stdout(predicate::str::contains("Created project"));
    harness
        .run_success(&["section", "add", "Home", "Garden"])
        .stdout(predicate::str::contains("Created section"));
    harness
        .run_success(&["section", "list", "Home"])
        .stdout(predicate::str::contains("Garden"));

    harness.add_task(&["Mow lawn", "--project", "Home", "--section", "Garden"]);
    harness
        .run_success(&["list", "--project", "Home"])
        .stdout(predicate::str::contains("Mow lawn"));

    harness
        .run_failure(&["add", "Lost", "--project", "Home", "--section", "Attic"])
        .stderr(predicate::str::contains("Not found"));
    harness.run_failure(&["project", "delete", "Home"]);
    harness
        .run_success(&["project", "list"])
        .stdout(predicate::str::contains("Home"));
}

#[test]
fn test_delete_with_force_and_unknown_id() {
    let harness = CliTestHarness::new();
    let id = harness.add_task(&["Scratch"]).to_string();

    harness
        .run_success(&["delete", &id, "--force"])
        .stdout(predicate::str::contains("Deleted task: 'Scratch'"));
    harness
        .run_success(&["list", "--all"])
        .stdout(predicate::str::contains("No tasks found."));

    harness
        .run_failure(&["do", "zzzz"])
        .stderr(predicate::str::contains("Not found"));
}

#[test]
fn test_archive_ends_recurrence() {
    let harness = CliTestHarness::new();
    let id = harness
        .add_task(&["Standup", "--due", "2030-06-03", "--every", "custom", "--on", "mon,wed"])
        .to_string();

    harness.run_success(&["archive", &id]);
    harness
        .run_success(&["recur", "show", &id])
        .stdout(predicate::str::contains("does not repeat"));
    harness
        .run_success(&["list", "--status", "archived"])
        .stdout(predicate::str::contains("Standup"));
}
