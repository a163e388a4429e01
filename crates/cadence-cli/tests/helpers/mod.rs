use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::TempDir;
use uuid::Uuid;

/// Runs the `cadence` binary against a throwaway database.
pub struct CliTestHarness {
    _temp_dir: TempDir,
    db_path: PathBuf,
}

impl CliTestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        Self {
            _temp_dir: temp_dir,
            db_path,
        }
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("cadence").expect("Failed to find cadence binary");
        cmd.env("CADENCE_DATABASE_PATH", &self.db_path);
        cmd.env("CADENCE_TIMEZONE", "UTC");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Adds a task and returns its full ID, read from the "Task ID:" line.
    pub fn add_task(&self, args: &[&str]) -> Uuid {
        let mut full_args = vec!["add"];
        full_args.extend_from_slice(args);
        let output = self.run_success(&full_args).get_output().stdout.clone();
        let stdout = String::from_utf8(output).expect("stdout is not UTF-8");
        let line = stdout
            .lines()
            .find(|line| line.contains("Task ID:"))
            .expect("no Task ID line in output");
        find_uuid(line).expect("no UUID on the Task ID line")
    }
}

/// Finds the first hyphenated UUID in `text`, skipping any colour codes around it.
pub fn find_uuid(text: &str) -> Option<Uuid> {
    let bytes = text.as_bytes();
    (0..bytes.len().saturating_sub(35))
        .filter_map(|start| text.get(start..start + 36))
        .find_map(|candidate| Uuid::parse_str(candidate).ok())
}
