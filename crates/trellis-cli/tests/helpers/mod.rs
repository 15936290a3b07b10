#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Runs the `trellis` binary against a database in its own temporary directory.
pub struct CliTestHarness {
    temp_dir: TempDir,
    db_path: PathBuf,
}

impl CliTestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        Self { temp_dir, db_path }
    }

    /// A command configured for this harness. The working directory is the
    /// temp dir so no stray `trellis.toml` is picked up.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("trellis").expect("Failed to find trellis binary");
        cmd.current_dir(self.temp_dir.path())
            .env("TRELLIS_DATABASE_PATH", &self.db_path)
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }

    /// Stdout of a successful run.
    pub fn stdout(&self, args: &[&str]) -> String {
        let output = self.run_success(args).get_output().stdout.clone();
        String::from_utf8(output).expect("stdout is not UTF-8")
    }

    /// Writes a file into the harness directory and returns its path as a string.
    pub fn write_file(&self, name: &str, contents: &str) -> String {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, contents).expect("Failed to write fixture");
        path.to_string_lossy().into_owned()
    }

    /// A list "Home" with a section "Chores".
    pub fn with_home_chores(self) -> Self {
        self.run_success(&["list", "add", "Home"]);
        self.run_success(&["section", "add", "Home", "Chores"]);
        self
    }
}

pub mod assertions {
    use predicates::prelude::*;

    pub fn has_error() -> impl Predicate<str> {
        predicate::str::contains("Error")
    }

    /// Matches an import statistics row such as `Tasks created │ 3`.
    pub fn stat(name: &str, count: usize) -> impl Predicate<str> {
        predicate::str::is_match(format!(r"{}\W+{}\b", name, count)).expect("valid regex")
    }
}
