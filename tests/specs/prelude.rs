//! Test helpers for behavioral specifications.
//!
//! Provides a high-level DSL for testing `ouro` CLI / `ouroborosd` daemon
//! behavior black-box: invoke the binaries, assert on stdout/stderr/exit
//! codes, nothing reaches into process internals.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

// Aggressive timeouts for fast tests.
//
// IMPORTANT:
//   Do NOT change these.
//   File a performance bug instead.
const TIMEOUT_CONNECT_MS: &str = "2000";
const TIMEOUT_EXIT_MS: &str = "1000";
const TIMEOUT_IPC_MS: &str = "1000";
const CONNECT_POLL_MS: &str = "5";
const WAIT_POLL_MS: &str = "20";

pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 2000;

/// Returns the path to a binary, checking llvm-cov target directory first.
/// Works with both standard builds and llvm-cov coverage runs, and falls
/// back to resolving relative to the test binary itself when
/// CARGO_MANIFEST_DIR is stale (e.g. compiled by a removed worktree into a
/// shared target directory).
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

fn ouro_binary() -> PathBuf {
    binary_path("ouro")
}

/// Returns the path to the `ouroborosd` daemon binary.
pub fn ouroborosd_binary() -> PathBuf {
    binary_path("ouroborosd")
}

fn ouro_cmd() -> Command {
    Command::new(ouro_binary())
}

/// Create a CLI builder for `ouro` commands.
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions.
pub struct CliBuilder {
    args: Vec<String>,
    dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            dir: None,
            envs: vec![
                (
                    "OUROBOROS_DAEMON_BINARY".into(),
                    ouroborosd_binary().to_string_lossy().into(),
                ),
                ("OUROBOROS_TIMEOUT_CONNECT_MS".into(), TIMEOUT_CONNECT_MS.into()),
                ("OUROBOROS_TIMEOUT_EXIT_MS".into(), TIMEOUT_EXIT_MS.into()),
                ("OUROBOROS_TIMEOUT_IPC_MS".into(), TIMEOUT_IPC_MS.into()),
                ("OUROBOROS_CONNECT_POLL_MS".into(), CONNECT_POLL_MS.into()),
                ("OUROBOROS_WAIT_POLL_MS".into(), WAIT_POLL_MS.into()),
            ],
        }
    }

    /// Add CLI arguments.
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set working directory.
    pub fn pwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.dir = Some(path.into());
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((
            key.to_string(),
            value.as_ref().to_string_lossy().to_string(),
        ));
        self
    }

    /// Build the command without running it.
    pub fn command(self) -> Command {
        let mut cmd = ouro_cmd();
        cmd.args(&self.args);

        if let Some(dir) = self.dir {
            cmd.current_dir(dir);
        }

        // Prevent a parent shell's real OUROBOROS_STATE_DIR from leaking
        // into tests that didn't ask for one.
        cmd.env_remove("OUROBOROS_STATE_DIR");

        for (key, value) in self.envs {
            cmd.env(key, value);
        }

        cmd
    }

    /// Run and expect success (exit code 0).
    pub fn passes(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code).
    pub fn fails(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run, for chaining assertions.
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            !stdout.contains(unexpected),
            "stdout should not contain '{}'\nstdout: {}",
            unexpected,
            stdout
        );
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }
}

// =============================================================================
// Polling
// =============================================================================

/// Poll a condition until it returns true or the timeout is reached.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    let poll_interval = std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

// =============================================================================
// Project
// =============================================================================

/// An isolated `OUROBOROS_STATE_DIR` a test's daemon instance lives in.
pub struct Project {
    state_dir: tempfile::TempDir,
}

impl Project {
    /// Create an empty, isolated state directory.
    pub fn empty() -> Self {
        Self {
            state_dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn state_path(&self) -> &Path {
        self.state_dir.path()
    }

    /// Write a file under the state directory (e.g. `config.toml`).
    pub fn file(&self, path: impl AsRef<Path>, content: &str) {
        let full_path = self.state_dir.path().join(path.as_ref());
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full_path, content).unwrap();
    }

    /// Run an `ouro` command scoped to this project's state directory.
    pub fn ouro(&self) -> CliBuilder {
        cli().env("OUROBOROS_STATE_DIR", self.state_path())
    }

    pub fn daemon_log(&self) -> String {
        let log_path = self.state_path().join("daemon.log");
        std::fs::read_to_string(&log_path).unwrap_or_else(|_| "(no daemon log)".to_string())
    }

    /// Bootstrap ownership (first-contact-wins registration): every
    /// CLI command is sent under the same fixed `cli-local` chat id, so
    /// the very first message this process ever sends only registers
    /// that id as owner and replies with the welcome line — it does not
    /// also execute whatever text rode along with it. Tests that then
    /// want to exercise a real command call this first.
    pub fn register_owner(&self) {
        self.ouro().args(&["chat", "bootstrap"]).passes();
        assert!(
            wait_for(SPEC_WAIT_MAX_MS, || {
                self.ouro()
                    .args(&["status"])
                    .passes()
                    .stdout()
                    .contains("owner registered: yes")
            }),
            "owner never registered during bootstrap"
        );
    }

    /// Poll `ouro status` until the daemon answers (rather than printing
    /// "not running"), or the timeout elapses.
    pub fn wait_until_daemon_up(&self) -> bool {
        wait_for(SPEC_WAIT_MAX_MS, || {
            !self
                .ouro()
                .args(&["status"])
                .passes()
                .stdout()
                .contains("not running")
        })
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        // Always try to stop the daemon (no-op if not running).
        let mut cmd = self.ouro().args(&["daemon", "stop", "--kill"]).command();
        cmd.stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());
        let _ = cmd.status();
    }
}
