//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for running tailstatd against a scratch run
//! directory and inspecting what it leaves behind.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};

// Backoff "second" for spawned daemons.
//
// IMPORTANT:
//   Do NOT raise this.
//   File a performance bug instead.
const TAILSTATD_BACKOFF_UNIT_MS: &str = "5";

// Spec polling timeouts
pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 5000;

/// Name of the out file inside every scratch run directory.
pub const OUT: &str = "diamond.dag.dagman.out";

/// Returns the path to a binary, checking llvm-cov target directory first.
/// Falls back to resolving relative to the test binary itself when
/// CARGO_MANIFEST_DIR is stale.
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

    // The test binary lives at target/debug/deps/specs-<hash>
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

pub fn tailstatd_binary() -> PathBuf {
    binary_path("tailstatd")
}

/// Create a builder for a tailstatd invocation
pub fn tailstatd() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions
pub struct CliBuilder {
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            envs: vec![(
                "TAILSTATD_BACKOFF_UNIT_MS".into(),
                TAILSTATD_BACKOFF_UNIT_MS.into(),
            )],
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn arg(mut self, arg: impl AsRef<Path>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Build the command without running it
    pub fn command(self) -> Command {
        let mut cmd = Command::new(tailstatd_binary());
        cmd.args(&self.args);
        cmd.env_remove("RUST_LOG");
        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run to completion and expect `code`
    pub fn exits(self, code: i32) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert_eq!(
            output.status.code(),
            Some(code),
            "unexpected exit status\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    pub fn passes(self) -> RunAssert {
        self.exits(0)
    }

    /// Start in the background with piped output
    pub fn spawn(self) -> Running {
        let child = self
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("command should start");
        Running { child }
    }
}

/// Result of a run for chaining assertions
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

/// A tailstatd running in the background.
pub struct Running {
    child: Child,
}

impl Running {
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn signal(&self, name: &str) {
        let status = Command::new("kill")
            .args([&format!("-{name}"), &self.pid().to_string()])
            .status()
            .expect("kill should run");
        assert!(status.success(), "kill -{name} failed");
    }

    /// Wait for exit and return the status code.
    pub fn wait(mut self) -> Option<i32> {
        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_millis(SPEC_WAIT_MAX_MS);
        while start.elapsed() < timeout {
            if let Some(status) = self.child.try_wait().unwrap() {
                return status.code();
            }
            std::thread::sleep(std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS));
        }
        let _ = self.child.kill();
        panic!("tailstatd did not exit within {SPEC_WAIT_MAX_MS}ms");
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

// =============================================================================
// Polling
// =============================================================================

/// Poll a condition until it returns true or timeout is reached.
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
// Run directory
// =============================================================================

/// Scratch DAGMan run directory.
pub struct RunDir {
    dir: tempfile::TempDir,
}

impl RunDir {
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// A run directory whose out file holds `lines`.
    pub fn with_out(lines: &[&str]) -> Self {
        let run = Self::empty();
        run.append(lines);
        run
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn out(&self) -> PathBuf {
        self.path().join(OUT)
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    pub fn append(&self, lines: &[&str]) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.out())
            .unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
    }

    /// jobstate.log lines with the leading timestamp removed.
    pub fn jobstate(&self) -> Vec<String> {
        std::fs::read_to_string(self.file("jobstate.log"))
            .unwrap_or_default()
            .lines()
            .map(|line| match line.split_once(' ') {
                Some((_, rest)) => rest.to_string(),
                None => line.to_string(),
            })
            .collect()
    }

    /// Read the daemon log (for debugging test failures)
    pub fn daemon_log(&self) -> String {
        std::fs::read_to_string(self.file("diamond.dag.tailstatd.log"))
            .unwrap_or_else(|_| "(no daemon log)".to_string())
    }

    /// Address published in the discovery file, once it exists.
    pub fn query_addr(&self) -> Option<String> {
        let text = std::fs::read_to_string(self.file("tailstatd.sock")).ok()?;
        let (ip, port) = text.trim().split_once(' ')?;
        Some(format!("{ip}:{port}"))
    }

    /// Send one request and read the whole response.
    pub fn query(&self, request: &str) -> String {
        let addr = self.query_addr().expect("daemon should publish its port");
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(request.as_bytes()).unwrap();
        stream.shutdown(std::net::Shutdown::Write).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }
}

/// A small diamond workflow that finishes with `status`.
pub fn diamond(status: i32) -> Vec<String> {
    let mut lines: Vec<String> = [
        "01/15 10:20:00 ******************************************************",
        "01/15 10:20:00 ** condor_scheduniv_exec.77.0 (CONDOR_DAGMAN) STARTING UP",
        "01/15 10:20:00 ** $CondorVersion: 7.4.2 Mar 29 2010 BuildID: 227044 $",
        "01/15 10:20:00 ** PID = 4321",
        "01/15 10:20:05 Running PRE script of Node A...",
        "01/15 10:20:06 PRE Script of Node A completed successfully.",
        "01/15 10:20:10 Event: ULOG_SUBMIT for Condor Node A (101.0.0)",
        "01/15 10:21:00 Event: ULOG_EXECUTE for Condor Node A (101.0.0)",
        "01/15 10:25:00 Event: ULOG_JOB_TERMINATED for Condor Node A (101.0.0)",
        "01/15 10:25:00 Node A job proc (101.0.0) completed successfully.",
        "01/15 10:25:05 Event: ULOG_SUBMIT for Condor Node B (102.0.0)",
        "01/15 10:25:06 Event: ULOG_SUBMIT for Condor Node C (103.0.0)",
        "01/15 10:26:00 Event: ULOG_EXECUTE for Condor Node B (102.0.0)",
        "01/15 10:26:30 Event: ULOG_EXECUTE for Condor Node C (103.0.0)",
        "01/15 10:30:00 Event: ULOG_JOB_TERMINATED for Condor Node B (102.0.0)",
        "01/15 10:31:00 Event: ULOG_JOB_TERMINATED for Condor Node C (103.0.0)",
        "01/15 10:31:05 POST Script of Node C completed successfully.",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    lines.push(format!(
        "01/15 10:32:00 (condor_DAGMAN) pid 4321 EXITING WITH STATUS {status}"
    ));
    lines
}

pub fn as_strs(lines: &[String]) -> Vec<&str> {
    lines.iter().map(String::as_str).collect()
}
