//! Execution adapter: build the test suite and harvest live pass/fail
//! results from the compiled binaries.
//!
//! The adapter never fails. Build errors, missing output directories,
//! unrunnable binaries and per-binary timeouts all degrade to the same
//! observable outcome: the affected functions simply have no recorded
//! result, and the classifier resolves them to NOT_RUN.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Marker a test binary prints for a passing function.
pub const PASS_MARKER: &str = "[PASS]";
/// Marker a test binary prints for a failing function (`[FAIL] name - msg`).
pub const FAIL_MARKER: &str = "[FAIL]";

const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_BINARY_TIMEOUT: Duration = Duration::from_secs(60);

/// Recorded outcome for one reported function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub passed: bool,
    /// The raw marker line, kept verbatim as human-readable evidence.
    pub detail: String,
}

/// Live results keyed by function name. Rebuilt fresh on every run; never
/// reuse an instance across runs.
#[derive(Debug, Clone, Default)]
pub struct RunResults {
    results: BTreeMap<String, RunOutcome>,
}

impl RunResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one reported function. A repeated report overwrites the
    /// earlier one: the binary's last word wins.
    pub fn record(&mut self, function: impl Into<String>, passed: bool, detail: impl Into<String>) {
        self.results.insert(
            function.into(),
            RunOutcome {
                passed,
                detail: detail.into(),
            },
        );
    }

    pub fn get(&self, function: &str) -> Option<&RunOutcome> {
        self.results.get(function)
    }

    pub fn contains(&self, function: &str) -> bool {
        self.results.contains_key(function)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Scan one binary's combined output for marker lines.
    fn absorb_output(&mut self, output: &str) {
        for raw_line in output.lines() {
            let line = raw_line.trim();
            let (passed, rest) = if let Some(rest) = line.strip_prefix(PASS_MARKER) {
                (true, rest)
            } else if let Some(rest) = line.strip_prefix(FAIL_MARKER) {
                (false, rest)
            } else {
                continue;
            };
            // First whitespace-delimited token after the marker is the
            // function name; a marker with nothing after it is noise
            let Some(function) = rest.split_whitespace().next() else {
                continue;
            };
            self.record(function, passed, line);
        }
    }
}

/// Builds and runs the native test binaries.
///
/// All paths are explicit configuration; the runner never consults the
/// process working directory.
#[derive(Debug, Clone)]
pub struct TestRunner {
    workspace_dir: PathBuf,
    build_dir: PathBuf,
    build_command: Vec<String>,
    build_timeout: Duration,
    binary_timeout: Duration,
}

impl TestRunner {
    /// Create a runner that builds in `workspace_dir` and expects the
    /// compiled binaries in `build_dir`.
    pub fn new(workspace_dir: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspace_dir: workspace_dir.into(),
            build_dir: build_dir.into(),
            build_command: vec!["make".to_string(), "all".to_string()],
            build_timeout: DEFAULT_BUILD_TIMEOUT,
            binary_timeout: DEFAULT_BINARY_TIMEOUT,
        }
    }

    /// Override the build command (program plus arguments).
    pub fn build_command(mut self, command: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.build_command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn build_timeout(mut self, timeout: Duration) -> Self {
        self.build_timeout = timeout;
        self
    }

    /// Per-binary timeout; must stay below the build timeout.
    pub fn binary_timeout(mut self, timeout: Duration) -> Self {
        self.binary_timeout = timeout;
        self
    }

    /// Build the suite and run every test binary, strictly in sorted order.
    ///
    /// Never returns an error: any failure yields a (possibly empty) result
    /// set and a logged diagnostic.
    pub fn run(&self) -> RunResults {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                warn!(error = %err, "failed to start runtime for test execution");
                return RunResults::new();
            }
        };
        runtime.block_on(self.run_inner())
    }

    async fn run_inner(&self) -> RunResults {
        let mut results = RunResults::new();

        let Some((program, args)) = self.build_command.split_first() else {
            warn!("empty build command, skipping test execution");
            return results;
        };

        debug!(command = %self.build_command.join(" "), "building test suite");
        let mut build = Command::new(program);
        build
            .args(args)
            .current_dir(&self.workspace_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let build_output = match timeout(self.build_timeout, build.output()).await {
            Err(_) => {
                warn!(timeout_secs = self.build_timeout.as_secs(), "build timed out");
                return results;
            }
            Ok(Err(err)) => {
                warn!(error = %err, "failed to invoke build command");
                return results;
            }
            Ok(Ok(output)) => output,
        };

        if !build_output.status.success() {
            let stderr = String::from_utf8_lossy(&build_output.stderr);
            warn!(status = %build_output.status, stderr = %stderr.trim(), "build failed");
            return results;
        }

        if !self.build_dir.is_dir() {
            warn!(dir = %self.build_dir.display(), "build directory not found");
            return results;
        }

        for binary in test_binaries(&self.build_dir) {
            debug!(binary = %binary.display(), "running test binary");

            let mut command = Command::new(&binary);
            command
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            match timeout(self.binary_timeout, command.output()).await {
                Err(_) => {
                    // Skip this binary; the rest still run
                    warn!(binary = %binary.display(), "test binary timed out");
                }
                Ok(Err(err)) => {
                    warn!(binary = %binary.display(), error = %err, "failed to run test binary");
                }
                Ok(Ok(output)) => {
                    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                    combined.push_str(&String::from_utf8_lossy(&output.stderr));
                    results.absorb_output(&combined);
                }
            }
        }

        results
    }
}

/// Executable `test_*` artifacts in the build directory, sorted by name.
fn test_binaries(build_dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(build_dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %build_dir.display(), error = %err, "failed to list build directory");
            return Vec::new();
        }
    };

    let mut binaries: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("test_"))
                && is_executable(path)
        })
        .collect();
    binaries.sort();
    binaries
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).is_ok_and(|meta| meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}
