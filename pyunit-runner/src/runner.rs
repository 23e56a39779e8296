// Copyright (c) The pyunit-harness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Orchestration of one Python unittest run.
//!
//! A run writes the bundled runner script to a temporary path, spawns the
//! interpreter on it, and drains stdout/stderr line streams as they arrive.
//! Sentinel-prefixed stdout lines become events; everything else is
//! forwarded to the log. Aggregation happens strictly after the child has
//! terminated -- there is no partial or streaming reduction.

use crate::{
    aggregator::{EventAggregator, TestStatus},
    errors::{SignalHandlerSetupError, TestRunError},
    protocol::parse_event_line,
    recorder::TestRecorder,
    signal::{SignalHandler, SignalHandlerKind},
};
use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use std::process::Stdio;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::Command,
};
use tracing::{error, info};

/// The bundled unittest runner script that emits the event stream.
const RUNNER_SCRIPT: &str = include_str!("../scripts/pyunit_event_runner.py");
const RUNNER_SCRIPT_FILE_NAME: &str = "pyunit_event_runner.py";

/// Builder for [`PyUnitRunner`].
///
/// Defaults mirror the runner script's expectations: `discover` as the
/// unittest argument string, verbose on, fail-fast off, per-case output
/// capture on.
#[derive(Clone, Debug)]
pub struct PyUnitRunnerBuilder {
    python_path: Utf8PathBuf,
    arguments: String,
    verbose: bool,
    fail_fast: bool,
    capture_output: bool,
    working_dir: Option<Utf8PathBuf>,
    envs: Vec<(String, String)>,
}

impl PyUnitRunnerBuilder {
    /// Creates a builder for runs using the given Python interpreter.
    pub fn new(python_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            python_path: python_path.into(),
            arguments: "discover".to_owned(),
            verbose: true,
            fail_fast: false,
            capture_output: true,
            working_dir: None,
            envs: Vec::new(),
        }
    }

    /// Sets the argument string passed to the unittest main, e.g.
    /// `"discover -s tests"`. Split with shell quoting rules.
    pub fn arguments(&mut self, arguments: impl Into<String>) -> &mut Self {
        self.arguments = arguments.into();
        self
    }

    /// Sets whether the runner prints verbose per-test progress (`-v`).
    pub fn verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    /// Sets whether the run stops at the first failure (`-f`).
    pub fn fail_fast(&mut self, fail_fast: bool) -> &mut Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Sets whether per-case stdout/stderr is buffered and captured into
    /// StopCase events (`-b`).
    pub fn capture_output(&mut self, capture_output: bool) -> &mut Self {
        self.capture_output = capture_output;
        self
    }

    /// Sets the working directory for the test process.
    pub fn working_dir(&mut self, working_dir: impl Into<Utf8PathBuf>) -> &mut Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    /// Adds an environment variable for the test process.
    pub fn env(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Builds a runner, setting up signal handling of the given kind.
    pub fn build(
        &self,
        signal_handler: SignalHandlerKind,
    ) -> Result<PyUnitRunner, SignalHandlerSetupError> {
        Ok(PyUnitRunner {
            config: self.clone(),
            signal_handler: signal_handler.build()?,
        })
    }
}

/// Executes one Python unittest run and reports its results.
#[derive(Debug)]
pub struct PyUnitRunner {
    config: PyUnitRunnerBuilder,
    signal_handler: SignalHandler,
}

impl PyUnitRunner {
    /// Runs the tests, then reduces the captured event stream and hands one
    /// result per test case to `recorder`, in first-seen order.
    ///
    /// A non-zero interpreter exit is logged as an error but does not
    /// suppress reporting: partial results from a crashed run are still
    /// valuable. A decode failure on the event stream, or a shutdown
    /// signal, aborts the run with no results reported.
    pub async fn execute(
        mut self,
        recorder: &mut dyn TestRecorder,
    ) -> Result<RunSummary, TestRunError> {
        let script_dir = Utf8TempDir::new().map_err(TestRunError::TempDirCreate)?;
        let script_path = script_dir.path().join(RUNNER_SCRIPT_FILE_NAME);
        std::fs::write(&script_path, RUNNER_SCRIPT).map_err(|error| {
            TestRunError::WriteRunnerScript {
                path: script_path.clone(),
                error,
            }
        })?;

        let (aggregator, exit_code) = self.run_child(&script_path).await?;

        let results = aggregator.reduce();
        let mut stats = RunStats::default();
        for result in &results {
            stats.on_result(result.status);
            recorder.record(result)?;
        }

        Ok(RunSummary { exit_code, stats })
    }

    async fn run_child(
        &mut self,
        script_path: &Utf8Path,
    ) -> Result<(EventAggregator, Option<i32>), TestRunError> {
        let config = &self.config;
        let user_args =
            shell_words::split(&config.arguments).map_err(|error| TestRunError::ArgumentsParse {
                arguments: config.arguments.clone(),
                error,
            })?;

        let mut cmd = Command::new(config.python_path.as_str());
        cmd.arg(script_path).args(user_args);
        if config.verbose {
            cmd.arg("-v");
        }
        if config.fail_fast {
            cmd.arg("-f");
        }
        if config.capture_output {
            cmd.arg("-b");
        }
        if let Some(dir) = &config.working_dir {
            cmd.current_dir(dir);
        }
        cmd.envs(config.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|error| TestRunError::Spawn {
            program: config.python_path.to_string(),
            error,
        })?;

        let stdout = child.stdout.take().expect("stdout is piped");
        let stderr = child.stderr.take().expect("stderr is piped");
        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();

        let mut aggregator = EventAggregator::new();
        let mut stdout_done = false;
        let mut stderr_done = false;

        // Output and error lines arrive in emission order within each
        // stream; the two streams have no defined order relative to each
        // other. Events are only ever appended here -- reduction waits for
        // the child to exit.
        while !(stdout_done && stderr_done) {
            tokio::select! {
                line = stdout_lines.next_line(), if !stdout_done => {
                    match line.map_err(TestRunError::ReadOutput)? {
                        Some(line) => match parse_event_line(&line) {
                            Some(event) => aggregator.push(event?),
                            None => info!("{line}"),
                        },
                        None => stdout_done = true,
                    }
                }
                line = stderr_lines.next_line(), if !stderr_done => {
                    match line.map_err(TestRunError::ReadOutput)? {
                        // The test runner writes its own progress to stderr;
                        // that's diagnostic text, not a failure indicator.
                        Some(line) => {
                            if !line.trim().is_empty() {
                                info!("{line}");
                            }
                        }
                        None => stderr_done = true,
                    }
                }
                reason = self.signal_handler.recv() => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    return Err(TestRunError::Cancelled { reason });
                }
            }
        }

        let status = child.wait().await.map_err(TestRunError::Wait)?;
        let exit_code = status.code();
        match exit_code {
            Some(0) => {}
            Some(code) => error!("test process exited with code {code}"),
            None => error!("test process was terminated by a signal"),
        }

        Ok((aggregator, exit_code))
    }
}

/// Statistics for the results of a run.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RunStats {
    /// The number of test cases that passed.
    pub passed: usize,
    /// The number of test cases that failed.
    pub failed: usize,
    /// The number of test cases that were skipped or never finished.
    pub inconclusive: usize,
}

impl RunStats {
    /// The total number of test cases reported.
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.inconclusive
    }

    fn on_result(&mut self, status: TestStatus) {
        match status {
            TestStatus::Passed => self.passed += 1,
            TestStatus::Failed => self.failed += 1,
            TestStatus::Inconclusive => self.inconclusive += 1,
        }
    }
}

/// The outcome of one test run.
#[derive(Copy, Clone, Debug)]
pub struct RunSummary {
    /// The interpreter's exit code; `None` if it was killed by a signal.
    pub exit_code: Option<i32>,
    /// Per-status result counts.
    pub stats: RunStats,
}

impl RunSummary {
    /// True if the interpreter exited cleanly and no test failed.
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0) && self.stats.failed == 0
    }
}
