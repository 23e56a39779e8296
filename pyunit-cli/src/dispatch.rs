// Copyright (c) The pyunit-harness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    output::OutputOpts,
    reporters::{ConsoleRecorder, MessageFormat, Styles},
};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, bail};
use pyunit_runner::{
    aggregator::CaseResult,
    errors::RecordResultError,
    recorder::{JunitRecorder, TestRecorder},
    runner::PyUnitRunnerBuilder,
    signal::SignalHandlerKind,
};

/// Run Python unittest suites and aggregate their results.
#[derive(Debug, Parser)]
#[command(name = "pyunit", version)]
pub(crate) struct PyUnitApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(subcommand)]
    command: Command,
}

impl PyUnitApp {
    /// Executes the app, returning the process exit code.
    pub(crate) fn exec(self) -> Result<i32> {
        crate::output::init_logging();
        match self.command {
            Command::Run(opts) => opts.exec(self.output),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a unittest suite
    ///
    /// Discovers and runs tests with the given Python interpreter, printing
    /// one result per test case. The exit code is 0 only if the interpreter
    /// exited cleanly and no test failed.
    Run(RunOpts),
}

#[derive(Debug, Args)]
struct RunOpts {
    /// Path to the Python interpreter to run tests with
    #[arg(long, value_name = "PATH", default_value = "python3")]
    python: Utf8PathBuf,

    /// Argument string passed to the unittest main, split with shell
    /// quoting rules
    #[arg(long, value_name = "ARGS", default_value = "discover")]
    arguments: String,

    /// Don't pass -v (verbose per-test progress) to the runner
    #[arg(long)]
    no_verbose: bool,

    /// Stop the run at the first failing test (-f)
    #[arg(long)]
    fail_fast: bool,

    /// Don't buffer and capture per-test stdout/stderr (-b)
    #[arg(long)]
    no_capture_output: bool,

    /// Working directory for the test process
    #[arg(long, value_name = "DIR")]
    workdir: Option<Utf8PathBuf>,

    /// Environment variable for the test process (may be repeated)
    #[arg(long = "env", value_name = "KEY=VALUE")]
    envs: Vec<String>,

    /// Write a JUnit XML report to this path
    #[arg(long, value_name = "PATH")]
    junit: Option<Utf8PathBuf>,

    /// Format for results on stdout
    #[arg(long, value_enum, value_name = "FORMAT", default_value_t = MessageFormat::Human)]
    message_format: MessageFormat,
}

impl RunOpts {
    fn exec(self, output: OutputOpts) -> Result<i32> {
        let mut builder = PyUnitRunnerBuilder::new(self.python);
        builder
            .arguments(self.arguments)
            .verbose(!self.no_verbose)
            .fail_fast(self.fail_fast)
            .capture_output(!self.no_capture_output);
        if let Some(workdir) = self.workdir {
            builder.working_dir(workdir);
        }
        for env in &self.envs {
            let Some((key, value)) = env.split_once('=') else {
                bail!("invalid --env value `{env}`: expected KEY=VALUE");
            };
            builder.env(key, value);
        }

        let mut styles = Styles::default();
        if output.color.should_colorize(supports_color::Stream::Stdout) {
            styles.colorize();
        }

        let mut recorders = RunRecorders {
            console: ConsoleRecorder::new(self.message_format, styles),
            junit: self.junit.is_some().then(|| JunitRecorder::new("pyunit")),
        };

        let runner = builder
            .build(SignalHandlerKind::Standard)
            .wrap_err("failed to set up signal handling")?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .wrap_err("failed to start the tokio runtime")?;
        let summary = runtime
            .block_on(runner.execute(&mut recorders))
            .wrap_err("test run failed")?;

        recorders.console.finish(&summary)?;
        if let (Some(junit), Some(path)) = (recorders.junit, &self.junit) {
            junit
                .write_to_file(path)
                .wrap_err_with(|| format!("failed to write JUnit report to `{path}`"))?;
        }

        Ok(if summary.is_success() { 0 } else { 1 })
    }
}

/// Fans each result out to the console recorder and, if requested, the
/// JUnit recorder.
struct RunRecorders {
    console: ConsoleRecorder,
    junit: Option<JunitRecorder>,
}

impl TestRecorder for RunRecorders {
    fn record(&mut self, result: &CaseResult) -> Result<(), RecordResultError> {
        self.console.record(result)?;
        if let Some(junit) = &mut self.junit {
            junit.record(result)?;
        }
        Ok(())
    }
}
