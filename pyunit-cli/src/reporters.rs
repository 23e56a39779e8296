// Copyright (c) The pyunit-harness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Console recorders for test results.

use clap::ValueEnum;
use owo_colors::{OwoColorize, Style};
use pyunit_runner::{
    aggregator::{CaseResult, TestStatus},
    errors::RecordResultError,
    recorder::TestRecorder,
    runner::RunSummary,
};
use std::io::Write;

/// How results are written to stdout.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum MessageFormat {
    /// One styled line per test, with diagnostics for non-passing tests.
    Human,
    /// One JSON object per line.
    Json,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Styles {
    pass: Style,
    fail: Style,
    inconclusive: Style,
    count: Style,
}

impl Styles {
    pub(crate) fn colorize(&mut self) {
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.inconclusive = Style::new().yellow().bold();
        self.count = Style::new().bold();
    }
}

/// A recorder that prints one human-readable line per result.
///
/// Non-passing results also get their full diagnostic log, indented under
/// the status line.
#[derive(Debug)]
pub(crate) struct HumanRecorder {
    styles: Styles,
}

impl HumanRecorder {
    pub(crate) fn new(styles: Styles) -> Self {
        Self { styles }
    }

    fn status_style(&self, status: TestStatus) -> Style {
        match status {
            TestStatus::Passed => self.styles.pass,
            TestStatus::Failed => self.styles.fail,
            TestStatus::Inconclusive => self.styles.inconclusive,
        }
    }

    pub(crate) fn finish(&self, summary: &RunSummary) -> Result<(), RecordResultError> {
        let stats = summary.stats;
        let mut out = std::io::stdout().lock();
        writeln!(
            out,
            "{} {} run: {} {}, {} {}, {} {}",
            "Summary:".style(self.styles.count),
            stats.total(),
            stats.passed.style(self.styles.count),
            "passed".style(self.styles.pass),
            stats.failed.style(self.styles.count),
            "failed".style(self.styles.fail),
            stats.inconclusive.style(self.styles.count),
            "inconclusive".style(self.styles.inconclusive),
        )
        .map_err(RecordResultError::Write)
    }
}

impl TestRecorder for HumanRecorder {
    fn record(&mut self, result: &CaseResult) -> Result<(), RecordResultError> {
        let label = match result.status {
            TestStatus::Passed => "PASS",
            TestStatus::Failed => "FAIL",
            TestStatus::Inconclusive => "INCONCLUSIVE",
        };

        let mut out = std::io::stdout().lock();
        writeln!(
            out,
            "{} [{:>9.3}s] {}",
            format!("{label:>12}").style(self.status_style(result.status)),
            result.duration.num_milliseconds() as f64 / 1000.0,
            result.test.id,
        )
        .map_err(RecordResultError::Write)?;

        if result.status != TestStatus::Passed {
            for line in result.log.lines() {
                writeln!(out, "    {line}").map_err(RecordResultError::Write)?;
            }
        }
        Ok(())
    }
}

/// The stdout recorder selected by `--message-format`.
#[derive(Debug)]
pub(crate) enum ConsoleRecorder {
    Human(HumanRecorder),
    Json(JsonRecorder),
}

impl ConsoleRecorder {
    pub(crate) fn new(format: MessageFormat, styles: Styles) -> Self {
        match format {
            MessageFormat::Human => ConsoleRecorder::Human(HumanRecorder::new(styles)),
            MessageFormat::Json => ConsoleRecorder::Json(JsonRecorder::default()),
        }
    }

    /// Writes the end-of-run summary.
    pub(crate) fn finish(&self, summary: &RunSummary) -> Result<(), RecordResultError> {
        match self {
            ConsoleRecorder::Human(human) => human.finish(summary),
            ConsoleRecorder::Json(json) => json.finish(summary),
        }
    }
}

impl TestRecorder for ConsoleRecorder {
    fn record(&mut self, result: &CaseResult) -> Result<(), RecordResultError> {
        match self {
            ConsoleRecorder::Human(human) => human.record(result),
            ConsoleRecorder::Json(json) => json.record(result),
        }
    }
}

/// A recorder that emits one JSON object per line, for machine consumers.
#[derive(Debug, Default)]
pub(crate) struct JsonRecorder {}

impl JsonRecorder {
    pub(crate) fn finish(&self, summary: &RunSummary) -> Result<(), RecordResultError> {
        let stats = summary.stats;
        let line = serde_json::json!({
            "type": "summary",
            "exit-code": summary.exit_code,
            "passed": stats.passed,
            "failed": stats.failed,
            "inconclusive": stats.inconclusive,
        });
        writeln!(std::io::stdout().lock(), "{line}").map_err(RecordResultError::Write)
    }
}

impl TestRecorder for JsonRecorder {
    fn record(&mut self, result: &CaseResult) -> Result<(), RecordResultError> {
        let line = serde_json::json!({
            "type": "test",
            "id": result.test.id,
            "group": result.group_name(),
            "name": result.test_name(),
            "status": result.status.as_str(),
            "start-time": result.start_time.to_rfc3339(),
            "duration": result.duration.num_milliseconds() as f64 / 1000.0,
            "log": result.log,
        });
        writeln!(std::io::stdout().lock(), "{line}").map_err(RecordResultError::Write)
    }
}
