// Copyright (c) The pyunit-harness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by pyunit-runner.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::signal::ShutdownEvent;

/// An error that occurred while decoding a sentinel-prefixed event line.
///
/// A corrupt event stream makes result aggregation unreliable, so this error
/// aborts the whole run rather than being skipped.
#[derive(Debug, Error)]
#[error("failed to decode test event line: `{line}`")]
pub struct EventParseError {
    line: String,
    #[source]
    error: serde_json::Error,
}

impl EventParseError {
    pub(crate) fn new(line: impl Into<String>, error: serde_json::Error) -> Self {
        Self {
            line: line.into(),
            error,
        }
    }

    /// The full line that failed to decode, including the sentinel prefix.
    pub fn line(&self) -> &str {
        &self.line
    }
}

/// An error that occurred while executing a test run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestRunError {
    /// The temporary directory for the runner script could not be created.
    #[error("failed to create a temporary directory for the runner script")]
    TempDirCreate(#[source] std::io::Error),

    /// The bundled runner script could not be written out.
    #[error("failed to write the runner script to `{path}`")]
    WriteRunnerScript {
        /// The path the script was being written to.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The user-supplied argument string could not be split into arguments.
    #[error("failed to parse argument string `{arguments}`")]
    ArgumentsParse {
        /// The argument string.
        arguments: String,
        /// The underlying error.
        #[source]
        error: shell_words::ParseError,
    },

    /// The Python interpreter could not be spawned.
    #[error("failed to spawn `{program}`")]
    Spawn {
        /// The program that was being spawned.
        program: String,
        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// Reading a line from the test process's output failed.
    #[error("failed to read output from the test process")]
    ReadOutput(#[source] std::io::Error),

    /// Waiting for the test process to exit failed.
    #[error("failed to wait for the test process to exit")]
    Wait(#[source] std::io::Error),

    /// A sentinel-prefixed line on the event stream failed to decode.
    #[error(transparent)]
    EventParse(#[from] EventParseError),

    /// A result could not be handed to the recorder.
    #[error(transparent)]
    Record(#[from] RecordResultError),

    /// The run was cancelled before completion; no results were reported.
    #[error("test run cancelled by {}", .reason.as_str())]
    Cancelled {
        /// The shutdown event that cancelled the run.
        reason: ShutdownEvent,
    },
}

/// An error that occurred while recording a test result.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RecordResultError {
    /// An error occurred while writing results to a sink.
    #[error("failed to write test result")]
    Write(#[source] std::io::Error),

    /// An error occurred while operating on a results file.
    #[error("failed to write test results to `{path}`")]
    Fs {
        /// The path being written to.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// An error occurred while serializing a JUnit report.
    #[error("failed to serialize JUnit report to `{path}`")]
    Junit {
        /// The path being written to.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: quick_junit::SerializeError,
    },
}

/// An error that occurred while setting up the signal handler.
#[derive(Debug, Error)]
#[error("error setting up signal handler")]
pub struct SignalHandlerSetupError(#[from] std::io::Error);
