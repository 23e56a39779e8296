// Copyright (c) The pyunit-harness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sinks for reduced test results.

use crate::{
    aggregator::{CaseResult, TestStatus},
    errors::RecordResultError,
};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use quick_junit::{NonSuccessKind, Report, TestCase, TestCaseStatus, TestSuite};
use std::fs::File;

/// A sink that receives one result per test case, in first-seen order.
///
/// This is the seam between the run orchestration and whatever persists or
/// displays outcomes. [`PyUnitRunner::execute`](crate::runner::PyUnitRunner::execute)
/// requires a recorder up front, so a run can never complete unrecorded.
pub trait TestRecorder {
    /// Records one reduced test result.
    fn record(&mut self, result: &CaseResult) -> Result<(), RecordResultError>;
}

/// A recorder that accumulates results into a JUnit XML report.
///
/// Results are grouped into one `<testsuite>` per group name; call
/// [`write_to_file`](Self::write_to_file) after the run to serialize the
/// report.
#[derive(Debug)]
pub struct JunitRecorder {
    report_name: String,
    // Keyed by group name; results with no group land in a suite named
    // after the report.
    test_suites: IndexMap<String, TestSuite>,
}

impl JunitRecorder {
    /// Creates a recorder producing a report with the given name.
    pub fn new(report_name: impl Into<String>) -> Self {
        Self {
            report_name: report_name.into(),
            test_suites: IndexMap::new(),
        }
    }

    /// Serializes the accumulated report to `path`.
    pub fn write_to_file(self, path: &Utf8Path) -> Result<(), RecordResultError> {
        let mut report = Report::new(self.report_name);
        report.add_test_suites(self.test_suites.into_values());

        let file = File::create(path).map_err(|error| RecordResultError::Fs {
            path: Utf8PathBuf::from(path),
            error,
        })?;
        report
            .serialize(file)
            .map_err(|error| RecordResultError::Junit {
                path: Utf8PathBuf::from(path),
                error,
            })
    }
}

impl TestRecorder for JunitRecorder {
    fn record(&mut self, result: &CaseResult) -> Result<(), RecordResultError> {
        let status = match result.status {
            TestStatus::Passed => TestCaseStatus::success(),
            TestStatus::Failed => {
                let mut status = TestCaseStatus::non_success(NonSuccessKind::Failure);
                status.set_description(result.log.clone());
                status
            }
            TestStatus::Inconclusive => {
                let mut status = TestCaseStatus::skipped();
                status.set_description(result.log.clone());
                status
            }
        };

        let mut test_case = TestCase::new(result.test_name(), status);
        if let Some(group) = result.group_name() {
            test_case.set_classname(group);
        }
        test_case.set_timestamp(result.start_time);
        // JUnit cannot express a negative duration; a truncated stream's
        // negative delta becomes zero here, in the XML only.
        test_case.set_time(result.duration.to_std().unwrap_or_default());

        let suite_name = result.group_name().unwrap_or(&self.report_name).to_owned();
        self.test_suites
            .entry(suite_name.clone())
            .or_insert_with(|| TestSuite::new(suite_name))
            .add_test_case(test_case);
        Ok(())
    }
}
