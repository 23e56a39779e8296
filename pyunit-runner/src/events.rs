// Copyright (c) The pyunit-harness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test event data model shared with the Python runner script.
//!
//! Every sentinel-prefixed line on the runner's stdout decodes into one
//! [`TestEvent`]. Only the fields relevant to an event type exist on its
//! [`TestEventKind`] variant; the envelope carries the two clocks and the
//! test-case identity common to (almost) all events.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// The identity of a single test case, as reported by the runner script.
///
/// Test-case *identity* is the `id` string alone: events are correlated by
/// `id`, and `desc` is auxiliary display data picked up once per case.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TestCaseId {
    /// The dotted test identifier, e.g. `tests.test_mod.MyCase.test_foo`.
    #[serde(rename = "ID")]
    pub id: String,

    /// The test's short description (its docstring first line), if any.
    ///
    /// The runner script emits `null` when a test has no docstring.
    #[serde(rename = "Desc", default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

impl TestCaseId {
    /// The portion of the identifier before the last `.`, or `None` for an
    /// undotted identifier.
    pub fn group(&self) -> Option<&str> {
        self.id.rsplit_once('.').map(|(group, _)| group)
    }

    /// The portion of the identifier after the last `.`, or the whole
    /// identifier if it contains no `.`.
    pub fn name(&self) -> &str {
        self.id.rsplit_once('.').map_or(&*self.id, |(_, name)| name)
    }
}

/// A single event observed on the runner's event stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestEvent {
    /// The kind of event, along with its type-specific payload.
    #[serde(flatten)]
    pub kind: TestEventKind,

    /// Wall-clock time at emission, in seconds since the Unix epoch.
    ///
    /// Display only. Subject to system clock adjustments, so never used for
    /// duration arithmetic.
    #[serde(rename = "Now")]
    pub now: f64,

    /// Monotonic time at emission, in seconds since an arbitrary origin.
    #[serde(rename = "Time")]
    pub time: f64,

    /// The test case this event pertains to.
    ///
    /// `None` only for [`StartSuite`](TestEventKind::StartSuite) and
    /// [`StopSuite`](TestEventKind::StopSuite) events.
    #[serde(rename = "Test", default, skip_serializing_if = "Option::is_none")]
    pub test: Option<TestCaseId>,
}

impl TestEvent {
    /// The wall-clock emission time as a UTC timestamp.
    pub fn now_time(&self) -> DateTime<Utc> {
        epoch_secs_to_datetime(self.now)
    }
}

/// The kind of test event, tagged on the wire by the `Type` field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum TestEventKind {
    /// The whole test run began.
    StartSuite,

    /// The whole test run finished.
    StopSuite,

    /// A test case is about to run.
    StartCase,

    /// A test case finished running.
    StopCase {
        /// Stdout captured for this case, if output buffering was on.
        #[serde(rename = "Output", default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,

        /// Stderr captured for this case, if output buffering was on.
        #[serde(rename = "Error", default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// A test raised an unexpected exception.
    Error {
        /// The formatted exception traceback.
        #[serde(rename = "Err", default, skip_serializing_if = "Option::is_none")]
        err: Option<String>,
    },

    /// A test assertion failed.
    Failure {
        /// The formatted exception traceback.
        #[serde(rename = "Err", default, skip_serializing_if = "Option::is_none")]
        err: Option<String>,
    },

    /// A test passed.
    Success,

    /// A test was skipped.
    Skip {
        /// The skip reason.
        #[serde(rename = "Message", default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// A test marked as an expected failure failed, as expected.
    ExpectedFailure {
        /// The formatted exception traceback.
        #[serde(rename = "Err", default, skip_serializing_if = "Option::is_none")]
        err: Option<String>,
    },

    /// A test marked as an expected failure passed.
    UnexpectedSuccess {
        /// Exception text, if the runner attached any.
        #[serde(rename = "Err", default, skip_serializing_if = "Option::is_none")]
        err: Option<String>,
    },
}

impl TestEventKind {
    /// The wire name of this event kind, used verbatim in result logs.
    pub fn name(&self) -> &'static str {
        match self {
            TestEventKind::StartSuite => "StartSuite",
            TestEventKind::StopSuite => "StopSuite",
            TestEventKind::StartCase => "StartCase",
            TestEventKind::StopCase { .. } => "StopCase",
            TestEventKind::Error { .. } => "Error",
            TestEventKind::Failure { .. } => "Failure",
            TestEventKind::Success => "Success",
            TestEventKind::Skip { .. } => "Skip",
            TestEventKind::ExpectedFailure { .. } => "ExpectedFailure",
            TestEventKind::UnexpectedSuccess { .. } => "UnexpectedSuccess",
        }
    }

    /// The exception text carried by this event, if any.
    pub fn err(&self) -> Option<&str> {
        match self {
            TestEventKind::Error { err }
            | TestEventKind::Failure { err }
            | TestEventKind::ExpectedFailure { err }
            | TestEventKind::UnexpectedSuccess { err } => err.as_deref(),
            _ => None,
        }
    }
}

/// Converts fractional epoch seconds, as emitted in the `Now` field, to a
/// UTC timestamp.
pub fn epoch_secs_to_datetime(secs: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos((secs * 1e9).round() as i64)
}

/// Converts a difference of two monotonic `Time` readings to a signed
/// duration. Negative and zero deltas are preserved.
pub fn monotonic_delta(start_secs: f64, end_secs: f64) -> TimeDelta {
    TimeDelta::nanoseconds(((end_secs - start_secs) * 1e9).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn case_id_group_and_name() {
        let id = TestCaseId {
            id: "tests.test_mod.MyCase.test_foo".into(),
            desc: None,
        };
        assert_eq!(id.group(), Some("tests.test_mod.MyCase"));
        assert_eq!(id.name(), "test_foo");

        let undotted = TestCaseId {
            id: "standalone".into(),
            desc: None,
        };
        assert_eq!(undotted.group(), None);
        assert_eq!(undotted.name(), "standalone");
    }

    #[test]
    fn decodes_runner_script_output() {
        // Lines exactly as the runner script produces them (after the
        // sentinel prefix), including the null Desc for docstring-less tests.
        let event: TestEvent = serde_json::from_str(
            r#"{"Type": "StartCase", "Test": {"ID": "t.C.test_a", "Desc": null}, "Now": 1000.5, "Time": 12.25}"#,
        )
        .expect("valid event");
        assert_eq!(event.kind, TestEventKind::StartCase);
        assert_eq!(event.test.as_ref().map(|t| t.id.as_str()), Some("t.C.test_a"));
        assert_eq!(event.test.as_ref().and_then(|t| t.desc.as_deref()), None);

        let event: TestEvent = serde_json::from_str(
            r#"{"Type": "StopCase", "Output": "hello", "Error": "", "Test": {"ID": "t.C.test_a", "Desc": "Adds things."}, "Now": 1001.0, "Time": 12.75}"#,
        )
        .expect("valid event");
        assert_eq!(
            event.kind,
            TestEventKind::StopCase {
                output: Some("hello".into()),
                error: Some("".into()),
            }
        );
        assert_eq!(
            event.test.as_ref().and_then(|t| t.desc.as_deref()),
            Some("Adds things.")
        );
    }

    #[test]
    fn suite_events_have_no_test() {
        let event: TestEvent =
            serde_json::from_str(r#"{"Type": "StartSuite", "Now": 1000.0, "Time": 1.0}"#)
                .expect("valid event");
        assert_eq!(event.kind, TestEventKind::StartSuite);
        assert_eq!(event.test, None);
    }

    #[test]
    fn round_trips_every_event_kind() {
        let test = Some(TestCaseId {
            id: "t.C.test_a".into(),
            desc: Some("A description.".into()),
        });
        let kinds = vec![
            (TestEventKind::StartSuite, None),
            (TestEventKind::StopSuite, None),
            (TestEventKind::StartCase, test.clone()),
            (
                TestEventKind::StopCase {
                    output: Some("out".into()),
                    error: Some("err".into()),
                },
                test.clone(),
            ),
            (
                TestEventKind::Error {
                    err: Some("Traceback".into()),
                },
                test.clone(),
            ),
            (
                TestEventKind::Failure {
                    err: Some("Traceback".into()),
                },
                test.clone(),
            ),
            (TestEventKind::Success, test.clone()),
            (
                TestEventKind::Skip {
                    message: Some("not supported".into()),
                },
                test.clone(),
            ),
            (
                TestEventKind::ExpectedFailure {
                    err: Some("Traceback".into()),
                },
                test.clone(),
            ),
            (TestEventKind::UnexpectedSuccess { err: None }, test.clone()),
        ];

        for (kind, test) in kinds {
            let event = TestEvent {
                kind,
                now: 1234.5,
                time: 6.5,
                test,
            };
            let encoded = serde_json::to_string(&event).expect("serializable");
            let decoded: TestEvent = serde_json::from_str(&encoded).expect("deserializable");
            assert_eq!(decoded, event, "round trip for {encoded}");
        }
    }

    #[test]
    fn epoch_conversion() {
        let dt = epoch_secs_to_datetime(1000.0);
        assert_eq!(dt.timestamp(), 1000);
        assert_eq!(dt.timestamp_subsec_nanos(), 0);

        let dt = epoch_secs_to_datetime(1002.5);
        assert_eq!(dt.timestamp(), 1002);
        assert_eq!(dt.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn monotonic_delta_is_signed() {
        assert_eq!(monotonic_delta(0.0, 2.5), TimeDelta::milliseconds(2500));
        assert_eq!(monotonic_delta(5.0, 5.0), TimeDelta::zero());
        assert_eq!(monotonic_delta(3.0, 1.5), TimeDelta::milliseconds(-1500));
    }
}
