// Copyright (c) The pyunit-harness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event correlation and per-case result reduction.
//!
//! Events are accumulated in emission order for the lifetime of one run,
//! then -- once the test process has terminated -- grouped by test-case
//! identity and reduced to one [`CaseResult`] per case. Results come out in
//! the order each case was first seen on the stream.
//!
//! The reduction is deliberately tolerant: a crashed or interrupted run can
//! truncate the stream at any point, and a group missing its StartCase or
//! StopCase still produces a best-effort result via the fallback rules on
//! each accessor below.

use crate::events::{TestCaseId, TestEvent, TestEventKind, epoch_secs_to_datetime, monotonic_delta};
use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use std::fmt;
use swrite::{SWrite, swrite};

/// The reduced status of a test case.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TestStatus {
    /// The test passed (or failed in a way it was expected to).
    Passed,
    /// The test failed, errored, or passed when it was expected to fail.
    Failed,
    /// The test was skipped, or produced no terminal event at all.
    Inconclusive,
}

impl TestStatus {
    /// The lowercase name of this status, for machine-readable output.
    pub fn as_str(self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Inconclusive => "inconclusive",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestStatus::Passed => "Passed",
            TestStatus::Failed => "Failed",
            TestStatus::Inconclusive => "Inconclusive",
        };
        f.write_str(s)
    }
}

/// The reduced outcome of a single test case.
#[derive(Clone, Debug)]
pub struct CaseResult {
    /// The identity of the test case.
    pub test: TestCaseId,

    /// The reduced status.
    pub status: TestStatus,

    /// The formatted, human-readable result log.
    pub log: String,

    /// When the case started running (wall clock).
    pub start_time: DateTime<Utc>,

    /// How long the case ran, from the monotonic clock.
    ///
    /// Negative and zero values are preserved as-is; a truncated stream can
    /// legitimately produce either.
    pub duration: TimeDelta,
}

impl CaseResult {
    /// The group portion of the case identifier, if any.
    pub fn group_name(&self) -> Option<&str> {
        self.test.group()
    }

    /// The name portion of the case identifier.
    pub fn test_name(&self) -> &str {
        self.test.name()
    }
}

/// Accumulates the event stream for one run and reduces it to results.
#[derive(Clone, Debug, Default)]
pub struct EventAggregator {
    events: Vec<TestEvent>,
}

impl EventAggregator {
    /// Creates an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one event in emission order.
    pub fn push(&mut self, event: TestEvent) {
        self.events.push(event);
    }

    /// The number of events accumulated so far.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if no events have been accumulated.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Groups the accumulated events by test-case identity and reduces each
    /// group to one result.
    ///
    /// Suite-level events (those without a test-case identity) are ignored
    /// here; they only delimit the run. Result order is the order in which
    /// each distinct case ID first appeared on the stream.
    pub fn reduce(&self) -> Vec<CaseResult> {
        let mut groups: IndexMap<&str, Vec<&TestEvent>> = IndexMap::new();
        for event in &self.events {
            if let Some(test) = &event.test {
                groups.entry(test.id.as_str()).or_default().push(event);
            }
        }

        groups.values().map(|events| reduce_group(events)).collect()
    }
}

/// Reduces the events of one test case to a result.
///
/// `events` is non-empty and in emission order; every element carries a
/// test-case identity with the same ID.
fn reduce_group(events: &[&TestEvent]) -> CaseResult {
    let first = events.first().expect("group is never empty");
    let test = first
        .test
        .clone()
        .expect("grouped events all carry a test-case identity");

    // The "chosen" event names the result: the first failure-or-skip beats
    // the first success, regardless of stream order. This same event also
    // decides the status, so the status and the displayed result name can
    // never disagree.
    let chosen = events
        .iter()
        .find(|e| {
            matches!(
                e.kind,
                TestEventKind::Error { .. }
                    | TestEventKind::Failure { .. }
                    | TestEventKind::UnexpectedSuccess { .. }
                    | TestEventKind::Skip { .. }
            )
        })
        .or_else(|| {
            events.iter().find(|e| {
                matches!(
                    e.kind,
                    TestEventKind::Success | TestEventKind::ExpectedFailure { .. }
                )
            })
        })
        .copied();

    let status = match chosen.map(|e| &e.kind) {
        Some(
            TestEventKind::Error { .. }
            | TestEventKind::Failure { .. }
            | TestEventKind::UnexpectedSuccess { .. },
        ) => TestStatus::Failed,
        Some(TestEventKind::Success | TestEventKind::ExpectedFailure { .. }) => TestStatus::Passed,
        // A lone Skip, or a case with only Start/Stop events (e.g. an
        // interrupted run).
        Some(TestEventKind::Skip { .. }) | None => TestStatus::Inconclusive,
        Some(_) => unreachable!("chosen is always a terminal event"),
    };

    let log = render_log(&test, events, chosen);

    let start_case = events
        .iter()
        .find(|e| matches!(e.kind, TestEventKind::StartCase));
    let stop_case = events
        .iter()
        .find(|e| matches!(e.kind, TestEventKind::StopCase { .. }));

    // Fallbacks for truncated streams: the first event stands in for a
    // missing StartCase, the last for a missing StopCase.
    let start_event = start_case.unwrap_or(first);
    let end_event = stop_case.unwrap_or_else(|| events.last().expect("group is never empty"));

    CaseResult {
        test,
        status,
        log,
        start_time: epoch_secs_to_datetime(start_event.now),
        duration: monotonic_delta(start_event.time, end_event.time),
    }
}

/// Builds the deterministic multi-part result log for one case.
///
/// Every optional section contributes nothing at all -- not even a
/// separator -- when its source field is empty. That suppression is part of
/// the format contract, not cosmetics.
fn render_log(test: &TestCaseId, events: &[&TestEvent], chosen: Option<&TestEvent>) -> String {
    let mut log = String::new();
    swrite!(log, "Test: {}", test.id);
    if let Some(desc) = test.desc.as_deref().filter(|d| !d.is_empty()) {
        swrite!(log, "\n{desc}");
    }

    swrite!(log, "\n\nResult: {}", chosen.map_or("Unknown", |e| e.kind.name()));
    if let Some(TestEventKind::Skip {
        message: Some(message),
    }) = chosen.map(|e| &e.kind)
        && !message.is_empty()
    {
        swrite!(log, " ({message})");
    }

    if let Some(TestEventKind::StopCase { output, error }) = events
        .iter()
        .find(|e| matches!(e.kind, TestEventKind::StopCase { .. }))
        .map(|e| &e.kind)
    {
        if let Some(output) = output.as_deref().filter(|o| !o.is_empty()) {
            swrite!(log, "\n\nOutput:\n{output}");
        }
        if let Some(error) = error.as_deref().filter(|e| !e.is_empty()) {
            swrite!(log, "\n\nError:\n{error}");
        }
    }

    let exceptions: Vec<&str> = events
        .iter()
        .filter_map(|e| e.kind.err())
        .filter(|err| !err.is_empty())
        .collect();
    if !exceptions.is_empty() {
        swrite!(log, "\n\nExceptions:\n\n{}", exceptions.join("\n\n"));
    }

    log.push('\n');
    log
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn case(id: &str) -> Option<TestCaseId> {
        Some(TestCaseId {
            id: id.into(),
            desc: None,
        })
    }

    fn event(kind: TestEventKind, test: Option<TestCaseId>, now: f64, time: f64) -> TestEvent {
        TestEvent {
            kind,
            now,
            time,
            test,
        }
    }

    fn aggregate(events: Vec<TestEvent>) -> Vec<CaseResult> {
        let mut aggregator = EventAggregator::new();
        for e in events {
            aggregator.push(e);
        }
        aggregator.reduce()
    }

    #[test]
    fn passing_case_with_output() {
        // Scenario: StartCase, Success, StopCase with captured stdout and an
        // empty stderr field.
        let results = aggregate(vec![
            event(TestEventKind::StartCase, case("t1"), 1000.0, 0.0),
            event(TestEventKind::Success, case("t1"), 1001.0, 1.0),
            event(
                TestEventKind::StopCase {
                    output: Some("ok".into()),
                    error: Some("".into()),
                },
                case("t1"),
                1002.5,
                2.5,
            ),
        ]);

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.status, TestStatus::Passed);
        assert_eq!(result.log, "Test: t1\n\nResult: Success\n\nOutput:\nok\n");
        assert_eq!(result.start_time, epoch_secs_to_datetime(1000.0));
        assert_eq!(result.duration, TimeDelta::milliseconds(2500));
    }

    #[test]
    fn skipped_case_carries_reason() {
        let results = aggregate(vec![
            event(TestEventKind::StartCase, case("t2"), 1000.0, 0.0),
            event(
                TestEventKind::Skip {
                    message: Some("not supported".into()),
                },
                case("t2"),
                1000.0,
                0.05,
            ),
            event(
                TestEventKind::StopCase {
                    output: None,
                    error: None,
                },
                case("t2"),
                1000.1,
                0.1,
            ),
        ]);

        let result = &results[0];
        assert_eq!(result.status, TestStatus::Inconclusive);
        assert_eq!(result.log, "Test: t2\n\nResult: Skip (not supported)\n");
    }

    #[test]
    fn errored_case_joins_exceptions_in_order() {
        let results = aggregate(vec![
            event(TestEventKind::StartCase, case("t3"), 1000.0, 0.0),
            event(
                TestEventKind::Error {
                    err: Some("Trace1".into()),
                },
                case("t3"),
                1000.2,
                0.2,
            ),
            event(
                TestEventKind::Error {
                    err: Some("Trace2".into()),
                },
                case("t3"),
                1000.4,
                0.4,
            ),
            event(
                TestEventKind::StopCase {
                    output: None,
                    error: None,
                },
                case("t3"),
                1001.0,
                1.0,
            ),
        ]);

        let result = &results[0];
        assert_eq!(result.status, TestStatus::Failed);
        assert_eq!(
            result.log,
            "Test: t3\n\nResult: Error\n\nExceptions:\n\nTrace1\n\nTrace2\n"
        );
        assert_eq!(result.duration, TimeDelta::seconds(1));
    }

    #[test]
    fn lone_start_case_is_inconclusive_with_zero_duration() {
        // The process crashed before emitting anything else for this case.
        let results = aggregate(vec![event(
            TestEventKind::StartCase,
            case("t4"),
            1005.0,
            5.0,
        )]);

        let result = &results[0];
        assert_eq!(result.status, TestStatus::Inconclusive);
        assert_eq!(result.log, "Test: t4\n\nResult: Unknown\n");
        assert_eq!(result.start_time, epoch_secs_to_datetime(1005.0));
        assert_eq!(result.duration, TimeDelta::zero());
    }

    #[test]
    fn result_order_is_first_seen_order() {
        let results = aggregate(vec![
            event(TestEventKind::StartCase, case("b"), 1.0, 1.0),
            event(TestEventKind::StartCase, case("a"), 2.0, 2.0),
            event(TestEventKind::Success, case("b"), 3.0, 3.0),
            event(TestEventKind::StartCase, case("c"), 4.0, 4.0),
            event(TestEventKind::Success, case("a"), 5.0, 5.0),
            event(TestEventKind::Success, case("c"), 6.0, 6.0),
        ]);

        let order: Vec<&str> = results.iter().map(|r| r.test.id.as_str()).collect();
        assert_eq!(order, ["b", "a", "c"]);
    }

    #[test]
    fn failure_beats_success_regardless_of_order() {
        let results = aggregate(vec![
            event(TestEventKind::Success, case("t"), 1.0, 1.0),
            event(
                TestEventKind::Failure {
                    err: Some("boom".into()),
                },
                case("t"),
                2.0,
                2.0,
            ),
        ]);
        assert_eq!(results[0].status, TestStatus::Failed);
        assert!(results[0].log.contains("Result: Failure"));
    }

    #[test]
    fn suite_events_produce_no_results() {
        let results = aggregate(vec![
            event(TestEventKind::StartSuite, None, 1.0, 1.0),
            event(TestEventKind::StopSuite, None, 2.0, 2.0),
        ]);
        assert!(results.is_empty());
    }

    #[test]
    fn empty_fields_emit_no_sections() {
        let results = aggregate(vec![
            event(TestEventKind::StartCase, case("t"), 1.0, 1.0),
            event(TestEventKind::Success, case("t"), 2.0, 2.0),
            event(
                TestEventKind::StopCase {
                    output: Some("".into()),
                    error: Some("".into()),
                },
                case("t"),
                3.0,
                3.0,
            ),
        ]);

        let log = &results[0].log;
        assert!(!log.contains("Output:"), "unexpected Output section: {log}");
        assert!(!log.contains("Error:"), "unexpected Error section: {log}");
    }

    #[test]
    fn description_appears_under_the_id() {
        let results = aggregate(vec![event(
            TestEventKind::Success,
            Some(TestCaseId {
                id: "t.C.test_a".into(),
                desc: Some("Checks a thing.".into()),
            }),
            1.0,
            1.0,
        )]);

        assert!(
            results[0]
                .log
                .starts_with("Test: t.C.test_a\nChecks a thing.\n\nResult: Success")
        );
    }

    #[test]
    fn duration_uses_monotonic_time_only() {
        // Two streams that differ only in wall-clock values produce the same
        // duration: the system clock jumped mid-run in the second stream.
        let stream = |now_offset: f64| {
            vec![
                event(TestEventKind::StartCase, case("t"), 1000.0, 10.0),
                event(
                    TestEventKind::StopCase {
                        output: None,
                        error: None,
                    },
                    case("t"),
                    1000.5 + now_offset,
                    12.0,
                ),
            ]
        };

        let steady = aggregate(stream(0.0));
        let jumped = aggregate(stream(-3600.0));
        assert_eq!(steady[0].duration, jumped[0].duration);
        assert_eq!(steady[0].duration, TimeDelta::seconds(2));
    }

    #[test]
    fn negative_duration_is_not_clamped() {
        // A stream missing StopCase falls back to the last event, which can
        // precede the StartCase reading on a truncated or reordered stream.
        let results = aggregate(vec![
            event(
                TestEventKind::Error {
                    err: Some("boom".into()),
                },
                case("t"),
                1.0,
                5.0,
            ),
            event(TestEventKind::StartCase, case("t"), 2.0, 6.0),
        ]);
        assert_eq!(results[0].duration, TimeDelta::seconds(-1));
    }

    #[test]
    fn expected_failure_passes_and_unexpected_success_fails() {
        let results = aggregate(vec![
            event(
                TestEventKind::ExpectedFailure {
                    err: Some("Trace".into()),
                },
                case("xf"),
                1.0,
                1.0,
            ),
            event(TestEventKind::UnexpectedSuccess { err: None }, case("us"), 2.0, 2.0),
        ]);

        assert_eq!(results[0].status, TestStatus::Passed);
        assert_eq!(results[1].status, TestStatus::Failed);
        // The expected failure's traceback still shows up as diagnostics.
        assert!(results[0].log.contains("Exceptions:\n\nTrace"));
    }
}
