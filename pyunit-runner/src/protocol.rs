// Copyright (c) The pyunit-harness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sentinel-line framing for the event stream.
//!
//! The runner script emits one event per stdout line: the sentinel prefix
//! followed immediately by a JSON object, with no separator. The prefix
//! match is the contract boundary -- any line that doesn't start with it is
//! ordinary output and passes through untouched.

use crate::{errors::EventParseError, events::TestEvent};

/// The literal prefix marking an event line on the runner's stdout.
pub const EVENT_LINE_SENTINEL: &str = "__BuildMasterPythonTestRunner__";

/// Classifies one stdout line from the test process.
///
/// Returns `None` for a line that does not carry an event (it should be
/// forwarded to the host log verbatim). For a sentinel-prefixed line,
/// returns the decoded event, or an [`EventParseError`] if the JSON payload
/// is corrupt -- decode failures are fatal to the run, never skipped.
pub fn parse_event_line(line: &str) -> Option<Result<TestEvent, EventParseError>> {
    let payload = line.strip_prefix(EVENT_LINE_SENTINEL)?;
    Some(serde_json::from_str(payload).map_err(|error| EventParseError::new(line, error)))
}
