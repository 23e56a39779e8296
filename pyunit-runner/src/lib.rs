// Copyright (c) The pyunit-harness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core runner logic for pyunit.
//!
//! This crate spawns a Python interpreter on a bundled unittest runner
//! script, decodes the structured event stream the script emits on stdout,
//! and reduces it into one result per test case:
//!
//! * [`events`] -- the wire data model shared with the runner script.
//! * [`protocol`] -- sentinel-line framing for stdout.
//! * [`aggregator`] -- grouping by test-case identity and per-case
//!   reduction to a status, log, start time and duration.
//! * [`runner`] -- process orchestration for one run.
//! * [`recorder`] -- sinks that receive the reduced results.
//!
//! For the command-line interface, see the `pyunit-cli` crate.

pub mod aggregator;
pub mod errors;
pub mod events;
pub mod protocol;
pub mod recorder;
pub mod runner;
pub mod signal;
