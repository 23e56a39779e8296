// Copyright (c) The pyunit-harness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::{Args, ValueEnum};
use std::sync::Once;
use tracing_subscriber::{
    Layer,
    filter::{LevelFilter, Targets},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

static INIT_LOGGER: Once = Once::new();

#[derive(Copy, Clone, Debug, Args)]
pub(crate) struct OutputOpts {
    /// When to colorize output
    #[arg(
        long,
        value_enum,
        global = true,
        value_name = "WHEN",
        default_value_t = Color::Auto
    )]
    pub(crate) color: Color,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Color {
    Auto,
    Always,
    Never,
}

impl Color {
    pub(crate) fn should_colorize(self, stream: supports_color::Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

/// Initializes the global tracing subscriber.
///
/// Log lines from the library (forwarded test-process output and exit-code
/// errors) go to stderr. `PYUNIT_LOG` selects targets and levels; the
/// default is info.
pub(crate) fn init_logging() {
    INIT_LOGGER.call_once(|| {
        let level_str = std::env::var("PYUNIT_LOG").unwrap_or_default();

        // If the level string is empty, use the standard level filter instead.
        let targets = if level_str.is_empty() {
            Targets::new().with_default(LevelFilter::INFO)
        } else {
            level_str.parse().expect("unable to parse PYUNIT_LOG")
        };

        let layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(targets);

        tracing_subscriber::registry().with(layer).init();
    });
}
