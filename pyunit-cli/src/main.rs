// Copyright (c) The pyunit-harness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::Parser;
use color_eyre::Result;

mod dispatch;
mod output;
mod reporters;

use dispatch::PyUnitApp;

fn main() -> Result<()> {
    color_eyre::install()?;

    let app = PyUnitApp::parse();
    let code = app.exec()?;
    std::process::exit(code);
}
