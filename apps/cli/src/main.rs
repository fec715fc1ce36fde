// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use clap::Parser;

use ccapi_cli::{cli, logging};

// Polling is sequential, so a single-threaded runtime is enough.
#[tokio::main(flavor = "current_thread")]
// Allow eprintln for errors that may occur before logging is initialized
#[allow(clippy::disallowed_macros)]
async fn main() {
    let cli = cli::Cli::parse();
    if let Err(e) = cli::handle_command(&cli, logging::init_logging).await {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
