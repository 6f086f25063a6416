//! Vayu Build - orchestrates the native engine and desktop app builds.
//!
//! Runs the pipeline on the tokio runtime, racing it against Ctrl-C, and maps
//! the outcome to the process exit code.

use std::process;
use vayu_build::cli::{self, Args};
use vayu_build::error::BuildError;

/// Resolves on the first Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    let args = Args::parse_args();
    let output = cli::output_for(&args);

    let result = tokio::select! {
        result = cli::run(args, output.clone()) => result,
        _ = interrupted() => {
            let _ = output.blank();
            Err(BuildError::Interrupted)
        }
    };

    let exit_code = match result {
        Ok(()) => 0,
        Err(e) => {
            log::debug!("Run failed: {:?}", e);
            cli::report_error(&output, &e);
            1
        }
    };

    process::exit(exit_code);
}
