#![forbid(unsafe_code)]

use clap::Parser;
use qc_server::{Cli, ServerConfig, logging};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ServerConfig::resolve(Cli::parse()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("qc_server: {err}");
            return ExitCode::from(2);
        }
    };
    logging::init(config.log_json);

    match qc_server::serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "server failed");
            ExitCode::FAILURE
        }
    }
}
