//! `acs` binary

use acs_cli::{cli, logging, run};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    if let Err(err) = logging::init(matches.get_flag("json-logs"), matches.get_flag("verbose")) {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    match run(&matches).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
