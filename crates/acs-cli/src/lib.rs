//! ACS command line
//!
//! ```text
//! acs validate defs/*.yaml
//! acs plan defs/*.yaml --state-dir /var/lib/acs
//! acs provision defs/*.yaml --config acs.toml
//! acs state --state-dir /var/lib/acs --json
//! ```

pub mod commands;
pub mod input;
pub mod logging;

use anyhow::{anyhow, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

fn files_arg() -> Arg {
    Arg::new("files")
        .required(true)
        .num_args(1..)
        .value_parser(value_parser!(PathBuf))
        .help("Submission documents (YAML, or JSON by extension), merged in order")
}

fn config_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_parser(value_parser!(PathBuf))
                .help("TOML service configuration"),
        )
        .arg(
            Arg::new("state-dir")
                .long("state-dir")
                .value_parser(value_parser!(PathBuf))
                .help("Directory of the file-backed stores (overrides the configuration)"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the result as JSON"),
        )
}

/// Command line definition
#[must_use]
pub fn cli() -> Command {
    Command::new("acs")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Assurance configuration service: validate, plan and provision KPI definitions")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging unless RUST_LOG is set"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("validate")
                .about("Parse, merge and validate submission documents")
                .arg(files_arg()),
        )
        .subcommand(config_args(
            Command::new("plan")
                .about("Compile affected KPIs without touching downstream services")
                .arg(files_arg()),
        ))
        .subcommand(config_args(
            Command::new("provision")
                .about("Persist a submission and provision affected profiles")
                .arg(files_arg())
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Plan only"),
                ),
        ))
        .subcommand(config_args(
            Command::new("state").about("Show recorded provisioning runs"),
        ))
}

fn files(args: &ArgMatches) -> Vec<PathBuf> {
    args.get_many::<PathBuf>("files")
        .map(|files| files.cloned().collect())
        .unwrap_or_default()
}

fn config(args: &ArgMatches) -> Result<acs_provision::ProvisioningConfig> {
    let dry_run = args
        .try_get_one::<bool>("dry-run")
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false);
    commands::load_config(
        args.get_one::<PathBuf>("config").map(PathBuf::as_path),
        args.get_one::<PathBuf>("state-dir").map(PathBuf::as_path),
        dry_run,
    )
}

/// Run the parsed command, returning what to print on stdout
pub async fn run(matches: &ArgMatches) -> Result<String> {
    match matches.subcommand() {
        Some(("validate", args)) => Ok(commands::validate(&files(args))?.to_string()),
        Some(("plan", args)) => {
            let service = commands::service(&config(args)?)?;
            let plan = commands::plan(&service, &files(args))?;
            if args.get_flag("json") {
                commands::plan_json(&plan)
            } else {
                Ok(commands::render_plan(&plan))
            }
        }
        Some(("provision", args)) => {
            let service = commands::service(&config(args)?)?;
            let outcome = commands::provision(&service, &files(args)).await?;
            if args.get_flag("json") {
                commands::outcome_json(&outcome)
            } else {
                Ok(commands::render_outcome(&outcome))
            }
        }
        Some(("state", args)) => {
            let stores = acs_provision::Stores::from_config(&config(args)?)?;
            let history = commands::history(&stores)?;
            if args.get_flag("json") {
                Ok(serde_json::to_string_pretty(&history)?)
            } else {
                Ok(commands::render_history(&history))
            }
        }
        Some((other, _)) => Err(anyhow!("unknown command {other}")),
        None => Err(anyhow!("no command given")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn provision_accepts_several_files() {
        let matches = cli()
            .try_get_matches_from(["acs", "provision", "a.yaml", "b.json", "--dry-run", "-v"])
            .unwrap();
        assert!(matches.get_flag("verbose"));
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "provision");
        assert_eq!(files(args), vec![PathBuf::from("a.yaml"), PathBuf::from("b.json")]);
        assert!(config(args).unwrap().dry_run);
    }

    #[test]
    fn plan_requires_files() {
        assert!(cli().try_get_matches_from(["acs", "plan"]).is_err());
    }

    #[tokio::test]
    async fn state_of_empty_directory_has_no_runs() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().to_str().unwrap();
        let matches = cli()
            .try_get_matches_from(["acs", "state", "--state-dir", state_dir])
            .unwrap();
        assert_eq!(run(&matches).await.unwrap(), "no provisioning runs");
    }
}
