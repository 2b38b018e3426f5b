mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use merakly_core::Session;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Local commands: no backend session
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),
        Command::Columns => commands::columns::handle(&cli.global),
        Command::Completions(args) => {
            use clap::CommandFactory;

            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "merakly", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let cfg = config::load_config_or_default();
            let (profile_name, session_config) = config::resolve_session_config(&cfg, &cli.global)?;
            if session_config.api_key.is_none() {
                return Err(CliError::NoCredentials {
                    profile: profile_name,
                });
            }
            tracing::debug!(
                profile = %profile_name,
                backend = %session_config.backend_url,
                "session configured"
            );

            let session = Session::new(session_config)?;
            commands::dispatch(cmd, &session, &cli.global).await
        }
    }
}
