mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use spectra_core::Broker;

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
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(mut cli: Cli) -> Result<(), CliError> {
    // Config commands do not need a broker
    if let Command::Config(args) = cli.command {
        return commands::config_cmd::handle(args, &cli.global);
    }

    let cfg = config::load(&cli.global)?;
    cli.global.output = Some(config::output_format(&cli.global, &cfg));

    let broker_config = config::broker_config(&cli.global, &cfg)?;
    let broker = Broker::init(&broker_config).await;

    tracing::debug!(
        command = ?cli.command,
        backends = broker_config.backends.len(),
        "dispatching command"
    );
    commands::dispatch(cli.command, &broker, &cli.global).await
}
