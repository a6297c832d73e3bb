//! Binary entry point for the Sirius leaderboard server.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use sirius::config::Config;
use sirius::error::{ConfigError, SiriusError};
use sirius::logging;
use sirius::App;

#[derive(Parser, Debug)]
#[command(
    name = "siriusd",
    version,
    about = "In-memory ranked leaderboard server"
)]
struct Cli {
    /// TCP listen address for clients; overrides [server].client_addr in the config file.
    #[arg(long)]
    clientaddr: Option<String>,

    /// Reserved for future inter-server traffic; accepted but unused.
    #[arg(long)]
    serveraddr: Option<String>,

    /// Path to the TOML rank-topology config file.
    #[arg(long)]
    config: PathBuf,

    /// tracing EnvFilter directive, overridden by RUST_LOG when set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = logging::init_logging(&cli.log_level) {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), SiriusError> {
    let mut config = Config::from_file(&cli.config)?;
    if let Some(clientaddr) = cli.serveraddr.as_ref() {
        tracing::debug!(serveraddr = %clientaddr, "serveraddr accepted but not yet used");
    }
    if cli.clientaddr.is_some() {
        config.server.client_addr = cli.clientaddr;
    }
    if config.server.client_addr.is_none() {
        return Err(SiriusError::Config(ConfigError::MissingClientAddr));
    }
    config.validate()?;

    let app = App::new(config);
    app.run().await
}
