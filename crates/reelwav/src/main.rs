mod args;
mod commands;
mod server;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let filter = match cli.verbose {
        0 => "reelwav=info,reelwav_core=info,tower_http=info",
        1 => "reelwav=debug,reelwav_core=debug,tower_http=debug",
        2 => "reelwav=trace,reelwav_core=trace,tower_http=trace",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Some(Commands::Serve { host, port }) => commands::serve::run(host, port, config_path).await,
        Some(Commands::Convert {
            url,
            output,
            keep_temp,
        }) => commands::convert::run(&url, &output, keep_temp, config_path).await,
        Some(Commands::Doctor) => commands::doctor::run(config_path).await,
        Some(Commands::Config) => commands::config::run(config_path).await,
        None => commands::serve::run(None, None, config_path).await,
    }
}
