use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelwav")]
#[command(author, version, about = "Reel to WAV micro-service")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path
    #[arg(long, global = true, env = "REELWAV_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service (default)
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Convert a single reel locally, without the HTTP service
    Convert {
        /// Reel URL, e.g. https://www.instagram.com/reel/<shortcode>/
        url: String,

        /// Where to write the WAV file
        #[arg(short, long, default_value = "audio.wav")]
        output: PathBuf,

        /// Keep the job directory (for debugging)
        #[arg(long)]
        keep_temp: bool,
    },

    /// Check external tools
    Doctor,

    /// Show configuration
    Config,
}
