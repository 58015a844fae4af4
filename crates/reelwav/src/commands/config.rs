use anyhow::Result;
use std::path::Path;
use reelwav_core::config::Config;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    println!("reelwav configuration\n");
    println!("{}", toml::to_string_pretty(&config)?);

    if config.paths.yt_dlp.is_none() {
        println!("# paths.yt_dlp: auto-detect");
    }
    if config.paths.ffmpeg.is_none() {
        println!("# paths.ffmpeg: auto-detect");
    }

    // Show config file locations
    println!("\nConfig file locations (in priority order):");
    println!("  1. Environment variables (REELWAV_*, nested keys joined with __)");
    if let Some(p) = config_path {
        println!("  2. {} (specified)", p.display());
    }
    if let Some(config_dir) = dirs::config_dir() {
        println!("  3. {}/reelwav/config.toml", config_dir.display());
    }

    Ok(())
}
