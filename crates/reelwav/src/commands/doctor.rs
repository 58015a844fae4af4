use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Command;

use reelwav_core::Config;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    println!("reelwav dependency check\n");

    let mut all_ok = true;

    // Check yt-dlp
    print!("yt-dlp:  ");
    all_ok &= report(
        config.yt_dlp_path().ok(),
        &["--version"],
        |stdout| stdout.trim().to_string(),
        "pip install yt-dlp",
    );

    // Check FFmpeg
    print!("ffmpeg:  ");
    all_ok &= report(
        config.ffmpeg_path().ok(),
        &["-version"],
        // "ffmpeg version 6.1.1 Copyright ..." -> "6.1.1"
        |stdout| {
            stdout
                .lines()
                .next()
                .and_then(|line| line.split_whitespace().nth(2))
                .unwrap_or("unknown")
                .to_string()
        },
        "apt install ffmpeg (or brew install ffmpeg)",
    );

    // Check scratch directory
    print!("scratch: ");
    let scratch = &config.scratch.directory;
    match std::fs::create_dir_all(scratch) {
        Ok(()) => println!("OK ({})", scratch.display()),
        Err(e) => {
            println!("NOT WRITABLE ({}: {})", scratch.display(), e);
            all_ok = false;
        }
    }

    println!();
    if all_ok {
        println!("All dependencies OK!");
    } else {
        println!("Some dependencies are missing. See above for installation instructions.");
    }

    Ok(())
}

fn report(
    path: Option<PathBuf>,
    version_args: &[&str],
    parse_version: impl Fn(&str) -> String,
    install_hint: &str,
) -> bool {
    let Some(path) = path else {
        println!("NOT FOUND");
        println!("         Install with: {}", install_hint);
        return false;
    };

    match Command::new(&path).args(version_args).output() {
        Ok(out) if out.status.success() => {
            let version = parse_version(&String::from_utf8_lossy(&out.stdout));
            println!("OK ({}, {})", version, path.display());
            true
        }
        _ => {
            println!("FOUND at {} but failed to get version", path.display());
            false
        }
    }
}
