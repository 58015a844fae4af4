use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

use reelwav_core::{job, Config, Job, Pipeline, PipelineStage};

pub async fn run(
    url: &str,
    output: &Path,
    keep_temp: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = Config::load(config_path)?;

    let scratch_root = config.scratch.directory.clone();
    job::ensure_scratch_root(&scratch_root).await?;
    let job = Job::create(&scratch_root)
        .await?
        .keep(keep_temp || config.scratch.keep);

    let pipeline = Pipeline::from_config(&config)?;

    // Create progress channel
    let (tx, mut rx) = mpsc::channel(32);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));

    // Spawn progress handler
    let progress_handle = tokio::spawn(async move {
        while let Some(stage) = rx.recv().await {
            match stage {
                PipelineStage::Fetching { url } => {
                    pb.set_message(format!("Downloading {}", truncate(&url, 60)));
                }
                PipelineStage::Fetched { post_id, title } => {
                    let label = title.unwrap_or(post_id);
                    pb.set_message(format!("Downloaded: {}", truncate(&label, 50)));
                }
                PipelineStage::Transcoding => {
                    pb.set_message("Extracting audio to WAV...");
                }
                PipelineStage::Complete { duration, .. } => {
                    pb.finish_with_message(format!("Done ({:.1}s)", duration.as_secs_f32()));
                }
                PipelineStage::Failed { stage, error } => {
                    pb.abandon_with_message(format!("Failed at {}: {}", stage, error));
                }
            }
        }
    });

    let result = pipeline.run(url, &job, Some(&tx)).await;
    drop(tx);

    // Wait for progress handler
    progress_handle.await?;

    let converted = result?;
    tokio::fs::copy(&converted.path, output)
        .await
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "\nWAV written to {} ({:.2}s, {} Hz, {} ch)",
        output.display(),
        converted.wav.duration_secs(),
        converted.wav.sample_rate,
        converted.wav.channels
    );
    if keep_temp {
        println!("Job files kept at: {}", job.dir().display());
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
