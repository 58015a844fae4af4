//! Pipeline orchestration: fetch the reel, then extract its audio

use crate::error::{ReelWavError, Result};
use crate::fetcher::{Fetcher, PostMetadata, ReelSource};
use crate::job::Job;
use crate::transcoder::{AudioExtractor, Transcoder};
use crate::wav::WavInfo;
use crate::Config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Pipeline progress stages
#[derive(Debug, Clone)]
pub enum PipelineStage {
    Fetching { url: String },
    Fetched { post_id: String, title: Option<String> },
    Transcoding,
    Complete { output: PathBuf, duration: Duration },
    Failed { stage: String, error: String },
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct ConvertedAudio {
    pub path: PathBuf,
    pub wav: WavInfo,
    pub post: PostMetadata,
}

/// Fetcher and transcoder composed over a job directory.
#[derive(Clone)]
pub struct Pipeline {
    source: Arc<dyn ReelSource>,
    extractor: Arc<dyn AudioExtractor>,
}

impl Pipeline {
    pub fn new(source: Arc<dyn ReelSource>, extractor: Arc<dyn AudioExtractor>) -> Self {
        Self { source, extractor }
    }

    /// Build the yt-dlp/FFmpeg pipeline described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let yt_dlp_path = config.yt_dlp_path()?;
        let ffmpeg_path = config.ffmpeg_path()?;
        debug!(
            "Using yt-dlp at {} and ffmpeg at {}",
            yt_dlp_path.display(),
            ffmpeg_path.display()
        );

        let fetcher = Fetcher::new(yt_dlp_path, &config.fetch).with_ffmpeg(ffmpeg_path.clone());
        let transcoder = Transcoder::new(ffmpeg_path, &config.transcode);
        Ok(Self::new(Arc::new(fetcher), Arc::new(transcoder)))
    }

    /// Convert `url` into `<job dir>/audio.wav`.
    pub async fn run(
        &self,
        url: &str,
        job: &Job,
        progress: Option<&mpsc::Sender<PipelineStage>>,
    ) -> Result<ConvertedAudio> {
        let start_time = Instant::now();
        info!("Starting job {} for: {}", job.id(), url);

        // 1. Fetch
        report(progress, PipelineStage::Fetching { url: url.to_string() }).await;
        let fetched = match self.source.fetch(url, job.dir()).await {
            Ok(fetched) => fetched,
            Err(e) => return Err(fail(progress, "fetch", e.into())),
        };
        report(
            progress,
            PipelineStage::Fetched {
                post_id: fetched.post.id.clone(),
                title: fetched.post.title.clone(),
            },
        )
        .await;

        // 2. Extract audio
        report(progress, PipelineStage::Transcoding).await;
        let output = job.audio_path();
        let wav = match self.extractor.extract(&fetched.video_path, &output).await {
            Ok(wav) => wav,
            Err(e) => return Err(fail(progress, "transcode", e.into())),
        };

        let duration = start_time.elapsed();
        info!(
            "Job {} complete: {:.2}s of audio ({:.1}s)",
            job.id(),
            wav.duration_secs(),
            duration.as_secs_f32()
        );
        report(
            progress,
            PipelineStage::Complete {
                output: output.clone(),
                duration,
            },
        )
        .await;

        Ok(ConvertedAudio {
            path: output,
            wav,
            post: fetched.post,
        })
    }
}

async fn report(progress: Option<&mpsc::Sender<PipelineStage>>, stage: PipelineStage) {
    if let Some(tx) = progress {
        let _ = tx.send(stage).await;
    }
}

fn fail(
    progress: Option<&mpsc::Sender<PipelineStage>>,
    stage: &str,
    error: ReelWavError,
) -> ReelWavError {
    warn!("Pipeline failed at {}: {}", stage, error);
    if let Some(tx) = progress {
        let _ = tx.try_send(PipelineStage::Failed {
            stage: stage.to_string(),
            error: error.to_string(),
        });
    }
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, FetchError, TranscodeError};
    use crate::fetcher::FetchedVideo;
    use async_trait::async_trait;
    use std::path::Path;

    struct FakeSource {
        fail: bool,
    }

    #[async_trait]
    impl ReelSource for FakeSource {
        async fn fetch(
            &self,
            url: &str,
            dest_dir: &Path,
        ) -> std::result::Result<FetchedVideo, FetchError> {
            if self.fail {
                return Err(FetchError::PostUnavailable(url.to_string()));
            }
            let video_path = dest_dir.join("ABC123.mp4");
            tokio::fs::write(&video_path, b"video").await?;
            Ok(FetchedVideo {
                video_path,
                post: PostMetadata {
                    id: "ABC123".to_string(),
                    title: Some("a reel".to_string()),
                    ..Default::default()
                },
            })
        }
    }

    struct FakeExtractor {
        has_audio: bool,
    }

    #[async_trait]
    impl AudioExtractor for FakeExtractor {
        async fn extract(
            &self,
            video: &Path,
            dest: &Path,
        ) -> std::result::Result<WavInfo, TranscodeError> {
            assert!(video.exists());
            if !self.has_audio {
                return Err(TranscodeError::NoAudioTrack);
            }
            tokio::fs::write(dest, b"RIFF").await?;
            Ok(WavInfo {
                sample_rate: 44100,
                channels: 1,
                bits_per_sample: 16,
                frames: 441000,
            })
        }
    }

    fn pipeline(fetch_fails: bool, has_audio: bool) -> Pipeline {
        Pipeline::new(
            Arc::new(FakeSource { fail: fetch_fails }),
            Arc::new(FakeExtractor { has_audio }),
        )
    }

    #[tokio::test]
    async fn writes_audio_into_job_directory() {
        let root = tempfile::tempdir().unwrap();
        let job = Job::create(root.path()).await.unwrap();
        let (tx, mut rx) = mpsc::channel(16);

        let converted = pipeline(false, true)
            .run("https://www.instagram.com/reel/ABC123/", &job, Some(&tx))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(converted.path, job.dir().join("audio.wav"));
        assert!(converted.path.exists());
        assert_eq!(converted.post.id, "ABC123");
        assert!((converted.wav.duration_secs() - 10.0).abs() < 1e-9);

        let mut stages = Vec::new();
        while let Some(stage) = rx.recv().await {
            stages.push(stage);
        }
        assert!(matches!(stages.first(), Some(PipelineStage::Fetching { .. })));
        assert!(matches!(stages.last(), Some(PipelineStage::Complete { .. })));
    }

    #[tokio::test]
    async fn fetch_failure_is_classified() {
        let root = tempfile::tempdir().unwrap();
        let job = Job::create(root.path()).await.unwrap();
        let (tx, mut rx) = mpsc::channel(16);

        let err = pipeline(true, true)
            .run("https://www.instagram.com/reel/DOESNOTEXIST/", &job, Some(&tx))
            .await
            .unwrap_err();
        drop(tx);

        assert_eq!(err.kind(), ErrorKind::FetchFailed);
        assert!(!job.audio_path().exists());

        let mut last = None;
        while let Some(stage) = rx.recv().await {
            last = Some(stage);
        }
        assert!(matches!(last, Some(PipelineStage::Failed { stage, .. }) if stage == "fetch"));
    }

    #[tokio::test]
    async fn missing_audio_track_is_classified() {
        let root = tempfile::tempdir().unwrap();
        let job = Job::create(root.path()).await.unwrap();

        let err = pipeline(false, false)
            .run("https://www.instagram.com/reel/SILENT/", &job, None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NoAudioTrack);
    }
}
