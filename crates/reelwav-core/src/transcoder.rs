//! Audio track extraction using FFmpeg

use crate::config::TranscodeConfig;
use crate::error::TranscodeError;
use crate::wav::{self, WavInfo};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Anything that can write the audio track of a video file as WAV.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Write the primary audio track of `video` to `dest` (whose parent must
    /// exist) and return the header of the written file.
    async fn extract(&self, video: &Path, dest: &Path) -> Result<WavInfo, TranscodeError>;
}

#[derive(Debug)]
pub struct Transcoder {
    ffmpeg_path: PathBuf,
    sample_rate: u32,
    channels: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub duration: Option<f64>,
    pub audio: Option<AudioStreamInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioStreamInfo {
    pub codec: String,
    pub sample_rate: u32,
    pub channel_layout: String,
}

impl AudioStreamInfo {
    pub fn channels(&self) -> u16 {
        match self.channel_layout.as_str() {
            "mono" => 1,
            "stereo" => 2,
            layout if layout.starts_with("5.1") => 6,
            layout if layout.starts_with("7.1") => 8,
            layout => layout
                .strip_suffix(" channels")
                .and_then(|n| n.parse().ok())
                .unwrap_or(2),
        }
    }
}

impl Transcoder {
    pub fn new(ffmpeg_path: PathBuf, config: &TranscodeConfig) -> Self {
        Self {
            ffmpeg_path,
            sample_rate: config.sample_rate,
            channels: config.channels,
        }
    }

    /// Open the container and describe its duration and first audio stream.
    pub async fn probe(&self, input: &Path) -> Result<MediaInfo, TranscodeError> {
        // With no output file ffmpeg prints the stream table and exits non-zero
        let output = Command::new(&self.ffmpeg_path)
            .arg("-hide_banner")
            .arg("-i")
            .arg(input)
            .output()
            .await
            .map_err(spawn_error)?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        parse_probe(&stderr)
    }

    async fn run_extract(
        &self,
        input: &Path,
        output: &Path,
        source: &AudioStreamInfo,
    ) -> Result<(), TranscodeError> {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.args(["-hide_banner", "-loglevel", "error"]);
        cmd.arg("-i").arg(input);
        // First audio stream only, no video
        cmd.args(["-vn", "-map", "0:a:0"]);
        cmd.args(["-c:a", "pcm_s16le"]);
        cmd.arg("-ar").arg(self.sample_rate.to_string());
        if let Some(channels) = self.channels {
            cmd.arg("-ac").arg(channels.to_string());
        }
        cmd.arg("-y").arg(output);

        debug!(
            "Extracting {} {} Hz {} to {} Hz PCM",
            source.codec, source.sample_rate, source.channel_layout, self.sample_rate
        );

        let result = cmd.output().await.map_err(spawn_error)?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            debug!("ffmpeg stderr: {}", stderr);
            if stderr.contains("matches no streams") {
                return Err(TranscodeError::NoAudioTrack);
            }
            return Err(TranscodeError::FfmpegFailed {
                code: result.status.code(),
                message: last_line(&stderr),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl AudioExtractor for Transcoder {
    async fn extract(&self, video: &Path, dest: &Path) -> Result<WavInfo, TranscodeError> {
        info!("Extracting audio from {}", video.display());

        let media = self.probe(video).await?;
        let audio = media.audio.ok_or(TranscodeError::NoAudioTrack)?;

        self.run_extract(video, dest, &audio).await?;

        let path = dest.to_path_buf();
        let info = tokio::task::spawn_blocking(move || wav::inspect(&path))
            .await
            .map_err(|e| TranscodeError::Io(std::io::Error::other(e)))??;

        if info.frames == 0 {
            return Err(TranscodeError::EmptyOutput);
        }

        debug!(
            "Wrote {} ({:.2}s, {} Hz, {} ch)",
            dest.display(),
            info.duration_secs(),
            info.sample_rate,
            info.channels
        );
        Ok(info)
    }
}

fn spawn_error(e: std::io::Error) -> TranscodeError {
    if e.kind() == std::io::ErrorKind::NotFound {
        TranscodeError::FfmpegNotFound
    } else {
        TranscodeError::Io(e)
    }
}

fn last_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("no output")
        .to_string()
}

/// Parse the stream table ffmpeg prints for `-i <input>`.
pub fn parse_probe(ffmpeg_output: &str) -> Result<MediaInfo, TranscodeError> {
    if !ffmpeg_output.contains("Input #0") {
        return Err(TranscodeError::Unreadable(last_line(ffmpeg_output)));
    }

    Ok(MediaInfo {
        duration: parse_duration(ffmpeg_output),
        audio: parse_audio_stream(ffmpeg_output),
    })
}

fn parse_audio_stream(ffmpeg_output: &str) -> Option<AudioStreamInfo> {
    // Stream #0:1[0x2](und): Audio: aac (LC) (mp4a / 0x6134706D), 44100 Hz, stereo, fltp, 128 kb/s
    let re = Regex::new(r"Stream #\d+:\d+\S*: Audio: (\w+)[^\n]*?, (\d+) Hz, ([^,\n]+)").ok()?;
    let caps = re.captures(ffmpeg_output)?;

    Some(AudioStreamInfo {
        codec: caps.get(1)?.as_str().to_string(),
        sample_rate: caps.get(2)?.as_str().parse().ok()?,
        channel_layout: caps.get(3)?.as_str().trim().to_string(),
    })
}

fn parse_duration(ffmpeg_output: &str) -> Option<f64> {
    // Look for pattern like "Duration: 00:00:10.03"
    let re = Regex::new(r"Duration: (\d+):(\d+):(\d+)\.(\d+)").ok()?;
    let caps = re.captures(ffmpeg_output)?;

    let hours: f64 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: f64 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: f64 = caps.get(3)?.as_str().parse().ok()?;
    let centiseconds: f64 = caps.get(4)?.as_str().parse().ok()?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds + centiseconds / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REEL_WITH_AUDIO: &str = "\
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'temp/ab12/ABC123.mp4':
  Metadata:
    major_brand     : isom
  Duration: 00:00:10.03, start: 0.000000, bitrate: 1203 kb/s
  Stream #0:0[0x1](und): Video: h264 (High) (avc1 / 0x31637661), yuv420p, 720x1280, 1068 kb/s, 30 fps (default)
  Stream #0:1[0x2](und): Audio: aac (LC) (mp4a / 0x6134706D), 44100 Hz, mono, fltp, 128 kb/s (default)
At least one output file must be specified
";

    const SILENT_REEL: &str = "\
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'temp/ab12/SILENT.mp4':
  Duration: 00:01:02.50, start: 0.000000, bitrate: 900 kb/s
  Stream #0:0[0x1](und): Video: h264 (Main) (avc1 / 0x31637661), yuv420p, 720x1280, 890 kb/s, 30 fps (default)
At least one output file must be specified
";

    #[test]
    fn parses_audio_stream_and_duration() {
        let info = parse_probe(REEL_WITH_AUDIO).unwrap();
        assert!((info.duration.unwrap() - 10.03).abs() < 1e-9);

        let audio = info.audio.unwrap();
        assert_eq!(audio.codec, "aac");
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.channel_layout, "mono");
        assert_eq!(audio.channels(), 1);
    }

    #[test]
    fn video_only_container_has_no_audio() {
        let info = parse_probe(SILENT_REEL).unwrap();
        assert_eq!(info.duration, Some(62.5));
        assert!(info.audio.is_none());
    }

    #[test]
    fn unreadable_input_is_reported() {
        let stderr = "temp/ab12/broken.mp4: Invalid data found when processing input\n";
        match parse_probe(stderr) {
            Err(TranscodeError::Unreadable(msg)) => assert!(msg.contains("Invalid data")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn channel_layouts() {
        let stream = |layout: &str| AudioStreamInfo {
            codec: "aac".into(),
            sample_rate: 48000,
            channel_layout: layout.into(),
        };
        assert_eq!(stream("stereo").channels(), 2);
        assert_eq!(stream("5.1(side)").channels(), 6);
        assert_eq!(stream("4 channels").channels(), 4);
    }

    #[tokio::test]
    async fn missing_binary_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = Transcoder::new(
            dir.path().join("no-such-ffmpeg"),
            &crate::Config::default().transcode,
        );

        let err = transcoder
            .extract(&dir.path().join("in.mp4"), &dir.path().join("audio.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::FfmpegNotFound));
    }
}
