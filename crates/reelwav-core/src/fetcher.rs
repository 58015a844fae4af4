//! Reel downloader using yt-dlp

use crate::config::FetchConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Extensions accepted as the downloaded video artifact.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "mkv", "webm"];

const INFO_FILE_NAME: &str = "post.info.json";

/// Anything that can turn a reel URL into a local video file.
#[async_trait]
pub trait ReelSource: Send + Sync {
    /// Download the reel behind `url` into `dest_dir`, which must exist.
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<FetchedVideo, FetchError>;
}

#[derive(Debug, Clone)]
pub struct FetchedVideo {
    pub video_path: PathBuf,
    pub post: PostMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostMetadata {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub ext: Option<String>,
    /// yt-dlp result type: "video" for single items, "playlist" for carousels
    #[serde(rename = "_type", default)]
    pub kind: Option<String>,
}

#[derive(Debug)]
pub struct Fetcher {
    yt_dlp_path: PathBuf,
    ffmpeg_path: Option<PathBuf>,
    reel_base_url: String,
    format: String,
    cookies: Option<PathBuf>,
}

impl Fetcher {
    pub fn new(yt_dlp_path: PathBuf, config: &FetchConfig) -> Self {
        Self {
            yt_dlp_path,
            ffmpeg_path: None,
            reel_base_url: config.reel_base_url.clone(),
            format: config.format.clone(),
            cookies: config.cookies.clone(),
        }
    }

    /// FFmpeg used by yt-dlp to merge separate video and audio streams.
    pub fn with_ffmpeg(mut self, ffmpeg_path: PathBuf) -> Self {
        self.ffmpeg_path = Some(ffmpeg_path);
        self
    }

    pub fn canonical_url(&self, shortcode: &str) -> String {
        format!("{}/{}/", self.reel_base_url.trim_end_matches('/'), shortcode)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.yt_dlp_path);
        cmd.args(["--no-warnings", "--no-progress"]);
        if let Some(ref cookies) = self.cookies {
            cmd.arg("--cookies").arg(cookies);
        }
        cmd
    }

    /// Resolve post metadata by shortcode and keep the raw info JSON in
    /// `dest_dir` for the download step.
    async fn lookup(
        &self,
        shortcode: &str,
        dest_dir: &Path,
    ) -> Result<(PostMetadata, PathBuf), FetchError> {
        let url = self.canonical_url(shortcode);
        debug!("Looking up post {} via {}", shortcode, url);

        let output = self
            .command()
            .args(["--dump-single-json", "--no-playlist"])
            .arg(&url)
            .output()
            .await
            .map_err(spawn_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp lookup stderr: {}", stderr);
            return Err(classify_failure(shortcode, output.status.code(), &stderr));
        }

        let post = parse_metadata(&output.stdout)?;
        let info_path = dest_dir.join(INFO_FILE_NAME);
        tokio::fs::write(&info_path, &output.stdout).await?;

        Ok((post, info_path))
    }

    async fn download(
        &self,
        shortcode: &str,
        info_path: &Path,
        dest_dir: &Path,
    ) -> Result<(), FetchError> {
        let mut cmd = self.command();
        cmd.arg("--load-info-json").arg(info_path);
        cmd.arg("-f").arg(&self.format);
        cmd.args(["--merge-output-format", "mp4"]);
        cmd.arg("--no-overwrites");
        cmd.arg("-o").arg(dest_dir.join("%(id)s.%(ext)s"));
        if let Some(ref ffmpeg) = self.ffmpeg_path {
            cmd.arg("--ffmpeg-location").arg(ffmpeg);
        }

        let output = cmd.output().await.map_err(spawn_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp download stderr: {}", stderr);
            return Err(classify_failure(shortcode, output.status.code(), &stderr));
        }

        Ok(())
    }
}

#[async_trait]
impl ReelSource for Fetcher {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<FetchedVideo, FetchError> {
        let shortcode = derive_shortcode(url)?;
        info!("Fetching reel {}", shortcode);

        let (post, info_path) = self.lookup(&shortcode, dest_dir).await?;
        self.download(&shortcode, &info_path, dest_dir).await?;

        let video_path = find_video_file(dest_dir).await?;
        debug!("Downloaded {} to {}", post.id, video_path.display());

        Ok(FetchedVideo { video_path, post })
    }
}

/// Take the final path segment of a reel URL as its shortcode.
///
/// Query strings, fragments and trailing slashes are ignored. The segment
/// must look like a shortcode (ASCII letters, digits, `-`, `_`).
pub fn derive_shortcode(url: &str) -> Result<String, FetchError> {
    let trimmed = url.trim();
    let path = trimmed.split(['?', '#']).next().unwrap_or_default();
    let segment = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    let valid = !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(segment.to_string())
    } else {
        Err(FetchError::InvalidUrl(trimmed.to_string()))
    }
}

fn parse_metadata(stdout: &[u8]) -> Result<PostMetadata, FetchError> {
    let post: PostMetadata =
        serde_json::from_slice(stdout).map_err(|e| FetchError::MetadataParse(e.to_string()))?;

    if post.kind.as_deref() == Some("playlist") {
        return Err(FetchError::MultiItemPost(post.id));
    }

    Ok(post)
}

/// Pick the downloaded video: candidates sorted by file name, first wins.
pub async fn find_video_file(dir: &Path) -> Result<PathBuf, FetchError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut candidates = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_video = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_video && entry.file_type().await?.is_file() {
            candidates.push(path);
        }
    }

    candidates.sort();
    candidates.into_iter().next().ok_or(FetchError::NoVideoFile)
}

fn spawn_error(e: std::io::Error) -> FetchError {
    if e.kind() == std::io::ErrorKind::NotFound {
        FetchError::YtDlpNotFound
    } else {
        FetchError::Io(e)
    }
}

fn classify_failure(shortcode: &str, code: Option<i32>, stderr: &str) -> FetchError {
    let message = last_error_line(stderr);
    let lower = stderr.to_lowercase();

    // yt-dlp reports throttling as "not available, rate-limit reached or login required"
    if lower.contains("login required")
        || lower.contains("rate-limit")
        || lower.contains("rate limit")
        || lower.contains("http error 429")
    {
        return FetchError::LoginRequired(message);
    }
    if lower.contains("private")
        || lower.contains("not available")
        || lower.contains("isn't available")
        || lower.contains("unavailable")
        || lower.contains("does not exist")
        || lower.contains("http error 404")
    {
        return FetchError::PostUnavailable(shortcode.to_string());
    }
    if lower.contains("unsupported url") || lower.contains("is not a valid url") {
        return FetchError::InvalidUrl(shortcode.to_string());
    }

    FetchError::YtDlpFailed { code, message }
}

fn last_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("no output")
        .trim_start_matches("ERROR: ")
        .to_string()
}
