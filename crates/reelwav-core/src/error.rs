//! Error types for reelwav-core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReelWavError>;

#[derive(Error, Debug)]
pub enum ReelWavError {
    #[error("Failed to download reel: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to extract audio: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

/// Coarse classification used by callers that need to map failures
/// onto a response (HTTP status, exit code).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FetchFailed,
    NoAudioTrack,
    TranscodeFailed,
    Internal,
}

impl ReelWavError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReelWavError::Fetch(_) => ErrorKind::FetchFailed,
            ReelWavError::Transcode(TranscodeError::NoAudioTrack) => ErrorKind::NoAudioTrack,
            ReelWavError::Transcode(_) => ErrorKind::TranscodeFailed,
            ReelWavError::Config(_) | ReelWavError::Io(_) | ReelWavError::Pipeline(_) => {
                ErrorKind::Internal
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("yt-dlp not found. Install with: pip install yt-dlp")]
    YtDlpNotFound,

    #[error("yt-dlp failed with exit code {code:?}: {message}")]
    YtDlpFailed { code: Option<i32>, message: String },

    #[error("Invalid reel URL: {0:?}")]
    InvalidUrl(String),

    #[error("Post unavailable or private: {0}")]
    PostUnavailable(String),

    #[error("Login required or rate limited while fetching: {0}")]
    LoginRequired(String),

    #[error("Post {0} contains multiple media items")]
    MultiItemPost(String),

    #[error("Failed to parse post metadata: {0}")]
    MetadataParse(String),

    #[error("Reel downloaded but no video file found")]
    NoVideoFile,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("FFmpeg not found. Install with: apt install ffmpeg")]
    FfmpegNotFound,

    #[error("FFmpeg failed with exit code {code:?}: {message}")]
    FfmpegFailed { code: Option<i32>, message: String },

    #[error("Could not open video container: {0}")]
    Unreadable(String),

    #[error("Video has no audio track")]
    NoAudioTrack,

    #[error("FFmpeg produced no audio frames")]
    EmptyOutput,

    #[error("Invalid WAV output: {0}")]
    InvalidWav(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadError(String),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
