//! reelwav-core: download a reel and extract its audio track as WAV

pub mod config;
pub mod error;
pub mod fetcher;
pub mod job;
pub mod pipeline;
pub mod transcoder;
pub mod wav;

pub use config::Config;
pub use error::{ErrorKind, ReelWavError, Result};
pub use job::Job;
pub use pipeline::{ConvertedAudio, Pipeline, PipelineStage};
