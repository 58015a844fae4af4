//! WAV header inspection

use crate::error::TranscodeError;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Number of sample frames (one sample per channel)
    pub frames: u32,
}

impl WavInfo {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }
}

/// Read the header of a WAV file.
///
/// Blocking; call through `spawn_blocking` from async code.
pub fn inspect(path: &Path) -> Result<WavInfo, TranscodeError> {
    let reader = hound::WavReader::open(path).map_err(|e| match e {
        hound::Error::IoError(io) => TranscodeError::Io(io),
        other => TranscodeError::InvalidWav(other.to_string()),
    })?;

    let spec = reader.spec();
    Ok(WavInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        frames: reader.duration(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tone(path: &Path, sample_rate: u32, channels: u16, secs: f32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let frames = (sample_rate as f32 * secs) as u32;
        for n in 0..frames {
            let t = n as f32 / sample_rate as f32;
            let s = ((t * 440.0 * std::f32::consts::TAU).sin() * 8000.0) as i16;
            for _ in 0..channels {
                writer.write_sample(s).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn reads_header_and_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.wav");
        write_tone(&path, 44100, 2, 1.5);

        let info = inspect(&path).unwrap();
        assert_eq!(info.sample_rate, 44100);
        assert_eq!(info.channels, 2);
        assert_eq!(info.bits_per_sample, 16);
        assert_eq!(info.frames, 66150);
        assert!((info.duration_secs() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn rejects_non_wav_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.wav");
        std::fs::write(&path, b"ftypisom this is an mp4 header").unwrap();

        assert!(matches!(inspect(&path), Err(TranscodeError::InvalidWav(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = inspect(&dir.path().join("absent.wav")).unwrap_err();
        assert!(matches!(err, TranscodeError::Io(_)));
    }
}
