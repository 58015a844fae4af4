//! Configuration management for reelwav

use crate::error::ConfigError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub scratch: ScratchConfig,
    pub fetch: FetchConfig,
    pub transcode: TranscodeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Path to yt-dlp binary (auto-detected if not set)
    pub yt_dlp: Option<PathBuf>,
    /// Path to FFmpeg binary (auto-detected if not set)
    pub ffmpeg: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScratchConfig {
    /// Root under which every job gets its own directory
    pub directory: PathBuf,
    /// Leave job directories in place after the response (for debugging)
    pub keep: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Canonical reel URL prefix; the shortcode and a trailing slash are appended
    pub reel_base_url: String,
    /// yt-dlp format selector
    pub format: String,
    /// Netscape cookies file handed to yt-dlp
    pub cookies: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Output channel count (follows the source if not set)
    pub channels: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            paths: PathsConfig {
                yt_dlp: None,
                ffmpeg: None,
            },
            scratch: ScratchConfig {
                directory: PathBuf::from("temp"),
                keep: false,
            },
            fetch: FetchConfig {
                reel_base_url: "https://www.instagram.com/reel/".to_string(),
                format: "bv*+ba/b".to_string(),
                cookies: None,
            },
            transcode: TranscodeConfig {
                sample_rate: 44100,
                channels: None,
            },
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Load from default config directory
        if let Some(config_dir) = dirs::config_dir() {
            let default_config = config_dir.join("reelwav/config.toml");
            if default_config.exists() {
                figment = figment.merge(Toml::file(&default_config));
            }
        }

        // Load from specified config file
        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ConfigError::LoadError(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        // Nested keys use a double underscore: REELWAV_SERVER__PORT
        figment = figment.merge(Env::prefixed("REELWAV_").split("__"));

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::LoadError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.transcode.sample_rate == 0 {
            return Err(ConfigError::InvalidValue(
                "transcode.sample_rate must be positive".to_string(),
            ));
        }
        if self.transcode.channels == Some(0) {
            return Err(ConfigError::InvalidValue(
                "transcode.channels must be positive".to_string(),
            ));
        }
        if !self.fetch.reel_base_url.starts_with("http://")
            && !self.fetch.reel_base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue(format!(
                "fetch.reel_base_url must be an http(s) URL, got {:?}",
                self.fetch.reel_base_url
            )));
        }
        Ok(())
    }

    /// Get yt-dlp path, auto-detecting if not configured
    pub fn yt_dlp_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.paths.yt_dlp {
            Ok(path.clone())
        } else {
            which::which("yt-dlp")
                .map_err(|_| ConfigError::InvalidValue("yt-dlp not found in PATH".to_string()))
        }
    }

    /// Get FFmpeg path, auto-detecting if not configured
    pub fn ffmpeg_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.paths.ffmpeg {
            Ok(path.clone())
        } else {
            which::which("ffmpeg")
                .map_err(|_| ConfigError::InvalidValue("ffmpeg not found in PATH".to_string()))
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_service_contract() {
        let config = Config::default();
        assert_eq!(config.scratch.directory, PathBuf::from("temp"));
        assert!(!config.scratch.keep);
        assert_eq!(config.transcode.sample_rate, 44100);
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nport = 9123\n\n[scratch]\nkeep = true\n\n[transcode]\nchannels = 1"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9123);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.scratch.keep);
        assert_eq!(config.transcode.channels, Some(1));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/reelwav.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::LoadError(_)));
    }

    #[test]
    fn rejects_zero_sample_rate() {
        let mut config = Config::default();
        config.transcode.sample_rate = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }
}
