//! Worker configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sticker_media::VideoJobConfig;
use sticker_models::settings::{DEFAULT_AUTHOR_NAME, DEFAULT_PACK_NAME};
use sticker_models::{GlobalSettings, SquareVideoParams};

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum messages processed at once
    pub max_concurrent_messages: usize,
    /// Directory for temporary video files
    pub work_dir: PathBuf,
    /// Directory holding the JSON settings files; unset keeps settings elsewhere
    pub data_dir: Option<PathBuf>,
    /// Wait before the second direct download attempt
    pub acquire_retry_delay: Duration,
    /// Limit for a single download attempt
    pub download_timeout: Duration,
    /// Limit for one ffmpeg run
    pub encode_timeout: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Pack name used until one is stored
    pub default_pack: String,
    /// Author used until one is stored
    pub default_author: String,
    /// Square video parameters
    pub video: SquareVideoParams,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_messages: 16,
            work_dir: std::env::temp_dir(),
            data_dir: None,
            acquire_retry_delay: Duration::from_millis(700),
            download_timeout: Duration::from_secs(60),
            encode_timeout: Duration::from_secs(120),
            shutdown_timeout: Duration::from_secs(30),
            default_pack: DEFAULT_PACK_NAME.to_string(),
            default_author: DEFAULT_AUTHOR_NAME.to_string(),
            video: SquareVideoParams::default(),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_messages: env_parse::<usize>("STICKER_MAX_CONCURRENT")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_concurrent_messages),
            work_dir: std::env::var("STICKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            data_dir: std::env::var("STICKER_DATA_DIR")
                .ok()
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            acquire_retry_delay: env_parse("STICKER_ACQUIRE_RETRY_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.acquire_retry_delay),
            download_timeout: env_parse("STICKER_DOWNLOAD_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.download_timeout),
            encode_timeout: env_parse("STICKER_ENCODE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.encode_timeout),
            shutdown_timeout: env_parse("STICKER_SHUTDOWN_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_timeout),
            default_pack: std::env::var("STICKER_DEFAULT_PACK").unwrap_or(defaults.default_pack),
            default_author: std::env::var("STICKER_DEFAULT_AUTHOR")
                .unwrap_or(defaults.default_author),
            video: defaults.video,
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.work_dir.as_os_str().is_empty() {
            return Err(WorkerError::config_error("STICKER_WORK_DIR cannot be empty"));
        }
        if self.video.size_px == 0 || self.video.fps == 0 || self.video.max_duration_secs == 0 {
            return Err(WorkerError::config_error(format!(
                "Invalid video parameters: {:?}",
                self.video
            )));
        }
        if self.download_timeout.is_zero() || self.encode_timeout.is_zero() {
            return Err(WorkerError::config_error("Timeouts must be greater than zero"));
        }
        Ok(())
    }

    /// Settings used when the store holds nothing yet.
    pub fn default_settings(&self) -> GlobalSettings {
        GlobalSettings::with_defaults(&self.default_pack, &self.default_author)
    }

    pub fn video_job_config(&self) -> VideoJobConfig {
        VideoJobConfig {
            work_dir: self.work_dir.clone(),
            encode_timeout: self.encode_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "STICKER_MAX_CONCURRENT",
        "STICKER_WORK_DIR",
        "STICKER_DATA_DIR",
        "STICKER_ACQUIRE_RETRY_DELAY_MS",
        "STICKER_DOWNLOAD_TIMEOUT_SECS",
        "STICKER_ENCODE_TIMEOUT_SECS",
        "STICKER_SHUTDOWN_TIMEOUT_SECS",
        "STICKER_DEFAULT_PACK",
        "STICKER_DEFAULT_AUTHOR",
    ];

    fn clear() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();
        let config = WorkerConfig::from_env();
        assert_eq!(config.max_concurrent_messages, 16);
        assert_eq!(config.acquire_retry_delay, Duration::from_millis(700));
        assert_eq!(config.encode_timeout, Duration::from_secs(120));
        assert_eq!(config.video, SquareVideoParams::default());
        assert!(config.data_dir.is_none());
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear();
        std::env::set_var("STICKER_MAX_CONCURRENT", "4");
        std::env::set_var("STICKER_WORK_DIR", "/var/tmp/stickers");
        std::env::set_var("STICKER_ACQUIRE_RETRY_DELAY_MS", "50");
        std::env::set_var("STICKER_DEFAULT_PACK", "My Pack");
        std::env::set_var("STICKER_DATA_DIR", "/var/lib/stickers");
        let config = WorkerConfig::from_env();
        clear();

        assert_eq!(config.max_concurrent_messages, 4);
        assert_eq!(config.work_dir, PathBuf::from("/var/tmp/stickers"));
        assert_eq!(config.acquire_retry_delay, Duration::from_millis(50));
        assert_eq!(config.default_settings().default_pack, "My Pack");
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/stickers")));
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back() {
        clear();
        std::env::set_var("STICKER_MAX_CONCURRENT", "0");
        std::env::set_var("STICKER_ENCODE_TIMEOUT_SECS", "soon");
        std::env::set_var("STICKER_DATA_DIR", "  ");
        let config = WorkerConfig::from_env();
        clear();

        assert_eq!(config.max_concurrent_messages, 16);
        assert!(config.data_dir.is_none());
        assert_eq!(config.encode_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_validate() {
        assert!(WorkerConfig::default().validate().is_ok());

        let mut config = WorkerConfig::default();
        config.video.fps = 0;
        assert!(matches!(config.validate(), Err(WorkerError::ConfigError(_))));

        let config = WorkerConfig {
            encode_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
