//! Media error taxonomy.

use std::path::PathBuf;
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    // Toolchain
    #[error("ffmpeg binary not found in PATH")]
    FfmpegNotFound,

    #[error("ffprobe binary not found in PATH")]
    FfprobeNotFound,

    #[error("ffmpeg failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("ffprobe failed: {message}")]
    FfprobeFailed { message: String, stderr: Option<String> },

    #[error("ffmpeg killed after {0}s")]
    Timeout(u64),

    // Inputs
    #[error("no such file: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("not a usable video: {0}")]
    InvalidVideo(String),

    #[error("cannot decode image: {0}")]
    ImageDecode(String),

    #[error("image has unusable dimensions {width}x{height}")]
    InvalidImageDimensions { width: u32, height: u32 },

    #[error("cannot encode PNG: {0}")]
    ImageEncode(String),

    // Plumbing
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed ffprobe report: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

impl MediaError {
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn image_decode(message: impl Into<String>) -> Self {
        Self::ImageDecode(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True when the encoder itself failed rather than our own I/O.
    pub fn is_encoder_failure(&self) -> bool {
        matches!(self, Self::FfmpegNotFound | Self::FfmpegFailed { .. } | Self::Timeout(_))
    }

    /// Captured tool stderr, if the failure carried any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::FfmpegFailed { stderr, .. } | Self::FfprobeFailed { stderr, .. } => {
                stderr.as_deref()
            }
            _ => None,
        }
    }
}
