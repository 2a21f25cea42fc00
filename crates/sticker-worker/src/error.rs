//! Worker error types.

use sticker_bg_client::RemovalError;
use sticker_media::MediaError;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Sending sticker failed: {0}")]
    SendFailed(String),

    #[error("Reply failed: {0}")]
    ReplyFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Firestore error: {0}")]
    Firestore(#[from] sticker_firestore::FirestoreError),

    #[error("Settings storage error: {0}")]
    Storage(String),
}

impl WorkerError {
    pub fn send_failed(msg: impl Into<String>) -> Self {
        Self::SendFailed(msg.into())
    }

    pub fn reply_failed(msg: impl Into<String>) -> Self {
        Self::ReplyFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// Transform chain failures. The dispatcher recovers from all of them by
/// sending the original media.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Background removal failed: {0}")]
    BackgroundRemovalFailed(#[source] RemovalError),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidImageDimensions { width: u32, height: u32 },

    #[error("Image decode failed: {0}")]
    Decode(String),

    #[error("Video encode failed: {0}")]
    VideoEncodeFailed(#[source] MediaError),

    #[error("Transform task failed: {0}")]
    Internal(String),
}

impl ChainError {
    /// Stage label used in logs and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::BackgroundRemovalFailed(_) => "background_removal",
            Self::InvalidImageDimensions { .. } | Self::Decode(_) => "image",
            Self::VideoEncodeFailed(_) => "video_encode",
            Self::Internal(_) => "internal",
        }
    }

    /// Encoder stderr tail, when the failure came from ffmpeg.
    pub fn encoder_stderr(&self) -> Option<&str> {
        match self {
            Self::VideoEncodeFailed(e) => e.stderr(),
            _ => None,
        }
    }

    /// Map a still-image media error into the chain taxonomy.
    pub fn from_image_error(err: MediaError) -> Self {
        match err {
            MediaError::InvalidImageDimensions { width, height } => {
                Self::InvalidImageDimensions { width, height }
            }
            MediaError::ImageDecode(msg) => Self::Decode(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}
