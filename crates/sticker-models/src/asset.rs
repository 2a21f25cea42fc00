//! Media assets flowing through the sticker pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// MIME type of every still-image chain output.
pub const PNG_MIME: &str = "image/png";
/// MIME type of every video chain output.
pub const MP4_MIME: &str = "video/mp4";
/// MIME type that is an image but is routed to the video chain.
pub const GIF_MIME: &str = "image/gif";

/// Coarse classification used by the dispatcher to pick a transform chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// `image/*` other than GIF.
    StillImage,
    /// `image/gif` or any `video/*`.
    AnimatedOrVideo,
    /// Anything else; forwarded untouched.
    Other,
}

impl MediaKind {
    /// Classify a MIME type string.
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        if mime == GIF_MIME || mime.starts_with("video/") {
            Self::AnimatedOrVideo
        } else if mime.starts_with("image/") {
            Self::StillImage
        } else {
            Self::Other
        }
    }

    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StillImage => "still_image",
            Self::AnimatedOrVideo => "animated_or_video",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attachment or transform result held in memory.
///
/// Transforms consume an asset and return a new one; an asset is never
/// shared between concurrent pipeline runs.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaAsset {
    /// Raw bytes
    pub bytes: Vec<u8>,
    /// MIME type consistent with `bytes`
    pub mime_type: String,
    /// File name presented to the chat network
    pub filename: String,
}

impl MediaAsset {
    /// Create a new asset.
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            filename: filename.into(),
        }
    }

    /// Create a PNG asset with the given file name.
    pub fn png(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self::new(bytes, PNG_MIME, filename)
    }

    /// Classify this asset by MIME type.
    pub fn kind(&self) -> MediaKind {
        MediaKind::from_mime(&self.mime_type)
    }

    /// True when there are no bytes to work with.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for MediaAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaAsset")
            .field("mime_type", &self.mime_type)
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}
