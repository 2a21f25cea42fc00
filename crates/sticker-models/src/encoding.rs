//! Sticker encoding configuration.
//!
//! The video values are part of the output contract and must not drift:
//! square crop on `min(iw,ih)`, 512x512, 15 fps, 8 seconds, no audio.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Side length of a sticker in pixels (images are bounded by it, videos scaled to it).
pub const STICKER_SIZE_PX: u32 = 512;
/// Output frame rate for animated stickers.
pub const STICKER_FPS: u32 = 15;
/// Hard cap on animated sticker duration.
pub const STICKER_MAX_DURATION_SECS: u32 = 8;

/// Video codec (H.264)
pub const STICKER_VIDEO_CODEC: &str = "libx264";
/// Encoder preset favouring speed
pub const STICKER_PRESET: &str = "veryfast";
/// 4:2:0 chroma subsampling for broad playback support
pub const STICKER_PIXEL_FORMAT: &str = "yuv420p";
/// Moves the moov atom to the front for progressive playback
pub const STICKER_MOVFLAGS: &str = "+faststart";

/// Parameters of the square video transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SquareVideoParams {
    /// Output is truncated to this many seconds
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: u32,

    /// Output width and height
    #[serde(default = "default_size")]
    pub size_px: u32,

    /// Output frame rate
    #[serde(default = "default_fps")]
    pub fps: u32,
}

fn default_max_duration() -> u32 {
    STICKER_MAX_DURATION_SECS
}
fn default_size() -> u32 {
    STICKER_SIZE_PX
}
fn default_fps() -> u32 {
    STICKER_FPS
}

impl Default for SquareVideoParams {
    fn default() -> Self {
        Self {
            max_duration_secs: STICKER_MAX_DURATION_SECS,
            size_px: STICKER_SIZE_PX,
            fps: STICKER_FPS,
        }
    }
}

/// Encoder settings applied to every animated sticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StickerEncoding {
    pub codec: String,
    pub preset: String,
    pub pixel_format: String,
    pub movflags: String,
}

impl Default for StickerEncoding {
    fn default() -> Self {
        Self {
            codec: STICKER_VIDEO_CODEC.to_string(),
            preset: STICKER_PRESET.to_string(),
            pixel_format: STICKER_PIXEL_FORMAT.to_string(),
            movflags: STICKER_MOVFLAGS.to_string(),
        }
    }
}

impl StickerEncoding {
    /// Convert to FFmpeg output arguments (audio is always dropped).
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-an".to_string(),
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-movflags".to_string(),
            self.movflags.clone(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
        ]
    }
}
