//! FFmpeg CLI wrapper and still-image operations for sticker output.
//!
//! This crate provides:
//! - The sticker `ffmpeg` invocation, killed on a wall-clock limit
//! - FFprobe metadata probing
//! - The square video transform with scoped temporary files
//! - Square crop, size clamp and PNG encoding for still images

pub mod command;
pub mod error;
pub mod filters;
pub mod image_ops;
pub mod probe;
pub mod square_video;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand};
pub use error::{MediaError, MediaResult};
pub use image_ops::{fit_dimensions, process_still, ProcessedImage, StillOp};
pub use probe::{parse_probe_output, probe_video, VideoInfo};
pub use square_video::{crop_video_to_square, EncodedVideo, VideoJobConfig, SQUARE_VIDEO_FILENAME};
