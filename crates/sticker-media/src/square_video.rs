//! Square video transform for animated stickers.
//!
//! Each job writes its input to a uniquely named temp file in the work dir and
//! encodes into a second one. The input is removed when the job returns; the
//! output belongs to the returned [`EncodedVideo`] and is removed when it drops.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sticker_models::asset::MP4_MIME;
use sticker_models::SquareVideoParams;
use tempfile::TempPath;
use tracing::{debug, info};

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::filters::build_square_filter;

/// Filename given to square video output.
pub const SQUARE_VIDEO_FILENAME: &str = "square.mp4";

/// Where and how long a video job may run.
#[derive(Debug, Clone)]
pub struct VideoJobConfig {
    /// Directory for the job's temp files
    pub work_dir: PathBuf,
    /// Wall-clock limit for the encoder
    pub encode_timeout: Duration,
}

impl Default for VideoJobConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir(),
            encode_timeout: Duration::from_secs(120),
        }
    }
}

/// Encoded square video on disk. The file is deleted on drop.
#[derive(Debug)]
pub struct EncodedVideo {
    path: TempPath,
    mime_type: String,
    filename: String,
}

impl EncodedVideo {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

}

/// Center-crop a video to a square and re-encode it as a sticker-sized MP4.
pub async fn crop_video_to_square(
    bytes: &[u8],
    params: &SquareVideoParams,
    config: &VideoJobConfig,
) -> MediaResult<EncodedVideo> {
    tokio::fs::create_dir_all(&config.work_dir).await?;

    let input = tempfile::Builder::new()
        .prefix("sticker_in_")
        .suffix(".mp4")
        .tempfile_in(&config.work_dir)?;
    let output = tempfile::Builder::new()
        .prefix("sticker_out_")
        .suffix(".mp4")
        .tempfile_in(&config.work_dir)?
        .into_temp_path();

    tokio::fs::write(input.path(), bytes).await?;
    debug!(
        input = %input.path().display(),
        output = %output.display(),
        size = bytes.len(),
        "Starting square video job"
    );

    FfmpegCommand::new(input.path(), output.to_path_buf())
        .filter_graph(build_square_filter(params))
        .trim(params.max_duration_secs)
        .run(config.encode_timeout)
        .await?;

    let written = tokio::fs::metadata(&output).await?.len();
    if written == 0 {
        return Err(MediaError::ffmpeg_failed("ffmpeg wrote an empty file", None, None));
    }

    info!(bytes = written, "Square video encoded");

    Ok(EncodedVideo {
        path: output,
        mime_type: MP4_MIME.to_string(),
        filename: SQUARE_VIDEO_FILENAME.to_string(),
    })
}
