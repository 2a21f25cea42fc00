//! Stream metadata via `ffprobe`, used to inspect encoded stickers.

use std::path::Path;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use sticker_models::SquareVideoParams;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// What a sticker consumer cares about in a video file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Average frame rate of the first video stream
    pub fps: f64,
    /// Container duration in seconds
    pub duration: f64,
    pub codec: String,
    pub pixel_format: String,
    pub audio_streams: usize,
}

impl VideoInfo {
    pub fn has_audio(&self) -> bool {
        self.audio_streams > 0
    }

    /// Whether the file matches what the square transform promises to produce.
    pub fn fits(&self, params: &SquareVideoParams) -> bool {
        self.width == params.size_px
            && self.height == params.size_px
            && (self.fps - f64::from(params.fps)).abs() < 0.01
            && self.duration <= f64::from(params.max_duration_secs) + 0.1
            && !self.has_audio()
    }
}

#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: ProbeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "codec_type", rename_all = "lowercase")]
enum ProbeStream {
    Video {
        codec_name: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        pix_fmt: Option<String>,
        avg_frame_rate: Option<String>,
        r_frame_rate: Option<String>,
    },
    Audio {},
    #[serde(other)]
    Other,
}

/// Run `ffprobe` on `path` and summarize the result.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("ffprobe exited with {}", output.status),
            stderr: Some(String::from_utf8_lossy(&output.stderr).trim().to_string()),
        });
    }
    parse_probe_output(&output.stdout)
}

/// Summarize `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_probe_output(stdout: &[u8]) -> MediaResult<VideoInfo> {
    let report: ProbeReport = serde_json::from_slice(stdout)?;

    let audio_streams = report
        .streams
        .iter()
        .filter(|s| matches!(s, ProbeStream::Audio {}))
        .count();

    let Some(ProbeStream::Video {
        codec_name,
        width,
        height,
        pix_fmt,
        avg_frame_rate,
        r_frame_rate,
    }) = report.streams.into_iter().find(|s| matches!(s, ProbeStream::Video { .. }))
    else {
        return Err(MediaError::InvalidVideo("no video stream".to_string()));
    };

    // avg_frame_rate reflects the fps filter; r_frame_rate is the container's nominal rate
    let fps = [avg_frame_rate, r_frame_rate]
        .iter()
        .flatten()
        .find_map(|rate| parse_rate(rate))
        .unwrap_or(0.0);

    Ok(VideoInfo {
        width: width.unwrap_or(0),
        height: height.unwrap_or(0),
        fps,
        duration: report
            .format
            .duration
            .and_then(|d| d.parse().ok())
            .unwrap_or(0.0),
        codec: codec_name.unwrap_or_default(),
        pixel_format: pix_fmt.unwrap_or_default(),
        audio_streams,
    })
}

/// `"30000/1001"` or `"25"`; a zero denominator is no rate at all.
fn parse_rate(rate: &str) -> Option<f64> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then_some(num.parse::<f64>().ok()? / den)
        }
        None => rate.parse().ok(),
    }
}
