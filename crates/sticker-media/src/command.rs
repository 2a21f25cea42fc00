//! Sticker encode invocation of the `ffmpeg` binary.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use sticker_models::StickerEncoding;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Stderr kept on failure, in bytes.
const STDERR_TAIL_BYTES: usize = 4096;

/// One `ffmpeg` encode: a single input, a filter graph, a single output.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    filter_graph: Option<String>,
    trim_secs: Option<u32>,
    encoding: StickerEncoding,
}

impl FfmpegCommand {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            filter_graph: None,
            trim_secs: None,
            encoding: StickerEncoding::default(),
        }
    }

    pub fn filter_graph(mut self, graph: impl Into<String>) -> Self {
        self.filter_graph = Some(graph.into());
        self
    }

    /// Keep only the first `secs` seconds of the input.
    pub fn trim(mut self, secs: u32) -> Self {
        self.trim_secs = Some(secs);
        self
    }

    /// Full argument list. Trim and filter are output options so they apply
    /// after decoding.
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-y", "-v", "error", "-i"].map(String::from).to_vec();
        args.push(self.input.to_string_lossy().into_owned());
        if let Some(graph) = &self.filter_graph {
            args.extend(["-vf".to_string(), graph.clone()]);
        }
        if let Some(secs) = self.trim_secs {
            args.extend(["-t".to_string(), secs.to_string()]);
        }
        args.extend(self.encoding.to_ffmpeg_args());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }

    /// Run to completion, killing the process if `limit` elapses first.
    pub async fn run(&self, limit: Duration) -> MediaResult<()> {
        check_ffmpeg()?;

        let args = self.args();
        debug!(args = %args.join(" "), "Spawning ffmpeg");

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("ffmpeg stderr not captured"))?;
        let collector = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf).await;
            buf
        });

        let waited: MediaResult<ExitStatus> = match tokio::time::timeout(limit, child.wait()).await
        {
            Ok(status) => status.map_err(MediaError::from),
            Err(_) => {
                warn!(limit_secs = limit.as_secs(), "ffmpeg over time limit, killing");
                let _ = child.kill().await;
                Err(MediaError::Timeout(limit.as_secs()))
            }
        };
        let stderr = collector.await.unwrap_or_default();

        let status = waited?;
        if status.success() {
            return Ok(());
        }
        Err(MediaError::ffmpeg_failed(
            format!("ffmpeg exited with {status}"),
            Some(stderr_tail(&stderr)),
            status.code(),
        ))
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim().to_string()
}

/// Locate `ffmpeg` on PATH.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Locate `ffprobe` on PATH.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
