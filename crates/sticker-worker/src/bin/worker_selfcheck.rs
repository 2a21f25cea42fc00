use std::path::Path;

use sticker_media::{check_ffmpeg, check_ffprobe};
use sticker_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();
    config.validate()?;

    println!(
        "worker-selfcheck: starting with work_dir={}",
        config.work_dir.display()
    );
    ensure_workdir(&config.work_dir).await?;

    let ffmpeg = check_ffmpeg().map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;
    let ffprobe = check_ffprobe().map_err(|e| anyhow::anyhow!("ffprobe not available: {}", e))?;
    println!("worker-selfcheck: ffmpeg={} ffprobe={}", ffmpeg.display(), ffprobe.display());

    warn_env_missing(&["REMOVE_BG_API_KEY", "GCP_PROJECT_ID"]);

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;

    let probe = tempfile::Builder::new()
        .prefix("selfcheck_")
        .tempfile_in(path)
        .map_err(|e| anyhow::anyhow!("work dir {} is not writable: {}", path.display(), e))?;
    drop(probe);
    Ok(())
}

fn warn_env_missing(vars: &[&str]) {
    for var in vars {
        if std::env::var(var).map(|v| v.is_empty()).unwrap_or(true) {
            println!("worker-selfcheck: warning: {} is not set", var);
        }
    }
}
