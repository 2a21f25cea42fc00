//! Sticker worker binary.
//!
//! `convert` runs one local file through the full pipeline against a
//! filesystem-backed session. `crop` runs only the square video transform.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sticker_bg_client::RemoveBgClient;
use sticker_firestore::{FirestoreClient, SettingsRepository};
use sticker_media::{crop_video_to_square, probe_video};
use sticker_models::MediaAsset;
use sticker_worker::metrics::init_prometheus;
use sticker_worker::{
    FirestoreSettingsStore, InMemorySettingsStore, InboundMessage, JsonFileSettingsStore,
    LocalSession, SettingsStore, StickerService, WorkerConfig,
};

#[derive(Debug, Parser)]
#[command(name = "sticker-worker", about = "Turn images and videos into chat stickers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one file through the sticker pipeline
    Convert {
        /// Media file to convert
        #[arg(long)]
        input: PathBuf,
        /// Caption sent with the media, e.g. "sticker square rbg"
        #[arg(long, default_value = "")]
        caption: String,
        /// MIME type; guessed from the extension when omitted
        #[arg(long)]
        mime: Option<String>,
        /// Directory receiving the sticker and its metadata
        #[arg(long)]
        out_dir: PathBuf,
        /// Sender id used for credit lookup
        #[arg(long, default_value = "local@c.us")]
        user: String,
    },
    /// Crop a video to a square sticker clip and print its properties
    Crop {
        #[arg(long)]
        input: PathBuf,
        /// Where to copy the encoded clip
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing()?;

    if let Some(port) = std::env::var("METRICS_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
        match init_prometheus(port) {
            Ok(()) => info!(port, "Prometheus exporter listening"),
            Err(e) => warn!("Failed to start Prometheus exporter: {}", e),
        }
    }

    let cli = Cli::parse();
    let config = WorkerConfig::from_env();
    config.validate()?;
    info!("Worker config: {:?}", config);

    match cli.command {
        Commands::Convert {
            input,
            caption,
            mime,
            out_dir,
            user,
        } => convert(config, &input, caption, mime, out_dir, user).await,
        Commands::Crop { input, out } => crop(&config, &input, out.as_deref()).await,
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("sticker=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

async fn convert(
    config: WorkerConfig,
    input: &Path,
    caption: String,
    mime: Option<String>,
    out_dir: PathBuf,
    user: String,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;
    let filename = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    let mime = mime.unwrap_or_else(|| guess_mime(input).to_string());
    tokio::fs::create_dir_all(&out_dir).await?;

    let message = InboundMessage {
        id: format!("local-{}", uuid::Uuid::new_v4()),
        from: user,
        body: caption,
        has_media: true,
        ..Default::default()
    };

    let asset = MediaAsset::new(bytes, mime, filename);
    let session = Arc::new(LocalSession::new(out_dir).with_attachment(&message.id, asset));
    let settings = settings_store(&config).await?;
    let remover = Arc::new(RemoveBgClient::from_env()?);
    if !remover.is_configured() {
        warn!("REMOVE_BG_API_KEY is not set; rbg requests will fall back to the original");
    }

    let service = Arc::new(StickerService::new(config, session.clone(), settings, remover));

    let (tx, rx) = mpsc::channel(1);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    tx.send(message).await?;
    drop(tx);
    service.run(rx, shutdown_rx).await;

    for reply in session.replies().await {
        println!("reply: {reply}");
    }
    for path in session.sent_stickers().await {
        println!("sticker: {}", path.display());
    }
    Ok(())
}

async fn settings_store(config: &WorkerConfig) -> anyhow::Result<Arc<dyn SettingsStore>> {
    if let Some(dir) = &config.data_dir {
        let store = JsonFileSettingsStore::open(dir, config.default_settings()).await?;
        info!(dir = %store.dir().display(), "Using file-backed settings");
        return Ok(Arc::new(store));
    }

    let has_project = ["GCP_PROJECT_ID", "FIREBASE_PROJECT_ID"]
        .iter()
        .any(|key| std::env::var(key).map(|v| !v.is_empty()).unwrap_or(false));

    if !has_project {
        info!("No data dir or Firestore project configured, using in-memory settings");
        return Ok(Arc::new(InMemorySettingsStore::new(config.default_settings())));
    }

    let client = FirestoreClient::from_env().await?;
    let repo = SettingsRepository::new(client);
    let store = FirestoreSettingsStore::load(repo, config.default_settings()).await?;
    Ok(Arc::new(store))
}

async fn crop(config: &WorkerConfig, input: &Path, out: Option<&Path>) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;

    let encoded = crop_video_to_square(&bytes, &config.video, &config.video_job_config()).await?;
    let info = probe_video(encoded.path()).await?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    if !info.fits(&config.video) {
        warn!(?info, "Encoded video does not match the sticker parameters");
    }

    if let Some(out) = out {
        tokio::fs::copy(encoded.path(), out).await?;
        println!("written: {}", out.display());
    }
    Ok(())
}

fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}
