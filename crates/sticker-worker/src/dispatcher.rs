//! Per-message transform dispatch and delivery.
//!
//! Still images always go through the image chain. Animated media and video
//! are re-encoded only when a square crop was asked for. Any chain failure is
//! answered with a notice and the original media is sent instead.

use std::sync::Arc;
use std::time::Instant;

use sticker_media::{crop_video_to_square, EncodedVideo, VideoJobConfig};
use sticker_models::settings::{DEFAULT_AUTHOR_NAME, DEFAULT_PACK_NAME};
use sticker_models::{Credits, Intent, MediaAsset, MediaKind, SquareVideoParams};
use tracing::debug;

use crate::delivery::deliver;
use crate::error::ChainError;
use crate::image_chain::ImageTransformChain;
use crate::logging::MessageLogger;
use crate::metrics::record_transform;
use crate::session::{ChatSession, InboundMessage, StickerPayload};
use crate::settings::SettingsStore;

pub const FALLBACK_NOTICE: &str = "⚠️ Processing failed. Sending original as sticker.";
pub const NOTICE_BG_REMOVED_SQUARE: &str = "🪄 Background removed and cropped to 1:1.";
pub const NOTICE_BG_REMOVED: &str = "🪄 Background removed.";
pub const NOTICE_SQUARE: &str = "🟩 Cropped to 1:1.";
pub const NOTICE_VIDEO_SQUARE: &str = "🟩 Cropped video/GIF to 1:1.";

/// What happened to one media message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOutcome {
    /// A sticker reached the transport
    pub sent: bool,
    /// The original was sent because a transform failed
    pub fallback: bool,
    pub kind: MediaKind,
}

/// Transformed output ready to send. Holds the encoded video file open until
/// it is dropped.
enum Prepared {
    Image(MediaAsset),
    Video(EncodedVideo),
    Original,
}

pub struct Dispatcher {
    session: Arc<dyn ChatSession>,
    settings: Arc<dyn SettingsStore>,
    image_chain: ImageTransformChain,
    video: SquareVideoParams,
    video_job: VideoJobConfig,
}

impl Dispatcher {
    pub fn new(
        session: Arc<dyn ChatSession>,
        settings: Arc<dyn SettingsStore>,
        image_chain: ImageTransformChain,
        video: SquareVideoParams,
        video_job: VideoJobConfig,
    ) -> Self {
        Self {
            session,
            settings,
            image_chain,
            video,
            video_job,
        }
    }

    pub async fn run(
        &self,
        message: &InboundMessage,
        intent: &Intent,
        asset: MediaAsset,
    ) -> DeliveryOutcome {
        let logger = MessageLogger::new(&message.id, message.user_id());
        let kind = asset.kind();
        let credits = self.credits(message, &logger).await;

        let started = Instant::now();
        let prepared = match kind {
            MediaKind::StillImage => self
                .image_chain
                .transform(&asset, intent)
                .await
                .map(Prepared::Image),
            MediaKind::AnimatedOrVideo if intent.wants_square => {
                crop_video_to_square(&asset.bytes, &self.video, &self.video_job)
                    .await
                    .map(Prepared::Video)
                    .map_err(ChainError::VideoEncodeFailed)
            }
            _ => Ok(Prepared::Original),
        };

        let prepared = match prepared {
            Ok(prepared) => {
                if !matches!(prepared, Prepared::Original) {
                    record_transform(kind.as_str(), "ok", started.elapsed());
                    logger.log_progress("transform", &format!("{} transform done", kind.as_str()));
                }
                prepared
            }
            Err(e) => {
                record_transform(kind.as_str(), "fallback", started.elapsed());
                logger.log_warning(e.stage(), &format!("Transform failed, sending original: {e}"));
                if let Some(stderr) = e.encoder_stderr() {
                    debug!(message_id = %message.id, stderr, "ffmpeg stderr");
                }
                self.reply(message, FALLBACK_NOTICE, &logger).await;

                let sent = self
                    .send(message, StickerPayload::Memory(asset), &credits, &logger)
                    .await;
                return DeliveryOutcome {
                    sent,
                    fallback: true,
                    kind,
                };
            }
        };

        let notice = success_notice(kind, intent, &prepared);
        let sent = match prepared {
            Prepared::Image(out) => {
                self.send(message, StickerPayload::Memory(out), &credits, &logger)
                    .await
            }
            Prepared::Video(encoded) => {
                let payload = StickerPayload::File {
                    path: encoded.path().to_path_buf(),
                    mime_type: encoded.mime_type().to_string(),
                    filename: encoded.filename().to_string(),
                };
                let sent = self.send(message, payload, &credits, &logger).await;
                drop(encoded);
                sent
            }
            Prepared::Original => {
                self.send(message, StickerPayload::Memory(asset), &credits, &logger)
                    .await
            }
        };

        if sent {
            if let Some(notice) = notice {
                self.reply(message, notice, &logger).await;
            }
        }

        DeliveryOutcome {
            sent,
            fallback: false,
            kind,
        }
    }

    async fn credits(&self, message: &InboundMessage, logger: &MessageLogger) -> Credits {
        match self.settings.credits_for(message.user_id()).await {
            Ok(credits) => credits,
            Err(e) => {
                logger.log_warning("settings", &format!("Using default credits: {e}"));
                Credits::new(DEFAULT_PACK_NAME, DEFAULT_AUTHOR_NAME)
            }
        }
    }

    async fn send(
        &self,
        message: &InboundMessage,
        payload: StickerPayload,
        credits: &Credits,
        logger: &MessageLogger,
    ) -> bool {
        match deliver(self.session.as_ref(), message.chat_id(), payload, credits).await {
            Ok(()) => true,
            Err(e) => {
                logger.log_error("deliver", &e.to_string());
                false
            }
        }
    }

    async fn reply(&self, message: &InboundMessage, text: &str, logger: &MessageLogger) {
        if let Err(e) = self.session.reply(message, text).await {
            logger.log_warning("reply", &format!("Reply failed: {e}"));
        }
    }
}

fn success_notice(kind: MediaKind, intent: &Intent, prepared: &Prepared) -> Option<&'static str> {
    match (kind, prepared) {
        (MediaKind::StillImage, Prepared::Image(_)) => {
            match (intent.wants_background_removal, intent.wants_square) {
                (true, true) => Some(NOTICE_BG_REMOVED_SQUARE),
                (true, false) => Some(NOTICE_BG_REMOVED),
                (false, true) => Some(NOTICE_SQUARE),
                (false, false) => None,
            }
        }
        (MediaKind::AnimatedOrVideo, Prepared::Video(_)) => Some(NOTICE_VIDEO_SQUARE),
        _ => None,
    }
}
