//! Message service: routes each inbound message to commands or the sticker
//! pipeline, one task per message.

use std::sync::Arc;
use std::time::Duration;

use sticker_bg_client::BackgroundRemover;
use sticker_models::GlobalSettings;
use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{debug, info, warn, Instrument};

use crate::acquire::{Acquisition, MediaAcquirer};
use crate::commands::{Command, CommandHandler};
use crate::config::WorkerConfig;
use crate::dispatcher::{DeliveryOutcome, Dispatcher};
use crate::image_chain::ImageTransformChain;
use crate::intent::parse_intent;
use crate::logging::MessageLogger;
use crate::metrics::record_message;
use crate::session::{ChatSession, InboundMessage};
use crate::settings::SettingsStore;

pub const MEDIA_NOT_FOUND_REPLY: &str = "⚠️ Could not download media. Send the media and the \
caption (e.g., \"sticker\", \"square\", \"rbg\") in the *same* message or reply directly to the \
media.";

/// How a message was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// A text command was answered
    Command,
    /// Plain text with no media to act on
    Ignored,
    /// Keyword mode is on and the caption lacks the keyword
    Skipped,
    /// No media could be downloaded
    NotFound,
    Delivered(DeliveryOutcome),
}

impl MessageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Ignored => "ignored",
            Self::Skipped => "skipped",
            Self::NotFound => "not_found",
            Self::Delivered(d) if d.fallback => "fallback",
            Self::Delivered(d) if d.sent => "delivered",
            Self::Delivered(_) => "send_failed",
        }
    }
}

pub struct StickerService {
    config: WorkerConfig,
    session: Arc<dyn ChatSession>,
    settings: Arc<dyn SettingsStore>,
    acquirer: MediaAcquirer,
    dispatcher: Dispatcher,
    commands: CommandHandler,
    semaphore: Arc<Semaphore>,
}

impl StickerService {
    pub fn new(
        config: WorkerConfig,
        session: Arc<dyn ChatSession>,
        settings: Arc<dyn SettingsStore>,
        remover: Arc<dyn BackgroundRemover>,
    ) -> Self {
        let dispatcher = Dispatcher::new(
            Arc::clone(&session),
            Arc::clone(&settings),
            ImageTransformChain::new(remover),
            config.video,
            config.video_job_config(),
        );

        Self {
            acquirer: MediaAcquirer::from_config(&config),
            commands: CommandHandler::new(Arc::clone(&settings)),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_messages)),
            dispatcher,
            session,
            settings,
            config,
        }
    }

    /// Consume `inbox` until it closes or `shutdown` flips to true, then wait
    /// (bounded by the shutdown timeout) for in-flight messages.
    pub async fn run(
        self: Arc<Self>,
        mut inbox: mpsc::Receiver<InboundMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            max_concurrent = self.config.max_concurrent_messages,
            "Starting sticker service"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown signal received, stopping intake");
                        break;
                    }
                }
                next = inbox.recv() => {
                    let Some(message) = next else {
                        info!("Inbox closed");
                        break;
                    };
                    let Ok(permit) = Arc::clone(&self.semaphore).acquire_owned().await else {
                        break;
                    };
                    let service = Arc::clone(&self);
                    tokio::spawn(async move {
                        let _permit = permit;
                        service.handle_message(message).await;
                    });
                }
            }
        }

        info!("Waiting for in-flight messages to complete...");
        if tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_messages())
            .await
            .is_err()
        {
            warn!(
                timeout_secs = self.config.shutdown_timeout.as_secs(),
                "In-flight messages still running at shutdown"
            );
        }
        info!("Sticker service stopped");
    }

    async fn wait_for_messages(&self) {
        while self.semaphore.available_permits() < self.config.max_concurrent_messages {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    pub async fn handle_message(&self, message: InboundMessage) -> MessageOutcome {
        let logger = MessageLogger::new(&message.id, message.user_id());
        let span = logger.create_span();
        let outcome = self.process(&message, &logger).instrument(span).await;
        record_message(outcome.as_str());
        outcome
    }

    async fn process(&self, message: &InboundMessage, logger: &MessageLogger) -> MessageOutcome {
        if let Some(command) = Command::parse(&message.body) {
            debug!(?command, "Handling command");
            if let Err(e) = self.commands.handle(self.session.as_ref(), message, command).await {
                logger.log_error("command", &e.to_string());
            }
            return MessageOutcome::Command;
        }

        if !message.has_media && !message.has_quoted_message {
            return MessageOutcome::Ignored;
        }

        let global = match self.settings.global_settings().await {
            Ok(global) => global,
            Err(e) => {
                logger.log_warning("settings", &format!("Using default settings: {e}"));
                GlobalSettings::default()
            }
        };

        let intent = parse_intent(message.caption(), global.require_caption_keyword);
        if !intent.passes_keyword_gate() {
            debug!("Caption keyword missing, skipping");
            return MessageOutcome::Skipped;
        }

        logger.log_start(&format!(
            "square={} rbg={}",
            intent.wants_square, intent.wants_background_removal
        ));

        let asset = match self.acquirer.acquire(self.session.as_ref(), message).await {
            Acquisition::Resolved(asset) => asset,
            Acquisition::NotFound => {
                logger.log_warning("acquire", "No media could be downloaded");
                if let Err(e) = self.session.reply(message, MEDIA_NOT_FOUND_REPLY).await {
                    logger.log_warning("reply", &format!("Reply failed: {e}"));
                }
                return MessageOutcome::NotFound;
            }
        };

        let outcome = self.dispatcher.run(message, &intent, asset).await;
        logger.log_completion(&format!(
            "kind={} sent={} fallback={}",
            outcome.kind.as_str(),
            outcome.sent,
            outcome.fallback
        ));
        MessageOutcome::Delivered(outcome)
    }
}
