//! Media acquisition.
//!
//! Attachments are not always downloadable on first try, so acquisition walks
//! an ordered list of strategies and takes the first non-empty asset.

use std::time::Duration;

use sticker_models::MediaAsset;
use tracing::debug;

use crate::config::WorkerConfig;
use crate::metrics::record_acquire;
use crate::session::{ChatSession, InboundMessage, SessionResult};

/// One way of getting the media for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionStrategy {
    /// Download the message's own attachment.
    Direct,
    /// Sleep, then download the message's own attachment again.
    DirectAfterDelay(Duration),
    /// Download the attachment of the message being replied to.
    Quoted,
}

impl AcquisitionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::DirectAfterDelay(_) => "direct_retry",
            Self::Quoted => "quoted",
        }
    }

    fn applies_to(&self, message: &InboundMessage) -> bool {
        match self {
            Self::Direct | Self::DirectAfterDelay(_) => message.has_media,
            Self::Quoted => message.has_quoted_message,
        }
    }
}

/// Result of acquisition. Failures are never surfaced as errors.
#[derive(Debug, Clone)]
pub enum Acquisition {
    Resolved(MediaAsset),
    NotFound,
}

impl Acquisition {
    pub fn into_asset(self) -> Option<MediaAsset> {
        match self {
            Self::Resolved(asset) => Some(asset),
            Self::NotFound => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaAcquirer {
    strategies: Vec<AcquisitionStrategy>,
    download_timeout: Duration,
}

impl MediaAcquirer {
    pub fn new(strategies: Vec<AcquisitionStrategy>, download_timeout: Duration) -> Self {
        Self {
            strategies,
            download_timeout,
        }
    }

    /// Direct, direct again after the configured delay, then the quoted message.
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(
            vec![
                AcquisitionStrategy::Direct,
                AcquisitionStrategy::DirectAfterDelay(config.acquire_retry_delay),
                AcquisitionStrategy::Quoted,
            ],
            config.download_timeout,
        )
    }

    pub fn strategies(&self) -> &[AcquisitionStrategy] {
        &self.strategies
    }

    pub async fn acquire(
        &self,
        session: &dyn ChatSession,
        message: &InboundMessage,
    ) -> Acquisition {
        for strategy in &self.strategies {
            if !strategy.applies_to(message) {
                continue;
            }

            if let AcquisitionStrategy::DirectAfterDelay(delay) = strategy {
                tokio::time::sleep(*delay).await;
            }

            let attempt = tokio::time::timeout(
                self.download_timeout,
                self.attempt(session, message, *strategy),
            )
            .await;

            match attempt {
                Ok(Ok(Some(asset))) if !asset.is_empty() => {
                    debug!(
                        message_id = %message.id,
                        strategy = strategy.as_str(),
                        mime_type = %asset.mime_type,
                        size = asset.len(),
                        "Media acquired"
                    );
                    record_acquire(strategy.as_str(), "resolved");
                    return Acquisition::Resolved(asset);
                }
                Ok(Ok(_)) => {
                    debug!(
                        message_id = %message.id,
                        strategy = strategy.as_str(),
                        "No media returned"
                    );
                    record_acquire(strategy.as_str(), "empty");
                }
                Ok(Err(e)) => {
                    debug!(
                        message_id = %message.id,
                        strategy = strategy.as_str(),
                        error = %e,
                        "Download failed"
                    );
                    record_acquire(strategy.as_str(), "error");
                }
                Err(_) => {
                    debug!(
                        message_id = %message.id,
                        strategy = strategy.as_str(),
                        timeout_ms = self.download_timeout.as_millis() as u64,
                        "Download timed out"
                    );
                    record_acquire(strategy.as_str(), "timeout");
                }
            }
        }

        Acquisition::NotFound
    }

    async fn attempt(
        &self,
        session: &dyn ChatSession,
        message: &InboundMessage,
        strategy: AcquisitionStrategy,
    ) -> SessionResult<Option<MediaAsset>> {
        match strategy {
            AcquisitionStrategy::Direct | AcquisitionStrategy::DirectAfterDelay(_) => {
                session.download_attachment(message).await
            }
            AcquisitionStrategy::Quoted => {
                match session.quoted_message(message).await?.filter(|q| q.has_media) {
                    Some(quoted) => session.download_attachment(&quoted).await,
                    None => Ok(None),
                }
            }
        }
    }
}
