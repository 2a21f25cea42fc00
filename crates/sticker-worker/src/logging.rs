//! Structured per-message logging.

use tracing::{error, info, warn, Span};

/// Logger carrying the message and sender identity on every event.
#[derive(Debug, Clone)]
pub struct MessageLogger {
    message_id: String,
    user_id: String,
}

impl MessageLogger {
    pub fn new(message_id: &str, user_id: &str) -> Self {
        Self {
            message_id: message_id.to_string(),
            user_id: user_id.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            message_id = %self.message_id,
            user_id = %self.user_id,
            "Message started: {}",
            message
        );
    }

    pub fn log_progress(&self, stage: &str, message: &str) {
        info!(
            message_id = %self.message_id,
            user_id = %self.user_id,
            stage,
            "{}", message
        );
    }

    pub fn log_warning(&self, stage: &str, message: &str) {
        warn!(
            message_id = %self.message_id,
            user_id = %self.user_id,
            stage,
            "{}", message
        );
    }

    pub fn log_error(&self, stage: &str, message: &str) {
        error!(
            message_id = %self.message_id,
            user_id = %self.user_id,
            stage,
            "{}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            message_id = %self.message_id,
            user_id = %self.user_id,
            "Message completed: {}",
            message
        );
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Span wrapping all work for one message.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("message", message_id = %self.message_id, user_id = %self.user_id)
    }
}
