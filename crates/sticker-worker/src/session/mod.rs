//! Chat transport boundary.
//!
//! The pipeline only talks to a chat network through [`ChatSession`]. Inbound
//! messages arrive on an `mpsc` channel consumed by the service loop.

mod local;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sticker_models::{Credits, MediaAsset};
use thiserror::Error;

pub use local::LocalSession;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Download failed: {0}")]
    Download(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Message not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Direct chats are addressed with this suffix.
const DIRECT_CHAT_SUFFIX: &str = "@c.us";

/// A message received from the chat network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Transport message id
    pub id: String,
    /// Chat the message arrived in
    pub from: String,
    /// Sender inside a group chat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Text body or media caption
    #[serde(default)]
    pub body: String,
    /// Message carries an attachment
    #[serde(default)]
    pub has_media: bool,
    /// Message replies to another message
    #[serde(default)]
    pub has_quoted_message: bool,
}

impl InboundMessage {
    /// Stable identity of the sender, used to key per-user settings.
    pub fn user_id(&self) -> &str {
        if self.from.ends_with(DIRECT_CHAT_SUFFIX) {
            return &self.from;
        }
        self.author
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or(self.from.as_str())
    }

    /// Chat to send stickers and replies to.
    pub fn chat_id(&self) -> &str {
        &self.from
    }

    pub fn caption(&self) -> &str {
        &self.body
    }
}

/// Sticker content handed to the transport.
#[derive(Debug, Clone)]
pub enum StickerPayload {
    /// Encoded bytes in memory
    Memory(MediaAsset),
    /// A file the transport reads; it must exist until `send_sticker` returns
    File {
        path: PathBuf,
        mime_type: String,
        filename: String,
    },
}

impl StickerPayload {
    pub fn mime_type(&self) -> &str {
        match self {
            Self::Memory(asset) => &asset.mime_type,
            Self::File { mime_type, .. } => mime_type,
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            Self::Memory(asset) => &asset.filename,
            Self::File { filename, .. } => filename,
        }
    }
}

/// Sticker metadata. Delivery always sends in sticker mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickerOptions {
    pub pack_name: String,
    pub author_name: String,
}

impl From<&Credits> for StickerOptions {
    fn from(credits: &Credits) -> Self {
        Self {
            pack_name: credits.pack_name.clone(),
            author_name: credits.author_name.clone(),
        }
    }
}

#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Download the attachment of `message`. `Ok(None)` when it has none.
    async fn download_attachment(
        &self,
        message: &InboundMessage,
    ) -> SessionResult<Option<MediaAsset>>;

    /// The message `message` replies to, if any.
    async fn quoted_message(
        &self,
        message: &InboundMessage,
    ) -> SessionResult<Option<InboundMessage>>;

    async fn send_sticker(
        &self,
        chat_id: &str,
        payload: StickerPayload,
        options: &StickerOptions,
    ) -> SessionResult<()>;

    /// Reply with text to `message`.
    async fn reply(&self, message: &InboundMessage, text: &str) -> SessionResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(from: &str, author: Option<&str>) -> InboundMessage {
        InboundMessage {
            id: "1".into(),
            from: from.into(),
            author: author.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn test_user_id_direct_chat() {
        let msg = message("123@c.us", Some("999@c.us"));
        assert_eq!(msg.user_id(), "123@c.us");
    }

    #[test]
    fn test_user_id_group_uses_author() {
        let msg = message("group-1@g.us", Some("456@c.us"));
        assert_eq!(msg.user_id(), "456@c.us");
        assert_eq!(msg.chat_id(), "group-1@g.us");
    }

    #[test]
    fn test_user_id_group_without_author() {
        assert_eq!(message("group-1@g.us", None).user_id(), "group-1@g.us");
        assert_eq!(message("group-1@g.us", Some("")).user_id(), "group-1@g.us");
    }

    #[test]
    fn test_options_from_credits() {
        let options = StickerOptions::from(&Credits::new("Pack", "Me"));
        assert_eq!(options.pack_name, "Pack");
        assert_eq!(options.author_name, "Me");
    }
}
