//! Filesystem-backed chat session used by the CLI.
//!
//! Attachments are registered up front; stickers are written to an output
//! directory next to a JSON sidecar holding the sticker metadata.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use sticker_models::MediaAsset;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::{
    ChatSession, InboundMessage, SessionError, SessionResult, StickerOptions, StickerPayload,
};

#[derive(Debug, Serialize)]
struct StickerSidecar<'a> {
    chat_id: &'a str,
    pack_name: &'a str,
    author_name: &'a str,
    mime_type: &'a str,
    filename: &'a str,
    sent_at: String,
}

/// Chat session that reads attachments from memory and writes stickers to disk.
pub struct LocalSession {
    out_dir: PathBuf,
    attachments: HashMap<String, MediaAsset>,
    quoted: HashMap<String, InboundMessage>,
    replies: Mutex<Vec<String>>,
    sent: Mutex<Vec<PathBuf>>,
}

impl LocalSession {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            attachments: HashMap::new(),
            quoted: HashMap::new(),
            replies: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Register the attachment of message `message_id`.
    pub fn with_attachment(mut self, message_id: impl Into<String>, asset: MediaAsset) -> Self {
        self.attachments.insert(message_id.into(), asset);
        self
    }

    /// Register `quoted` as the message `message_id` replies to.
    pub fn with_quote(mut self, message_id: impl Into<String>, quoted: InboundMessage) -> Self {
        self.quoted.insert(message_id.into(), quoted);
        self
    }

    /// Text replies sent so far.
    pub async fn replies(&self) -> Vec<String> {
        self.replies.lock().await.clone()
    }

    /// Sticker files written so far.
    pub async fn sent_stickers(&self) -> Vec<PathBuf> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl ChatSession for LocalSession {
    async fn download_attachment(
        &self,
        message: &InboundMessage,
    ) -> SessionResult<Option<MediaAsset>> {
        Ok(self.attachments.get(&message.id).cloned())
    }

    async fn quoted_message(
        &self,
        message: &InboundMessage,
    ) -> SessionResult<Option<InboundMessage>> {
        if !message.has_quoted_message {
            return Ok(None);
        }
        self.quoted
            .get(&message.id)
            .cloned()
            .map(Some)
            .ok_or_else(|| SessionError::NotFound(format!("quoted message of {}", message.id)))
    }

    async fn send_sticker(
        &self,
        chat_id: &str,
        payload: StickerPayload,
        options: &StickerOptions,
    ) -> SessionResult<()> {
        tokio::fs::create_dir_all(&self.out_dir).await?;

        let target = self
            .out_dir
            .join(format!("{}_{}", Uuid::new_v4().simple(), payload.filename()));

        match &payload {
            StickerPayload::Memory(asset) => tokio::fs::write(&target, &asset.bytes).await?,
            StickerPayload::File { path, .. } => {
                tokio::fs::copy(path, &target)
                    .await
                    .map_err(|e| SessionError::Send(format!("{}: {}", path.display(), e)))?;
            }
        }

        let sidecar = StickerSidecar {
            chat_id,
            pack_name: &options.pack_name,
            author_name: &options.author_name,
            mime_type: payload.mime_type(),
            filename: payload.filename(),
            sent_at: Utc::now().to_rfc3339(),
        };
        let json =
            serde_json::to_vec_pretty(&sidecar).map_err(|e| SessionError::Send(e.to_string()))?;
        tokio::fs::write(target.with_extension("json"), json).await?;

        info!(path = %target.display(), pack = %options.pack_name, "Sticker written");
        self.sent.lock().await.push(target);
        Ok(())
    }

    async fn reply(&self, message: &InboundMessage, text: &str) -> SessionResult<()> {
        info!(chat_id = %message.chat_id(), "Reply: {}", text);
        self.replies.lock().await.push(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn message(id: &str) -> InboundMessage {
        InboundMessage {
            id: id.into(),
            from: "1@c.us".into(),
            has_media: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_attachments_and_quotes() {
        let quoted = message("orig");
        let mut reply = message("reply");
        reply.has_quoted_message = true;
        let session = LocalSession::new("unused")
            .with_attachment("orig", MediaAsset::png(vec![1], "a.png"))
            .with_quote("reply", quoted.clone());

        assert!(session.download_attachment(&reply).await.unwrap().is_none());
        assert_eq!(session.quoted_message(&reply).await.unwrap(), Some(quoted.clone()));
        assert!(session.download_attachment(&quoted).await.unwrap().is_some());
        assert!(session.quoted_message(&quoted).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unregistered_quote_is_not_found() {
        let mut reply = message("reply");
        reply.has_quoted_message = true;
        let session = LocalSession::new("unused");

        let err = session.quoted_message(&reply).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_send_writes_sticker_and_sidecar() {
        let dir = TempDir::new().unwrap();
        let session = LocalSession::new(dir.path());
        let options = StickerOptions {
            pack_name: "Pack".into(),
            author_name: "Me".into(),
        };

        let payload = StickerPayload::Memory(MediaAsset::png(vec![1, 2, 3], "sticker.png"));
        session.send_sticker("1@c.us", payload, &options).await.unwrap();

        let sent = session.sent_stickers().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(std::fs::read(&sent[0]).unwrap(), vec![1, 2, 3]);

        let raw = std::fs::read(sent[0].with_extension("json")).unwrap();
        let sidecar: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(sidecar["pack_name"], "Pack");
        assert_eq!(sidecar["author_name"], "Me");
        assert_eq!(sidecar["mime_type"], "image/png");
    }

    #[tokio::test]
    async fn test_send_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let session = LocalSession::new(dir.path());
        let payload = StickerPayload::File {
            path: dir.path().join("gone.mp4"),
            mime_type: "video/mp4".into(),
            filename: "square.mp4".into(),
        };
        let options = StickerOptions {
            pack_name: "P".into(),
            author_name: "A".into(),
        };
        assert!(session.send_sticker("1@c.us", payload, &options).await.is_err());
    }
}
