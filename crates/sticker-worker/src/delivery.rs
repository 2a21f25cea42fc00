//! Sticker delivery.

use sticker_models::Credits;
use tracing::debug;

use crate::error::{WorkerError, WorkerResult};
use crate::session::{ChatSession, StickerOptions, StickerPayload};

/// Send `payload` to `chat_id` as a sticker carrying `credits`.
///
/// Not retried. A file payload must stay on disk until this returns.
pub async fn deliver(
    session: &dyn ChatSession,
    chat_id: &str,
    payload: StickerPayload,
    credits: &Credits,
) -> WorkerResult<()> {
    let options = StickerOptions::from(credits);
    let mime_type = payload.mime_type().to_string();
    let filename = payload.filename().to_string();

    session
        .send_sticker(chat_id, payload, &options)
        .await
        .map_err(|e| WorkerError::send_failed(e.to_string()))?;

    debug!(chat_id, %mime_type, %filename, pack = %options.pack_name, "Sticker sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{png_bytes, FakeSession};
    use sticker_models::MediaAsset;

    #[tokio::test]
    async fn test_deliver_passes_credits() {
        let session = FakeSession::default();
        let payload = StickerPayload::Memory(MediaAsset::png(png_bytes(8, 8), "square.png"));

        deliver(&session, "1@c.us", payload, &Credits::new("Pack", "Me"))
            .await
            .unwrap();

        let sent = session.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, "1@c.us");
        assert_eq!(sent[0].filename, "square.png");
        assert_eq!(sent[0].options.pack_name, "Pack");
        assert_eq!(sent[0].options.author_name, "Me");
    }

    #[tokio::test]
    async fn test_send_failure_maps_to_send_failed() {
        let session = FakeSession::default().failing_send();
        let payload = StickerPayload::Memory(MediaAsset::png(png_bytes(8, 8), "resized.png"));

        let err = deliver(&session, "1@c.us", payload, &Credits::new("Pack", "Me"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::SendFailed(_)));
    }
}
