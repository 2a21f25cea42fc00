//! Fakes shared by the pipeline tests.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage, Rgba, RgbaImage};
use sticker_bg_client::{BackgroundRemover, RemovalError, RemovalResult};
use sticker_models::MediaAsset;
use tokio::sync::Mutex;

use crate::session::{
    ChatSession, InboundMessage, SessionError, SessionResult, StickerOptions, StickerPayload,
};

pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        Rgba([200, 40, 40, 255]),
    ));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png).unwrap();
    buf
}

pub(crate) fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([20, 120, 220])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Jpeg(90)).unwrap();
    buf
}

pub(crate) fn png_dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes).unwrap();
    (img.width(), img.height())
}

pub(crate) fn media_message(id: &str, caption: &str) -> InboundMessage {
    InboundMessage {
        id: id.to_string(),
        from: "111@c.us".to_string(),
        author: None,
        body: caption.to_string(),
        has_media: true,
        has_quoted_message: false,
    }
}

pub(crate) fn text_message(id: &str, body: &str) -> InboundMessage {
    InboundMessage {
        has_media: false,
        ..media_message(id, body)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SentSticker {
    pub chat_id: String,
    pub mime_type: String,
    pub filename: String,
    pub bytes: Vec<u8>,
    pub options: StickerOptions,
}

/// Scripted chat session.
///
/// Direct downloads pop results from a queue (empty queue means no media).
/// The quoted message, if set, always downloads successfully.
#[derive(Default)]
pub(crate) struct FakeSession {
    direct: Mutex<VecDeque<Result<Option<MediaAsset>, String>>>,
    quoted: Option<(InboundMessage, MediaAsset)>,
    fail_send: bool,
    hang_downloads: bool,
    pub download_calls: AtomicUsize,
    pub sent: Mutex<Vec<SentSticker>>,
    pub replies: Mutex<Vec<String>>,
}

impl FakeSession {
    pub fn with_media(asset: MediaAsset) -> Self {
        Self::scripted(vec![Ok(Some(asset))])
    }

    pub fn scripted(results: Vec<Result<Option<MediaAsset>, String>>) -> Self {
        Self {
            direct: Mutex::new(results.into()),
            ..Default::default()
        }
    }

    pub fn with_quoted(self, quoted_id: &str, asset: MediaAsset) -> Self {
        self.with_quoted_message(media_message(quoted_id, ""), asset)
    }

    pub fn with_quoted_message(mut self, quoted: InboundMessage, asset: MediaAsset) -> Self {
        self.quoted = Some((quoted, asset));
        self
    }

    /// Downloads never complete.
    pub fn hanging() -> Self {
        Self {
            hang_downloads: true,
            ..Default::default()
        }
    }

    pub fn failing_send(mut self) -> Self {
        self.fail_send = true;
        self
    }

    pub async fn sent(&self) -> Vec<SentSticker> {
        self.sent.lock().await.clone()
    }

    pub async fn replies(&self) -> Vec<String> {
        self.replies.lock().await.clone()
    }
}

#[async_trait]
impl ChatSession for FakeSession {
    async fn download_attachment(
        &self,
        message: &InboundMessage,
    ) -> SessionResult<Option<MediaAsset>> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_downloads {
            std::future::pending::<()>().await;
        }
        if let Some((quoted, asset)) = &self.quoted {
            if quoted.id == message.id {
                return Ok(Some(asset.clone()));
            }
        }
        match self.direct.lock().await.pop_front() {
            Some(Ok(asset)) => Ok(asset),
            Some(Err(e)) => Err(SessionError::Download(e)),
            None => Ok(None),
        }
    }

    async fn quoted_message(
        &self,
        message: &InboundMessage,
    ) -> SessionResult<Option<InboundMessage>> {
        if !message.has_quoted_message {
            return Ok(None);
        }
        Ok(self.quoted.as_ref().map(|(m, _)| m.clone()))
    }

    async fn send_sticker(
        &self,
        chat_id: &str,
        payload: StickerPayload,
        options: &StickerOptions,
    ) -> SessionResult<()> {
        if self.fail_send {
            return Err(SessionError::Send("transport offline".into()));
        }
        let (mime_type, filename, bytes) = match payload {
            StickerPayload::Memory(asset) => (asset.mime_type, asset.filename, asset.bytes),
            StickerPayload::File {
                path,
                mime_type,
                filename,
            } => (mime_type, filename, tokio::fs::read(&path).await?),
        };
        self.sent.lock().await.push(SentSticker {
            chat_id: chat_id.to_string(),
            mime_type,
            filename,
            bytes,
            options: options.clone(),
        });
        Ok(())
    }

    async fn reply(&self, _message: &InboundMessage, text: &str) -> SessionResult<()> {
        self.replies.lock().await.push(text.to_string());
        Ok(())
    }
}

/// Background remover returning a fixed image or a fixed HTTP status.
pub(crate) struct FakeRemover {
    result: Result<Vec<u8>, u16>,
    pub calls: AtomicUsize,
}

impl FakeRemover {
    pub fn returning(bytes: Vec<u8>) -> Self {
        Self {
            result: Ok(bytes),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            result: Err(status),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackgroundRemover for FakeRemover {
    async fn remove_background(&self, _image: &[u8]) -> RemovalResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Ok(bytes) => Ok(bytes.clone()),
            Err(status) => Err(RemovalError::status(*status, "forbidden")),
        }
    }
}
