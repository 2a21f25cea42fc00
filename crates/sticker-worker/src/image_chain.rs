//! Still-image transform chain: optional background removal, then square
//! crop or size clamp, always ending in a PNG.

use std::sync::Arc;

use sticker_bg_client::BackgroundRemover;
use sticker_media::{process_still, StillOp};
use sticker_models::encoding::STICKER_SIZE_PX;
use sticker_models::{Intent, MediaAsset};
use tracing::debug;

use crate::error::ChainError;

pub const SQUARE_IMAGE_FILENAME: &str = "square.png";
pub const RESIZED_FILENAME: &str = "resized.png";

#[derive(Clone)]
pub struct ImageTransformChain {
    remover: Arc<dyn BackgroundRemover>,
    max_side: u32,
}

impl ImageTransformChain {
    pub fn new(remover: Arc<dyn BackgroundRemover>) -> Self {
        Self {
            remover,
            max_side: STICKER_SIZE_PX,
        }
    }

    pub async fn transform(
        &self,
        asset: &MediaAsset,
        intent: &Intent,
    ) -> Result<MediaAsset, ChainError> {
        let source = if intent.wants_background_removal {
            let cut = self
                .remover
                .remove_background(&asset.bytes)
                .await
                .map_err(ChainError::BackgroundRemovalFailed)?;
            debug!(input = asset.len(), output = cut.len(), "Background removed");
            cut
        } else {
            asset.bytes.clone()
        };

        let op = if intent.wants_square {
            StillOp::Square
        } else {
            StillOp::Clamp
        };
        let max_side = self.max_side;

        let processed = tokio::task::spawn_blocking(move || process_still(&source, op, max_side))
            .await
            .map_err(|e| ChainError::Internal(e.to_string()))?
            .map_err(ChainError::from_image_error)?;

        Ok(MediaAsset::png(processed.bytes, output_filename(intent)))
    }
}

/// Named after the last structural step: the square crop, or else the clamp
/// (which also runs after background removal).
fn output_filename(intent: &Intent) -> &'static str {
    if intent.wants_square {
        SQUARE_IMAGE_FILENAME
    } else {
        RESIZED_FILENAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{jpeg_bytes, png_bytes, png_dimensions, FakeRemover};
    use sticker_models::asset::PNG_MIME;

    fn intent(square: bool, rbg: bool) -> Intent {
        Intent {
            wants_square: square,
            wants_background_removal: rbg,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_clamp_without_directives() {
        let remover = Arc::new(FakeRemover::returning(png_bytes(1, 1)));
        let chain = ImageTransformChain::new(remover.clone());
        let asset = MediaAsset::new(jpeg_bytes(1200, 800), "image/jpeg", "photo.jpg");

        let out = chain.transform(&asset, &intent(false, false)).await.unwrap();

        assert_eq!(out.mime_type, PNG_MIME);
        assert_eq!(out.filename, RESIZED_FILENAME);
        assert_eq!(png_dimensions(&out.bytes), (512, 341));
        assert_eq!(remover.calls(), 0);
    }

    #[tokio::test]
    async fn test_square_after_background_removal() {
        let remover = Arc::new(FakeRemover::returning(png_bytes(900, 1400)));
        let chain = ImageTransformChain::new(remover.clone());
        let asset = MediaAsset::png(png_bytes(900, 1400), "photo.png");

        let out = chain.transform(&asset, &intent(true, true)).await.unwrap();

        assert_eq!(out.filename, SQUARE_IMAGE_FILENAME);
        assert_eq!(png_dimensions(&out.bytes), (512, 512));
        assert_eq!(remover.calls(), 1);
    }

    #[tokio::test]
    async fn test_small_square_is_not_enlarged() {
        let chain = ImageTransformChain::new(Arc::new(FakeRemover::failing(500)));
        let asset = MediaAsset::png(png_bytes(300, 600), "photo.png");

        let out = chain.transform(&asset, &intent(true, false)).await.unwrap();
        assert_eq!(png_dimensions(&out.bytes), (300, 300));
    }

    #[tokio::test]
    async fn test_background_only_is_named_after_clamp() {
        let chain = ImageTransformChain::new(Arc::new(FakeRemover::returning(png_bytes(200, 100))));
        let asset = MediaAsset::png(png_bytes(200, 100), "photo.png");

        let out = chain.transform(&asset, &intent(false, true)).await.unwrap();
        assert_eq!(out.filename, RESIZED_FILENAME);
        assert_eq!(png_dimensions(&out.bytes), (200, 100));
    }

    #[tokio::test]
    async fn test_removal_failure_is_not_skipped() {
        let chain = ImageTransformChain::new(Arc::new(FakeRemover::failing(403)));
        let asset = MediaAsset::png(png_bytes(64, 64), "photo.png");

        let err = chain.transform(&asset, &intent(true, true)).await.unwrap_err();
        assert!(matches!(err, ChainError::BackgroundRemovalFailed(_)));
    }

    #[tokio::test]
    async fn test_undecodable_input() {
        let chain = ImageTransformChain::new(Arc::new(FakeRemover::failing(500)));
        let asset = MediaAsset::new(b"not an image".to_vec(), "image/jpeg", "x.jpg");

        let err = chain.transform(&asset, &intent(false, false)).await.unwrap_err();
        assert!(matches!(err, ChainError::Decode(_)));
    }

    #[tokio::test]
    async fn test_square_is_idempotent() {
        let chain = ImageTransformChain::new(Arc::new(FakeRemover::failing(500)));
        let asset = MediaAsset::png(png_bytes(1000, 700), "photo.png");

        let once = chain.transform(&asset, &intent(true, false)).await.unwrap();
        let twice = chain.transform(&once, &intent(true, false)).await.unwrap();
        assert_eq!(png_dimensions(&once.bytes), (512, 512));
        assert_eq!(png_dimensions(&twice.bytes), (512, 512));
    }
}
