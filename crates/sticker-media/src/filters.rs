//! FFmpeg video filter definitions.

use sticker_models::SquareVideoParams;

/// Centered square crop on the shorter side. FFmpeg centers the crop window by default.
pub const FILTER_SQUARE_CROP: &str = "crop='min(iw,ih)':'min(iw,ih)'";

/// Build the square sticker filter graph: crop, then scale, then resample the frame rate.
pub fn build_square_filter(params: &SquareVideoParams) -> String {
    format!(
        "{},scale={size}:{size}:flags=lanczos,fps={fps}",
        FILTER_SQUARE_CROP,
        size = params.size_px,
        fps = params.fps
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_square_filter() {
        let filter = build_square_filter(&SquareVideoParams::default());
        assert_eq!(
            filter,
            "crop='min(iw,ih)':'min(iw,ih)',scale=512:512:flags=lanczos,fps=15"
        );
    }

    #[test]
    fn test_filter_stage_order() {
        let filter = build_square_filter(&SquareVideoParams {
            max_duration_secs: 3,
            size_px: 256,
            fps: 10,
        });
        let crop = filter.find("crop=").unwrap();
        let scale = filter.find("scale=256:256").unwrap();
        let fps = filter.find("fps=10").unwrap();
        assert!(crop < scale && scale < fps);
    }
}
