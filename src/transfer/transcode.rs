//! WebP recompression for rehosted copies.

use super::TransferError;

/// Extension used for recompressed copies.
pub const WEBP_EXTENSION: &str = "webp";

/// Lossy WebP quality for recompressed copies.
pub const WEBP_QUALITY: f32 = 80.0;

/// Decodes any supported image, drops the alpha channel and encodes it as
/// lossy WebP at [`WEBP_QUALITY`].
///
/// # Errors
///
/// Returns [`TransferError::Image`] if the bytes are not a decodable image,
/// or [`TransferError::Encode`] if libwebp rejects the pixels.
pub fn recompress_to_webp(bytes: &[u8]) -> Result<Vec<u8>, TransferError> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let (width, height) = rgb.dimensions();

    let encoded = webp::Encoder::from_rgb(rgb.as_raw(), width, height)
        .encode_simple(false, WEBP_QUALITY)
        .map_err(|status| TransferError::Encode {
            reason: format!("{status:?}"),
        })?;
    Ok(encoded.to_vec())
}

/// Runs [`recompress_to_webp`] on the blocking pool.
///
/// # Errors
///
/// Returns [`TransferError::Image`] on codec failure, or
/// [`TransferError::Task`] if the blocking task panicked.
pub async fn recompress_off_runtime(bytes: Vec<u8>) -> Result<Vec<u8>, TransferError> {
    tokio::task::spawn_blocking(move || recompress_to_webp(&bytes))
        .await
        .map_err(|e| TransferError::Task {
            reason: e.to_string(),
        })?
}

/// Name for the rehosted file: `<hash>.<ext>`, or `<hash>.webp` when recompressed.
#[must_use]
pub fn rehosted_file_name(hash: &str, ext: &str, recompressed: bool) -> String {
    let ext = if recompressed { WEBP_EXTENSION } else { ext };
    format!("{hash}.{ext}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use image::codecs::jpeg::JpegEncoder;
    use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

    use super::*;

    /// Smooth gradients with grain, sized like a small photo.
    fn photo_like_jpeg() -> Vec<u8> {
        let mut seed: u32 = 0x2545_f491;
        let image = RgbImage::from_fn(640, 480, |x, y| {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let grain = i32::try_from(seed >> 28).unwrap() - 8;
            let channel = |base: f32| u8::try_from((base as i32 + grain).clamp(0, 255)).unwrap();
            let (fx, fy) = (x as f32, y as f32);
            Rgb([
                channel(128.0 + 90.0 * (fx / 37.0).sin()),
                channel(128.0 + 90.0 * (fy / 29.0).cos()),
                channel((fx + fy) / 4.5),
            ])
        });
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image)
            .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, 85))
            .unwrap();
        buf.into_inner()
    }

    fn png_with_alpha() -> Vec<u8> {
        let image = RgbaImage::from_pixel(4, 3, Rgba([200, 10, 10, 128]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_recompress_produces_webp_container() {
        let webp = recompress_to_webp(&png_with_alpha()).unwrap();
        assert_eq!(&webp[0..4], b"RIFF");
        assert_eq!(&webp[8..12], b"WEBP");

        let decoded = image::load_from_memory(&webp).unwrap();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_recompress_shrinks_lossy_jpeg() {
        let jpeg = photo_like_jpeg();
        let webp = recompress_to_webp(&jpeg).unwrap();

        assert_eq!(&webp[8..12], b"WEBP");
        assert!(
            webp.len() < jpeg.len(),
            "webp {} bytes should be smaller than jpeg {} bytes",
            webp.len(),
            jpeg.len()
        );
        let decoded = image::load_from_memory(&webp).unwrap();
        assert_eq!(decoded.dimensions(), (640, 480));
    }

    #[test]
    fn test_recompress_rejects_garbage() {
        let err = recompress_to_webp(b"definitely not an image").unwrap_err();
        assert!(matches!(err, TransferError::Image { .. }));
    }

    #[tokio::test]
    async fn test_recompress_off_runtime() {
        let webp = recompress_off_runtime(png_with_alpha()).await.unwrap();
        assert_eq!(&webp[8..12], b"WEBP");
    }

    #[test]
    fn test_rehosted_file_name() {
        assert_eq!(rehosted_file_name("abc", "png", false), "abc.png");
        assert_eq!(rehosted_file_name("abc", "png", true), "abc.webp");
    }
}
