use bytes::Bytes;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, GenericImageView};
use tracing::debug;

/// Uploads above this size are downscaled before the external call.
pub const RESIZE_THRESHOLD_BYTES: usize = 1024 * 1024;
/// Longer edge after downscaling.
const MAX_EDGE: u32 = 1000;
const JPEG_QUALITY: u8 = 70;

/// Bound the payload shipped to the external model: encodings over the
/// threshold are decoded, constrained to `MAX_EDGE` on the longer side and
/// re-encoded as JPEG; anything smaller passes through untouched.
pub fn downscale_if_large(bytes: Bytes, threshold: usize) -> anyhow::Result<Bytes> {
    if bytes.len() <= threshold {
        return Ok(bytes);
    }

    let decoded = image::load_from_memory(&bytes)?;
    let (width, height) = decoded.dimensions();

    let resized = if width > MAX_EDGE || height > MAX_EDGE {
        decoded.resize(MAX_EDGE, MAX_EDGE, FilterType::Triangle)
    } else {
        decoded
    };

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    resized.to_rgb8().write_with_encoder(encoder)?;

    debug!(
        original_bytes = bytes.len(),
        resized_bytes = out.len(),
        width,
        height,
        "image downscaled for inference"
    );
    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use rand::Rng;

    fn noise_png(width: u32, height: u32) -> Bytes {
        let mut rng = rand::thread_rng();
        let mut img = RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            pixel.0 = [rng.gen(), rng.gen(), rng.gen()];
        }
        let mut out = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .expect("encode png");
        Bytes::from(out.into_inner())
    }

    #[test]
    fn small_upload_passes_through_unmodified() {
        let original = noise_png(10, 10);
        let result =
            downscale_if_large(original.clone(), RESIZE_THRESHOLD_BYTES).expect("prepare");
        assert_eq!(result, original);
    }

    #[test]
    fn oversized_upload_is_constrained_to_max_edge() {
        // random noise defeats PNG compression, so this clears 1 MB
        let original = noise_png(1400, 900);
        assert!(original.len() > RESIZE_THRESHOLD_BYTES);

        let result = downscale_if_large(original, RESIZE_THRESHOLD_BYTES).expect("prepare");
        let decoded = image::load_from_memory(&result).expect("decode");
        let (w, h) = decoded.dimensions();
        assert!(w.max(h) <= 1000, "longer edge was {}", w.max(h));
        // aspect ratio preserved: 1400x900 -> 1000x643
        assert_eq!(w, 1000);
    }

    #[test]
    fn resized_output_is_jpeg() {
        let original = noise_png(1400, 900);
        let result = downscale_if_large(original, 0).expect("prepare");
        assert_eq!(
            image::guess_format(&result).expect("format"),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn large_encoding_with_small_dimensions_is_reencoded_not_stretched() {
        let original = noise_png(800, 600);
        let result = downscale_if_large(original, 0).expect("prepare");
        let decoded = image::load_from_memory(&result).expect("decode");
        assert_eq!(decoded.dimensions(), (800, 600));
    }

    #[test]
    fn garbage_bytes_over_threshold_error() {
        let garbage = Bytes::from(vec![0u8; 64]);
        assert!(downscale_if_large(garbage, 0).is_err());
    }
}
