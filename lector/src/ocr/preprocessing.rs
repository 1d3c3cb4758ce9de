//! The preprocessing pipeline that sits between an upload and the
//! recognition engine.
//!
//! Every upload goes through the same fixed stage sequence:
//!
//! 1. Grayscale conversion (luminance-weighted channel collapse)
//! 2. Non-local-means-style denoising with a fixed strength
//! 3. Otsu global binarization to exactly two levels
//!
//! The stages are total: given a decoded image they always produce a
//! cleaned image of identical dimensions. Cropping, rotation, deskew
//! and any language-specific shaping are out of scope here.

use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, ImageReader};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};

use crate::error::{LectorError, Result};

/// Smoothing strength for the denoising pass. Carried over from the
/// original deployment; treated as a fixed constant, not configuration.
const DENOISE_STRENGTH: f32 = 10.0;

/// Half-width of the patches compared during denoising (3x3 patches).
const PATCH_RADIUS: i64 = 1;

/// Half-width of the search window scanned per pixel (7x7 window).
const SEARCH_RADIUS: i64 = 3;

/// Decode uploaded bytes into an in-memory image.
///
/// An empty upload is the caller's mistake and maps to a 400; bytes
/// that are present but unparseable are a processing failure and map
/// to a 500. A successful decode always has non-zero dimensions.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(LectorError::Validation("Empty image upload".to_string()));
    }

    let reader = ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| LectorError::Decode(format!("Failed to read image: {e}")))?;

    let img = reader
        .decode()
        .map_err(|e| LectorError::Decode(format!("Failed to decode image: {e}")))?;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(LectorError::Decode(format!(
            "Decoded image has degenerate dimensions: {width}x{height}"
        )));
    }

    Ok(img)
}

/// Run the full pipeline: grayscale, denoise, binarize.
///
/// The result has the same width and height as the input and contains
/// at most two distinct intensities, drawn from {0, 255}.
pub fn preprocess(img: &DynamicImage) -> GrayImage {
    let gray = img.to_luma8();
    let smoothed = denoise(&gray);
    binarize(&smoothed)
}

/// Non-local-means-style smoothing with a fixed strength.
///
/// For each pixel, nearby pixels are weighted by how similar their
/// surrounding patches look, so speckle averages out while character
/// strokes keep their edges. Output dimensions match the input and
/// values stay within the input's intensity range.
fn denoise(gray: &GrayImage) -> GrayImage {
    let (width, height) = gray.dimensions();
    let h_sq = DENOISE_STRENGTH * DENOISE_STRENGTH;

    GrayImage::from_fn(width, height, |x, y| {
        let (x, y) = (x as i64, y as i64);
        let mut value_sum = 0.0f32;
        let mut weight_sum = 0.0f32;

        for ny in (y - SEARCH_RADIUS)..=(y + SEARCH_RADIUS) {
            for nx in (x - SEARCH_RADIUS)..=(x + SEARCH_RADIUS) {
                let dist = patch_distance(gray, x, y, nx, ny);
                let weight = (-dist / h_sq).exp();
                value_sum += weight * pixel_clamped(gray, nx, ny);
                weight_sum += weight;
            }
        }

        // weight_sum >= 1.0: the center pixel always contributes weight 1
        let value = (value_sum / weight_sum).round().clamp(0.0, 255.0) as u8;
        image::Luma([value])
    })
}

/// Mean squared difference between the patches centered at (ax, ay)
/// and (bx, by). Coordinates outside the image clamp to the border.
fn patch_distance(gray: &GrayImage, ax: i64, ay: i64, bx: i64, by: i64) -> f32 {
    let mut sum = 0.0f32;
    for dy in -PATCH_RADIUS..=PATCH_RADIUS {
        for dx in -PATCH_RADIUS..=PATCH_RADIUS {
            let diff = pixel_clamped(gray, ax + dx, ay + dy) - pixel_clamped(gray, bx + dx, by + dy);
            sum += diff * diff;
        }
    }
    let patch_len = (2 * PATCH_RADIUS + 1) * (2 * PATCH_RADIUS + 1);
    sum / patch_len as f32
}

fn pixel_clamped(gray: &GrayImage, x: i64, y: i64) -> f32 {
    let x = x.clamp(0, gray.width() as i64 - 1) as u32;
    let y = y.clamp(0, gray.height() as i64 - 1) as u32;
    gray.get_pixel(x, y).0[0] as f32
}

/// Reduce a grayscale image to two levels with a global Otsu threshold.
///
/// The threshold is computed per image from its intensity histogram,
/// never a fixed constant, so typography separates from background
/// regardless of how the upload was lit or scanned. A uniform image
/// yields a degenerate threshold and a consistent single-class output.
fn binarize(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    threshold(gray, level, ThresholdType::Binary)
}

/// Encode the cleaned image as PNG bytes for staging and recognition.
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    DynamicImage::ImageLuma8(img.clone())
        .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
        .map_err(|e| LectorError::Decode(format!("Failed to encode image: {e}")))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut output = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut output), format)
            .unwrap();
        output
    }

    fn flat_png(width: u32, height: u32, value: u8) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([value, value, value]));
        encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
    }

    fn distinct_levels(img: &GrayImage) -> Vec<u8> {
        let mut levels: Vec<u8> = img.pixels().map(|p| p.0[0]).collect();
        levels.sort_unstable();
        levels.dedup();
        levels
    }

    #[test]
    fn decode_valid_png_preserves_dimensions() {
        let bytes = flat_png(200, 80, 255);
        let img = decode_image(&bytes).unwrap();
        assert_eq!(img.dimensions(), (200, 80));
    }

    #[test]
    fn decode_valid_jpeg_preserves_dimensions() {
        let img = RgbImage::from_pixel(64, 48, Rgb([120, 120, 120]));
        let bytes = encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg);
        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[test]
    fn decode_empty_bytes_is_a_caller_error() {
        let result = decode_image(&[]);
        assert!(matches!(result, Err(LectorError::Validation(_))));
    }

    #[test]
    fn decode_garbage_bytes_fails() {
        let result = decode_image(b"this is not an image at all");
        assert!(matches!(result, Err(LectorError::Decode(_))));
    }

    #[test]
    fn decode_truncated_png_fails() {
        let bytes = flat_png(100, 100, 200);
        let truncated = &bytes[..bytes.len() / 2];
        let result = decode_image(truncated);
        assert!(matches!(result, Err(LectorError::Decode(_))));
    }

    #[test]
    fn preprocess_preserves_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 48, |x, y| {
            Rgb([(x * 4) as u8, (y * 5) as u8, 90])
        }));
        let cleaned = preprocess(&img);
        assert_eq!(cleaned.dimensions(), (64, 48));
    }

    #[test]
    fn preprocess_output_is_two_level() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(40, 40, |x, y| {
            let v = ((x + y) * 3 % 256) as u8;
            Rgb([v, v, v])
        }));
        let cleaned = preprocess(&img);
        let levels = distinct_levels(&cleaned);
        assert!(levels.len() <= 2, "expected at most two levels: {levels:?}");
        assert!(levels.iter().all(|l| *l == 0 || *l == 255));
    }

    #[test]
    fn preprocess_uniform_image_does_not_fail() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([128, 128, 128])));
        let cleaned = preprocess(&img);
        assert_eq!(cleaned.dimensions(), (32, 32));

        let levels = distinct_levels(&cleaned);
        assert_eq!(levels.len(), 1, "uniform input maps to one class");
        assert!(levels[0] == 0 || levels[0] == 255);
    }

    #[test]
    fn preprocess_accepts_grayscale_input() {
        let gray = GrayImage::from_fn(30, 20, |x, _| Luma([(x * 8) as u8]));
        let cleaned = preprocess(&DynamicImage::ImageLuma8(gray));
        assert_eq!(cleaned.dimensions(), (30, 20));
    }

    #[test]
    fn binarize_separates_bimodal_image() {
        // Dark left half, light right half; interior pixels are far
        // enough from the seam that smoothing cannot flip them.
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(20, 20, |x, _| {
            if x < 10 {
                Luma([30])
            } else {
                Luma([220])
            }
        }));
        let cleaned = preprocess(&img);

        assert_eq!(cleaned.get_pixel(1, 10).0[0], 0, "dark side is background");
        assert_eq!(cleaned.get_pixel(18, 10).0[0], 255, "light side is foreground");
    }

    #[test]
    fn denoise_preserves_dimensions_and_range() {
        let gray = GrayImage::from_fn(32, 32, |x, y| Luma([((x * 13 + y * 7) % 200 + 20) as u8]));
        let (min, max) = gray
            .pixels()
            .fold((255u8, 0u8), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));

        let smoothed = denoise(&gray);

        assert_eq!(smoothed.dimensions(), gray.dimensions());
        for pixel in smoothed.pixels() {
            assert!(pixel.0[0] >= min && pixel.0[0] <= max);
        }
    }

    #[test]
    fn denoise_flattens_speckle() {
        // A flat field with one mildly noisy pixel: smoothing should
        // pull the speckle toward its neighborhood.
        let mut gray = GrayImage::from_pixel(16, 16, Luma([200]));
        gray.put_pixel(8, 8, Luma([188]));

        let smoothed = denoise(&gray);
        let center = smoothed.get_pixel(8, 8).0[0];
        assert!(
            center > 188,
            "speckle should move toward the field, got {center}"
        );
    }

    #[test]
    fn encode_png_round_trips() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([255, 255, 255])));
        let cleaned = preprocess(&img);
        let bytes = encode_png(&cleaned).unwrap();

        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (10, 10));
    }
}
