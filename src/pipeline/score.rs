//! Change scoring between a before and an after image.

use crate::error::{Error, Result, Side};
use crate::image::{Bitmap, BitmapCodec, NormalizedImage, RGB_CHANNELS};

use super::Pipeline;

/// Default side length of the comparison grid.
pub const DEFAULT_GRID_SIZE: u32 = 64;

/// Highest possible change score.
const MAX_SCORE: f64 = 100.0;

impl<C: BitmapCodec> Pipeline<C> {
    /// Score the visual change between two normalized images.
    ///
    /// Both images are resampled to a `grid_size` square, and the mean
    /// absolute RGB difference is mapped onto 0-100. Identical images score
    /// 0 and a black/white pair scores 100. Argument order does not matter.
    ///
    /// # Errors
    ///
    /// Returns `ScoringFailed` naming the side that could not be decoded.
    pub fn score(&self, before: &NormalizedImage, after: &NormalizedImage) -> Result<u8> {
        let before_bitmap = self
            .decode_normalized(before)
            .map_err(|err| err.on_side(Side::Before))?;
        let after_bitmap = self
            .decode_normalized(after)
            .map_err(|err| err.on_side(Side::After))?;

        let score = score_bitmaps(
            &self.codec,
            &before_bitmap,
            &after_bitmap,
            self.config.grid_size,
        );
        tracing::debug!("Change score {score}");

        Ok(score)
    }

    fn decode_normalized(&self, image: &NormalizedImage) -> Result<Bitmap> {
        let bytes = image.decode_bytes()?;
        let bitmap = self.codec.decode(&bytes)?;

        if bitmap.width() == 0 || bitmap.height() == 0 {
            return Err(Error::InvalidImageDimensions {
                width: bitmap.width(),
                height: bitmap.height(),
            });
        }

        Ok(bitmap)
    }
}

/// Score two decoded bitmaps on a `grid_size` x `grid_size` grid.
///
/// Only the red, green and blue channels take part.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn score_bitmaps<C: BitmapCodec>(
    codec: &C,
    before: &Bitmap,
    after: &Bitmap,
    grid_size: u32,
) -> u8 {
    let before = codec.read_pixels(&codec.resample(before, grid_size, grid_size));
    let after = codec.read_pixels(&codec.resample(after, grid_size, grid_size));

    let total_diff: f64 = before
        .pixels()
        .zip(after.pixels())
        .map(|(b, a)| {
            let channel_sum: u32 = (0..RGB_CHANNELS)
                .map(|c| u32::from(b[c].abs_diff(a[c])))
                .sum();
            f64::from(channel_sum) / RGB_CHANNELS as f64
        })
        .sum();

    let pixel_count = f64::from(grid_size) * f64::from(grid_size);
    let score = (total_diff / pixel_count / 255.0 * MAX_SCORE).round();

    // Safe: clamped to [0, 100] before casting
    score.clamp(0.0, MAX_SCORE) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageCodec;
    use crate::pipeline::Config;
    use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Bitmap {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)))
    }

    fn gradient(width: u32, height: u32) -> Bitmap {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    fn encoded(bitmap: &Bitmap) -> NormalizedImage {
        NormalizedImage::from_jpeg(&ImageCodec::default().encode_lossy(bitmap, 0.8).unwrap())
    }

    #[test]
    fn test_black_white_is_100() {
        let codec = ImageCodec::default();
        let black = solid(100, 50, [0, 0, 0]);
        let white = solid(30, 70, [255, 255, 255]);

        assert_eq!(score_bitmaps(&codec, &black, &white, 64), 100);
    }

    #[test]
    fn test_identical_is_zero() {
        let codec = ImageCodec::default();
        let img = gradient(90, 60);

        assert_eq!(score_bitmaps(&codec, &img, &img, 64), 0);
    }

    #[test]
    fn test_half_intensity() {
        let codec = ImageCodec::default();
        let black = solid(8, 8, [0, 0, 0]);
        // Only red changes: 255 / 3 per pixel -> 33.33
        let red = solid(8, 8, [255, 0, 0]);

        assert_eq!(score_bitmaps(&codec, &black, &red, 64), 33);
    }

    #[test]
    fn test_alpha_is_ignored() {
        let codec = ImageCodec::default();
        let opaque = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([10, 20, 30, 255])));
        let clear = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([10, 20, 30, 0])));

        assert_eq!(score_bitmaps(&codec, &opaque, &clear, 64), 0);
    }

    #[test]
    fn test_score_symmetric() {
        let pipeline = Pipeline::new(Config::default()).unwrap();
        let a = encoded(&gradient(120, 80));
        let b = encoded(&solid(50, 50, [200, 40, 90]));

        let ab = pipeline.score(&a, &b).unwrap();
        let ba = pipeline.score(&b, &a).unwrap();
        assert_eq!(ab, ba);
        assert!(ab <= 100);
    }

    #[test]
    fn test_score_same_image_is_zero() {
        let pipeline = Pipeline::new(Config::default()).unwrap();
        let a = encoded(&gradient(200, 100));

        assert_eq!(pipeline.score(&a, &a).unwrap(), 0);
    }

    #[test]
    fn test_score_names_failing_side() {
        let pipeline = Pipeline::new(Config::default()).unwrap();
        let good = encoded(&solid(10, 10, [1, 2, 3]));
        let bad = NormalizedImage::parse("data:image/jpeg;base64,AAAA").unwrap();

        assert!(matches!(
            pipeline.score(&bad, &good),
            Err(Error::ScoringFailed { side: Side::Before, .. })
        ));
        assert!(matches!(
            pipeline.score(&good, &bad),
            Err(Error::ScoringFailed { side: Side::After, .. })
        ));
    }

    #[test]
    fn test_custom_grid_size() {
        let config = Config {
            grid_size: 8,
            ..Config::default()
        };
        let pipeline = Pipeline::new(config).unwrap();
        let black = encoded(&solid(40, 40, [0, 0, 0]));
        let white = encoded(&solid(40, 40, [255, 255, 255]));

        assert_eq!(pipeline.score(&black, &white).unwrap(), 100);
    }
}
