//! `image`-crate implementation of [`BitmapCodec`].

use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, Rgb, RgbImage};

use crate::error::{DecodeError, Error, Result};

use super::{Bitmap, BitmapCodec};

/// Default codec backed by the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct ImageCodec {
    filter: FilterType,
}

impl ImageCodec {
    /// Create a codec that resamples with the given filter.
    ///
    /// `FilterType::Nearest` is accepted but gives blocky output; the default
    /// is `Triangle` (bilinear).
    #[must_use]
    pub const fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self::with_filter(FilterType::Triangle)
    }
}

impl BitmapCodec for ImageCodec {
    fn decode(&self, bytes: &[u8]) -> std::result::Result<Bitmap, DecodeError> {
        Ok(image::load_from_memory(bytes)?)
    }

    fn resample(&self, bitmap: &Bitmap, width: u32, height: u32) -> Bitmap {
        if bitmap.width() == width && bitmap.height() == height {
            return bitmap.clone();
        }
        bitmap.resize_exact(width, height, self.filter)
    }

    fn encode_lossy(&self, bitmap: &Bitmap, quality: f32) -> Result<Vec<u8>> {
        if bitmap.width() == 0 || bitmap.height() == 0 {
            return Err(Error::EncodeFailed {
                reason: format!(
                    "cannot encode a {}x{} bitmap",
                    bitmap.width(),
                    bitmap.height()
                ),
            });
        }

        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(flatten_onto_black(bitmap));

        let mut output = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut output, jpeg_quality(quality));
        rgb.write_with_encoder(encoder)
            .map_err(|source| Error::EncodeFailed {
                reason: source.to_string(),
            })?;

        if output.is_empty() {
            return Err(Error::EncodeFailed {
                reason: "encoder produced no data".to_string(),
            });
        }

        Ok(output)
    }

    fn read_pixels(&self, bitmap: &Bitmap) -> RgbImage {
        bitmap.to_rgb8()
    }
}

/// Composite any transparency onto an opaque black background.
#[allow(clippy::cast_possible_truncation)]
fn flatten_onto_black(bitmap: &Bitmap) -> RgbImage {
    if !bitmap.color().has_alpha() {
        return bitmap.to_rgb8();
    }

    let rgba = bitmap.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        // Safe: channel * alpha / 255 is at most 255
        let scale = |c: u8| ((u32::from(c) * u32::from(a) + 127) / 255) as u8;
        Rgb([scale(r), scale(g), scale(b)])
    })
}

/// Map a `[0, 1]` quality factor onto the JPEG encoder's 1-100 scale.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn jpeg_quality(quality: f32) -> u8 {
    // Safe: clamped to [1, 100] before casting
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}
