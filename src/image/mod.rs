//! Image decoding, resampling, lossy encoding and data URL handling.

mod codec;
mod data_url;
mod load;

pub use codec::{jpeg_quality, ImageCodec};
pub use data_url::NormalizedImage;
pub use load::RawImageInput;

use image::{DynamicImage, RgbImage};

use crate::error::{DecodeError, Result};

/// Decoded raster image.
pub type Bitmap = DynamicImage;

/// Media type of every normalized image.
pub const JPEG_MEDIA_TYPE: &str = "image/jpeg";

/// Number of channels that take part in scoring.
pub const RGB_CHANNELS: usize = 3;

/// Decode, resample, encode and read back bitmaps.
///
/// Every call works on its own buffers, so one codec can be shared freely
/// across worker threads.
pub trait BitmapCodec: Send + Sync {
    /// Decode raw or base64-decoded bytes into a bitmap.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a readable image.
    fn decode(&self, bytes: &[u8]) -> std::result::Result<Bitmap, DecodeError>;

    /// Resample to exactly `width` x `height` with smooth interpolation.
    fn resample(&self, bitmap: &Bitmap, width: u32, height: u32) -> Bitmap;

    /// Encode as a lossy JPEG at `quality` in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder produced nothing usable.
    fn encode_lossy(&self, bitmap: &Bitmap, quality: f32) -> Result<Vec<u8>>;

    /// Read the RGB channels, discarding alpha.
    fn read_pixels(&self, bitmap: &Bitmap) -> RgbImage;
}
