//! Image normalization: validate, fit within a bounding box, re-encode.

use std::path::Path;

use crate::error::{Error, Result};
use crate::image::{BitmapCodec, ImageCodec, NormalizedImage, RawImageInput};

use super::score::DEFAULT_GRID_SIZE;

/// Largest accepted comparison grid side.
pub const MAX_GRID_SIZE: u32 = 4096;

/// Configuration for the normalization and scoring pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Longer-side cap in pixels for normalized output.
    pub max_dimension: u32,

    /// Lossy re-encode quality (0.0-1.0).
    pub quality: f32,

    /// Raw inputs larger than this many bytes are rejected.
    pub max_file_size: u64,

    /// Side length of the grid both images are resampled to for scoring.
    pub grid_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_dimension: 800,
            quality: 0.8,
            max_file_size: 10 * 1024 * 1024,
            grid_size: DEFAULT_GRID_SIZE,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.max_dimension == 0 {
            return Err(Error::InvalidParameter {
                name: "max_dimension".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.quality) {
            return Err(Error::InvalidParameter {
                name: "quality".to_string(),
                reason: "must be between 0.0 and 1.0".to_string(),
            });
        }

        if self.max_file_size == 0 {
            return Err(Error::InvalidParameter {
                name: "max_file_size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.grid_size == 0 {
            return Err(Error::InvalidParameter {
                name: "grid_size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        let grid_limit = self.max_dimension.min(MAX_GRID_SIZE);
        if self.grid_size > grid_limit {
            return Err(Error::InvalidParameter {
                name: "grid_size".to_string(),
                reason: format!("must not exceed {grid_limit}"),
            });
        }

        Ok(())
    }
}

/// Normalizes raw images and scores before/after pairs.
///
/// The pipeline holds no mutable state; every call is independent and a
/// single pipeline can be shared across threads.
#[derive(Debug, Clone)]
pub struct Pipeline<C = ImageCodec> {
    pub(super) config: Config,
    pub(super) codec: C,
}

impl Pipeline {
    /// Create a new pipeline using the default `image`-crate codec.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_codec(config, ImageCodec::default())
    }
}

impl<C: BitmapCodec> Pipeline<C> {
    /// Create a new pipeline with a custom codec.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_codec(config: Config, codec: C) -> Result<Self> {
        config.validate()?;

        tracing::debug!("Initializing pipeline with config: {config:?}");

        Ok(Self { config, codec })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Read an image file, enforcing `max_file_size` before loading it.
    ///
    /// # Errors
    ///
    /// Returns `FileTooLarge` or an I/O error.
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<RawImageInput> {
        RawImageInput::from_path_with_limit(path, self.config.max_file_size)
    }

    /// Normalize a raw image into a JPEG data URL.
    ///
    /// The image is:
    /// 1. Checked for an `image/*` media type and the size limit
    /// 2. Decoded and checked for non-zero dimensions
    /// 3. Resized so its longer side is at most `max_dimension`
    /// 4. Re-encoded as JPEG at the configured quality
    /// 5. Wrapped as `data:image/jpeg;base64,...`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInputKind`, `FileTooLarge`, `DecodeFailed`,
    /// `InvalidImageDimensions` or `EncodeFailed`.
    pub fn normalize(&self, raw: &RawImageInput) -> Result<NormalizedImage> {
        if !raw.media_type().starts_with("image/") {
            return Err(Error::InvalidInputKind {
                media_type: raw.media_type().to_string(),
            });
        }

        if raw.len() > self.config.max_file_size {
            return Err(Error::FileTooLarge {
                size: raw.len(),
                limit: self.config.max_file_size,
            });
        }

        let bitmap = self.codec.decode(raw.bytes())?;
        let (width, height) = (bitmap.width(), bitmap.height());
        if width == 0 || height == 0 {
            return Err(Error::InvalidImageDimensions { width, height });
        }

        let (target_width, target_height) = fit_within(width, height, self.config.max_dimension);
        if target_width == 0 || target_height == 0 {
            return Err(Error::EncodeFailed {
                reason: format!(
                    "{width}x{height} rounds to {target_width}x{target_height} at max dimension {}",
                    self.config.max_dimension
                ),
            });
        }

        let resized = self.codec.resample(&bitmap, target_width, target_height);
        let jpeg = self.codec.encode_lossy(&resized, self.config.quality)?;
        if jpeg.is_empty() {
            return Err(Error::EncodeFailed {
                reason: "encoder produced no data".to_string(),
            });
        }

        tracing::debug!(
            "Normalized {width}x{height} {} -> {target_width}x{target_height} JPEG ({} bytes)",
            raw.media_type(),
            jpeg.len()
        );

        Ok(NormalizedImage::from_jpeg(&jpeg))
    }
}

/// Dimensions after scaling the longer side down to `max_dimension`.
///
/// Images that already fit are returned unchanged. Width and height are
/// rounded independently, so the aspect ratio can drift by up to half a
/// pixel per side; very thin images can round a side down to 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longer = width.max(height);
    if longer <= max_dimension {
        return (width, height);
    }

    let scale = f64::from(max_dimension) / f64::from(longer);
    // Safe: both results are at most max_dimension
    let scaled = |side: u32| (f64::from(side) * scale).round() as u32;

    (scaled(width), scaled(height))
}
