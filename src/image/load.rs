//! Raw, not yet normalized image input.

use std::fs;
use std::path::Path;

use image::ImageFormat;

use crate::error::{Error, Result};

/// Bytes of a user-chosen file together with its declared media type.
#[derive(Debug, Clone)]
pub struct RawImageInput {
    bytes: Vec<u8>,
    media_type: String,
}

impl RawImageInput {
    /// Wrap in-memory bytes with an explicit media type.
    #[must_use]
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
        }
    }

    /// Read a file from disk, declaring its media type from the extension.
    ///
    /// Files with an unrecognised extension are declared
    /// `application/octet-stream` and will be rejected by the normalizer.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read(path.as_ref())
    }

    /// Like [`RawImageInput::from_path`], but refuse files larger than
    /// `limit` bytes before reading them.
    ///
    /// # Errors
    ///
    /// Returns `FileTooLarge` if the file exceeds `limit`, or an I/O error if
    /// it cannot be read.
    pub fn from_path_with_limit<P: AsRef<Path>>(path: P, limit: u64) -> Result<Self> {
        let path = path.as_ref();
        let size = fs::metadata(path)?.len();
        if size > limit {
            return Err(Error::FileTooLarge { size, limit });
        }
        Self::read(path)
    }

    fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let media_type = media_type_for(path);

        tracing::debug!(
            "Read {} ({media_type}, {} bytes)",
            path.display(),
            bytes.len()
        );

        Ok(Self { bytes, media_type })
    }

    /// The raw file contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The declared media type, e.g. `image/png`.
    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Size of the raw input in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Whether the input holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn media_type_for(path: &Path) -> String {
    ImageFormat::from_path(path).map_or_else(
        |_| "application/octet-stream".to_string(),
        |format| format.to_mime_type().to_string(),
    )
}
