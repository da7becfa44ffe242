//! Canonical `data:image/...;base64,` form of a processed image.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

use super::JPEG_MEDIA_TYPE;

const SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// An image encoded as a base64 data URL, as persisted in a record.
///
/// Images produced by the normalizer are always `data:image/jpeg;base64,...`.
/// Parsing also accepts other `image/*` types so previously saved or
/// hand-imported records still load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NormalizedImage(String);

impl NormalizedImage {
    /// Wrap JPEG bytes as a data URL.
    #[must_use]
    pub fn from_jpeg(bytes: &[u8]) -> Self {
        Self(format!(
            "{SCHEME}{JPEG_MEDIA_TYPE}{BASE64_MARKER}{}",
            STANDARD.encode(bytes)
        ))
    }

    /// Parse and validate a data URL string.
    ///
    /// A leading `data:` is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the string has no `image/*` media type or no
    /// base64 marker.
    pub fn parse(value: impl Into<String>) -> Result<Self, DecodeError> {
        let value = value.into();
        let body = value.strip_prefix(SCHEME).unwrap_or(&value);

        let Some((media_type, _)) = body.split_once(BASE64_MARKER) else {
            return Err(DecodeError::DataUrl {
                reason: "missing ;base64, marker".to_string(),
            });
        };
        if !media_type.starts_with("image/") || media_type.len() == "image/".len() {
            return Err(DecodeError::DataUrl {
                reason: format!("media type {media_type:?} is not an image type"),
            });
        }

        Ok(Self(value))
    }

    /// The declared media type, e.g. `image/jpeg`.
    #[must_use]
    pub fn media_type(&self) -> &str {
        self.split().0
    }

    /// The base64 payload without the header.
    #[must_use]
    pub fn payload(&self) -> &str {
        self.split().1
    }

    /// Decode the base64 payload into the encoded image bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid base64.
    pub fn decode_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        Ok(STANDARD.decode(self.payload())?)
    }

    /// The full data URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn split(&self) -> (&str, &str) {
        let body = self.0.strip_prefix(SCHEME).unwrap_or(&self.0);
        // Safe: construction guarantees the marker is present
        body.split_once(BASE64_MARKER).unwrap_or((body, ""))
    }
}

impl TryFrom<String> for NormalizedImage {
    type Error = DecodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<NormalizedImage> for String {
    fn from(image: NormalizedImage) -> Self {
        image.0
    }
}

impl fmt::Display for NormalizedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_jpeg_shape() {
        let image = NormalizedImage::from_jpeg(&[0xFF, 0xD8, 0xFF]);

        assert_eq!(image.as_str(), "data:image/jpeg;base64,/9j/");
        assert_eq!(image.media_type(), "image/jpeg");
        assert_eq!(image.payload(), "/9j/");
        assert_eq!(image.decode_bytes().unwrap(), vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_parse_accepts_other_image_types() {
        let image = NormalizedImage::parse("data:image/png;base64,AAAA").unwrap();
        assert_eq!(image.media_type(), "image/png");
    }

    #[test]
    fn test_parse_accepts_missing_scheme() {
        let image = NormalizedImage::parse("image/jpeg;base64,AAAA").unwrap();
        assert_eq!(image.payload(), "AAAA");
    }

    #[test]
    fn test_parse_rejects_non_images() {
        assert!(NormalizedImage::parse("data:text/plain;base64,AAAA").is_err());
        assert!(NormalizedImage::parse("data:image/jpeg,AAAA").is_err());
        assert!(NormalizedImage::parse("data:image/;base64,AAAA").is_err());
        assert!(NormalizedImage::parse("data:,").is_err());
    }

    #[test]
    fn test_bad_base64_payload() {
        let image = NormalizedImage::parse("data:image/jpeg;base64,@@@").unwrap();
        assert!(matches!(image.decode_bytes(), Err(DecodeError::Base64(_))));
    }

    #[test]
    fn test_serde_validates() {
        let ok: NormalizedImage =
            serde_json::from_str("\"data:image/jpeg;base64,AAAA\"").unwrap();
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"data:image/jpeg;base64,AAAA\"");

        assert!(serde_json::from_str::<NormalizedImage>("\"hello\"").is_err());
    }
}
