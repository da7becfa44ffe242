//! Custom error types for beforeafter.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which half of a before/after pair an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The "before" image.
    Before,
    /// The "after" image.
    After,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => f.write_str("before"),
            Self::After => f.write_str("after"),
        }
    }
}

/// Reasons an encoded or raw image could not be turned into a bitmap.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The bytes are not a readable raster image.
    #[error("{0}")]
    Image(#[from] image::ImageError),

    /// The data URL payload is not valid base64.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The string is not a `data:image/...;base64,` URL.
    #[error("malformed data URL: {reason}")]
    DataUrl { reason: String },
}

/// Main error type for the beforeafter library.
#[derive(Error, Debug)]
pub enum Error {
    /// The input does not declare an image media type.
    #[error("not an image: declared media type is {media_type:?}")]
    InvalidInputKind { media_type: String },

    /// The raw input is larger than the configured limit.
    #[error("file too large: {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    /// The decoded bitmap has a zero dimension.
    #[error("invalid image dimensions {width}x{height}")]
    InvalidImageDimensions { width: u32, height: u32 },

    /// The bytes could not be decoded into a bitmap.
    #[error("failed to decode image: {0}")]
    DecodeFailed(#[source] DecodeError),

    /// Lossy re-encoding produced no usable output.
    #[error("failed to encode image: {reason}")]
    EncodeFailed { reason: String },

    /// One side of a before/after pair could not be scored.
    #[error("failed to score {side} image: {source}")]
    ScoringFailed {
        side: Side,
        #[source]
        source: Box<Error>,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// A record is missing data or carries out-of-range values.
    #[error("invalid record: {reason}")]
    InvalidRecord { reason: String },

    /// Wrong number of images supplied for one side of a new record.
    #[error("{side} images: got {count}, expected between {min} and {max}")]
    ImageCount {
        side: Side,
        count: usize,
        min: usize,
        max: usize,
    },

    /// An import contained no record that passed validation.
    #[error("no valid records found in {path}")]
    NoValidRecords { path: PathBuf },

    /// No record with the given id.
    #[error("record {id} not found")]
    RecordNotFound { id: String },

    /// Failed to read or write a JSON record file.
    #[error("failed to parse records in {path}: {source}")]
    RecordFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to create the store directory.
    #[error("failed to create data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DecodeError> for Error {
    fn from(source: DecodeError) -> Self {
        Self::DecodeFailed(source)
    }
}

impl Error {
    /// Wrap this error as a scoring failure on the given side.
    #[must_use]
    pub fn on_side(self, side: Side) -> Self {
        Self::ScoringFailed {
            side,
            source: Box::new(self),
        }
    }
}

/// Result type alias for beforeafter operations.
pub type Result<T> = std::result::Result<T, Error>;
