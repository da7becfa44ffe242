//! # beforeafter
//!
//! Record before/after image sets and measure how much changed between them.
//!
//! Every uploaded image is normalized once: decoded, scaled so its longer side
//! fits a bounding dimension, and re-encoded as a JPEG data URL. Each
//! before/after pair is then scored 0-100 from the mean RGB difference of
//! both images resampled onto a small grid, and the record keeps the rounded
//! mean of its pair scores.
//!
//! ## Example
//!
//! ```no_run
//! use beforeafter::{Config, Pipeline, RawImageInput};
//!
//! # fn main() -> beforeafter::Result<()> {
//! let pipeline = Pipeline::new(Config::default())?;
//!
//! let before = pipeline.normalize(&RawImageInput::from_path("before.png")?)?;
//! let after = pipeline.normalize(&RawImageInput::from_path("after.png")?)?;
//! let score = pipeline.score(&before, &after)?;
//! println!("change score: {score}");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod image;
pub mod pipeline;
pub mod record;

pub use error::{Error, Result, Side};
pub use crate::image::{BitmapCodec, ImageCodec, NormalizedImage, RawImageInput};
pub use pipeline::{Config, Pipeline};
pub use record::{RecordDraft, RecordItem, RecordStore, SortOrder};
