//! Normalization and change-scoring pipeline.

mod batch;
mod normalize;
mod score;

pub use batch::aggregate_scores;
pub use normalize::{fit_within, Config, Pipeline, MAX_GRID_SIZE};
pub use score::{score_bitmaps, DEFAULT_GRID_SIZE};
