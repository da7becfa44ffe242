//! Fan-out over batches of files and record-level score aggregation.

use rayon::prelude::*;

use crate::error::Result;
use crate::image::{BitmapCodec, NormalizedImage, RawImageInput};

use super::Pipeline;

impl<C: BitmapCodec> Pipeline<C> {
    /// Normalize every input concurrently.
    ///
    /// Results keep the input order. A failure only affects its own entry.
    pub fn normalize_all(&self, inputs: &[RawImageInput]) -> Vec<Result<NormalizedImage>> {
        inputs.par_iter().map(|raw| self.normalize(raw)).collect()
    }

    /// Normalize every input concurrently, failing if any input fails.
    ///
    /// # Errors
    ///
    /// Returns the first failure encountered.
    pub fn try_normalize_all(&self, inputs: &[RawImageInput]) -> Result<Vec<NormalizedImage>> {
        inputs.par_iter().map(|raw| self.normalize(raw)).collect()
    }

    /// Compute the change score of a record from its before/after images.
    ///
    /// Images are paired by index. A before image with no matching after
    /// image scores 0. Returns `None` when there are no after images (or no
    /// before images to pair them with).
    ///
    /// # Errors
    ///
    /// Returns the first pair that fails to score.
    pub fn change_score(
        &self,
        before: &[NormalizedImage],
        after: &[NormalizedImage],
    ) -> Result<Option<u8>> {
        if after.is_empty() {
            return Ok(None);
        }

        let scores = before
            .par_iter()
            .enumerate()
            .map(|(index, before_image)| match after.get(index) {
                Some(after_image) => self.score(before_image, after_image),
                None => Ok(0),
            })
            .collect::<Result<Vec<u8>>>()?;

        tracing::debug!("Pair scores: {scores:?}");

        Ok(aggregate_scores(&scores))
    }
}

/// Rounded arithmetic mean of per-pair scores, or `None` for no pairs.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn aggregate_scores(scores: &[u8]) -> Option<u8> {
    if scores.is_empty() {
        return None;
    }

    let total: u64 = scores.iter().map(|&s| u64::from(s)).sum();
    let mean = (total as f64 / scores.len() as f64).round();

    // Safe: the mean of u8 values fits in u8
    Some(mean.clamp(0.0, 100.0) as u8)
}
