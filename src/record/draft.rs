//! Building a new record from raw files.

use chrono::{NaiveDate, Utc};

use crate::error::{Error, Result, Side};
use crate::image::{BitmapCodec, RawImageInput};
use crate::pipeline::Pipeline;

use super::{Images, RecordItem, DATE_FORMAT};

/// Fewest images allowed on either side of a new record.
pub const MIN_IMAGE_COUNT: usize = 1;

/// Most images allowed on either side of a new record.
pub const MAX_IMAGE_COUNT: usize = 3;

/// User input for a record that has not been normalized or scored yet.
#[derive(Debug, Clone)]
pub struct RecordDraft {
    pub title: String,
    /// Defaults to today (UTC).
    pub date: Option<NaiveDate>,
    pub before: Vec<RawImageInput>,
    pub after: Vec<RawImageInput>,
}

impl RecordDraft {
    /// Check the title and image counts.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRecord` for a blank title or `ImageCount` when either
    /// side has too few or too many images.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidRecord {
                reason: "title must not be empty".to_string(),
            });
        }

        for (side, images) in [(Side::Before, &self.before), (Side::After, &self.after)] {
            if !(MIN_IMAGE_COUNT..=MAX_IMAGE_COUNT).contains(&images.len()) {
                return Err(Error::ImageCount {
                    side,
                    count: images.len(),
                    min: MIN_IMAGE_COUNT,
                    max: MAX_IMAGE_COUNT,
                });
            }
        }

        Ok(())
    }

    /// Normalize all images, score the pairs and produce a record.
    ///
    /// Before and after sides are normalized concurrently. Nothing is
    /// returned unless every image normalizes and every pair scores.
    ///
    /// # Errors
    ///
    /// Returns the validation error or the first normalization or scoring
    /// failure.
    pub fn build<C: BitmapCodec>(self, pipeline: &Pipeline<C>) -> Result<RecordItem> {
        self.validate()?;

        tracing::info!(
            "Creating record {:?} ({} before, {} after)",
            self.title.trim(),
            self.before.len(),
            self.after.len()
        );

        let (before, after) = rayon::join(
            || pipeline.try_normalize_all(&self.before),
            || pipeline.try_normalize_all(&self.after),
        );
        let (before, after) = (before?, after?);

        let change_score = pipeline.change_score(&before, &after)?;

        let now = Utc::now();
        let date = self.date.unwrap_or_else(|| now.date_naive());
        let millis = now.timestamp_millis();

        let record = RecordItem {
            id: millis.to_string(),
            title: self.title.trim().to_string(),
            date: date.format(DATE_FORMAT).to_string(),
            created_at: millis,
            updated_at: millis,
            change_score,
            images: Images { before, after },
        };

        tracing::info!("Created record {} with change score {:?}", record.id, change_score);

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Config;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(rgb: [u8; 3]) -> RawImageInput {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 20, Rgb(rgb)))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        RawImageInput::new(bytes, "image/png")
    }

    fn draft(before: usize, after: usize) -> RecordDraft {
        RecordDraft {
            title: "  Lawn  ".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 4, 1),
            before: vec![png([0, 0, 0]); before],
            after: vec![png([255, 255, 255]); after],
        }
    }

    #[test]
    fn test_validate_counts() {
        assert!(draft(1, 1).validate().is_ok());
        assert!(draft(3, 3).validate().is_ok());
        assert!(matches!(
            draft(0, 1).validate(),
            Err(Error::ImageCount {
                side: Side::Before,
                count: 0,
                ..
            })
        ));
        assert!(matches!(
            draft(1, 4).validate(),
            Err(Error::ImageCount {
                side: Side::After,
                count: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_validate_title() {
        let mut d = draft(1, 1);
        d.title = "   ".to_string();
        assert!(matches!(d.validate(), Err(Error::InvalidRecord { .. })));
    }

    #[test]
    fn test_build() {
        let pipeline = Pipeline::new(Config::default()).unwrap();
        let record = draft(2, 1).build(&pipeline).unwrap();

        assert_eq!(record.title, "Lawn");
        assert_eq!(record.date, "2024-04-01");
        assert_eq!(record.created_at, record.updated_at);
        assert_eq!(record.id, record.created_at.to_string());
        assert_eq!(record.images.before.len(), 2);
        assert_eq!(record.images.after.len(), 1);
        assert_eq!(record.change_score, Some(50));
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_build_aborts_on_bad_file() {
        let pipeline = Pipeline::new(Config::default()).unwrap();
        let mut d = draft(1, 1);
        d.after = vec![RawImageInput::new(b"not an image".to_vec(), "image/png")];

        assert!(matches!(d.build(&pipeline), Err(Error::DecodeFailed(_))));
    }
}
