//! Before/after records and queries over a collection of them.

mod draft;
mod store;

pub use draft::{RecordDraft, MAX_IMAGE_COUNT, MIN_IMAGE_COUNT};
pub use store::{default_export_name, parse_records, Import, RecordStore};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::image::NormalizedImage;

/// Format of a record's `date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Before and after images of a record, paired by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Images {
    pub before: Vec<NormalizedImage>,
    pub after: Vec<NormalizedImage>,
}

/// A titled, dated set of before/after images with its change score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordItem {
    pub id: String,
    pub title: String,
    pub date: String,
    /// Unix milliseconds.
    pub created_at: i64,
    /// Unix milliseconds.
    pub updated_at: i64,
    /// Fractional scores in imported files are rounded to the nearest integer.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_score"
    )]
    pub change_score: Option<u8>,
    pub images: Images,
}

impl RecordItem {
    /// Check values that deserialization alone does not enforce.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRecord` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if let Some(score) = self.change_score {
            if score > 100 {
                return Err(invalid(format!("change score {score} is above 100")));
            }
        }

        let mut all_images = self.images.before.iter().chain(&self.images.after);
        if let Some(image) = all_images.find(|image| !image.as_str().starts_with("data:image/"))
        {
            return Err(invalid(format!(
                "image {}... is not a data URL",
                image.as_str().chars().take(24).collect::<String>()
            )));
        }

        Ok(())
    }

    /// Change the title and/or date. Images and score are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRecord` if the new title is blank or the date is not
    /// `YYYY-MM-DD`.
    pub fn update(&mut self, title: Option<&str>, date: Option<&str>) -> Result<()> {
        let title = title.map(str::trim);
        if title.is_some_and(str::is_empty) {
            return Err(invalid("title must not be empty".to_string()));
        }
        if let Some(date) = date {
            parse_date(date)?;
        }

        if let Some(title) = title {
            self.title = title.to_string();
        }
        if let Some(date) = date {
            self.date = date.to_string();
        }
        self.updated_at = Utc::now().timestamp_millis();

        Ok(())
    }

    /// The record date, if it parses as `YYYY-MM-DD`.
    #[must_use]
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, DATE_FORMAT).ok()
    }
}

/// Order in which records are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Latest date first.
    #[default]
    NewestFirst,
    /// Earliest date first.
    OldestFirst,
}

/// Records whose title contains `term` (case-insensitive), sorted by date.
///
/// Records with an unparseable date sort as the oldest. Records sharing a
/// date keep their collection order.
#[must_use]
pub fn search<'a>(records: &'a [RecordItem], term: &str, order: SortOrder) -> Vec<&'a RecordItem> {
    let needle = term.to_lowercase();
    let mut found: Vec<&RecordItem> = records
        .iter()
        .filter(|record| record.title.to_lowercase().contains(&needle))
        .collect();

    match order {
        SortOrder::OldestFirst => found.sort_by_key(|record| record.parsed_date()),
        SortOrder::NewestFirst => {
            found.sort_by_key(|record| std::cmp::Reverse(record.parsed_date()));
        }
    }

    found
}

/// Remove the record with `id`, returning it.
///
/// # Errors
///
/// Returns `RecordNotFound` if no record has that id.
pub fn remove(records: &mut Vec<RecordItem>, id: &str) -> Result<RecordItem> {
    let index = records
        .iter()
        .position(|record| record.id == id)
        .ok_or_else(|| Error::RecordNotFound { id: id.to_string() })?;

    Ok(records.remove(index))
}

/// Append imported records whose id is not already present.
///
/// Returns how many records were added.
pub fn merge(records: &mut Vec<RecordItem>, imported: Vec<RecordItem>) -> usize {
    let before = records.len();
    for record in imported {
        if !records.iter().any(|existing| existing.id == record.id) {
            records.push(record);
        }
    }
    records.len() - before
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn deserialize_score<'de, D>(deserializer: D) -> std::result::Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(score) = Option::<f64>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let rounded = score.round();
    if !(0.0..=f64::from(u8::MAX)).contains(&rounded) {
        return Err(serde::de::Error::custom(format!(
            "change score {score} is out of range"
        )));
    }
    // Safe: range checked above
    Ok(Some(rounded as u8))
}

/// Parse a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns `InvalidRecord` if the string is not a valid date.
pub fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|_| invalid(format!("date {date:?} is not YYYY-MM-DD")))
}

fn invalid(reason: String) -> Error {
    Error::InvalidRecord { reason }
}
