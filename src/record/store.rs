//! JSON persistence, import and export of record collections.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::{Error, Result};

use super::{RecordItem, DATE_FORMAT};

/// File name of the default store inside the data directory.
const STORE_FILENAME: &str = "records.json";

/// Records read from a JSON file, plus how many entries were dropped.
#[derive(Debug, Clone, Default)]
pub struct Import {
    pub records: Vec<RecordItem>,
    pub skipped: usize,
}

/// A record collection persisted as a JSON array on disk.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    /// Use the given file as the store.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Use the platform-appropriate data directory:
    /// - Windows: `%APPDATA%\beforeafter\records.json`
    /// - Linux: `~/.local/share/beforeafter/records.json`
    /// - macOS: `~/Library/Application Support/beforeafter/records.json`
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn default_location() -> Result<Self> {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        let data_dir = base.join("beforeafter");

        fs::create_dir_all(&data_dir).map_err(|source| Error::DataDir {
            path: data_dir.clone(),
            source,
        })?;

        Ok(Self::new(data_dir.join(STORE_FILENAME)))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all valid records. A missing file is an empty collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON array.
    pub fn load(&self) -> Result<Vec<RecordItem>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!("No store at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };

        let import = parse_records(&text, &self.path)?;
        if import.skipped > 0 {
            tracing::warn!(
                "Skipped {} invalid records in {}",
                import.skipped,
                self.path.display()
            );
        }

        Ok(import.records)
    }

    /// Replace the stored collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, records: &[RecordItem]) -> Result<()> {
        tracing::debug!("Saving {} records to {}", records.len(), self.path.display());
        write_records(records, &self.path)
    }

    /// Read records from another JSON file, skipping invalid entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable, not a JSON array, or
    /// holds no valid record at all.
    pub fn import<P: AsRef<Path>>(path: P) -> Result<Import> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let import = parse_records(&text, path)?;

        if import.records.is_empty() {
            return Err(Error::NoValidRecords {
                path: path.to_path_buf(),
            });
        }
        if import.skipped > 0 {
            tracing::warn!("Skipped {} invalid records in {}", import.skipped, path.display());
        }

        Ok(import)
    }

    /// Write records as pretty-printed JSON to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn export<P: AsRef<Path>>(records: &[RecordItem], path: P) -> Result<()> {
        let path = path.as_ref();
        tracing::info!("Exporting {} records to {}", records.len(), path.display());
        write_records(records, path)
    }
}

/// Parse a JSON array of records, keeping the ones that validate.
///
/// # Errors
///
/// Returns an error if `text` is not JSON or not an array.
pub fn parse_records(text: &str, path: &Path) -> Result<Import> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|source| Error::RecordFile {
            path: path.to_path_buf(),
            source,
        })?;

    let serde_json::Value::Array(entries) = value else {
        return Err(Error::InvalidRecord {
            reason: format!("{} does not contain a JSON array", path.display()),
        });
    };

    let mut import = Import::default();
    for entry in entries {
        let record = serde_json::from_value::<RecordItem>(entry)
            .map_err(|err| err.to_string())
            .and_then(|record| match record.validate() {
                Ok(()) => Ok(record),
                Err(err) => Err(err.to_string()),
            });

        match record {
            Ok(record) => import.records.push(record),
            Err(reason) => {
                tracing::debug!("Skipping record: {reason}");
                import.skipped += 1;
            }
        }
    }

    Ok(import)
}

/// Suggested file name for an export made on `date`.
#[must_use]
pub fn default_export_name(date: NaiveDate) -> String {
    format!("before-after-records-{}.json", date.format(DATE_FORMAT))
}

fn write_records(records: &[RecordItem], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(records).map_err(|source| Error::RecordFile {
        path: path.to_path_buf(),
        source,
    })?;

    // Write to a temporary file first, then rename for atomicity
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, json)?;
    fs::rename(&temp_path, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::NormalizedImage;
    use crate::record::Images;

    fn record(id: &str) -> RecordItem {
        RecordItem {
            id: id.to_string(),
            title: format!("Record {id}"),
            date: "2024-02-03".to_string(),
            created_at: 1_700_000_000_000,
            updated_at: 1_700_000_000_000,
            change_score: Some(12),
            images: Images {
                before: vec![NormalizedImage::parse("data:image/jpeg;base64,AAAA").unwrap()],
                after: vec![NormalizedImage::parse("data:image/jpeg;base64,BBBB").unwrap()],
            },
        }
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("none.json"));

        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("records.json"));
        let records = vec![record("1"), record("2")];

        store.save(&records).unwrap();
        assert_eq!(store.load().unwrap(), records);
        assert!(!dir.path().join("records.tmp").exists());
    }

    #[test]
    fn test_parse_skips_invalid_entries() {
        let text = r#"[
            {"id": "1", "title": "ok", "date": "2024-01-01", "createdAt": 1, "updatedAt": 2,
             "images": {"before": ["data:image/jpeg;base64,AAAA"], "after": []}},
            {"id": "2", "title": "bad score", "date": "2024-01-01", "createdAt": 1, "updatedAt": 2,
             "changeScore": 150,
             "images": {"before": [], "after": []}},
            {"id": "3", "title": "bad image", "date": "2024-01-01", "createdAt": 1, "updatedAt": 2,
             "images": {"before": ["http://example.com/a.jpg"], "after": []}},
            {"id": 4}
        ]"#;

        let import = parse_records(text, Path::new("test.json")).unwrap();
        assert_eq!(import.records.len(), 1);
        assert_eq!(import.records[0].id, "1");
        assert_eq!(import.records[0].change_score, None);
        assert_eq!(import.skipped, 3);
    }

    #[test]
    fn test_parse_keeps_fractional_score() {
        let text = r#"[
            {"id": "1", "title": "avg", "date": "2024-01-01", "createdAt": 1, "updatedAt": 2,
             "changeScore": 42.5,
             "images": {"before": ["data:image/jpeg;base64,AAAA"], "after": []}}
        ]"#;

        let import = parse_records(text, Path::new("test.json")).unwrap();
        assert_eq!(import.skipped, 0);
        assert_eq!(import.records[0].change_score, Some(43));
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(matches!(
            parse_records("{\"id\": \"1\"}", Path::new("x.json")),
            Err(Error::InvalidRecord { .. })
        ));
        assert!(matches!(
            parse_records("not json", Path::new("x.json")),
            Err(Error::RecordFile { .. })
        ));
    }

    #[test]
    fn test_import_requires_a_valid_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, "[{\"id\": 1}]").unwrap();

        assert!(matches!(
            RecordStore::import(&path),
            Err(Error::NoValidRecords { .. })
        ));
    }

    #[test]
    fn test_export_then_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        let records = vec![record("9")];

        RecordStore::export(&records, &path).unwrap();
        let import = RecordStore::import(&path).unwrap();

        assert_eq!(import.records, records);
        assert_eq!(import.skipped, 0);
    }

    #[test]
    fn test_default_export_name() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 9).unwrap();
        assert_eq!(default_export_name(date), "before-after-records-2024-07-09.json");
    }
}
