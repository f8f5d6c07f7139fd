//! CSV table export and edit import.
//!
//! The table has exactly four columns, `Filename, Title, Description, Keywords`,
//! and the same layout is accepted back by [`read_edits`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{MetaError, Result};
use crate::record::{EditedFields, MetadataRecord};

/// One table row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRow {
    #[serde(rename = "Filename")]
    pub filename: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Keywords", default)]
    pub keywords: String,
}

impl EditRow {
    fn from_record(record: &MetadataRecord) -> Self {
        Self {
            filename: record.filename.clone(),
            title: record.fields.title.clone(),
            description: record.fields.description.clone(),
            keywords: record.fields.keywords.clone(),
        }
    }

    pub fn fields(&self) -> EditedFields {
        EditedFields {
            title: self.title.clone(),
            description: self.description.clone(),
            keywords: self.keywords.clone(),
        }
    }
}

/// Write the table to any writer. Records without a filename are skipped.
pub fn write_csv<W: Write>(records: &[MetadataRecord], writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    // Header is written explicitly so an empty batch still produces it.
    wtr.write_record(["Filename", "Title", "Description", "Keywords"])?;
    for record in records.iter().filter(|r| !r.filename.is_empty()) {
        let row = EditRow::from_record(record);
        wtr.write_record([&row.filename, &row.title, &row.description, &row.keywords])?;
    }
    wtr.flush()?;
    Ok(())
}

/// File name for an export taken at `now`.
pub fn export_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("edited_metadata_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// First path in `dir` based on `name` that does not exist yet.
fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = name.rsplit_once('.').unwrap_or((name, "csv"));
    (1..)
        .map(|n| dir.join(format!("{stem}_{n}.{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Export the table into `dir` under a timestamped name and return its path.
///
/// Existing exports are never overwritten.
///
/// ```rust,no_run
/// use image_meta_batch::export::export_csv;
/// use image_meta_batch::pipeline::BatchProcessor;
/// use std::path::{Path, PathBuf};
///
/// let records = BatchProcessor::default().extract(&[PathBuf::from("photo.jpg")]);
/// let path = export_csv(&records, Path::new(".")).unwrap();
/// println!("Exported to {}", path.display());
/// ```
pub fn export_csv(records: &[MetadataRecord], dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| MetaError::export(dir, e))?;

    let path = unique_path(dir, &export_file_name(chrono::Local::now()));
    let file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| MetaError::export(&path, e))?;
    write_csv(records, file).map_err(|e| MetaError::export(&path, e))?;

    log::info!("Exported {} record(s) to {}", records.len(), path.display());
    Ok(path)
}

/// Read edit rows from a CSV file in the export layout.
pub fn read_edits(path: &Path) -> Result<Vec<EditRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|e| MetaError::export(path, e))?;

    rdr.deserialize()
        .collect::<csv::Result<Vec<EditRow>>>()
        .map_err(|e| MetaError::export(path, e))
}

/// Line up edit rows with records by filename.
///
/// Records without a matching row keep their current fields. When a filename
/// appears more than once in `rows`, the last row wins.
pub fn match_edits(records: &[MetadataRecord], rows: &[EditRow]) -> Vec<EditedFields> {
    let by_name: HashMap<&str, &EditRow> = rows.iter().map(|r| (r.filename.as_str(), r)).collect();

    records
        .iter()
        .map(|record| match by_name.get(record.filename.as_str()) {
            Some(row) => row.fields(),
            None => record.fields.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ContainerFormat;
    use crate::record::CanonicalFields;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn record(filename: &str, title: &str, keywords: &str) -> MetadataRecord {
        MetadataRecord {
            source_path: PathBuf::from(format!("/photos/{filename}")),
            filename: filename.to_string(),
            fields: CanonicalFields {
                title: title.to_string(),
                description: String::new(),
                keywords: keywords.to_string(),
            },
            format: ContainerFormat::JpegExif,
            decode_failed: false,
        }
    }

    #[test]
    fn header_and_rows() {
        let mut records = vec![record("a.jpg", "Sunset", "beach, sun"), record("b.png", "", "")];
        records.push(MetadataRecord {
            filename: String::new(),
            ..record("", "ignored", "")
        });

        let mut out = Vec::new();
        write_csv(&records, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Filename,Title,Description,Keywords");
        assert_eq!(lines[1], "a.jpg,Sunset,,\"beach, sun\"");
        assert_eq!(lines[2], "b.png,,,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn empty_batch_still_has_header() {
        let mut out = Vec::new();
        write_csv(&[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Filename,Title,Description,Keywords\n");
    }

    #[test]
    fn timestamped_name() {
        let now = chrono::Local.with_ymd_and_hms(2024, 7, 3, 9, 5, 1).unwrap();
        assert_eq!(export_file_name(now), "edited_metadata_20240703_090501.csv");
    }

    #[test]
    fn never_overwrites() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("x.csv"), "old").unwrap();
        std::fs::write(dir.path().join("x_1.csv"), "old").unwrap();

        assert_eq!(unique_path(dir.path(), "x.csv"), dir.path().join("x_2.csv"));
        assert_eq!(unique_path(dir.path(), "y.csv"), dir.path().join("y.csv"));
    }

    #[test]
    fn export_then_import() {
        let dir = TempDir::new().unwrap();
        let records = vec![record("a.jpg", "Café, \"quoted\"", "x, y"), record("b.png", "B", "")];

        let first = export_csv(&records, &dir.path().join("exports")).unwrap();
        let second = export_csv(&records, &dir.path().join("exports")).unwrap();
        assert_ne!(first, second);
        assert!(first.file_name().unwrap().to_string_lossy().starts_with("edited_metadata_"));

        let rows = read_edits(&first).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].filename, "a.jpg");
        assert_eq!(rows[0].title, "Café, \"quoted\"");
        assert_eq!(rows[0].keywords, "x, y");
    }

    #[test]
    fn import_missing_file_is_export_error() {
        let err = read_edits(Path::new("/nonexistent/edits.csv")).unwrap_err();
        assert!(matches!(err, MetaError::Export { .. }));
    }

    #[test]
    fn matching_by_filename() {
        let records = vec![record("a.jpg", "A", ""), record("b.jpg", "B", "")];
        let rows = vec![EditRow {
            filename: "b.jpg".into(),
            title: "New B".into(),
            ..Default::default()
        }];

        let edits = match_edits(&records, &rows);
        assert_eq!(edits[0].title, "A");
        assert_eq!(edits[1].title, "New B");
    }
}
