//! Per-split annotation tables.
//!
//! Each split directory carries a CSV whose first column names an image file
//! in the same directory and whose remaining columns are 0/1 label
//! indicators. Labels are always read by header name in schema order, never
//! by column position, so a reordered CSV still yields correct targets.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Result, SkinScanError};
use crate::labels::{LABELS, NUM_LABELS};

use super::CSV_NAME;

/// Dataset split names, matching the directory layout on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Valid,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Valid => "valid",
            Split::Test => "test",
        }
    }
}

/// One annotated image: its file and a multi-hot target in schema order.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub filename: String,
    pub image_path: PathBuf,
    pub targets: [f32; NUM_LABELS],
}

/// All records of one split.
#[derive(Debug, Clone)]
pub struct SplitTable {
    pub split: Split,
    pub records: Vec<ImageRecord>,
}

impl SplitTable {
    /// Load the annotation table for one split under the dataset root.
    ///
    /// Headers are whitespace-trimmed before matching. Every schema label
    /// must be present as a column; missing ones are reported together in a
    /// single schema error naming the split.
    pub fn load(dataset_root: &Path, split: Split) -> Result<Self> {
        let split_dir = dataset_root.join(split.as_str());
        let csv_path = split_dir.join(CSV_NAME);

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&csv_path)
            .map_err(|e| SkinScanError::Table {
                path: csv_path.clone(),
                message: e.to_string(),
            })?;

        let headers = reader
            .headers()
            .map_err(|e| SkinScanError::Table {
                path: csv_path.clone(),
                message: e.to_string(),
            })?
            .clone();

        // Map each schema label to its column index, whatever the CSV order.
        let mut columns = [0usize; NUM_LABELS];
        let mut missing = Vec::new();
        for (slot, label) in LABELS.iter().enumerate() {
            match headers.iter().position(|h| h == *label) {
                Some(index) => columns[slot] = index,
                None => missing.push((*label).to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(SkinScanError::Schema {
                split: split.as_str().to_string(),
                missing,
            });
        }

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result.map_err(|e| SkinScanError::Table {
                path: csv_path.clone(),
                message: format!("row {}: {e}", row + 1),
            })?;

            let filename = record
                .get(0)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| SkinScanError::Table {
                    path: csv_path.clone(),
                    message: format!("row {}: empty filename", row + 1),
                })?
                .to_string();

            let mut targets = [0.0f32; NUM_LABELS];
            for (slot, &column) in columns.iter().enumerate() {
                let value = record.get(column).unwrap_or("");
                targets[slot] = value.parse::<f32>().map_err(|_| SkinScanError::Table {
                    path: csv_path.clone(),
                    message: format!(
                        "row {}: non-numeric value '{value}' in column '{}'",
                        row + 1,
                        LABELS[slot]
                    ),
                })?;
            }

            records.push(ImageRecord {
                image_path: split_dir.join(&filename),
                filename,
                targets,
            });
        }

        info!("Loaded {} {} examples from {}", records.len(), split.as_str(), csv_path.display());
        Ok(Self { split, records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_split(root: &Path, split: &str, csv: &str) {
        let dir = root.join(split);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(CSV_NAME), csv).unwrap();
    }

    fn full_header() -> String {
        format!("filename, {}", LABELS.join(", "))
    }

    #[test]
    fn test_load_reads_targets_in_schema_order() {
        let tmp = tempfile::tempdir().unwrap();
        let csv = format!("{}\na.jpg, 1, 0, 0, 0, 0, 0, 0, 0, 0, 1\n", full_header());
        write_split(tmp.path(), "train", &csv);

        let table = SplitTable::load(tmp.path(), Split::Train).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].filename, "a.jpg");
        assert_eq!(table.records[0].targets[0], 1.0);
        assert_eq!(table.records[0].targets[9], 1.0);
        assert_eq!(table.records[0].targets[1..9], [0.0; 8]);
    }

    #[test]
    fn test_load_matches_columns_by_name_not_position() {
        let tmp = tempfile::tempdir().unwrap();
        // Reversed label columns relative to the schema.
        let mut reversed: Vec<&str> = LABELS.to_vec();
        reversed.reverse();
        let csv = format!(
            "filename, {}\na.jpg, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0\n",
            reversed.join(", ")
        );
        write_split(tmp.path(), "valid", &csv);

        let table = SplitTable::load(tmp.path(), Split::Valid).unwrap();
        // The `1` sits under the last schema label, not the first.
        assert_eq!(table.records[0].targets[NUM_LABELS - 1], 1.0);
        assert_eq!(table.records[0].targets[0], 0.0);
    }

    #[test]
    fn test_missing_columns_reported_together() {
        let tmp = tempfile::tempdir().unwrap();
        let csv = "filename, Acne, Blackheads\na.jpg, 1, 0\n";
        write_split(tmp.path(), "test", csv);

        match SplitTable::load(tmp.path(), Split::Test) {
            Err(SkinScanError::Schema { split, missing }) => {
                assert_eq!(split, "test");
                assert_eq!(missing.len(), NUM_LABELS - 2);
                assert!(missing.contains(&"Dark Spots".to_string()));
                assert!(missing.contains(&"Wrinkles".to_string()));
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_value_is_a_table_error() {
        let tmp = tempfile::tempdir().unwrap();
        let csv = format!("{}\na.jpg, x, 0, 0, 0, 0, 0, 0, 0, 0, 0\n", full_header());
        write_split(tmp.path(), "train", &csv);

        assert!(matches!(
            SplitTable::load(tmp.path(), Split::Train),
            Err(SkinScanError::Table { .. })
        ));
    }

    #[test]
    fn test_missing_csv_is_a_table_error() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("train")).unwrap();
        assert!(SplitTable::load(tmp.path(), Split::Train).is_err());
    }
}
