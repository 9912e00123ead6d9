//! Brief augmentation
//!
//! When the workspace holds a `data.csv`, the total of its `sales` column is
//! appended to the brief sent to the model.

use pagesmith_foundation::{Error, Result};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Data file that triggers augmentation
pub const DATA_FILE: &str = "data.csv";

/// Column summed by the augmenter
pub const SALES_COLUMN: &str = "sales";

/// Sum the `sales` column of a CSV document
///
/// A missing column or a short record counts as zero; a present value that
/// does not parse as a number (including an empty cell) is an error.
pub fn sum_sales<R: Read>(reader: R) -> Result<f64> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let column = csv
        .headers()
        .map_err(|e| Error::BriefAugment(format!("invalid header: {}", e)))?
        .iter()
        .position(|h| h == SALES_COLUMN);

    let Some(column) = column else {
        debug!("{} has no '{}' column", DATA_FILE, SALES_COLUMN);
        return Ok(0.0);
    };

    let mut total = 0.0;
    for (index, record) in csv.records().enumerate() {
        let record = record.map_err(|e| Error::BriefAugment(e.to_string()))?;
        let Some(raw) = record.get(column) else {
            continue;
        };
        let value: f64 = raw.trim().parse().map_err(|_| {
            Error::BriefAugment(format!(
                "row {}: '{}' is not a number in column '{}'",
                index + 1,
                raw,
                SALES_COLUMN
            ))
        })?;
        total += value;
    }

    Ok(total)
}

/// Sentence appended to the brief for a computed total
pub fn augment_brief(brief: &str, total: f64) -> String {
    format!(
        "{}\n\nThe attached {} has a total of {} in its '{}' column; display this total in the app.",
        brief, DATA_FILE, total, SALES_COLUMN
    )
}

/// Brief augmenter
#[derive(Debug, Clone, Default)]
pub struct BriefAugmenter;

impl BriefAugmenter {
    pub fn new() -> Self {
        Self
    }

    /// Return the brief to send to the generator for `workspace`
    pub async fn augment(&self, workspace: &Path, brief: &str) -> Result<String> {
        let path = workspace.join(DATA_FILE);
        let present = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| Error::BriefAugment(format!("failed to stat {}: {}", DATA_FILE, e)))?;
        if !present {
            return Ok(brief.to_string());
        }

        let content = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::BriefAugment(format!("failed to read {}: {}", DATA_FILE, e)))?;
        let total = sum_sales(content.as_slice())?;

        info!("Augmenting brief with {} total {}", SALES_COLUMN, total);
        Ok(augment_brief(brief, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sum_sales() {
        let csv = "region,sales\nnorth,10\nsouth,20.5\n";
        assert_eq!(sum_sales(csv.as_bytes()).unwrap(), 30.5);
    }

    #[test]
    fn test_missing_column_is_zero() {
        let csv = "region,units\nnorth,10\n";
        assert_eq!(sum_sales(csv.as_bytes()).unwrap(), 0.0);
    }

    #[test]
    fn test_short_record_counts_as_zero() {
        let csv = "region,sales\nnorth,10\nsouth\n";
        assert_eq!(sum_sales(csv.as_bytes()).unwrap(), 10.0);
    }

    #[test]
    fn test_unparseable_value_fails() {
        let csv = "region,sales\nnorth,ten\n";
        assert!(matches!(
            sum_sales(csv.as_bytes()),
            Err(Error::BriefAugment(_))
        ));

        let empty = "region,sales\nnorth,\n";
        assert!(sum_sales(empty.as_bytes()).is_err());
    }

    #[tokio::test]
    async fn test_augment_with_data_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(DATA_FILE), "sales\n10\n20.5\n").unwrap();

        let brief = "Show a sales dashboard";
        let augmented = BriefAugmenter::new().augment(dir.path(), brief).await.unwrap();

        assert!(augmented.starts_with(brief));
        assert!(augmented.contains("30.5"));
        assert_ne!(augmented, brief);
    }

    #[tokio::test]
    async fn test_no_data_file_leaves_brief() {
        let dir = tempdir().unwrap();
        let augmented = BriefAugmenter::new()
            .augment(dir.path(), "Build X")
            .await
            .unwrap();
        assert_eq!(augmented, "Build X");
    }

    #[tokio::test]
    async fn test_unreadable_workspace_is_an_error() {
        let dir = tempdir().unwrap();
        // A regular file where the workspace directory should be
        let not_a_dir = dir.path().join("workspace");
        std::fs::write(&not_a_dir, "x").unwrap();

        let err = BriefAugmenter::new()
            .augment(&not_a_dir, "Build X")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BriefAugment(_)));
    }
}
