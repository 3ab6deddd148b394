//! DataFrame export
//!
//! Writes normalized tables to CSV or to a JSON array of row objects.

use super::error::{RagicError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("Unsupported export format '{}'", other)),
        }
    }
}

pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

pub fn write_json(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    JsonWriter::new(&mut file)
        .with_json_format(JsonFormat::Json)
        .finish(df)?;
    Ok(())
}

/// Write `df` to `path`, picking the format from `format` or the extension
pub fn write(df: &mut DataFrame, path: &Path, format: Option<ExportFormat>) -> Result<()> {
    let format = format.or_else(|| ExportFormat::from_path(path)).ok_or_else(|| {
        RagicError::Config(format!(
            "Cannot tell export format of '{}', use a .csv or .json extension",
            path.display()
        ))
    })?;

    match format {
        ExportFormat::Csv => write_csv(df, path)?,
        ExportFormat::Json => write_json(df, path)?,
    }

    tracing::info!(path = %path.display(), rows = df.height(), ?format, "Exported table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df! {
            "index" => ["1", "2"],
            "Amount" => [None, Some(50.0f32)],
            "Name" => ["Alice", "Missing Value"],
        }
        .unwrap()
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ExportFormat::from_path(Path::new("out/data.JSON")),
            Some(ExportFormat::Json)
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("data.csv")),
            Some(ExportFormat::Csv)
        );
        assert_eq!(ExportFormat::from_path(Path::new("data")), None);
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut df = sample();

        write(&mut df, &path, None).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("index,Amount,Name"));
        assert_eq!(lines.next(), Some("1,,Alice"));
        let last = lines.next().unwrap();
        assert!(last.starts_with("2,50"));
        assert!(last.ends_with(",Missing Value"));
    }

    #[test]
    fn test_write_json_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.data");
        let mut df = sample();

        write(&mut df, &path, Some(ExportFormat::Json)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let rows: serde_json::Value = serde_json::from_str(&text).unwrap();
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Name"], "Alice");
        assert!(rows[0]["Amount"].is_null());
        assert_eq!(rows[1]["Amount"], 50.0);
    }

    #[test]
    fn test_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut df = sample();
        let result = write(&mut df, &dir.path().join("data.xlsx"), None);
        assert!(matches!(result, Err(RagicError::Config(_))));
    }
}
