//! CSV Data Loader Module
//! Reads the survey CSV into a DataFrame using Polars and checks the
//! configured columns are present before anything downstream runs.

use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("input file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("failed to load CSV: {0}")]
    Csv(#[from] PolarsError),
    #[error("required column '{0}' is missing from the input")]
    MissingColumn(String),
}

/// Load a CSV file using Polars.
///
/// Cells that fail type inference come back as null and are handled by the
/// cleaner; a missing file or an unparseable header is fatal here.
pub fn load_csv(path: &Path) -> Result<DataFrame, LoadError> {
    if !path.is_file() {
        return Err(LoadError::FileNotFound(path.to_path_buf()));
    }

    // Use lazy evaluation for memory efficiency, then collect
    let df = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(10000))
        .with_ignore_errors(true)
        .finish()?
        .collect()?;

    Ok(df)
}

/// Check every required column exists in the frame.
pub fn validate_schema(df: &DataFrame, required: &[String]) -> Result<(), LoadError> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    for column in required {
        if !present.contains(column) {
            return Err(LoadError::MissingColumn(column.clone()));
        }
    }
    Ok(())
}
