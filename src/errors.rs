//! Errors for the data-loading boundary.
//!
//! Only loading a backing file can fail; every aggregation downstream is
//! total over whatever was loaded.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("failed to read accident data: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read volume workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("workbook {0} contains no sheets")]
    EmptyWorkbook(PathBuf),

    #[error("column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },
}
