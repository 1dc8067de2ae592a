//! Error types shared by the loader, metrics and chart preparation.
//!
//! Loader failures abort a dashboard request. Aggregate failures are caught
//! per panel so one missing column only blanks the panels that need it.

use serde::ser::SerializeStruct;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    /// The upload is neither CSV nor an XLSX workbook.
    #[error("Unsupported file type '{0}'. Please upload a CSV or Excel file")]
    UnsupportedFormat(String),

    /// The file content could not be parsed into a table.
    #[error("Failed to parse uploaded file: {0}")]
    Parse(String),

    /// An aggregate needs a column the upload does not have.
    #[error("Required column '{0}' not found in the dataset")]
    MissingColumn(String),

    /// Nothing to chart. Informational, never fatal.
    #[error("The dataset is empty. No data to visualize for {0}")]
    EmptyDataset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    /// Stable code for front ends that branch on the failure kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::Parse(_) => "PARSE_ERROR",
            Self::MissingColumn(_) => "MISSING_COLUMN",
            Self::EmptyDataset(_) => "EMPTY_DATASET",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// True for notices that should be shown as info rather than as errors.
    pub fn is_informational(&self) -> bool {
        matches!(self, Self::EmptyDataset(_))
    }
}

impl From<csv::Error> for DashboardError {
    fn from(err: csv::Error) -> Self {
        DashboardError::Parse(err.to_string())
    }
}

impl From<calamine::XlsxError> for DashboardError {
    fn from(err: calamine::XlsxError) -> Self {
        DashboardError::Parse(err.to_string())
    }
}

impl Serialize for DashboardError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("DashboardError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
