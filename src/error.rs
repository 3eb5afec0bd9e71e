// Error taxonomy for the explorer library
// Malformed rows are NOT errors: they are logged and skipped (see parser/table)

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExplorerError>;

#[derive(Debug, Error)]
pub enum ExplorerError {
    /// Nothing loaded yet for the requested view
    #[error("no data available for the {view} view")]
    MissingData { view: String },

    /// Out-of-range or non-numeric dataset choice
    #[error("invalid selection {input:?} (expected 1..={available})")]
    InvalidSelection { input: String, available: usize },

    #[error("dataset name rejected: {0}")]
    InvalidFilename(String),

    #[error("file structure not recognized by any pattern")]
    StructureNotRecognized,

    #[error("missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("no patterns found in {0}")]
    NoPattern(String),

    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExplorerError {
    pub fn missing_data(view: impl Into<String>) -> Self {
        ExplorerError::MissingData { view: view.into() }
    }

    /// Errors the user caused (bad name, bad choice, unknown layout)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ExplorerError::InvalidSelection { .. }
                | ExplorerError::InvalidFilename(_)
                | ExplorerError::StructureNotRecognized
                | ExplorerError::MissingColumns(_)
                | ExplorerError::UnsupportedFile(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message() {
        let err = ExplorerError::MissingColumns(vec!["Montant".into(), "Expéditeur".into()]);
        assert_eq!(err.to_string(), "missing columns: Montant, Expéditeur");
        assert!(err.is_user_error());
    }

    #[test]
    fn test_io_error_is_not_user_error() {
        let err: ExplorerError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(!err.is_user_error());
    }
}
