//! Errors that stop a reconciliation cycle

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    /// No current report given, or the path does not exist
    MissingCurrentDocument { path: Option<PathBuf> },
    /// The base workbook to copy from does not exist
    MissingTemplate { path: PathBuf },
    /// A sheet the layout names is absent from the workbook
    MissingSheet { name: String },
    /// A layout cell reference cannot be used
    InvalidLayout { message: String },
}

impl std::fmt::Display for UpdateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateError::MissingCurrentDocument { path: None } => {
                write!(f, "The current report is required")
            }
            UpdateError::MissingCurrentDocument { path: Some(path) } => {
                write!(f, "Current report not found: {}", path.display())
            }
            UpdateError::MissingTemplate { path } => {
                write!(f, "Base workbook not found: {}", path.display())
            }
            UpdateError::MissingSheet { name } => {
                write!(f, "Workbook has no sheet named '{}'", name)
            }
            UpdateError::InvalidLayout { message } => {
                write!(f, "Invalid sheet layout: {}", message)
            }
        }
    }
}

impl std::error::Error for UpdateError {}
