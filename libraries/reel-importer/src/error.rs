//! Error types for the importer

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Core error: {0}")]
    Core(#[from] reel_core::CoreError),

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Invalid file path: {0}")]
    InvalidPath(String),

    #[error("Destination unreachable: {0}")]
    DestinationUnreachable(String),

    #[error("No free destination slot for {0} after {1} suffixes")]
    CollisionOverflow(String, u32),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ImportError {
    /// Whether this error aborts a whole batch rather than a single record
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            ImportError::DestinationUnreachable(_) | ImportError::SourceNotFound(_)
        )
    }
}
