//! Error types for ann_lab.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by dataset preparation, training, evaluation and persistence.
#[derive(Error, Debug)]
pub enum Error {
    /// Unreadable or unwritable path
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed dataset or weight file, column-count mismatch
    #[error("Format error: {0}")]
    Format(String),

    /// Label, index or dimension outside its valid bounds
    #[error("Range error: {0}")]
    Range(String),

    /// Operation called in the wrong order (e.g. backward before forward)
    #[error("State error: {0}")]
    State(String),

    /// Delimited table could not be tokenized
    #[error("Format error: {0}")]
    Csv(#[from] csv::Error),

    /// Snapshot document could not be encoded or decoded
    #[error("Format error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    pub(crate) fn range(msg: impl Into<String>) -> Self {
        Error::Range(msg.into())
    }

    pub(crate) fn state(msg: impl Into<String>) -> Self {
        Error::State(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_kind() {
        assert!(Error::format("bad row").to_string().starts_with("Format error"));
        assert!(Error::range("label 7").to_string().contains("label 7"));
        assert!(Error::state("no forward").to_string().starts_with("State error"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
