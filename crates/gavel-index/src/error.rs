use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum IndexError {
    #[error("Error while {action}: {source}")]
    #[diagnostic(code(gavel_index::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error("Index snapshot is malformed: {0}")]
    #[diagnostic(
        code(gavel_index::malformed_snapshot),
        help("The snapshot must be a JSON array of index documents, optionally zstd-compressed")
    )]
    MalformedSnapshot(String),

    #[error("No index snapshot found in {0}")]
    #[diagnostic(
        code(gavel_index::snapshot_not_found),
        help("Download the repository index first, or pass --index <PATH>")
    )]
    SnapshotNotFound(String),

    #[error("Index position {position} is out of range (size {size})")]
    #[diagnostic(code(gavel_index::out_of_range))]
    OutOfRange { position: u64, size: u64 },

    #[error("Invalid index document at position {position}: {source}")]
    #[diagnostic(code(gavel_index::invalid_document))]
    InvalidDocument {
        position: u64,
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// Attaches a description of the failed action to I/O errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            IndexError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IndexError::OutOfRange {
            position: 10,
            size: 3,
        };
        assert_eq!(err.to_string(), "Index position 10 is out of range (size 3)");

        let err: Result<()> = Err(std::io::Error::other("disk on fire")).with_context(|| {
            "reading index.json".to_string()
        });
        assert_eq!(
            err.unwrap_err().to_string(),
            "Error while reading index.json: disk on fire"
        );
    }
}
