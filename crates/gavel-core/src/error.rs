//! Error types for gavel-core.

use gavel_broker::BrokerError;
use gavel_config::error::ConfigError;
use gavel_db::DbError;
use gavel_index::IndexError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum GavelError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Connectivity(#[from] BrokerError),

    #[error("Setup failed: {0}")]
    #[diagnostic(
        code(gavel::fatal_setup),
        help("Check that the repository is configured and its index snapshot is readable")
    )]
    FatalSetup(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Index(#[from] IndexError),

    #[error("Store operation failed: {0}")]
    #[diagnostic(
        code(gavel::store),
        help("Check that the database is writable, or point GAVEL_DB at another file")
    )]
    Store(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to process {gav}: {reason}")]
    #[diagnostic(code(gavel::item))]
    TransientItem { gav: String, reason: String },

    #[error("A lock was poisoned by a panicking thread")]
    #[diagnostic(code(gavel::poison))]
    PoisonError,
}

impl From<DbError> for GavelError {
    fn from(err: DbError) -> Self {
        GavelError::Store(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GavelError>;
