//! The gavel synchronization pipeline.
//!
//! [`SyncOrchestrator`] connects to the broker, walks a repository index,
//! records every new checksum through [`ChecksumDeduplicator`] and publishes
//! one notification per artifact with [`NotificationPublisher`].

pub mod database;
pub mod dedup;
pub mod error;
pub mod notify;
pub mod store;
pub mod sync;

pub use database::DieselStore;
pub use dedup::ChecksumDeduplicator;
pub use error::{GavelError, Result};
pub use notify::{notification_payload, NotificationPublisher, PublishOutcome};
pub use store::{ChecksumAlgorithm, ChecksumRecord, ChecksumStore, RepositoryProvider, VersionStore};
pub use sync::{SyncOptions, SyncOrchestrator};
