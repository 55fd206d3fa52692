use std::sync::Arc;

use chrono::Utc;
use gavel_index::{ArtifactKey, IndexEntry};
use tracing::debug;

use crate::{
    error::Result,
    store::{ChecksumAlgorithm, ChecksumRecord, ChecksumStore, VersionStore},
};

pub const LANGUAGE_JAVA: &str = "Java";
pub const PROD_TYPE_MAVEN2: &str = "Maven2";

/// Decides whether an artifact was seen before, by checksum and by version.
#[derive(Clone)]
pub struct ChecksumDeduplicator {
    checksums: Arc<dyn ChecksumStore>,
    versions: Arc<dyn VersionStore>,
}

impl ChecksumDeduplicator {
    pub fn new(checksums: Arc<dyn ChecksumStore>, versions: Arc<dyn VersionStore>) -> Self {
        Self {
            checksums,
            versions,
        }
    }

    /// Records `checksum` for `entry` unless it is empty or already recorded.
    /// Returns whether a record was created.
    pub fn record_if_new(
        &self,
        entry: &IndexEntry,
        checksum: Option<&str>,
        algorithm: ChecksumAlgorithm,
    ) -> Result<bool> {
        let Some(checksum) = checksum.map(str::trim).filter(|c| !c.is_empty()) else {
            return Ok(false);
        };

        if self.checksums.find_by_checksum(checksum)?.is_some() {
            return Ok(false);
        }

        let now = Utc::now();
        let record = ChecksumRecord {
            checksum: checksum.to_string(),
            algorithm,
            group_id: entry.group_id.clone(),
            artifact_id: entry.artifact_id.clone(),
            version: entry.version.clone(),
            classifier: entry.classifier.clone(),
            packaging: entry.packaging.clone(),
            prod_key: entry.prod_key(),
            language: LANGUAGE_JAVA.to_string(),
            prod_type: PROD_TYPE_MAVEN2.to_string(),
            created_at: now,
            updated_at: now,
        };

        let created = self.checksums.create(&record)?;
        if created {
            debug!("recorded {} {} for {}", algorithm, checksum, entry.gav());
        }
        Ok(created)
    }

    /// Whether the product catalog already has the version identified by
    /// `key`.
    pub fn is_known_version(&self, key: &ArtifactKey) -> Result<bool> {
        self.versions.exists(key)
    }
}
