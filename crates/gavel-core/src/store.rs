//! Interfaces to the record stores the pipeline consumes.

use std::fmt;

use chrono::{DateTime, Utc};
use gavel_config::{config::Config, repository::RepositoryDescriptor};
use gavel_index::ArtifactKey;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Sha1,
    Md5,
}

impl ChecksumAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            ChecksumAlgorithm::Sha1 => "sha1",
            ChecksumAlgorithm::Md5 => "md5",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChecksumAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" => Ok(Self::Sha1),
            "md5" => Ok(Self::Md5),
            other => Err(format!("unknown checksum algorithm `{other}`")),
        }
    }
}

/// A checksum seen in the index, with the artifact it was first seen on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumRecord {
    pub checksum: String,
    pub algorithm: ChecksumAlgorithm,
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub packaging: Option<String>,
    /// `groupId/artifactId`
    pub prod_key: String,
    pub language: String,
    pub prod_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub trait ChecksumStore: Send + Sync {
    fn find_by_checksum(&self, checksum: &str) -> Result<Option<ChecksumRecord>>;

    /// Persists `record`. Returns `false` when a record for the same checksum
    /// already existed and nothing was written.
    fn create(&self, record: &ChecksumRecord) -> Result<bool>;
}

pub trait VersionStore: Send + Sync {
    /// Whether the product catalog knows this version.
    fn exists(&self, key: &ArtifactKey) -> Result<bool>;
}

pub trait RepositoryProvider {
    fn find_by_name(&self, name: &str) -> Option<RepositoryDescriptor>;
}

impl RepositoryProvider for Config {
    fn find_by_name(&self, name: &str) -> Option<RepositoryDescriptor> {
        self.find_repository(name)
    }
}
