//! Index documents as stored in a snapshot, and the validated entries the
//! walker hands downstream.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Deserialize)]
#[serde(untagged)]
enum FlexiBool {
    Bool(bool),
    String(String),
    Number(i64),
}

pub(crate) fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<FlexiBool>::deserialize(deserializer)? {
        Some(FlexiBool::Bool(b)) => b,
        Some(FlexiBool::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Some(FlexiBool::Number(n)) => n != 0,
        None => false,
    })
}

fn empty_is_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

/// One raw record of a repository index.
///
/// Every identity field is optional; blank strings are read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocument {
    #[serde(default, deserialize_with = "empty_is_none")]
    pub group_id: Option<String>,
    #[serde(default, deserialize_with = "empty_is_none")]
    pub artifact_id: Option<String>,
    #[serde(default, deserialize_with = "empty_is_none")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "empty_is_none")]
    pub classifier: Option<String>,
    #[serde(default, deserialize_with = "empty_is_none")]
    pub packaging: Option<String>,
    #[serde(default, deserialize_with = "empty_is_none")]
    pub sha1: Option<String>,
    #[serde(default, deserialize_with = "empty_is_none")]
    pub md5: Option<String>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub deleted: bool,
}

impl IndexDocument {
    /// Validates the document. Returns `None` when groupId or artifactId is
    /// missing.
    pub fn into_entry(self) -> Option<IndexEntry> {
        let group_id = self.group_id?;
        let artifact_id = self.artifact_id?;

        Some(IndexEntry {
            group_id,
            artifact_id,
            version: self.version.unwrap_or_default(),
            classifier: self.classifier,
            packaging: self.packaging,
            sha1: self.sha1,
            md5: self.md5,
            last_modified: self.last_modified,
        })
    }
}

/// A live index entry with its identity fields present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub group_id: String,
    pub artifact_id: String,
    /// Empty when the index carries no version.
    pub version: String,
    pub classifier: Option<String>,
    pub packaging: Option<String>,
    pub sha1: Option<String>,
    pub md5: Option<String>,
    pub last_modified: i64,
}

impl IndexEntry {
    /// The coordinate string used in notifications:
    /// `groupId:artifactId:pom:version`.
    pub fn gav(&self) -> String {
        format!("{}:{}:pom:{}", self.group_id, self.artifact_id, self.version)
    }

    /// `groupId/artifactId`, as stored on checksum records.
    pub fn prod_key(&self) -> String {
        format!("{}/{}", self.group_id, self.artifact_id)
    }

    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(&self.group_id, &self.artifact_id, &self.version)
    }
}

/// Identity of an artifact version independent of its checksums.
/// Group and artifact ids are lower-cased; the version is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl ArtifactKey {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> Self {
        Self {
            group_id: group_id.to_lowercase(),
            artifact_id: artifact_id.to_lowercase(),
            version: version.to_string(),
        }
    }
}
