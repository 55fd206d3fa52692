use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    cursor::IndexCursor,
    entry::{flexible_bool, IndexDocument},
    error::{ErrorContext, IndexError, Result},
};

/// Magic bytes for Zstandard compressed files.
pub const ZST_MAGIC_BYTES: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// File names probed, in order, by [`find_snapshot`].
pub const SNAPSHOT_FILE_NAMES: [&str; 2] = ["index.json.zst", "index.json"];

#[derive(Deserialize)]
struct Tombstone {
    #[serde(default, deserialize_with = "flexible_bool")]
    deleted: bool,
}

/// Cursor over an index snapshot held in memory.
///
/// Documents are kept as raw JSON values and only decoded when a position is
/// read, so one malformed document does not prevent the rest of the snapshot
/// from being walked.
#[derive(Debug)]
pub struct SnapshotCursor {
    documents: Vec<Value>,
}

impl SnapshotCursor {
    /// Opens a snapshot file. Zstd-compressed content is detected by its magic
    /// bytes and decompressed transparently.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read(path).with_context(|| format!("reading index snapshot {}", path.display()))?;

        let content = if content.len() >= 4 && content[..4] == ZST_MAGIC_BYTES {
            debug!("decompressing zstd snapshot {}", path.display());
            zstd::decode_all(content.as_slice())
                .with_context(|| format!("decoding zstd from {}", path.display()))?
        } else {
            content
        };

        Self::from_slice(&content)
    }

    /// Parses an uncompressed JSON snapshot.
    pub fn from_slice(content: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(content)
            .map_err(|err| IndexError::MalformedSnapshot(err.to_string()))?;

        match value {
            Value::Array(documents) => Ok(Self { documents }),
            other => {
                Err(IndexError::MalformedSnapshot(format!(
                    "expected an array of documents, found {}",
                    json_kind(&other)
                )))
            }
        }
    }

    pub fn from_values(documents: Vec<Value>) -> Self {
        Self { documents }
    }

    pub fn from_documents<I>(documents: I) -> Self
    where
        I: IntoIterator<Item = IndexDocument>,
    {
        Self {
            documents: documents
                .into_iter()
                .map(|doc| serde_json::to_value(doc).unwrap_or(Value::Null))
                .collect(),
        }
    }

    fn raw(&self, position: u64) -> Result<&Value> {
        usize::try_from(position)
            .ok()
            .and_then(|idx| self.documents.get(idx))
            .ok_or(IndexError::OutOfRange {
                position,
                size: self.size(),
            })
    }
}

impl IndexCursor for SnapshotCursor {
    fn size(&self) -> u64 {
        self.documents.len() as u64
    }

    fn is_deleted(&self, position: u64) -> Result<bool> {
        let raw = self.raw(position)?;
        Tombstone::deserialize(raw)
            .map(|t| t.deleted)
            .map_err(|source| IndexError::InvalidDocument { position, source })
    }

    fn document_at(&self, position: u64) -> Result<IndexDocument> {
        let raw = self.raw(position)?;
        IndexDocument::deserialize(raw)
            .map_err(|source| IndexError::InvalidDocument { position, source })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Looks for a snapshot file inside `dir`, preferring the compressed one.
pub fn find_snapshot<P: AsRef<Path>>(dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    SNAPSHOT_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| IndexError::SnapshotNotFound(dir.display().to_string()))
}

/// Resolves `path` to a snapshot file. A directory is searched with
/// [`find_snapshot`]; a file is used as is.
pub fn resolve_index_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.is_dir() {
        find_snapshot(path)
    } else if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(IndexError::SnapshotNotFound(path.display().to_string()))
    }
}
