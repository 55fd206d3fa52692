//! Repository index access for gavel.
//!
//! An index is consumed through the [`IndexCursor`] trait: a fixed number of
//! positions, each of which can be tombstoned or hold one [`IndexDocument`].
//! [`IndexWalker`] turns a cursor into a forward-only iterator of validated
//! [`IndexEntry`] values, skipping tombstones, incomplete documents and
//! unreadable positions.
//!
//! [`SnapshotCursor`] is the bundled cursor implementation. It reads an index
//! snapshot that was downloaded beforehand: a JSON array of documents,
//! optionally zstd-compressed.

mod cursor;
mod entry;
mod error;
mod snapshot;
mod walker;

pub use cursor::IndexCursor;
pub use entry::{ArtifactKey, IndexDocument, IndexEntry};
pub use error::{ErrorContext, IndexError, Result};
pub use snapshot::{find_snapshot, resolve_index_path, SnapshotCursor, SNAPSHOT_FILE_NAMES, ZST_MAGIC_BYTES};
pub use walker::{IndexWalker, WalkStats, DEFAULT_PROGRESS_INTERVAL};
