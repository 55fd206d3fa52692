use crate::{entry::IndexDocument, error::Result};

/// Positional, read-only access to an opened repository index.
///
/// Positions run from `0` to `size() - 1`. A cursor is opened once per walk;
/// restarting a walk means opening a new cursor.
pub trait IndexCursor {
    /// Number of positions in the index, tombstones included.
    fn size(&self) -> u64;

    /// Whether the document at `position` has been deleted from the index.
    fn is_deleted(&self, position: u64) -> Result<bool>;

    /// Reads the document stored at `position`.
    fn document_at(&self, position: u64) -> Result<IndexDocument>;
}

impl<C: IndexCursor + ?Sized> IndexCursor for Box<C> {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn is_deleted(&self, position: u64) -> Result<bool> {
        (**self).is_deleted(position)
    }

    fn document_at(&self, position: u64) -> Result<IndexDocument> {
        (**self).document_at(position)
    }
}
