use gavel_events::{EventSinkHandle, SyncEvent};
use tracing::{debug, error, info};

use crate::{cursor::IndexCursor, entry::IndexEntry};

pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000;

/// Counters kept while walking an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub visited: u64,
    pub deleted: u64,
    pub incomplete: u64,
    pub failed: u64,
    pub yielded: u64,
}

/// Lazy, forward-only iteration over every position of an [`IndexCursor`].
///
/// Tombstoned documents and documents without a groupId or artifactId are
/// skipped. A position that cannot be read is logged and skipped; it never
/// ends the walk.
pub struct IndexWalker<'a, C: IndexCursor + ?Sized> {
    cursor: &'a C,
    position: u64,
    size: u64,
    progress_interval: u64,
    stats: WalkStats,
    events: Option<EventSinkHandle>,
}

impl<'a, C: IndexCursor + ?Sized> IndexWalker<'a, C> {
    pub fn new(cursor: &'a C) -> Self {
        Self {
            cursor,
            position: 0,
            size: cursor.size(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            stats: WalkStats::default(),
            events: None,
        }
    }

    /// Logs progress every `interval` positions. Zero keeps the default.
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        if interval > 0 {
            self.progress_interval = interval;
        }
        self
    }

    pub fn with_events(mut self, events: EventSinkHandle) -> Self {
        self.events = Some(events);
        self
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }

    fn report_progress(&self, position: u64) {
        if position % self.progress_interval != 0 {
            return;
        }
        info!("{}/{} index positions walked", position, self.size);
        self.emit(SyncEvent::Progress {
            position,
            total: self.size,
        });
    }

    fn read(&mut self, position: u64) -> Option<IndexEntry> {
        let result = self.cursor.is_deleted(position).and_then(|deleted| {
            if deleted {
                return Ok(None);
            }
            self.cursor.document_at(position).map(Some)
        });

        match result {
            Ok(None) => {
                self.stats.deleted += 1;
                None
            }
            Ok(Some(document)) if document.deleted => {
                self.stats.deleted += 1;
                None
            }
            Ok(Some(document)) => {
                match document.into_entry() {
                    Some(entry) => Some(entry),
                    None => {
                        debug!("skipping index position {}: missing groupId or artifactId", position);
                        self.stats.incomplete += 1;
                        None
                    }
                }
            }
            Err(err) => {
                error!("failed to read index position {}: {}", position, err);
                self.stats.failed += 1;
                self.emit(SyncEvent::EntryFailed {
                    position,
                    error: err.to_string(),
                });
                None
            }
        }
    }
}

impl<C: IndexCursor + ?Sized> Iterator for IndexWalker<'_, C> {
    type Item = IndexEntry;

    fn next(&mut self) -> Option<Self::Item> {
        while self.position < self.size {
            let position = self.position;
            self.position += 1;

            self.report_progress(position);
            self.stats.visited += 1;

            if let Some(entry) = self.read(position) {
                self.stats.yielded += 1;
                return Some(entry);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gavel_events::CollectorSink;
    use serde_json::json;

    use super::*;
    use crate::{
        error::{IndexError, Result},
        IndexDocument, SnapshotCursor,
    };

    fn live(group: &str, artifact: &str, version: &str) -> serde_json::Value {
        json!({ "groupId": group, "artifactId": artifact, "version": version })
    }

    #[test]
    fn test_skips_tombstones_and_incomplete() {
        let cursor = SnapshotCursor::from_values(vec![
            live("org.example", "a", "1.0"),
            json!({ "groupId": "org.example", "artifactId": "gone", "deleted": true }),
            json!({ "groupId": "org.example" }),
            json!({ "artifactId": "orphan" }),
            live("org.example", "b", "2.0"),
        ]);

        let mut walker = IndexWalker::new(&cursor);
        let artifacts: Vec<_> = walker.by_ref().map(|e| e.artifact_id).collect();

        assert_eq!(artifacts, vec!["a", "b"]);
        assert_eq!(
            walker.stats(),
            WalkStats {
                visited: 5,
                deleted: 1,
                incomplete: 2,
                failed: 0,
                yielded: 2,
            }
        );
    }

    #[test]
    fn test_unreadable_position_does_not_stop_walk() {
        let cursor = SnapshotCursor::from_values(vec![
            live("org.example", "a", "1.0"),
            json!({ "groupId": ["not", "a", "string"], "artifactId": "x" }),
            json!("garbage"),
            live("org.example", "b", "2.0"),
        ]);
        let sink = Arc::new(CollectorSink::default());

        let mut walker = IndexWalker::new(&cursor).with_events(sink.clone());
        let artifacts: Vec<_> = walker.by_ref().map(|e| e.artifact_id).collect();

        assert_eq!(artifacts, vec!["a", "b"]);
        assert_eq!(walker.stats().failed, 2);
        let failed_positions: Vec<u64> = sink
            .events()
            .into_iter()
            .filter_map(|event| {
                match event {
                    SyncEvent::EntryFailed { position, .. } => Some(position),
                    _ => None,
                }
            })
            .collect();
        assert_eq!(failed_positions, vec![1, 2]);
    }

    #[test]
    fn test_progress_events() {
        let cursor = SnapshotCursor::from_values(
            (0..7).map(|i| live("org.example", &format!("a{i}"), "1.0")).collect(),
        );
        let sink = Arc::new(CollectorSink::default());

        let walker = IndexWalker::new(&cursor)
            .with_progress_interval(3)
            .with_events(sink.clone());
        assert_eq!(walker.count(), 7);

        let positions: Vec<u64> = sink
            .events()
            .into_iter()
            .filter_map(|event| {
                match event {
                    SyncEvent::Progress { position, total } => {
                        assert_eq!(total, 7);
                        Some(position)
                    }
                    _ => None,
                }
            })
            .collect();
        assert_eq!(positions, vec![0, 3, 6]);
    }

    #[test]
    fn test_empty_index() {
        let cursor = SnapshotCursor::from_values(vec![]);
        let mut walker = IndexWalker::new(&cursor);
        assert!(walker.next().is_none());
        assert_eq!(walker.stats(), WalkStats::default());
    }

    struct FlakyCursor;

    impl IndexCursor for FlakyCursor {
        fn size(&self) -> u64 {
            3
        }

        fn is_deleted(&self, position: u64) -> Result<bool> {
            if position == 0 {
                return Err(IndexError::IoError {
                    action: "reading tombstone".into(),
                    source: std::io::Error::other("bad sector"),
                });
            }
            Ok(false)
        }

        fn document_at(&self, position: u64) -> Result<IndexDocument> {
            Ok(IndexDocument {
                group_id: Some("org.example".into()),
                artifact_id: Some(format!("a{position}")),
                ..Default::default()
            })
        }
    }

    #[test]
    fn test_tombstone_read_failure_skips_position() {
        let cursor = FlakyCursor;
        let mut walker = IndexWalker::new(&cursor);
        let artifacts: Vec<_> = walker.by_ref().map(|e| e.artifact_id).collect();

        assert_eq!(artifacts, vec!["a1", "a2"]);
        assert_eq!(walker.stats().failed, 1);
    }

    #[test]
    fn test_boxed_cursor() {
        let cursor: Box<dyn IndexCursor> =
            Box::new(SnapshotCursor::from_values(vec![live("org.example", "a", "1.0")]));
        assert_eq!(IndexWalker::new(&cursor).count(), 1);
    }
}
