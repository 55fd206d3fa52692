use std::fmt;

/// Lifecycle states of a synchronization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    ConnectingBroker,
    Walking,
    ClosingBroker,
    Done,
    Failed,
}

impl SyncState {
    /// `Done` and `Failed` end a run.
    pub fn is_terminal(self) -> bool {
        matches!(self, SyncState::Done | SyncState::Failed)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Idle => "idle",
            SyncState::ConnectingBroker => "connecting-broker",
            SyncState::Walking => "walking",
            SyncState::ClosingBroker => "closing-broker",
            SyncState::Done => "done",
            SyncState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Final counters of a synchronization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Cursor positions visited.
    pub visited: u64,
    /// Positions skipped because the entry is tombstoned.
    pub deleted: u64,
    /// Positions skipped because groupId or artifactId is missing.
    pub incomplete: u64,
    /// Positions that could not be read.
    pub unreadable: u64,
    /// Entries that reached checksum recording.
    pub processed: u64,
    pub checksums_created: u64,
    pub skipped_known: u64,
    pub published: u64,
    pub publish_failed: u64,
    pub timed_out: u64,
    /// Entries whose processing failed outside of publishing.
    pub item_errors: u64,
}

/// All events emitted by a synchronization run.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// The orchestrator moved to a new state.
    StateChanged { repo_name: String, state: SyncState },
    /// Periodic walk checkpoint.
    Progress { position: u64, total: u64 },
    /// A checksum was seen for the first time and recorded.
    ChecksumRecorded { checksum: String, algorithm: String },
    /// Publication skipped because the version is already in the catalog.
    SkippedKnown { gav: String },
    Published { gav: String },
    PublishFailed { gav: String, error: String },
    /// The publish deadline elapsed and the task was cancelled.
    PublishTimedOut { gav: String },
    /// An index position could not be read.
    EntryFailed { position: u64, error: String },
    /// The run finished, successfully or not.
    Complete { repo_name: String, summary: SyncSummary },
}
