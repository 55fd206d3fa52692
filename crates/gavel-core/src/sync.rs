//! The synchronization run.
//!
//! A run moves through `Idle → ConnectingBroker → Walking → ClosingBroker →
//! Done`, or ends in `Failed`. The broker connection is closed whenever one
//! was opened, whatever the outcome of the walk.

use std::{sync::Arc, time::Duration};

use gavel_broker::{BrokerConnector, Connection};
use gavel_config::{broker::BrokerSettings, repository::RepositoryDescriptor, sync::SyncConfig};
use gavel_events::{EventSinkHandle, NullSink, SyncEvent, SyncState, SyncSummary};
use gavel_index::{IndexCursor, IndexEntry, IndexWalker, WalkStats};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::{
    dedup::ChecksumDeduplicator,
    error::{GavelError, Result},
    notify::{NotificationPublisher, PublishOutcome},
    store::ChecksumAlgorithm,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Do not publish versions already present in the product catalog.
    pub skip_known: bool,
    /// Upper bound for publishing one artifact. `None` publishes inline.
    pub deadline: Option<Duration>,
    pub progress_interval: u64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            skip_known: false,
            deadline: Some(Duration::from_secs(30 * 60)),
            progress_interval: gavel_index::DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl SyncOptions {
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Ok(Self {
            skip_known: config.skip_known(),
            deadline: config.deadline()?,
            progress_interval: config.progress_interval(),
        })
    }
}

/// How long a publish task that missed its deadline may take to close its
/// session before it is aborted.
pub const RELEASE_GRACE: Duration = Duration::from_secs(30);

pub struct SyncOrchestrator {
    repository: RepositoryDescriptor,
    connector: BrokerConnector,
    host: String,
    port: u16,
    dedup: ChecksumDeduplicator,
    publisher: NotificationPublisher,
    options: SyncOptions,
    events: EventSinkHandle,
    state: SyncState,
}

impl SyncOrchestrator {
    pub fn new(
        repository: RepositoryDescriptor,
        connector: BrokerConnector,
        broker: &BrokerSettings,
        dedup: ChecksumDeduplicator,
        options: SyncOptions,
    ) -> Self {
        Self {
            repository,
            connector,
            host: broker.host.clone(),
            port: broker.port,
            dedup,
            publisher: NotificationPublisher::new(broker.queue.clone()),
            options,
            events: Arc::new(NullSink),
            state: SyncState::Idle,
        }
    }

    pub fn with_events(mut self, events: EventSinkHandle) -> Self {
        self.publisher = self.publisher.with_events(events.clone());
        self.events = events;
        self
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    fn transition(&mut self, next: SyncState) {
        info!(repo = %self.repository.name, "sync state {} -> {}", self.state, next);
        self.state = next;
        self.events.emit(SyncEvent::StateChanged {
            repo_name: self.repository.name.clone(),
            state: next,
        });
    }

    fn complete(&self, summary: SyncSummary) {
        self.events.emit(SyncEvent::Complete {
            repo_name: self.repository.name.clone(),
            summary,
        });
    }

    /// Runs one synchronization.
    ///
    /// `open_cursor` is called once the broker connection is up. Failing to
    /// connect or to open the cursor ends the run before any entry is
    /// processed; every per-entry failure is logged and skipped.
    pub async fn run<C, F>(&mut self, open_cursor: F) -> Result<SyncSummary>
    where
        C: IndexCursor,
        F: FnOnce() -> gavel_index::Result<C>,
    {
        if self.state != SyncState::Idle {
            return Err(GavelError::FatalSetup(format!(
                "orchestrator for {} already ran (state {})",
                self.repository.name, self.state
            )));
        }

        self.transition(SyncState::ConnectingBroker);
        let link = match self.connector.connect(&self.host, self.port).await {
            Ok(link) => link,
            Err(err) => {
                error!("cannot reach broker, no entries will be processed: {}", err);
                self.transition(SyncState::Failed);
                self.complete(SyncSummary::default());
                return Err(GavelError::Connectivity(err));
            }
        };

        let mut summary = SyncSummary::default();
        let walked = self.walk(link.connection(), open_cursor, &mut summary).await;

        self.transition(SyncState::ClosingBroker);
        self.connector.close(link).await;

        match walked {
            Ok(()) => {
                info!(
                    repo = %self.repository.name,
                    "sync finished: {} visited, {} processed, {} checksums created, {} published, {} failed, {} timed out, {} skipped as known",
                    summary.visited,
                    summary.processed,
                    summary.checksums_created,
                    summary.published,
                    summary.publish_failed,
                    summary.timed_out,
                    summary.skipped_known,
                );
                self.transition(SyncState::Done);
                self.complete(summary);
                Ok(summary)
            }
            Err(err) => {
                error!(repo = %self.repository.name, "sync failed: {}", err);
                self.transition(SyncState::Failed);
                self.complete(summary);
                Err(err)
            }
        }
    }

    async fn walk<C, F>(
        &mut self,
        connection: Arc<dyn Connection>,
        open_cursor: F,
        summary: &mut SyncSummary,
    ) -> Result<()>
    where
        C: IndexCursor,
        F: FnOnce() -> gavel_index::Result<C>,
    {
        let cursor = open_cursor()
            .map_err(|err| GavelError::FatalSetup(format!("opening index cursor: {err}")))?;

        self.transition(SyncState::Walking);
        info!(
            "walking {} index positions of {}",
            cursor.size(),
            self.repository.name
        );

        let mut walker = IndexWalker::new(&cursor)
            .with_progress_interval(self.options.progress_interval)
            .with_events(self.events.clone());

        for entry in walker.by_ref() {
            summary.processed += 1;
            self.process_entry(&connection, &entry, summary).await;
        }

        fold_walk_stats(summary, walker.stats());
        Ok(())
    }

    async fn process_entry(
        &self,
        connection: &Arc<dyn Connection>,
        entry: &IndexEntry,
        summary: &mut SyncSummary,
    ) {
        let gav = entry.gav();
        let mut failed = false;

        // Checksums are recorded before the known-version check so that
        // skipping publication never skips bookkeeping.
        for (checksum, algorithm) in [
            (entry.sha1.as_deref(), ChecksumAlgorithm::Sha1),
            (entry.md5.as_deref(), ChecksumAlgorithm::Md5),
        ] {
            match self.dedup.record_if_new(entry, checksum, algorithm) {
                Ok(true) => {
                    summary.checksums_created += 1;
                    self.events.emit(SyncEvent::ChecksumRecorded {
                        checksum: checksum.unwrap_or_default().trim().to_string(),
                        algorithm: algorithm.to_string(),
                    });
                }
                Ok(false) => {}
                Err(err) => {
                    error!(gav = %gav, "failed to record {} checksum: {}", algorithm, err);
                    failed = true;
                }
            }
        }

        if self.options.skip_known {
            match self.dedup.is_known_version(&entry.key()) {
                Ok(true) => {
                    debug!("{} is already known, not publishing", gav);
                    summary.skipped_known += 1;
                    self.events.emit(SyncEvent::SkippedKnown { gav });
                    if failed {
                        summary.item_errors += 1;
                    }
                    return;
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(gav = %gav, "could not check known versions, publishing anyway: {}", err);
                    failed = true;
                }
            }
        }

        if failed {
            summary.item_errors += 1;
        }

        match self.publish(connection, gav, entry.last_modified).await {
            PublishOutcome::Sent => summary.published += 1,
            PublishOutcome::Failed => summary.publish_failed += 1,
            PublishOutcome::Cancelled => summary.timed_out += 1,
        }
    }

    /// Publishes inline, or as a task bounded by the deadline. When the
    /// deadline elapses the task is told to stop, gets [`RELEASE_GRACE`] to
    /// close its session, and is aborted after that.
    async fn publish(
        &self,
        connection: &Arc<dyn Connection>,
        gav: String,
        last_modified: i64,
    ) -> PublishOutcome {
        let Some(deadline) = self.options.deadline else {
            return self
                .publisher
                .publish(connection.clone(), &self.repository, &gav, last_modified)
                .await;
        };

        let (cancel, cancelled) = oneshot::channel::<()>();
        let publisher = self.publisher.clone();
        let connection = connection.clone();
        let repository = self.repository.clone();
        let task_gav = gav.clone();
        let mut task = tokio::spawn(async move {
            publisher
                .publish_until(connection, &repository, &task_gav, last_modified, async move {
                    let _ = cancelled.await;
                })
                .await
        });

        match tokio::time::timeout(deadline, &mut task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_err)) => {
                error!(gav = %gav, "publish task failed: {}", join_err);
                self.events.emit(SyncEvent::PublishFailed {
                    gav,
                    error: join_err.to_string(),
                });
                PublishOutcome::Failed
            }
            Err(_) => {
                let _ = cancel.send(());
                match tokio::time::timeout(RELEASE_GRACE, &mut task).await {
                    // delivered right at the deadline
                    Ok(Ok(PublishOutcome::Sent)) => return PublishOutcome::Sent,
                    Ok(_) => {}
                    Err(_) => {
                        warn!(gav = %gav, "publish task did not release its session, aborting it");
                        task.abort();
                    }
                }
                warn!(gav = %gav, "publishing did not finish within {:?}, moving on", deadline);
                self.events.emit(SyncEvent::PublishTimedOut { gav });
                PublishOutcome::Cancelled
            }
        }
    }
}

fn fold_walk_stats(summary: &mut SyncSummary, stats: WalkStats) {
    summary.visited = stats.visited;
    summary.deleted = stats.deleted;
    summary.incomplete = stats.incomplete;
    summary.unreadable = stats.failed;
}
