use std::{future::Future, sync::Arc};

use gavel_broker::{Connection, DeliveryMode, Session};
use gavel_config::{broker::DEFAULT_QUEUE_NAME, repository::RepositoryDescriptor};
use gavel_events::{EventSinkHandle, NullSink, SyncEvent};
use tracing::{debug, error, info, warn};

pub const PAYLOAD_DELIMITER: &str = "::";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Sent,
    Failed,
    /// The send was abandoned before the broker accepted it.
    Cancelled,
}

/// `<repoName>::<repoUrl>::<gav>::<lastModified>`
pub fn notification_payload(repository: &RepositoryDescriptor, gav: &str, last_modified: i64) -> String {
    [
        repository.name.as_str(),
        repository.url.as_str(),
        gav,
        &last_modified.to_string(),
    ]
    .join(PAYLOAD_DELIMITER)
}

/// Sends one change notification per artifact.
#[derive(Clone)]
pub struct NotificationPublisher {
    queue: String,
    events: EventSinkHandle,
}

impl Default for NotificationPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_NAME)
    }
}

impl NotificationPublisher {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            events: Arc::new(NullSink),
        }
    }

    pub fn with_events(mut self, events: EventSinkHandle) -> Self {
        self.events = events;
        self
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Publishes the notification for `gav` on a fresh session of
    /// `connection`. Failures are logged and reported as
    /// [`PublishOutcome::Failed`]; they are never returned as errors.
    pub async fn publish(
        &self,
        connection: Arc<dyn Connection>,
        repository: &RepositoryDescriptor,
        gav: &str,
        last_modified: i64,
    ) -> PublishOutcome {
        self.publish_until(
            connection,
            repository,
            gav,
            last_modified,
            std::future::pending(),
        )
        .await
    }

    /// Like [`publish`](Self::publish), but abandons the send once
    /// `cancelled` completes and reports [`PublishOutcome::Cancelled`].
    /// The session is closed before returning in every case.
    pub async fn publish_until<F>(
        &self,
        connection: Arc<dyn Connection>,
        repository: &RepositoryDescriptor,
        gav: &str,
        last_modified: i64,
        cancelled: F,
    ) -> PublishOutcome
    where
        F: Future<Output = ()>,
    {
        let payload = notification_payload(repository, gav, last_modified);

        match self.send(connection.as_ref(), &payload, cancelled).await {
            Ok(false) => {
                debug!("abandoned publishing {}", gav);
                PublishOutcome::Cancelled
            }
            Ok(true) => {
                info!("published {}", payload);
                self.events.emit(SyncEvent::Published {
                    gav: gav.to_string(),
                });
                PublishOutcome::Sent
            }
            Err(err) => {
                error!("failed to publish {}: {}", gav, err);
                self.events.emit(SyncEvent::PublishFailed {
                    gav: gav.to_string(),
                    error: err.to_string(),
                });
                PublishOutcome::Failed
            }
        }
    }

    /// Returns `Ok(false)` when `cancelled` completed before the send did.
    async fn send<F>(
        &self,
        connection: &dyn Connection,
        payload: &str,
        cancelled: F,
    ) -> gavel_broker::Result<bool>
    where
        F: Future<Output = ()>,
    {
        let mut session = connection.create_session().await?;
        let sent = tokio::select! {
            sent = self.send_on(session.as_mut(), payload) => sent.map(|()| true),
            () = cancelled => Ok(false),
        };

        if let Err(err) = session.close().await {
            warn!("failed to close session: {}", err);
        }
        sent
    }

    async fn send_on(&self, session: &mut dyn Session, payload: &str) -> gavel_broker::Result<()> {
        session.declare_queue(&self.queue).await?;
        session
            .send_text(&self.queue, payload, DeliveryMode::NonPersistent)
            .await
    }
}
