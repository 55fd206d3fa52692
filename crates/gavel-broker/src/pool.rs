//! Process-wide pooled connection factory.
//!
//! The factory is created lazily by the first caller of
//! [`PooledConnector::connect`]. Concurrent first callers wait on the same
//! initialization instead of creating their own factory. At most
//! [`MAX_POOL_SIZE`] connections are checked out at any time; further callers
//! wait until a link is closed.
//!
//! Released connections stay open on the idle list until
//! [`ConnectionFactory::shutdown`] closes them.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, LazyLock, Mutex,
};

use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, info, warn};

use crate::{
    connector::{BrokerLink, PoolSlot},
    error::{BrokerError, Result},
    transport::{Connection, Credentials, Endpoint, Transport},
};

pub const MAX_POOL_SIZE: usize = 10;

static SHARED_FACTORY: LazyLock<Arc<OnceCell<ConnectionFactory>>> =
    LazyLock::new(|| Arc::new(OnceCell::new()));

static NEXT_FACTORY_ID: AtomicU64 = AtomicU64::new(1);

pub struct ConnectionFactory {
    id: u64,
    transport: Arc<dyn Transport>,
    endpoint: Endpoint,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<Arc<dyn Connection>>>,
}

impl ConnectionFactory {
    fn new(transport: Arc<dyn Transport>, endpoint: Endpoint, max_size: usize) -> Self {
        Self {
            id: NEXT_FACTORY_ID.fetch_add(1, Ordering::Relaxed),
            transport,
            endpoint,
            permits: Arc::new(Semaphore::new(max_size)),
            idle: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Connections that can be checked out right now without waiting.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    fn take_idle(&self) -> Option<Arc<dyn Connection>> {
        let mut idle = self.idle.lock().unwrap_or_else(|p| p.into_inner());
        while let Some(connection) = idle.pop() {
            if connection.is_open() {
                return Some(connection);
            }
        }
        None
    }

    async fn checkout(&self) -> Result<BrokerLink> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| BrokerError::PoolClosed)?;

        let connection = match self.take_idle() {
            Some(connection) => connection,
            None => {
                debug!("opening pooled connection to {}", self.endpoint);
                let connection = self.transport.open(&self.endpoint).await?;
                connection.start().await?;
                connection
            }
        };

        Ok(BrokerLink::new(
            connection,
            self.endpoint.clone(),
            Some(PoolSlot::new(self.id, permit)),
        ))
    }

    /// Closes every idle connection and stops handing out new ones. Links
    /// still checked out are dropped when released. Returns the number of
    /// connections closed.
    pub async fn shutdown(&self) -> usize {
        self.permits.close();

        let idle: Vec<_> = self
            .idle
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .drain(..)
            .collect();

        let mut closed = 0;
        for connection in idle {
            match connection.close().await {
                Ok(()) => closed += 1,
                Err(err) => warn!("failed to close pooled connection to {}: {}", self.endpoint, err),
            }
        }
        info!("closed {} pooled connection(s) to {}", closed, self.endpoint);
        closed
    }

    /// Returns a link's connection to the idle list and frees its slot.
    fn release(&self, link: BrokerLink) {
        let (connection, slot) = link.into_parts();
        if self.permits.is_closed() {
            debug!("pool is shut down, dropping released connection");
        } else if connection.is_open() {
            self.idle
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .push(connection);
        }
        drop(slot);
    }
}

/// Checks connections out of a lazily created [`ConnectionFactory`].
#[derive(Clone)]
pub struct PooledConnector {
    cell: Arc<OnceCell<ConnectionFactory>>,
    transport: Arc<dyn Transport>,
    credentials: Option<Credentials>,
}

impl PooledConnector {
    /// Uses the factory shared by the whole process.
    pub fn shared(transport: Arc<dyn Transport>, credentials: Option<Credentials>) -> Self {
        Self {
            cell: SHARED_FACTORY.clone(),
            transport,
            credentials,
        }
    }

    /// Uses a factory private to this connector and its clones.
    pub fn isolated(transport: Arc<dyn Transport>, credentials: Option<Credentials>) -> Self {
        Self {
            cell: Arc::new(OnceCell::new()),
            transport,
            credentials,
        }
    }

    pub fn factory(&self) -> Option<&ConnectionFactory> {
        self.cell.get()
    }

    pub async fn connect(&self, host: &str, port: u16) -> Result<BrokerLink> {
        let endpoint = Endpoint::new(host, port, self.credentials.clone());

        let factory = self
            .cell
            .get_or_init(|| {
                async {
                    info!(
                        "initializing pooled connection factory for {} (max {} connections)",
                        endpoint, MAX_POOL_SIZE
                    );
                    ConnectionFactory::new(self.transport.clone(), endpoint.clone(), MAX_POOL_SIZE)
                }
            })
            .await;

        if factory.endpoint.host != endpoint.host || factory.endpoint.port != endpoint.port {
            warn!(
                "pooled factory already bound to {}, ignoring requested {}",
                factory.endpoint, endpoint
            );
        }

        factory.checkout().await
    }

    pub fn close(&self, link: BrokerLink) {
        match self.cell.get() {
            Some(factory) if link.factory_id() == Some(factory.id) => factory.release(link),
            _ => warn!("dropping connection that does not belong to this pool"),
        }
    }

    /// Shuts the factory down if it was ever initialized.
    pub async fn shutdown(&self) {
        if let Some(factory) = self.cell.get() {
            factory.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::mock::MockTransport;

    fn connector(transport: &MockTransport) -> PooledConnector {
        PooledConnector::isolated(Arc::new(transport.clone()), None)
    }

    #[tokio::test]
    async fn test_factory_initialized_once_under_concurrency() {
        let transport = MockTransport::new();
        let pool = connector(&transport);

        let handles: Vec<_> = (0..MAX_POOL_SIZE)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move { pool.connect("localhost", 5672).await })
            })
            .collect();

        let mut ids = Vec::new();
        let mut links = Vec::new();
        for handle in handles {
            let link = handle.await.unwrap().unwrap();
            ids.push(link.factory_id());
            links.push(link);
        }

        let first = pool.factory().unwrap().id();
        assert!(ids.iter().all(|id| *id == Some(first)));
        assert_eq!(transport.connections_opened(), MAX_POOL_SIZE);

        for link in links {
            pool.close(link);
        }
    }

    #[tokio::test]
    async fn test_pool_caps_checked_out_connections() {
        let transport = MockTransport::new();
        let pool = connector(&transport);

        let mut links = Vec::new();
        for _ in 0..MAX_POOL_SIZE {
            links.push(pool.connect("localhost", 5672).await.unwrap());
        }
        assert_eq!(pool.factory().unwrap().available(), 0);

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            pool.connect("localhost", 5672),
        )
        .await;
        assert!(blocked.is_err(), "11th checkout must wait for a free slot");

        pool.close(links.pop().unwrap());
        let link = tokio::time::timeout(
            Duration::from_millis(50),
            pool.connect("localhost", 5672),
        )
        .await
        .expect("slot should be free after close")
        .unwrap();

        // the released connection is reused rather than reopened
        assert_eq!(transport.connections_opened(), MAX_POOL_SIZE);
        pool.close(link);
    }

    #[tokio::test]
    async fn test_closed_connections_are_not_reused() {
        let transport = MockTransport::new();
        let pool = connector(&transport);

        let link = pool.connect("localhost", 5672).await.unwrap();
        link.connection().close().await.unwrap();
        pool.close(link);

        let link = pool.connect("localhost", 5672).await.unwrap();
        assert!(link.connection().is_open());
        assert_eq!(transport.connections_opened(), 2);
        pool.close(link);
    }

    #[tokio::test]
    async fn test_failed_open_releases_slot() {
        let transport = MockTransport::new();
        transport.refuse_connections();
        let pool = connector(&transport);

        for _ in 0..MAX_POOL_SIZE + 1 {
            assert!(matches!(
                pool.connect("localhost", 5672).await,
                Err(BrokerError::Connect { .. })
            ));
        }
        assert_eq!(pool.factory().unwrap().available(), MAX_POOL_SIZE);
    }

    #[tokio::test]
    async fn test_shutdown_closes_idle_connections() {
        let transport = MockTransport::new();
        let pool = connector(&transport);

        let first = pool.connect("localhost", 5672).await.unwrap();
        let second = pool.connect("localhost", 5672).await.unwrap();
        pool.close(first);
        pool.close(second);
        assert_eq!(transport.connections_closed(), 0);

        assert_eq!(pool.factory().unwrap().shutdown().await, 2);
        assert_eq!(transport.connections_closed(), 2);

        assert!(matches!(
            pool.connect("localhost", 5672).await,
            Err(BrokerError::PoolClosed)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_before_first_use_is_noop() {
        let transport = MockTransport::new();
        let pool = connector(&transport);

        pool.shutdown().await;
        assert!(pool.factory().is_none());
        assert_eq!(transport.connections_opened(), 0);
    }
}
