//! Connection strategies.

use std::sync::Arc;

use gavel_config::broker::{BrokerSettings, BrokerStrategy};
use tokio::sync::OwnedSemaphorePermit;
use tracing::{info, warn};

use crate::{
    error::{BrokerError, Result},
    pool::PooledConnector,
    transport::{Connection, Credentials, Endpoint, Transport},
};

/// Occupied pool slot. The permit is released when the slot is dropped.
pub(crate) struct PoolSlot {
    factory_id: u64,
    _permit: OwnedSemaphorePermit,
}

impl PoolSlot {
    pub(crate) fn new(factory_id: u64, permit: OwnedSemaphorePermit) -> Self {
        Self {
            factory_id,
            _permit: permit,
        }
    }
}

/// A connection handed out by a [`BrokerConnector`]. Give it back through
/// [`BrokerConnector::close`].
pub struct BrokerLink {
    connection: Arc<dyn Connection>,
    endpoint: Endpoint,
    slot: Option<PoolSlot>,
}

impl BrokerLink {
    pub(crate) fn new(connection: Arc<dyn Connection>, endpoint: Endpoint, slot: Option<PoolSlot>) -> Self {
        Self {
            connection,
            endpoint,
            slot,
        }
    }

    pub fn connection(&self) -> Arc<dyn Connection> {
        self.connection.clone()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Id of the pool factory this link was checked out from.
    pub fn factory_id(&self) -> Option<u64> {
        self.slot.as_ref().map(|slot| slot.factory_id)
    }

    pub(crate) fn into_parts(self) -> (Arc<dyn Connection>, Option<PoolSlot>) {
        (self.connection, self.slot)
    }
}

/// Opens one connection per call.
#[derive(Clone)]
pub struct DirectConnector {
    transport: Arc<dyn Transport>,
    credentials: Option<Credentials>,
}

impl DirectConnector {
    pub fn new(transport: Arc<dyn Transport>, credentials: Option<Credentials>) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    pub async fn connect(&self, host: &str, port: u16) -> Result<BrokerLink> {
        let endpoint = Endpoint::new(host, port, self.credentials.clone());
        let connection = self.transport.open(&endpoint).await?;
        connection.start().await?;
        Ok(BrokerLink::new(connection, endpoint, None))
    }

    pub async fn close(&self, link: BrokerLink) {
        let endpoint = link.endpoint.to_string();
        if let Err(err) = link.connection.close().await {
            warn!("error while closing broker connection to {}: {}", endpoint, err);
        }
    }
}

/// The configured way of obtaining broker connections.
#[derive(Clone)]
pub enum BrokerConnector {
    Direct(DirectConnector),
    Pooled(PooledConnector),
}

impl BrokerConnector {
    /// Builds the connector selected by `settings`. The pooled strategy uses
    /// the process-wide factory.
    pub fn from_settings(settings: &BrokerSettings, transport: Arc<dyn Transport>) -> Self {
        let credentials = Credentials::from_parts(settings.username.clone(), settings.password.clone());
        match settings.strategy {
            BrokerStrategy::Direct => Self::Direct(DirectConnector::new(transport, credentials)),
            BrokerStrategy::Pooled => Self::Pooled(PooledConnector::shared(transport, credentials)),
        }
    }

    pub fn strategy(&self) -> BrokerStrategy {
        match self {
            Self::Direct(_) => BrokerStrategy::Direct,
            Self::Pooled(_) => BrokerStrategy::Pooled,
        }
    }

    /// Opens (or checks out) a started connection to `host:port`.
    ///
    /// Every failure is reported as [`BrokerError::Connect`].
    pub async fn connect(&self, host: &str, port: u16) -> Result<BrokerLink> {
        let result = match self {
            Self::Direct(direct) => direct.connect(host, port).await,
            Self::Pooled(pooled) => pooled.connect(host, port).await,
        };

        match result {
            Ok(link) => {
                info!("connected to broker at {} ({:?})", link.endpoint, self.strategy());
                Ok(link)
            }
            Err(err @ BrokerError::Connect { .. }) => Err(err),
            Err(err) => {
                Err(BrokerError::Connect {
                    endpoint: format!("{host}:{port}"),
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Releases a connection. Errors are logged and never returned.
    pub async fn close(&self, link: BrokerLink) {
        match self {
            Self::Direct(direct) => direct.close(link).await,
            Self::Pooled(pooled) => pooled.close(link),
        }
    }

    /// Closes connections kept open across runs. Direct connections are
    /// closed by [`close`](Self::close) already.
    pub async fn shutdown(&self) {
        if let Self::Pooled(pooled) = self {
            pooled.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    fn settings(strategy: BrokerStrategy, username: Option<&str>) -> BrokerSettings {
        BrokerSettings {
            strategy,
            host: "localhost".into(),
            port: 5672,
            username: username.map(String::from),
            password: None,
            queue: "maven_index_worker".into(),
        }
    }

    #[tokio::test]
    async fn test_direct_connect_and_close() {
        let transport = MockTransport::new();
        let connector = BrokerConnector::from_settings(
            &settings(BrokerStrategy::Direct, Some("gavel")),
            Arc::new(transport.clone()),
        );
        assert_eq!(connector.strategy(), BrokerStrategy::Direct);

        let link = connector.connect("rabbit", 5673).await.unwrap();
        assert!(link.connection().is_open());
        assert!(link.factory_id().is_none());

        let endpoint = &transport.endpoints()[0];
        assert_eq!(endpoint.host, "rabbit");
        assert_eq!(endpoint.port, 5673);
        let creds = endpoint.credentials.as_ref().unwrap();
        assert_eq!(creds.username, "gavel");
        assert_eq!(creds.password, "");

        connector.close(link).await;
        assert_eq!(transport.connections_closed(), 1);
    }

    #[tokio::test]
    async fn test_direct_without_username_is_anonymous() {
        let transport = MockTransport::new();
        let connector = BrokerConnector::from_settings(
            &settings(BrokerStrategy::Direct, None),
            Arc::new(transport.clone()),
        );
        let link = connector.connect("localhost", 5672).await.unwrap();
        assert!(transport.endpoints()[0].credentials.is_none());
        connector.close(link).await;
    }

    #[tokio::test]
    async fn test_connect_refused_is_connectivity_error() {
        let transport = MockTransport::new();
        transport.refuse_connections();
        let connector = BrokerConnector::Direct(DirectConnector::new(Arc::new(transport), None));

        let err = connector.connect("localhost", 5672).await.err().unwrap();
        assert!(matches!(err, BrokerError::Connect { .. }));
    }

    #[tokio::test]
    async fn test_close_twice_does_not_fail() {
        let transport = MockTransport::new();
        let connector = BrokerConnector::Direct(DirectConnector::new(Arc::new(transport.clone()), None));

        let link = connector.connect("localhost", 5672).await.unwrap();
        link.connection().close().await.unwrap();
        connector.close(link).await;
        assert_eq!(transport.connections_closed(), 1);
    }

    #[tokio::test]
    async fn test_pooled_close_keeps_connection_open() {
        let transport = MockTransport::new();
        let connector = BrokerConnector::Pooled(PooledConnector::isolated(
            Arc::new(transport.clone()),
            None,
        ));

        let link = connector.connect("localhost", 5672).await.unwrap();
        assert!(link.factory_id().is_some());
        connector.close(link).await;

        assert_eq!(transport.connections_closed(), 0);
        let again = connector.connect("localhost", 5672).await.unwrap();
        assert_eq!(transport.connections_opened(), 1);
        connector.close(again).await;

        connector.shutdown().await;
        assert_eq!(transport.connections_closed(), 1);
    }

    #[tokio::test]
    async fn test_direct_shutdown_is_noop() {
        let transport = MockTransport::new();
        let connector = BrokerConnector::Direct(DirectConnector::new(Arc::new(transport.clone()), None));

        let link = connector.connect("localhost", 5672).await.unwrap();
        connector.shutdown().await;
        assert!(link.connection().is_open());
        connector.close(link).await;
        assert_eq!(transport.connections_closed(), 1);
    }
}
