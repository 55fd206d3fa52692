//! Broker connectivity for gavel.
//!
//! [`Transport`], [`Connection`] and [`Session`] describe a broker without
//! tying callers to a wire protocol. [`AmqpTransport`] talks to RabbitMQ;
//! `MockTransport` (feature `mock`) keeps everything in memory.
//!
//! [`BrokerConnector`] selects how connections are obtained: a fresh
//! connection per call ([`DirectConnector`]) or a checkout from the bounded,
//! process-wide pool ([`PooledConnector`]).

mod amqp;
mod connector;
mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod pool;
mod transport;

pub use amqp::{amqp_uri, AmqpConnection, AmqpSession, AmqpTransport};
pub use connector::{BrokerConnector, BrokerLink, DirectConnector};
pub use error::{BrokerError, Result};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockTransport, SentMessage};
pub use pool::{ConnectionFactory, PooledConnector, MAX_POOL_SIZE};
pub use transport::{Connection, Credentials, DeliveryMode, Endpoint, Session, Transport};
