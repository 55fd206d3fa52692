//! In-memory transport for tests.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    error::{BrokerError, Result},
    transport::{Connection, DeliveryMode, Endpoint, Session, Transport},
};

/// A message accepted by the mock broker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub queue: String,
    pub body: String,
    pub mode: DeliveryMode,
}

#[derive(Clone, Debug)]
enum SendRule {
    Fail(String),
    Delay(String, Duration),
}

#[derive(Default)]
struct MockState {
    refuse_connections: AtomicBool,
    rules: Mutex<Vec<SendRule>>,
    endpoints: Mutex<Vec<Endpoint>>,
    declared: Mutex<Vec<String>>,
    sent: Mutex<Vec<SentMessage>>,
    connections_opened: AtomicUsize,
    connections_closed: AtomicUsize,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Transport that keeps everything in memory.
///
/// Clones share state, so a test can hand one clone to the code under test
/// and inspect another.
///
/// ```
/// use gavel_broker::{MockTransport, Transport, Endpoint, DeliveryMode};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> gavel_broker::Result<()> {
/// let transport = MockTransport::new();
/// let connection = transport.open(&Endpoint::new("localhost", 5672, None)).await?;
/// connection.start().await?;
/// let mut session = connection.create_session().await?;
/// session.send_text("queue", "hello", DeliveryMode::NonPersistent).await?;
/// session.close().await?;
/// assert_eq!(transport.sent()[0].body, "hello");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent `open` fails as an unreachable broker would.
    pub fn refuse_connections(&self) {
        self.state.refuse_connections.store(true, Ordering::SeqCst);
    }

    /// Sends whose body contains `pattern` fail. An empty pattern fails all
    /// sends.
    pub fn fail_sends_containing(&self, pattern: impl Into<String>) {
        lock(&self.state.rules).push(SendRule::Fail(pattern.into()));
    }

    /// Sends whose body contains `pattern` wait for `delay` before being
    /// accepted.
    pub fn delay_sends_containing(&self, pattern: impl Into<String>, delay: Duration) {
        lock(&self.state.rules).push(SendRule::Delay(pattern.into(), delay));
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        lock(&self.state.sent).clone()
    }

    pub fn sent_bodies(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.body).collect()
    }

    pub fn declared_queues(&self) -> Vec<String> {
        lock(&self.state.declared).clone()
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        lock(&self.state.endpoints).clone()
    }

    pub fn connections_opened(&self) -> usize {
        self.state.connections_opened.load(Ordering::SeqCst)
    }

    pub fn connections_closed(&self) -> usize {
        self.state.connections_closed.load(Ordering::SeqCst)
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.state.sessions_closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open(&self, endpoint: &Endpoint) -> Result<Arc<dyn Connection>> {
        lock(&self.state.endpoints).push(endpoint.clone());
        if self.state.refuse_connections.load(Ordering::SeqCst) {
            return Err(BrokerError::Connect {
                endpoint: endpoint.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        self.state.connections_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockConnection {
            state: self.state.clone(),
            open: AtomicBool::new(true),
        }))
    }
}

struct MockConnection {
    state: Arc<MockState>,
    open: AtomicBool,
}

#[async_trait]
impl Connection for MockConnection {
    async fn start(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(BrokerError::Closed)
        }
    }

    async fn create_session(&self) -> Result<Box<dyn Session>> {
        if !self.is_open() {
            return Err(BrokerError::Closed);
        }
        self.state.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            state: self.state.clone(),
        }))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        if self.open.swap(false, Ordering::SeqCst) {
            self.state.connections_closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

struct MockSession {
    state: Arc<MockState>,
}

#[async_trait]
impl Session for MockSession {
    async fn declare_queue(&mut self, queue: &str) -> Result<()> {
        lock(&self.state.declared).push(queue.to_string());
        Ok(())
    }

    async fn send_text(&mut self, queue: &str, body: &str, mode: DeliveryMode) -> Result<()> {
        let rules = lock(&self.state.rules).clone();

        for rule in &rules {
            if let SendRule::Delay(pattern, delay) = rule {
                if body.contains(pattern.as_str()) {
                    tokio::time::sleep(*delay).await;
                }
            }
        }

        let failing = rules.iter().any(|rule| {
            matches!(rule, SendRule::Fail(pattern) if body.contains(pattern.as_str()))
        });
        if failing {
            return Err(BrokerError::Send {
                queue: queue.to_string(),
                reason: "rejected by mock broker".to_string(),
            });
        }

        lock(&self.state.sent).push(SentMessage {
            queue: queue.to_string(),
            body: body.to_string(),
            mode,
        });
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
