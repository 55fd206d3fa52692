//! Transport-neutral broker interface.

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::error::Result;

/// Username and password presented to the broker.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Authentication is only attempted when a username is present. A missing
    /// password is sent as empty.
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Option<Self> {
        let username = username.filter(|u| !u.is_empty())?;
        Some(Self {
            username,
            password: password.unwrap_or_default(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub credentials: Option<Credentials>,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, credentials: Option<Credentials>) -> Self {
        Self {
            host: host.into(),
            port,
            credentials,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.credentials {
            Some(creds) => write!(f, "{}@{}:{}", creds.username, self.host, self.port),
            None => write!(f, "{}:{}", self.host, self.port),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeliveryMode {
    #[default]
    NonPersistent,
    Persistent,
}

impl DeliveryMode {
    /// AMQP `delivery-mode` property value.
    pub fn amqp_code(self) -> u8 {
        match self {
            DeliveryMode::NonPersistent => 1,
            DeliveryMode::Persistent => 2,
        }
    }
}

/// Opens connections to a broker.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    async fn open(&self, endpoint: &Endpoint) -> Result<Arc<dyn Connection>>;
}

/// A live broker connection. Shared between a connector and the sessions
/// opened on it.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Readies the connection for use. Called once before the first session
    /// is created.
    async fn start(&self) -> Result<()>;

    async fn create_session(&self) -> Result<Box<dyn Session>>;

    fn is_open(&self) -> bool;

    async fn close(&self) -> Result<()>;
}

/// A lightweight, single-user channel on a [`Connection`].
#[async_trait]
pub trait Session: Send {
    async fn declare_queue(&mut self, queue: &str) -> Result<()>;

    async fn send_text(&mut self, queue: &str, body: &str, mode: DeliveryMode) -> Result<()>;

    async fn close(self: Box<Self>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_require_username() {
        assert!(Credentials::from_parts(None, Some("secret".into())).is_none());
        assert!(Credentials::from_parts(Some(String::new()), None).is_none());

        let creds = Credentials::from_parts(Some("gavel".into()), None).unwrap();
        assert_eq!(creds.password, "");
    }

    #[test]
    fn test_endpoint_display_hides_password() {
        let endpoint = Endpoint::new(
            "rabbit",
            5672,
            Credentials::from_parts(Some("gavel".into()), Some("hunter2".into())),
        );
        assert_eq!(endpoint.to_string(), "gavel@rabbit:5672");
        assert!(!format!("{endpoint:?}").contains("hunter2"));
    }

    #[test]
    fn test_delivery_mode_codes() {
        assert_eq!(DeliveryMode::default().amqp_code(), 1);
        assert_eq!(DeliveryMode::Persistent.amqp_code(), 2);
    }
}
