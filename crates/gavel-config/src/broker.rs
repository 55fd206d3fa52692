//! Broker endpoint settings.
//!
//! Host, port and credentials are read from the environment first and fall
//! back to the `[broker]` table of the config file.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

pub const BROKER_HOST_ENV: &str = "RM_PORT_5672_TCP_ADDR";
pub const BROKER_PORT_ENV: &str = "RM_PORT_5672_TCP_PORT";
pub const BROKER_USER_ENV: &str = "RM_PORT_USER";
pub const BROKER_CRED_ENV: &str = "RM_PORT_CRED";

pub const DEFAULT_BROKER_HOST: &str = "localhost";
pub const DEFAULT_BROKER_PORT: u16 = 5672;
pub const DEFAULT_QUEUE_NAME: &str = "maven_index_worker";

/// How connections to the broker are obtained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerStrategy {
    /// One connection per synchronization run.
    #[default]
    Direct,
    /// Connections are checked out from a process-wide bounded pool.
    Pooled,
}

impl std::str::FromStr for BrokerStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "pooled" => Ok(Self::Pooled),
            other => Err(format!("unknown broker strategy `{other}`")),
        }
    }
}

/// The `[broker]` table of the config file.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct BrokerConfig {
    /// Connection strategy: "direct" or "pooled".
    /// Default: "direct"
    pub strategy: Option<BrokerStrategy>,

    /// Broker host, used when RM_PORT_5672_TCP_ADDR is unset.
    pub host: Option<String>,

    /// Broker port, used when RM_PORT_5672_TCP_PORT is unset.
    pub port: Option<u16>,

    /// Username, used when RM_PORT_USER is unset.
    pub username: Option<String>,

    /// Password, used when RM_PORT_CRED is unset.
    pub password: Option<String>,

    /// Destination queue for notifications.
    /// Default: "maven_index_worker"
    pub queue: Option<String>,
}

/// Fully resolved broker settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokerSettings {
    pub strategy: BrokerStrategy,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub queue: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl BrokerConfig {
    pub fn default_config() -> Self {
        Self {
            strategy: Some(BrokerStrategy::Direct),
            host: Some(DEFAULT_BROKER_HOST.to_string()),
            port: Some(DEFAULT_BROKER_PORT),
            username: None,
            password: None,
            queue: Some(DEFAULT_QUEUE_NAME.to_string()),
        }
    }

    /// Resolves settings against the process environment.
    pub fn resolve(&self) -> Result<BrokerSettings> {
        self.resolve_with(|key| env::var(key).ok())
    }

    /// Resolves settings using `lookup` for environment variables.
    ///
    /// Host and port are taken from the environment only when both are
    /// present; otherwise both come from the config table.
    pub fn resolve_with<F>(&self, lookup: F) -> Result<BrokerSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_host = non_empty(lookup(BROKER_HOST_ENV));
        let env_port = non_empty(lookup(BROKER_PORT_ENV));

        let (host, port) = match (env_host, env_port) {
            (Some(host), Some(port)) => {
                let port = port
                    .trim()
                    .parse::<u16>()
                    .ok()
                    .filter(|p| *p != 0)
                    .ok_or(ConfigError::InvalidBrokerPort(port))?;
                (host, port)
            }
            _ => {
                let host = non_empty(self.host.clone()).ok_or(ConfigError::MissingBrokerHost)?;
                let port = self.port.unwrap_or(DEFAULT_BROKER_PORT);
                if port == 0 {
                    return Err(ConfigError::InvalidBrokerPort(port.to_string()));
                }
                (host, port)
            }
        };

        let username = non_empty(lookup(BROKER_USER_ENV)).or_else(|| non_empty(self.username.clone()));
        let password = lookup(BROKER_CRED_ENV).or_else(|| self.password.clone());

        Ok(BrokerSettings {
            strategy: self.strategy.unwrap_or_default(),
            host,
            port,
            username,
            password,
            queue: non_empty(self.queue.clone()).unwrap_or_else(|| DEFAULT_QUEUE_NAME.to_string()),
        })
    }
}
