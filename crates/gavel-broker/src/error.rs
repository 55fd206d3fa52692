use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum BrokerError {
    #[error("Failed to connect to broker at {endpoint}: {reason}")]
    #[diagnostic(
        code(gavel_broker::connect),
        help("Check RM_PORT_5672_TCP_ADDR/RM_PORT_5672_TCP_PORT or the [broker] section of the config, and the broker credentials")
    )]
    Connect { endpoint: String, reason: String },

    #[error("Failed to open a session: {0}")]
    #[diagnostic(code(gavel_broker::session))]
    Session(String),

    #[error("Failed to send to queue `{queue}`: {reason}")]
    #[diagnostic(code(gavel_broker::send))]
    Send { queue: String, reason: String },

    #[error("Connection is closed")]
    #[diagnostic(code(gavel_broker::closed))]
    Closed,

    #[error("Connection pool is shut down")]
    #[diagnostic(code(gavel_broker::pool_closed))]
    PoolClosed,

    #[error(transparent)]
    #[diagnostic(code(gavel_broker::amqp))]
    Amqp(#[from] lapin::Error),
}

pub type Result<T> = std::result::Result<T, BrokerError>;
