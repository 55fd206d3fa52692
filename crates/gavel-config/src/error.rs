use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(gavel_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(gavel_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists")]
    #[diagnostic(
        code(gavel_config::already_exists),
        help("Remove the existing config file or use a different location")
    )]
    ConfigAlreadyExists,

    #[error("Invalid repository name: {0:?}")]
    #[diagnostic(
        code(gavel_config::invalid_repository),
        help("Repository names must be non-empty")
    )]
    InvalidRepository(String),

    #[error("Invalid repository URL: {0}")]
    #[diagnostic(
        code(gavel_config::invalid_repository_url),
        help("Use an absolute URL such as https://repo.maven.apache.org/maven2")
    )]
    InvalidRepositoryUrl(String),

    #[error("Duplicate repository name: {0}")]
    #[diagnostic(
        code(gavel_config::duplicate_repo),
        help("Each repository must have a unique name")
    )]
    DuplicateRepositoryName(String),

    #[error("Invalid broker port: {0:?}")]
    #[diagnostic(
        code(gavel_config::invalid_broker_port),
        help("Set RM_PORT_5672_TCP_PORT or broker.port to a number between 1 and 65535")
    )]
    InvalidBrokerPort(String),

    #[error("Broker host is not configured")]
    #[diagnostic(
        code(gavel_config::missing_broker_host),
        help("Set RM_PORT_5672_TCP_ADDR or broker.host in your config file")
    )]
    MissingBrokerHost,

    #[error("Invalid duration: {0:?}")]
    #[diagnostic(
        code(gavel_config::invalid_duration),
        help("Use values like \"30m\", \"1h30m\" or \"never\"")
    )]
    InvalidDuration(String),

    #[error("IO error: {0}")]
    #[diagnostic(code(gavel_config::io))]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
