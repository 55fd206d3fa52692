use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    sync::{LazyLock, RwLock},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    broker::BrokerConfig,
    error::{ConfigError, Result},
    repository::{RepositoryDescriptor, CENTRAL_REPOSITORY_NAME},
    sync::SyncConfig,
    utils::{resolve_path, xdg_cache_home, xdg_config_home, xdg_data_home},
};

/// Application's configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Path to the SQLite database holding checksum and product records.
    /// Default: $XDG_DATA_HOME/gavel/gavel.db
    pub db_path: Option<String>,

    /// Directory holding downloaded index snapshots, one sub-directory per
    /// repository.
    /// Default: $XDG_CACHE_HOME/gavel/index
    pub index_path: Option<String>,

    /// Message broker settings.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Synchronization behaviour.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Repositories that can be synchronized.
    #[serde(default)]
    pub repositories: Vec<RepositoryDescriptor>,
}

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match std::env::var("GAVEL_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("gavel").join("config.toml"),
    })
});

/// Overrides the config path, e.g. from a `--config` flag.
pub fn set_config_path<P: AsRef<Path>>(path: P) {
    if let Ok(mut config_path) = CONFIG_PATH.write() {
        *config_path = path.as_ref().to_path_buf();
    }
}

pub fn config_path() -> PathBuf {
    CONFIG_PATH
        .read()
        .map(|p| p.clone())
        .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn default_config() -> Self {
        let data_root = xdg_data_home().join("gavel");
        let cache_root = xdg_cache_home().join("gavel");

        Self {
            db_path: Some(data_root.join("gavel.db").display().to_string()),
            index_path: Some(cache_root.join("index").display().to_string()),
            broker: BrokerConfig::default_config(),
            sync: SyncConfig::default_config(),
            repositories: vec![RepositoryDescriptor::central()],
        }
    }

    /// Loads the configuration from [`CONFIG_PATH`], falling back to the
    /// default configuration when the file does not exist.
    pub fn new() -> Result<Self> {
        Self::load_from(config_path())
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config = match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("config file {} not found, using defaults", path.display());
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    /// Fills unset values with defaults and validates the configuration.
    pub fn resolve(&mut self) -> Result<()> {
        let mut seen_repos = HashSet::new();
        for repo in &self.repositories {
            repo.validate()?;
            if !seen_repos.insert(repo.name.as_str()) {
                return Err(ConfigError::DuplicateRepositoryName(repo.name.clone()));
            }
        }

        if self.repositories.is_empty() {
            warn!("No repositories configured, only the built-in `central` is available");
        }

        self.sync.skip_known.get_or_insert(false);
        self.sync.progress_interval.get_or_insert(crate::sync::DEFAULT_PROGRESS_INTERVAL);
        self.sync.deadline()?;

        self.broker.strategy.get_or_insert_with(Default::default);
        self.broker
            .queue
            .get_or_insert_with(|| crate::broker::DEFAULT_QUEUE_NAME.to_string());

        Ok(())
    }

    /// Finds a repository by name. `central` is always available, either as
    /// configured or as the built-in descriptor.
    pub fn find_repository(&self, name: &str) -> Option<RepositoryDescriptor> {
        self.repositories
            .iter()
            .find(|repo| repo.name == name)
            .cloned()
            .or_else(|| (name == CENTRAL_REPOSITORY_NAME).then(RepositoryDescriptor::central))
    }

    pub fn get_db_path(&self) -> PathBuf {
        if let Ok(env_path) = std::env::var("GAVEL_DB") {
            return resolve_path(&env_path);
        }
        match &self.db_path {
            Some(db_path) => resolve_path(db_path),
            None => xdg_data_home().join("gavel").join("gavel.db"),
        }
    }

    pub fn get_index_path(&self, repo_name: &str) -> PathBuf {
        let root = match &self.index_path {
            Some(index_path) => resolve_path(index_path),
            None => xdg_cache_home().join("gavel").join("index"),
        };
        root.join(repo_name)
    }
}

/// Writes the default configuration to [`CONFIG_PATH`].
pub fn generate_default_config() -> Result<PathBuf> {
    let path = config_path();
    if path.exists() {
        return Err(ConfigError::ConfigAlreadyExists);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(&Config::default_config())?;
    fs::write(&path, content)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serial_test::serial;

    use super::*;
    use crate::{broker::BrokerStrategy, test_utils::with_env};

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.repositories.len(), 1);
        assert_eq!(config.repositories[0].name, "central");
        assert_eq!(config.broker.strategy, Some(BrokerStrategy::Direct));
        assert_eq!(config.broker.queue.as_deref(), Some("maven_index_worker"));
        assert_eq!(config.sync.skip_known, Some(false));
        assert_eq!(config.sync.progress_interval, Some(100_000));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("absent.toml")).unwrap();
        assert!(config.find_repository("central").is_some());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
db_path = "/var/lib/gavel/gavel.db"

[broker]
strategy = "pooled"
host = "mq.internal"
port = 5673

[sync]
skip_known = true
deadline = "1h"

[[repositories]]
name = "typesafe"
url = "https://repo.typesafe.com/typesafe/releases"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.broker.strategy, Some(BrokerStrategy::Pooled));
        assert_eq!(config.broker.host.as_deref(), Some("mq.internal"));
        assert_eq!(config.broker.queue.as_deref(), Some("maven_index_worker"));
        assert!(config.sync.skip_known());
        assert_eq!(
            config.sync.deadline().unwrap(),
            Some(Duration::from_secs(3600))
        );
        assert_eq!(config.sync.progress_interval, Some(100_000));

        let typesafe = config.find_repository("typesafe").unwrap();
        assert_eq!(typesafe.language, "Java");
        // central stays reachable even when not listed
        assert!(config.find_repository("central").is_some());
        assert!(config.find_repository("jcenter").is_none());
    }

    #[test]
    fn test_resolve_duplicate_repo() {
        let mut config = Config::default_config();
        config.repositories.push(RepositoryDescriptor::central());

        assert!(matches!(
            config.resolve(),
            Err(ConfigError::DuplicateRepositoryName(name)) if name == "central"
        ));
    }

    #[test]
    fn test_resolve_invalid_deadline() {
        let mut config = Config::default_config();
        config.sync.deadline = Some("eventually".to_string());
        assert!(matches!(config.resolve(), Err(ConfigError::InvalidDuration(_))));
    }

    #[test]
    fn test_resolve_sets_defaults() {
        let mut config = Config::default_config();
        config.broker.strategy = None;
        config.broker.queue = None;
        config.sync.skip_known = None;
        config.sync.progress_interval = None;

        config.resolve().unwrap();

        assert_eq!(config.broker.strategy, Some(BrokerStrategy::Direct));
        assert_eq!(config.broker.queue.as_deref(), Some("maven_index_worker"));
        assert_eq!(config.sync.skip_known, Some(false));
        assert_eq!(config.sync.progress_interval, Some(100_000));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.repositories, config.repositories);
    }

    #[test]
    fn test_index_path_is_per_repository() {
        let mut config = Config::default_config();
        config.index_path = Some("/srv/index".to_string());
        assert_eq!(
            config.get_index_path("central"),
            PathBuf::from("/srv/index/central")
        );
    }

    #[test]
    #[serial]
    fn test_db_path_env_override() {
        with_env(vec![("GAVEL_DB", Some("/custom/gavel.db"))], || {
            let config = Config::default_config();
            assert_eq!(config.get_db_path(), PathBuf::from("/custom/gavel.db"));
        });
    }
}
