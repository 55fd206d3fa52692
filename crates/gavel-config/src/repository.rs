use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConfigError, Result};

pub const CENTRAL_REPOSITORY_NAME: &str = "central";
pub const CENTRAL_REPOSITORY_URL: &str = "https://repo.maven.apache.org/maven2";
pub const DEFAULT_LANGUAGE: &str = "Java";

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

/// Describes a remote package repository whose index is synchronized.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepositoryDescriptor {
    /// Unique name of the repository. Used as the first payload field of
    /// every notification.
    pub name: String,

    /// Base URL of the repository.
    pub url: String,

    /// Username for repositories that require authentication.
    pub username: Option<String>,

    /// Password for repositories that require authentication.
    pub password: Option<String>,

    /// Source language tag of the packages in this repository.
    /// Default: "Java"
    #[serde(default = "default_language")]
    pub language: String,
}

impl RepositoryDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            username: None,
            password: None,
            language: default_language(),
        }
    }

    /// The built-in descriptor for Maven Central.
    pub fn central() -> Self {
        Self::new(CENTRAL_REPOSITORY_NAME, CENTRAL_REPOSITORY_URL)
    }

    /// Returns `(username, password)` when the repository is authenticated.
    /// A missing password is treated as empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.username
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|u| (u, self.password.as_deref().unwrap_or_default()))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidRepository(self.name.clone()));
        }
        Url::parse(&self.url)
            .map_err(|err| ConfigError::InvalidRepositoryUrl(format!("{}: {err}", self.url)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_central_descriptor() {
        let central = RepositoryDescriptor::central();
        assert_eq!(central.name, "central");
        assert_eq!(central.url, "https://repo.maven.apache.org/maven2");
        assert_eq!(central.language, "Java");
        assert!(central.credentials().is_none());
    }

    #[test]
    fn test_credentials_password_defaults_to_empty() {
        let mut repo = RepositoryDescriptor::new("private", "https://maven.example.com/releases");
        repo.username = Some("deploy".to_string());
        assert_eq!(repo.credentials(), Some(("deploy", "")));

        repo.password = Some("s3cret".to_string());
        assert_eq!(repo.credentials(), Some(("deploy", "s3cret")));

        repo.username = Some(String::new());
        assert!(repo.credentials().is_none());
    }

    #[test]
    fn test_language_defaults_when_missing() {
        let repo: RepositoryDescriptor =
            toml::from_str("name = \"typesafe\"\nurl = \"https://repo.typesafe.com/typesafe/releases\"")
                .unwrap();
        assert_eq!(repo.language, "Java");
    }

    #[test]
    fn test_validate() {
        assert!(RepositoryDescriptor::central().validate().is_ok());

        let bad_url = RepositoryDescriptor::new("broken", "not a url");
        assert!(matches!(
            bad_url.validate(),
            Err(ConfigError::InvalidRepositoryUrl(_))
        ));

        let empty_name = RepositoryDescriptor::new("  ", CENTRAL_REPOSITORY_URL);
        assert!(matches!(
            empty_name.validate(),
            Err(ConfigError::InvalidRepository(_))
        ));
    }
}
