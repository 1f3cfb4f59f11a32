//! Origin/target store connection configuration.

use serde::{Deserialize, Serialize};

/// Which adapter backs a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// libSQL: a local file, `:memory:`, or a remote `libsql://` database.
    #[default]
    Libsql,
    /// Process-local in-memory store. Contents vanish with the process.
    Memory,
}

const fn default_provision_schema() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Remote database URL (e.g., `libsql://migration-target.turso.io`).
    #[serde(default)]
    pub url: String,

    /// Auth token for the remote database.
    #[serde(default)]
    pub auth_token: String,

    /// Local database path, used when `url` is empty.
    #[serde(default)]
    pub path: String,

    /// Create the `records` table if it does not exist.
    #[serde(default = "default_provision_schema")]
    pub provision_schema: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: String::new(),
            auth_token: String::new(),
            path: String::new(),
            provision_schema: default_provision_schema(),
        }
    }
}

impl StoreConfig {
    /// In-memory store config, mostly for tests and demos.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            ..Self::default()
        }
    }

    /// Local libSQL file (or `:memory:`).
    #[must_use]
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            backend: StoreBackend::Libsql,
            path: path.into(),
            ..Self::default()
        }
    }

    /// Check whether enough is set to attempt a connection.
    pub fn is_configured(&self) -> bool {
        match self.backend {
            StoreBackend::Memory => true,
            StoreBackend::Libsql => self.is_remote() || !self.path.is_empty(),
        }
    }

    /// Remote mode needs both a URL and a token.
    pub fn is_remote(&self) -> bool {
        !self.url.is_empty() && !self.auth_token.is_empty()
    }

    /// Location string safe to log (never includes the token).
    pub fn display_location(&self) -> String {
        match self.backend {
            StoreBackend::Memory => "memory".to_string(),
            StoreBackend::Libsql if self.is_remote() => self.url.clone(),
            StoreBackend::Libsql => self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_configured() {
        let config = StoreConfig::default();
        assert_eq!(config.backend, StoreBackend::Libsql);
        assert!(!config.is_configured());
        assert!(config.provision_schema);
    }

    #[test]
    fn memory_is_always_configured() {
        assert!(StoreConfig::memory().is_configured());
        assert_eq!(StoreConfig::memory().display_location(), "memory");
    }

    #[test]
    fn remote_requires_url_and_token() {
        let mut config = StoreConfig {
            url: "libsql://target.turso.io".into(),
            ..Default::default()
        };
        assert!(!config.is_remote());
        assert!(!config.is_configured());

        config.auth_token = "token".into();
        assert!(config.is_remote());
        assert!(config.is_configured());
        assert_eq!(config.display_location(), "libsql://target.turso.io");
    }

    #[test]
    fn local_path_is_configured() {
        let config = StoreConfig::local("./origin.db");
        assert!(config.is_configured());
        assert!(!config.is_remote());
        assert_eq!(config.display_location(), "./origin.db");
    }
}
