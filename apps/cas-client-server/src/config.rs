//! Server configuration: YAML file overlaid with `CAS_CLIENT__*` variables.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use cas_client::CasClientConfig;
use cas_client::api::rest::session_cookie::DEFAULT_COOKIE_NAME;
use cas_client::config::AccountsConfig;
use cas_client::infra::SessionLimits;
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use secrecy::SecretString;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "CAS_CLIENT__";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub cas: CasClientConfig,
    pub storage: StorageConfig,
    pub accounts: AccountsConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8087)),
            cas: CasClientConfig::default(),
            storage: StorageConfig::default(),
            accounts: AccountsConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Where proxy-granting tickets wait between the callback and the login.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum StorageConfig {
    /// Single-instance deployments only.
    #[default]
    Memory,
    Database {
        /// sea-orm connection string, e.g. `sqlite://cas.db?mode=rwc`.
        dsn: SecretString,
        /// Unclaimed mappings older than this are purged at startup.
        #[serde(default = "default_pgt_max_age_secs")]
        pgt_max_age_secs: u64,
    },
}

fn default_pgt_max_age_secs() -> u64 {
    3600
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Sessions (and sessions with pending notices) kept in memory at once.
    pub max_sessions: usize,
    /// Idle sessions and uncollected notices older than this are dropped
    /// once the limit is reached.
    pub idle_timeout_secs: u64,
}

impl SessionConfig {
    #[must_use]
    pub fn limits(&self) -> SessionLimits {
        SessionLimits {
            max_sessions: self.max_sessions,
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let limits = SessionLimits::default();
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_owned(),
            max_sessions: limits.max_sessions,
            idle_timeout_secs: limits.idle_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
    /// Log CAS protocol traffic (`cas_client=debug`).
    pub debug_log: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
            debug_log: false,
        }
    }
}

/// Load the configuration. Environment variables win over the file.
///
/// # Errors
///
/// Unreadable file, unknown keys or ill-typed values.
pub fn load(path: Option<&Path>) -> Result<AppConfig, figment::Error> {
    let mut figment = Figment::new();
    if let Some(path) = path {
        if !path.is_file() {
            return Err(figment::Error::from(format!(
                "configuration file '{}' not found",
                path.display()
            )));
        }
        figment = figment.merge(Yaml::file(path));
    }
    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
}
