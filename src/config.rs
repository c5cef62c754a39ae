//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Environment variable names read by [`WizardConfig::from_env`].
pub mod env_keys {
    pub const PORT: &str = "PROFILE_WIZARD_PORT";
    pub const DB_PATH: &str = "PROFILE_WIZARD_DB_PATH";
    pub const USER: &str = "PROFILE_WIZARD_USER";
    pub const COMPLETE_ROUTE: &str = "PROFILE_WIZARD_COMPLETE_ROUTE";
    pub const SKIP_ROUTE: &str = "PROFILE_WIZARD_SKIP_ROUTE";
}

/// Wizard service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardConfig {
    /// Port for the REST + WebSocket server.
    pub port: u16,
    /// Database file. `None` keeps progress in memory only.
    pub db_path: Option<PathBuf>,
    /// Settings owner for persisted progress (single-user service).
    pub user_id: String,
    /// Where the dashboard should go once the wizard finishes.
    pub complete_route: String,
    /// Where the dashboard should go when the wizard is skipped.
    pub skip_route: String,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            db_path: Some(PathBuf::from("./data/profile-wizard.db")),
            user_id: "default".to_string(),
            complete_route: "/dashboard".to_string(),
            skip_route: "/dashboard".to_string(),
        }
    }
}

impl WizardConfig {
    /// Defaults overridden by `PROFILE_WIZARD_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or blank keys keep their
    /// default; `PROFILE_WIZARD_DB_PATH=:memory:` disables the database.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(port) = get(env_keys::PORT) {
            config.port = port.parse().map_err(|e| ConfigError::InvalidValue {
                key: env_keys::PORT.to_string(),
                message: format!("{port:?} is not a valid port: {e}"),
            })?;
        }
        if let Some(path) = get(env_keys::DB_PATH) {
            config.db_path = (path != ":memory:").then(|| PathBuf::from(path));
        }
        if let Some(user) = get(env_keys::USER) {
            config.user_id = user;
        }
        if let Some(route) = get(env_keys::COMPLETE_ROUTE) {
            config.complete_route = validate_route(env_keys::COMPLETE_ROUTE, route)?;
        }
        if let Some(route) = get(env_keys::SKIP_ROUTE) {
            config.skip_route = validate_route(env_keys::SKIP_ROUTE, route)?;
        }
        Ok(config)
    }
}

fn validate_route(key: &str, route: String) -> Result<String, ConfigError> {
    if route.starts_with('/') {
        Ok(route)
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("route {route:?} must start with '/'"),
        })
    }
}
