use std::sync::Arc;

use anyhow::Result;
use ::config::{Config, ConfigError, Environment};
use sea_orm::Database;
use serde::Deserialize;
use tracing::{debug, info, trace};

use crate::schemas::AppState;

/// Runtime tunables. Every value has a default and can be overridden from
/// the environment with the `APP__` prefix, e.g.
/// `APP__PAGINATION__MAX_PAGE_SIZE=50`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub pagination: PaginationSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PaginationSettings {
    /// Page size used when the request does not ask for one
    pub default_page_size: u64,
    /// Upper bound applied to a requested page size
    pub max_page_size: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerSettings {
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pagination: PaginationSettings {
                default_page_size: 10,
                max_page_size: 100,
            },
            server: ServerSettings {
                request_timeout_secs: 30,
            },
        }
    }
}

impl Settings {
    /// Loads settings from defaults overlaid with `APP__*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Environment::with_prefix("APP").separator("__").try_parsing(true))
    }

    fn load_from(env: Environment) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let settings: Settings = Config::builder()
            .set_default("pagination.default_page_size", defaults.pagination.default_page_size)?
            .set_default("pagination.max_page_size", defaults.pagination.max_page_size)?
            .set_default("server.request_timeout_secs", defaults.server.request_timeout_secs)?
            .add_source(env)
            .build()?
            .try_deserialize()?;

        if settings.pagination.default_page_size == 0 || settings.pagination.max_page_size == 0 {
            return Err(ConfigError::Message("page sizes must be at least 1".to_string()));
        }
        Ok(settings)
    }
}

/// Initialize application state with a specific database URL
pub async fn initialize_app_state_with_url(database_url: &str) -> Result<AppState> {
    trace!("Loading settings");
    dotenvy::dotenv().ok();
    let settings = Settings::load()?;
    debug!("Settings: {:?}", settings);

    info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    Ok(AppState {
        db,
        settings: Arc::new(settings),
    })
}
