//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Budget cycle behaviour.
    #[serde(default)]
    pub cycle: CycleConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT settings as read from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for verifying tokens.
    pub secret: String,
    /// Access token expiration in seconds (used when issuing tokens for tooling).
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Budget cycle configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CycleConfig {
    /// Reject unknown stage labels instead of falling back to Revision 1.
    #[serde(default = "default_strict_stage_labels")]
    pub strict_stage_labels: bool,
    /// Highest revision number with a provisioned stage table.
    #[serde(default = "default_max_revision")]
    pub max_revision: u8,
    /// Time-to-live of the cached unit master list.
    #[serde(default = "default_master_cache_ttl")]
    pub master_cache_ttl_secs: u64,
}

fn default_strict_stage_labels() -> bool {
    true
}

fn default_max_revision() -> u8 {
    30
}

fn default_master_cache_ttl() -> u64 {
    7200 // 120 minutes
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            strict_stage_labels: default_strict_stage_labels(),
            max_revision: default_max_revision(),
            master_cache_ttl_secs: default_master_cache_ttl(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("PAGU").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
