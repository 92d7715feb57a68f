use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::StorageConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Allowed origins. Empty allows any origin.
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("PICTURES_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("storage.directory", "uploads")?
            .set_default("storage.max_blob_size", 16 * 1024 * 1024_i64)?
            .set_default("storage.reconcile_on_start", true)?
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., PICTURES__STORAGE__DIRECTORY)
            .add_source(Environment::with_prefix("PICTURES").separator("__"))
            // Plain PORT, as honoured by the previous deployment.
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .build()?;

        s.try_deserialize()
    }
}
