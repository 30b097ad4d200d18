use crate::core::filters::UnknownDistance;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub appwrite: AppwriteSettings,
    pub collection: CollectionSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub discovery: DiscoverySettings,
    #[serde(default)]
    pub maintenance: MaintenanceSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppwriteSettings {
    pub endpoint: String,
    pub api_key: String,
    pub project_id: String,
    pub database_id: String,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionSettings {
    pub profiles: String,
    pub swipes: String,
    pub matches: String,
    pub blocks: String,
}

/// Local store connection. Without a URL the engine keeps its store in memory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverySettings {
    #[serde(default = "default_profile_ttl_secs")]
    pub profile_ttl_secs: u64,
    #[serde(default = "default_swipe_retention_secs")]
    pub swipe_retention_secs: u64,
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    #[serde(default = "default_fetch_multiplier")]
    pub fetch_multiplier: usize,
    #[serde(default = "default_max_fetch_pages")]
    pub max_fetch_pages: usize,
    #[serde(default)]
    pub unknown_distance: UnknownDistance,
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u64,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            profile_ttl_secs: default_profile_ttl_secs(),
            swipe_retention_secs: default_swipe_retention_secs(),
            remote_timeout_ms: default_remote_timeout_ms(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            fetch_multiplier: default_fetch_multiplier(),
            max_fetch_pages: default_max_fetch_pages(),
            unknown_distance: UnknownDistance::default(),
            session_idle_secs: default_session_idle_secs(),
            max_sessions: default_max_sessions(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_profile_ttl_secs() -> u64 { 30 * 60 }
fn default_swipe_retention_secs() -> u64 { 30 * 24 * 60 * 60 }
fn default_remote_timeout_ms() -> u64 { 2000 }
fn default_limit() -> usize { 20 }
fn default_max_limit() -> usize { 100 }
fn default_fetch_multiplier() -> usize { 5 }
fn default_max_fetch_pages() -> usize { 20 }
fn default_session_idle_secs() -> u64 { 30 * 60 }
fn default_max_sessions() -> u64 { 100_000 }
fn default_event_capacity() -> usize { 1024 }

#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_sync_batch")]
    pub sync_batch: usize,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            sync_batch: default_sync_batch(),
        }
    }
}

fn default_interval_secs() -> u64 { 300 }
fn default_sync_batch() -> usize { 500 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with LUME_)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            // Add default config file
            .add_source(File::with_name("config/default").required(false))
            // Add local config file (for development overrides)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (prefixed with LUME_)
            // e.g., LUME__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("LUME")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("LUME")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Apply well-known environment variables on top of the loaded sources
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    // DATABASE_URL is the conventional name used by sqlx tooling
    if let Ok(database_url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", database_url)?;
    }
    if let Ok(api_key) = env::var("APPWRITE_API_KEY") {
        builder = builder.set_override("appwrite.api_key", api_key)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_default_discovery() {
        let discovery = DiscoverySettings::default();
        assert_eq!(discovery.profile_ttl_secs, 1800);
        assert_eq!(discovery.default_limit, 20);
        assert_eq!(discovery.unknown_distance, UnknownDistance::Exclude);
        assert!(discovery.swipe_retention_secs > discovery.profile_ttl_secs);
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
            [server]
            host = "127.0.0.1"
            port = 8080

            [appwrite]
            endpoint = "https://appwrite.test/v1"
            api_key = "key"
            project_id = "project"
            database_id = "db"

            [collection]
            profiles = "profiles"
            swipes = "swipes"
            matches = "matches"
            blocks = "blocks"

            [discovery]
            unknown_distance = "place_last"
            profile_ttl_secs = 60
        "#;

        let settings: Settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(settings.database.url.is_none());
        assert_eq!(settings.discovery.unknown_distance, UnknownDistance::PlaceLast);
        assert_eq!(settings.discovery.profile_ttl_secs, 60);
        assert_eq!(settings.discovery.max_limit, 100);
        assert_eq!(settings.maintenance.interval_secs, 300);
    }
}
