//! Configuration types for the thermowatch service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sensor box identifiers; blank entries are ignored
    #[serde(default)]
    pub sensors: Vec<String>,
    #[serde(default)]
    pub sensor_api: SensorApiConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub freshness: FreshnessConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensors: Vec::new(),
            sensor_api: SensorApiConfig::default(),
            health: HealthConfig::default(),
            freshness: FreshnessConfig::default(),
            scheduler: SchedulerConfig::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
            version: default_version(),
        }
    }
}

impl Config {
    /// The sensor identifiers that take part in sweeps and quorum counting
    pub fn configured_sensors(&self) -> Vec<String> {
        configured_sensors(&self.sensors)
    }
}

/// Drop empty, whitespace-only and repeated identifiers, trimming the rest
pub fn configured_sensors(ids: &[String]) -> Vec<String> {
    let mut sensors: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids.iter().map(|id| id.trim()) {
        if !id.is_empty() && !sensors.iter().any(|s| s == id) {
            sensors.push(id.to_string());
        }
    }
    sensors
}

/// Parse a comma separated sensor list such as `a,b,,c`
pub fn parse_sensor_list(list: &str) -> Vec<String> {
    configured_sensors(&list.split(',').map(str::to_string).collect::<Vec<_>>())
}

/// Remote sensor API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(default = "default_max_measurement_age", with = "humantime_serde")]
    pub max_measurement_age: Duration,
}

impl Default for SensorApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            max_measurement_age: default_max_measurement_age(),
        }
    }
}

/// Health record caching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_health_ttl", with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            ttl: default_health_ttl(),
        }
    }
}

/// How old the last snapshot may be while still backing readiness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreshnessConfig {
    #[serde(default = "default_freshness_window", with = "humantime_serde")]
    pub window: Duration,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            window: default_freshness_window(),
        }
    }
}

/// Snapshot scheduler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_scheduler_interval", with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: default_scheduler_interval(),
        }
    }
}

/// Cache and archive settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Upper bound for any single cache or archive call
    #[serde(default = "default_storage_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default)]
    pub archive: ArchiveConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            timeout: default_storage_timeout(),
            archive: ArchiveConfig::default(),
        }
    }
}

/// Archive backend with tagged enum for extensibility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ArchiveConfig {
    #[serde(rename = "filesystem")]
    Filesystem {
        #[serde(default = "default_archive_directory")]
        directory: PathBuf,
    },
    #[serde(rename = "memory")]
    Memory,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        ArchiveConfig::Filesystem {
            directory: default_archive_directory(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.opensensemap.org".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_max_measurement_age() -> Duration {
    Duration::from_secs(3600)
}

fn default_health_ttl() -> Duration {
    Duration::from_secs(60)
}

fn default_freshness_window() -> Duration {
    Duration::from_secs(300)
}

fn default_scheduler_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_storage_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_archive_directory() -> PathBuf {
    PathBuf::from("archive")
}

fn default_port() -> u16 {
    5000
}

fn default_version() -> String {
    "v0.0.1".to_string()
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::ThermowatchError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
