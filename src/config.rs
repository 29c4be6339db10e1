//! Application configuration
//!
//! Loaded from a TOML file (default `~/.config/hotel-booking/config.toml`).
//! Every field has a default, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::availability::{AvailabilityConfig, MAX_RANGE_DAYS};
use crate::application::booking::BookingConfig;
use crate::domain::RoomType;
use crate::infrastructure::DatabaseConfig;
use crate::shared::RetryConfig;

/// Environment variable that overrides the default config location.
pub const CONFIG_ENV_VAR: &str = "HOTEL_BOOKING_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// `$HOTEL_BOOKING_CONFIG`, else `<config dir>/hotel-booking/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        return PathBuf::from(path);
    }
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hotel-booking")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub logging: LoggingSection,
    pub booking: BookingSection,
    pub concurrency: ConcurrencySection,
    pub messaging: MessagingSection,
    pub catalog: CatalogSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for in-flight work on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub backend: StorageBackend,
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        let db = DatabaseConfig::default();
        Self {
            backend: StorageBackend::Sqlite,
            url: db.url,
            max_connections: db.max_connections,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `tracing` filter directive; `RUST_LOG` takes precedence
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingSection {
    pub max_stay_nights: i64,
    pub currency: String,
    /// Seconds a PENDING booking may hold rooms
    pub pending_ttl_secs: u64,
    /// Seconds between expiry sweeps
    pub sweep_interval_secs: u64,
}

impl Default for BookingSection {
    fn default() -> Self {
        let defaults = BookingConfig::default();
        Self {
            max_stay_nights: defaults.max_stay_nights,
            currency: defaults.currency,
            pending_ttl_secs: defaults.pending_ttl.as_secs(),
            sweep_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencySection {
    pub lock_timeout_ms: u64,
    pub retry_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for ConcurrencySection {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 10_000,
            retry_attempts: 3,
            initial_backoff_ms: 100,
            backoff_multiplier: 2.0,
            max_backoff_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingSection {
    /// When off, booking events are dropped
    pub enabled: bool,
    pub channel_capacity: usize,
}

impl Default for MessagingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    /// Room types upserted into the catalog at startup
    pub room_types: Vec<RoomTypeSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomTypeSeed {
    pub id: i64,
    pub property_id: i64,
    pub name: String,
    pub max_occupancy: i32,
    pub base_price: Decimal,
    pub total_rooms: i32,
}

impl From<&RoomTypeSeed> for RoomType {
    fn from(s: &RoomTypeSeed) -> Self {
        RoomType {
            id: s.id,
            property_id: s.property_id,
            name: s.name.clone(),
            max_occupancy: s.max_occupancy,
            base_price: s.base_price,
            total_rooms: s.total_rooms,
        }
    }
}

impl AppConfig {
    /// Read and validate the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if !(1..=MAX_RANGE_DAYS).contains(&self.booking.max_stay_nights) {
            return Err(ConfigError::Invalid(format!(
                "booking.max_stay_nights must be between 1 and {}",
                MAX_RANGE_DAYS
            )));
        }
        if self.booking.currency.len() != 3 {
            return invalid("booking.currency must be a 3-letter ISO 4217 code");
        }
        if self.booking.sweep_interval_secs == 0 {
            return invalid("booking.sweep_interval_secs must be positive");
        }
        if self.concurrency.retry_attempts == 0 {
            return invalid("concurrency.retry_attempts must be at least 1");
        }
        if self.concurrency.backoff_multiplier < 1.0 {
            return invalid("concurrency.backoff_multiplier must be at least 1.0");
        }
        if self.messaging.channel_capacity == 0 {
            return invalid("messaging.channel_capacity must be positive");
        }
        for rt in &self.catalog.room_types {
            if rt.total_rooms < 0 || rt.max_occupancy < 1 || rt.base_price < Decimal::ZERO {
                return Err(ConfigError::Invalid(format!(
                    "catalog room type {} has a negative price or room count, or no capacity",
                    rt.id
                )));
            }
        }
        Ok(())
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
        }
    }

    pub fn availability_config(&self) -> AvailabilityConfig {
        let c = &self.concurrency;
        AvailabilityConfig {
            lock_timeout: Duration::from_millis(c.lock_timeout_ms),
            retry: RetryConfig {
                max_attempts: c.retry_attempts,
                initial_delay: Duration::from_millis(c.initial_backoff_ms),
                backoff_multiplier: c.backoff_multiplier,
                max_delay: Duration::from_millis(c.max_backoff_ms),
            },
        }
    }

    pub fn booking_config(&self) -> BookingConfig {
        BookingConfig {
            max_stay_nights: self.booking.max_stay_nights,
            currency: self.booking.currency.clone(),
            pending_ttl: Duration::from_secs(self.booking.pending_ttl_secs),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.booking.sweep_interval_secs)
    }

    pub fn seed_room_types(&self) -> Vec<RoomType> {
        self.catalog.room_types.iter().map(RoomType::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.backend, StorageBackend::Sqlite);
        assert_eq!(config.booking.max_stay_nights, 30);
        assert_eq!(config.booking_config().pending_ttl, Duration::from_secs(900));

        let availability = config.availability_config();
        assert_eq!(availability.lock_timeout, Duration::from_secs(10));
        assert_eq!(availability.retry.max_attempts, 3);
        assert_eq!(availability.retry.initial_delay, Duration::from_millis(100));
    }

    #[test]
    fn sections_override_individually() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            port = 9090

            [database]
            backend = "memory"

            [concurrency]
            lock_timeout_ms = 250

            [[catalog.room_types]]
            id = 10
            property_id = 1
            name = "Double"
            max_occupancy = 2
            base_price = "129.50"
            total_rooms = 12
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.backend, StorageBackend::Memory);
        assert_eq!(config.concurrency.retry_attempts, 3);
        assert_eq!(
            config.availability_config().lock_timeout,
            Duration::from_millis(250)
        );

        let seeded = config.seed_room_types();
        assert_eq!(seeded.len(), 1);
        assert_eq!(seeded[0].base_price, Decimal::new(12950, 2));
    }

    #[test]
    fn rejects_nonsense() {
        assert!(matches!(
            AppConfig::from_toml("[booking]\nmax_stay_nights = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AppConfig::from_toml("[booking]\nmax_stay_nights = 400"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AppConfig::from_toml("[database]\nbackend = \"postgres\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            AppConfig::load("/nonexistent/hotel-booking.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
