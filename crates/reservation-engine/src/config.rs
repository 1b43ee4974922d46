//! Configuration for the reservation engine.
//!
//! Loads configuration from environment variables (and a `.env` file when present) with
//! defaults for everything except the inventory API credentials.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{key} must be at most {max}")]
    TooLarge { key: &'static str, max: i64 },
}

/// A year; longer windows are rejected so expiry timestamps stay in range.
pub const MAX_WINDOW_MINUTES: i64 = 365 * 24 * 60;
const DEFAULT_WINDOW_MINUTES: i64 = 20;

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub reservation: ReservationConfig,
    pub actors: ActorConfig,
    pub inventory_api: InventoryApiConfig,
    /// Shared secret for inbound webhook signatures. Unsigned deliveries are rejected.
    pub webhook_secret: String,
}

/// Reservation window and clock cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationConfig {
    /// Minutes a cart line holds stock (default: 20)
    pub window_minutes: i64,
    /// Seconds between authoritative expiry sweeps (default: 6)
    pub sweep_interval_secs: u64,
    /// Seconds between cosmetic countdown refreshes (default: 1)
    pub countdown_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Number of ledger shards (default: 4)
    pub ledger_shards: usize,
    /// Mailbox capacity of every actor (default: 32)
    pub mailbox_size: usize,
}

/// Inventory API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryApiConfig {
    pub base_url: String,
    pub api_key: String,
    /// Sent as `x-facility-id` when set.
    pub facility_id: Option<String>,
    /// Request timeout in seconds (default: 10)
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl EngineConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, applying defaults for absent or
    /// unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            reservation: ReservationConfig {
                window_minutes: parsed(&lookup, "RESERVATION_WINDOW_MINUTES")
                    .unwrap_or(DEFAULT_WINDOW_MINUTES),
                sweep_interval_secs: parsed(&lookup, "RESERVATION_SWEEP_INTERVAL_SECS")
                    .unwrap_or(6),
                countdown_interval_secs: parsed(&lookup, "RESERVATION_COUNTDOWN_INTERVAL_SECS")
                    .unwrap_or(1),
            },
            actors: ActorConfig {
                ledger_shards: parsed(&lookup, "LEDGER_SHARDS").unwrap_or(4),
                mailbox_size: parsed(&lookup, "ACTOR_MAILBOX_SIZE").unwrap_or(32),
            },
            inventory_api: InventoryApiConfig {
                base_url: lookup("INVENTORY_API_URL").unwrap_or_default(),
                api_key: lookup("INVENTORY_API_KEY").unwrap_or_default(),
                facility_id: lookup("INVENTORY_FACILITY_ID").filter(|id| !id.trim().is_empty()),
                timeout_secs: parsed(&lookup, "INVENTORY_API_TIMEOUT_SECS").unwrap_or(10),
            },
            webhook_secret: lookup("INVENTORY_WEBHOOK_SECRET").unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reservation.window_minutes <= 0 {
            return Err(ConfigError::Zero("RESERVATION_WINDOW_MINUTES"));
        }
        if self.reservation.window_minutes > MAX_WINDOW_MINUTES {
            return Err(ConfigError::TooLarge {
                key: "RESERVATION_WINDOW_MINUTES",
                max: MAX_WINDOW_MINUTES,
            });
        }
        if self.reservation.sweep_interval_secs == 0 {
            return Err(ConfigError::Zero("RESERVATION_SWEEP_INTERVAL_SECS"));
        }
        if self.reservation.countdown_interval_secs == 0 {
            return Err(ConfigError::Zero("RESERVATION_COUNTDOWN_INTERVAL_SECS"));
        }
        if self.actors.ledger_shards == 0 {
            return Err(ConfigError::Zero("LEDGER_SHARDS"));
        }
        if self.actors.mailbox_size == 0 {
            return Err(ConfigError::Zero("ACTOR_MAILBOX_SIZE"));
        }
        Ok(())
    }

    /// Checks the settings only the HTTP gateway needs.
    pub fn validate_inventory_api(&self) -> Result<(), ConfigError> {
        if self.inventory_api.base_url.trim().is_empty() {
            return Err(ConfigError::Missing("INVENTORY_API_URL"));
        }
        if self.inventory_api.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("INVENTORY_API_KEY"));
        }
        if self.inventory_api.timeout_secs == 0 {
            return Err(ConfigError::Zero("INVENTORY_API_TIMEOUT_SECS"));
        }
        Ok(())
    }

    /// Falls back to the default window when the configured one fails [`validate`](Self::validate).
    pub fn reservation_window(&self) -> Duration {
        Some(self.reservation.window_minutes)
            .filter(|minutes| (1..=MAX_WINDOW_MINUTES).contains(minutes))
            .and_then(Duration::try_minutes)
            .unwrap_or_else(|| Duration::minutes(DEFAULT_WINDOW_MINUTES))
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reservation.sweep_interval_secs)
    }

    pub fn countdown_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reservation.countdown_interval_secs)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.trim().parse().ok())
}
