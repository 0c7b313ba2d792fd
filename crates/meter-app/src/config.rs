//! Application configuration.

use crate::error::{MeterError, MeterResult};
use meter_contract::TransitionRules;
use meter_core::IdentityKey;
use meter_overlay::{METER_SERVICE, METER_TOPIC};
use meter_wallet::KeySource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "METER_CONFIG";

/// Configuration file used when neither flag nor environment names one.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Overlay endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Lookup service base URL (questions go to `{lookup_url}/lookup`).
    #[serde(default = "default_overlay_url")]
    pub lookup_url: String,
    /// Broadcast service base URL (envelopes go to `{broadcast_url}/submit`).
    #[serde(default = "default_overlay_url")]
    pub broadcast_url: String,
    /// Per-request timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_overlay_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            lookup_url: default_overlay_url(),
            broadcast_url: default_overlay_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl NetworkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Overlay naming and output parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Topic meter transactions are delivered under.
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Lookup service indexing live meters.
    #[serde(default = "default_service")]
    pub service: String,
    /// Units locked in a new meter output.
    #[serde(default = "default_units")]
    pub units: u64,
    /// Wallet basket new meter outputs are filed under.
    #[serde(default = "default_basket")]
    pub basket: String,
}

fn default_topic() -> String {
    METER_TOPIC.to_string()
}

fn default_service() -> String {
    METER_SERVICE.to_string()
}

fn default_units() -> u64 {
    1
}

fn default_basket() -> String {
    "meter tokens".to_string()
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            service: default_service(),
            units: default_units(),
            basket: default_basket(),
        }
    }
}

/// Reference wallet key custody.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Environment variable holding the hex identity key.
    #[serde(default = "default_key_env")]
    pub key_env: String,
    /// Key file; takes precedence over `key_env` when set.
    #[serde(default)]
    pub key_file: Option<PathBuf>,
    /// If set, the identity derived from the key must match.
    #[serde(default)]
    pub expected_identity: Option<IdentityKey>,
}

fn default_key_env() -> String {
    "METER_IDENTITY_KEY".to_string()
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            key_env: default_key_env(),
            key_file: None,
            expected_identity: None,
        }
    }
}

impl WalletConfig {
    pub fn key_source(&self) -> KeySource {
        match &self.key_file {
            Some(path) => KeySource::File { path: path.clone() },
            None => KeySource::EnvVar {
                var_name: self.key_env.clone(),
            },
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default log filter; `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    meter_telemetry::DEFAULT_FILTER.to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    /// Local transition rules (decrement floor).
    #[serde(default)]
    pub transitions: TransitionRules,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Resolve the configuration path: explicit path > `METER_CONFIG` > default.
    pub fn resolve_path(explicit: Option<String>) -> String {
        explicit
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load configuration, falling back to defaults if the file is missing.
    pub fn load(explicit: Option<String>) -> MeterResult<Self> {
        let config_path = Self::resolve_path(explicit);

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> MeterResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| MeterError::Config(format!("Failed to read config: {e}")))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> MeterResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| MeterError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> MeterResult<()> {
        if self.protocol.units == 0 {
            return Err(MeterError::Config("protocol.units must be positive".to_string()));
        }
        if self.network.request_timeout_ms == 0 {
            return Err(MeterError::Config(
                "network.request_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
