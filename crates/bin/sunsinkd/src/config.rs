//! Configuration loading: TOML file with environment variable overrides.
//!
//! The file is mandatory since it names the plugs and the thresholds; a
//! missing or malformed file stops the daemon. Sections other than
//! `[influxdb]`, `[tapo]`, `[appliances]` and `[thresholds]` fall back to
//! defaults. Environment variables take precedence over file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use sunsink_adapter_influxdb::InfluxConfig;
use sunsink_adapter_tapo::TapoConfig;
use sunsink_app::control_loop::ControlSettings;
use sunsink_domain::plug::PlugCredentials;
use sunsink_domain::telemetry::TelemetryPlan;
use sunsink_domain::thresholds::Thresholds;

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Metrics backend.
    pub influxdb: InfluxConfig,
    /// Account shared by both plugs.
    pub tapo: TapoConfig,
    pub appliances: AppliancesConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub control: ControlConfig,
    /// Liveness endpoint settings.
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub thresholds: Thresholds,
}

/// The two controlled appliances.
#[derive(Debug, Deserialize)]
pub struct AppliancesConfig {
    pub water_heater: ApplianceConfig,
    pub space_heater: ApplianceConfig,
}

/// One appliance: its plug and the circuit it draws from.
#[derive(Debug, Deserialize)]
pub struct ApplianceConfig {
    /// Host or IP address of the plug.
    pub address: String,
    /// Circuit id substituted into the load series, e.g. `l3`.
    /// Defaults to `l3` for the water heater and `l2` for the space heater.
    pub circuit: Option<String>,
}

/// Telemetry selection not tied to an appliance.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// PV string whose voltage tells night from day.
    pub pv_string: String,
}

/// Control loop pacing.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Pause after each appliance, in seconds.
    pub interval_secs: u64,
    /// Pause between two attempts at a plug command, in seconds.
    pub cooldown_secs: u64,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `path` then apply environment-variable
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is malformed, or fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("SUNSINK_INFLUX_TOKEN") {
            self.influxdb.token = val;
        }
        if let Some(val) = var("SUNSINK_TAPO_PASSWORD") {
            self.tapo.password = val;
        }
        if let Some(port) = var("SUNSINK_HEALTH_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("SUNSINK_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("influxdb.url", self.influxdb.url.as_str()),
            ("influxdb.org", self.influxdb.org.as_str()),
            ("influxdb.bucket", self.influxdb.bucket.as_str()),
            (
                "appliances.water_heater.address",
                self.appliances.water_heater.address.as_str(),
            ),
            (
                "appliances.space_heater.address",
                self.appliances.space_heater.address.as_str(),
            ),
            ("telemetry.pv_string", self.telemetry.pv_string.as_str()),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        for (key, circuit) in [
            ("appliances.water_heater.circuit", &self.appliances.water_heater.circuit),
            ("appliances.space_heater.circuit", &self.appliances.space_heater.circuit),
        ] {
            if circuit.as_deref().is_some_and(|c| c.trim().is_empty()) {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.control.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "control.interval_secs must be non-zero".to_string(),
            ));
        }
        if self.control.cooldown_secs == 0 {
            return Err(ConfigError::Validation(
                "control.cooldown_secs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.control.cooldown_secs)
    }

    /// Circuits and PV string the snapshot is read from.
    #[must_use]
    pub fn telemetry_plan(&self) -> TelemetryPlan {
        let circuit = |appliance: &ApplianceConfig, fallback: &str| {
            appliance
                .circuit
                .clone()
                .unwrap_or_else(|| fallback.to_string())
        };
        TelemetryPlan {
            primary_circuit: circuit(&self.appliances.water_heater, "l3"),
            secondary_circuit: circuit(&self.appliances.space_heater, "l2"),
            pv_string: self.telemetry.pv_string.clone(),
        }
    }

    /// Everything the control loop needs, resolved once.
    #[must_use]
    pub fn control_settings(&self) -> ControlSettings {
        ControlSettings {
            plan: self.telemetry_plan(),
            water_heater: self.credentials(&self.appliances.water_heater),
            space_heater: self.credentials(&self.appliances.space_heater),
            thresholds: self.thresholds,
            interval: Duration::from_secs(self.control.interval_secs),
        }
    }

    fn credentials(&self, appliance: &ApplianceConfig) -> PlugCredentials {
        self.tapo.credentials(&appliance.address)
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            pv_string: "1".to_string(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            cooldown_secs: 3,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "sunsinkd=info,sunsink=info,tower_http=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure, including missing required keys.
    #[error("failed to parse config file")]
    Parse(#[source] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
