//! InfluxDB connection and series configuration.

use serde::Deserialize;
use sunsink_domain::telemetry::Metric;

/// Configuration for the InfluxDB telemetry source.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct InfluxConfig {
    /// Base URL of the InfluxDB server, e.g. `http://influx:8086`.
    pub url: String,
    /// API token sent as `Authorization: Token …`.
    pub token: String,
    /// Organisation the query runs in.
    pub org: String,
    /// Bucket Home Assistant writes its states to.
    pub bucket: String,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
    /// Which series each metric is read from.
    pub series: SeriesCatalog,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            token: String::new(),
            org: String::new(),
            bucket: "homeassistant".to_string(),
            timeout_secs: 10,
            series: SeriesCatalog::default(),
        }
    }
}

impl std::fmt::Debug for InfluxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("org", &self.org)
            .field("bucket", &self.bucket)
            .field("timeout_secs", &self.timeout_secs)
            .field("series", &self.series)
            .finish()
    }
}

/// Selector for one Home Assistant series.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Series {
    /// Entity id. A `{}` placeholder is replaced with the metric dimension
    /// (circuit or PV string id).
    pub entity_id: String,
    /// Unit of measurement, which Home Assistant stores as `_measurement`.
    pub unit: String,
    /// Optional entity domain filter, e.g. `sensor`.
    #[serde(default)]
    pub domain: Option<String>,
}

impl Series {
    fn new(entity_id: &str, unit: &str) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            unit: unit.to_string(),
            domain: None,
        }
    }

    /// Resolve the entity id for a given dimension.
    #[must_use]
    pub fn entity_id_for(&self, dimension: Option<&str>) -> String {
        match dimension {
            Some(dimension) => self.entity_id.replace("{}", dimension),
            None => self.entity_id.clone(),
        }
    }
}

/// Series backing each [`Metric`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SeriesCatalog {
    pub battery_soc: Series,
    pub circuit_load: Series,
    pub solar_power: Series,
    pub string_voltage: Series,
    pub tank_temperature: Series,
}

impl Default for SeriesCatalog {
    fn default() -> Self {
        Self {
            battery_soc: Series::new("battery_state_of_charge", "%"),
            circuit_load: Series::new("load_{}", "W"),
            solar_power: Series::new("pv_power", "W"),
            string_voltage: Series::new("pv{}_voltage", "V"),
            tank_temperature: Series {
                domain: Some("sensor".to_string()),
                ..Series::new("tank_temperature", "°C")
            },
        }
    }
}

impl SeriesCatalog {
    #[must_use]
    pub fn get(&self, metric: Metric) -> &Series {
        match metric {
            Metric::BatterySoc => &self.battery_soc,
            Metric::CircuitLoad => &self.circuit_load,
            Metric::SolarPower => &self.solar_power,
            Metric::StringVoltage => &self.string_voltage,
            Metric::TankTemperature => &self.tank_temperature,
        }
    }
}
