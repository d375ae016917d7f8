//! The scalar readings one control cycle is decided on.

use serde::{Deserialize, Serialize};

/// A named time series the controller reads.
///
/// Closed set: every metric maps to a known series in the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Battery state of charge, percent.
    BatterySoc,
    /// Load on one monitored circuit, watts. Dimension: circuit id.
    CircuitLoad,
    /// Total PV production, watts.
    SolarPower,
    /// Voltage of one PV string, volts. Dimension: string id.
    StringVoltage,
    /// Hot water tank temperature, degrees Celsius.
    TankTemperature,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BatterySoc => f.write_str("battery_soc"),
            Self::CircuitLoad => f.write_str("circuit_load"),
            Self::SolarPower => f.write_str("solar_power"),
            Self::StringVoltage => f.write_str("string_voltage"),
            Self::TankTemperature => f.write_str("tank_temperature"),
        }
    }
}

/// Which circuits and PV string a snapshot is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryPlan {
    /// Circuit feeding the water heater.
    pub primary_circuit: String,
    /// Circuit feeding the space heater.
    pub secondary_circuit: String,
    /// PV string whose voltage tells night from day.
    pub pv_string: String,
}

/// Readings for one evaluation cycle.
///
/// Read once, shared by both appliance decisions, then discarded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Percent, 0–100.
    pub battery_soc: f64,
    /// Watts on the water heater circuit.
    pub load_primary: f64,
    /// Watts on the space heater circuit.
    pub load_secondary: f64,
    pub solar_power: f64,
    pub solar_string_voltage: f64,
    pub tank_temperature: f64,
}
