//! Threshold configuration the decision engine compares telemetry against.
//!
//! Loaded once at startup and never mutated. Every comparison is strict
//! (`<`, `>`, `==`). Values are not range-checked: an odd
//! threshold skews which clause can fire but never stops the controller.
//! [`Thresholds::warnings`] reports combinations that defeat hysteresis so
//! they can be logged.

use serde::{Deserialize, Serialize};

/// Numeric limits for both appliances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Tank temperature ceiling, °C. Below it the tank counts as cold.
    pub max_tank_temperature: f64,
    /// Circuit load below which the circuit is idle, W. Gates turning ON.
    pub load_idle: f64,
    /// Circuit load below which the circuit is within limit, W. Gates staying ON.
    pub max_load: f64,
    /// SoC the water heater needs on the headroom path, %.
    pub min_water_heater_soc: f64,
    /// SoC the space heater needs on the headroom path, %.
    pub min_space_heater_soc: f64,
    /// PV production above which there is meaningful surplus, W.
    pub min_solar_power: f64,
    /// SoC sentinel reported at saturation.
    pub full_soc: f64,
    /// Alternate SoC sentinel the charge controller reports at saturation.
    pub full_soc_alt: f64,
    /// String voltage above which the panels produce at all, V.
    pub string_voltage_present: f64,
    /// String voltage above which it is confirmed daytime, V.
    pub string_voltage_daylight: f64,
}

/// A threshold combination that undermines the entry/hold asymmetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdWarning {
    /// `load_idle` above `max_load`: staying on is stricter than turning on.
    IdleAboveLimit,
    /// `string_voltage_present` above `string_voltage_daylight`.
    PresenceAboveDaylight,
    /// A threshold is NaN, so every comparison against it is false.
    NotANumber(&'static str),
}

impl std::fmt::Display for ThresholdWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdleAboveLimit => {
                f.write_str("load_idle exceeds max_load, heaters will oscillate")
            }
            Self::PresenceAboveDaylight => f.write_str(
                "string_voltage_present exceeds string_voltage_daylight, daylight check is redundant",
            ),
            Self::NotANumber(field) => write!(f, "{field} is NaN, comparisons will never hold"),
        }
    }
}

impl Thresholds {
    /// Inspect the thresholds for combinations that break hysteresis.
    ///
    /// Nothing is rejected; the caller decides what to do with the findings.
    #[must_use]
    pub fn warnings(&self) -> Vec<ThresholdWarning> {
        let mut found = Vec::new();

        for (name, value) in self.fields() {
            if value.is_nan() {
                found.push(ThresholdWarning::NotANumber(name));
            }
        }
        if self.load_idle > self.max_load {
            found.push(ThresholdWarning::IdleAboveLimit);
        }
        if self.string_voltage_present > self.string_voltage_daylight {
            found.push(ThresholdWarning::PresenceAboveDaylight);
        }

        found
    }

    fn fields(&self) -> [(&'static str, f64); 10] {
        [
            ("max_tank_temperature", self.max_tank_temperature),
            ("load_idle", self.load_idle),
            ("max_load", self.max_load),
            ("min_water_heater_soc", self.min_water_heater_soc),
            ("min_space_heater_soc", self.min_space_heater_soc),
            ("min_solar_power", self.min_solar_power),
            ("full_soc", self.full_soc),
            ("full_soc_alt", self.full_soc_alt),
            ("string_voltage_present", self.string_voltage_present),
            ("string_voltage_daylight", self.string_voltage_daylight),
        ]
    }
}
