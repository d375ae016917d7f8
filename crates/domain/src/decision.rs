//! Decision engine: turns a telemetry snapshot into on/off verdicts.
//!
//! The engine is pure: no IO, no clock, no mutable state. Given the same
//! snapshot, observed state and thresholds it always returns the same
//! verdict, for any input including negative or NaN readings.
//!
//! ## Clauses
//!
//! An appliance should be on when one of four clauses holds. Which clauses
//! are eligible depends on the state observed on the device, which is the
//! hysteresis: entering ON needs stricter conditions than staying ON.
//!
//! | Clause | Observed | Path |
//! |--------|----------|------|
//! | [`Clause::SaturatedEntry`] | off | battery at a saturation sentinel |
//! | [`Clause::SaturatedHold`] | on | battery at a saturation sentinel |
//! | [`Clause::HeadroomEntry`] | off | SoC above the appliance floor and surplus sun |
//! | [`Clause::HeadroomHold`] | on | SoC above the appliance floor and surplus sun |
//!
//! Entry clauses require an *idle* circuit, hold clauses only a circuit
//! *within limit*. The headroom entry clause additionally requires confirmed
//! daylight. When nothing matches the verdict is OFF.
//!
//! The space heater is lower priority: it is never on while the water heater
//! is on, and its headroom path only opens once the tank is hot.

use serde::{Deserialize, Serialize};

use crate::appliance::{Appliance, PowerState};
use crate::telemetry::TelemetrySnapshot;
use crate::thresholds::Thresholds;

/// Predicates derived once per cycle and shared by both appliances.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    /// SoC equals one of the two saturation sentinels.
    pub at_max_charge: bool,
    /// Tank below its temperature ceiling.
    pub cold_tank: bool,
    /// Monitoring string above the "producing at all" floor.
    pub sun_present: bool,
    /// Total PV production above the surplus floor.
    pub sun_surplus: bool,
    /// Monitoring string above the "confirmed daytime" floor.
    pub daylight: bool,
}

impl Conditions {
    #[must_use]
    pub fn derive(snapshot: &TelemetrySnapshot, thresholds: &Thresholds) -> Self {
        // Sentinels, not a range: the charge controller reports exactly
        // these values at saturation.
        #[allow(clippy::float_cmp)]
        let at_max_charge = snapshot.battery_soc == thresholds.full_soc_alt
            || snapshot.battery_soc == thresholds.full_soc;

        Self {
            at_max_charge,
            cold_tank: snapshot.tank_temperature < thresholds.max_tank_temperature,
            sun_present: snapshot.solar_string_voltage > thresholds.string_voltage_present,
            sun_surplus: snapshot.solar_power > thresholds.min_solar_power,
            daylight: snapshot.solar_string_voltage > thresholds.string_voltage_daylight,
        }
    }
}

/// Load predicates for the circuit feeding one appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitConditions {
    /// Load below the idle threshold. Justifies turning on.
    pub idle: bool,
    /// Load below the maximum allowed. Justifies staying on.
    pub within_limit: bool,
}

impl CircuitConditions {
    #[must_use]
    pub fn derive(load: f64, thresholds: &Thresholds) -> Self {
        Self {
            idle: load < thresholds.load_idle,
            within_limit: load < thresholds.max_load,
        }
    }
}

/// The rule that produced an ON verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    SaturatedEntry,
    SaturatedHold,
    HeadroomEntry,
    HeadroomHold,
}

impl Clause {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SaturatedEntry => "saturated_entry",
            Self::SaturatedHold => "saturated_hold",
            Self::HeadroomEntry => "headroom_entry",
            Self::HeadroomHold => "headroom_hold",
        }
    }
}

impl std::fmt::Display for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one appliance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub appliance: Appliance,
    /// State observed on the device right before deciding.
    pub previous: PowerState,
    pub verdict: PowerState,
    /// Clause that matched, `None` when the verdict is OFF.
    pub clause: Option<Clause>,
    /// Load on the appliance's circuit, W.
    pub circuit_load: f64,
    pub conditions: Conditions,
    pub circuit: CircuitConditions,
    /// Water heater state the space heater was decided against.
    pub water_heater: Option<PowerState>,
}

/// Evaluates both appliances against one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct DecisionEngine<'a> {
    snapshot: &'a TelemetrySnapshot,
    thresholds: &'a Thresholds,
    conditions: Conditions,
}

impl<'a> DecisionEngine<'a> {
    /// Derive the shared predicates for this cycle.
    #[must_use]
    pub fn new(snapshot: &'a TelemetrySnapshot, thresholds: &'a Thresholds) -> Self {
        Self {
            snapshot,
            thresholds,
            conditions: Conditions::derive(snapshot, thresholds),
        }
    }

    /// Decide the water heater, given the state observed on its outlet.
    #[must_use]
    pub fn water_heater(&self, observed: PowerState) -> Decision {
        let c = self.conditions;
        let load = self.snapshot.load_primary;
        let circuit = CircuitConditions::derive(load, self.thresholds);
        let headroom = self.snapshot.battery_soc > self.thresholds.min_water_heater_soc;

        let clause = match observed {
            PowerState::Off => {
                if c.at_max_charge && circuit.idle && c.cold_tank && c.sun_present {
                    Some(Clause::SaturatedEntry)
                } else if headroom && circuit.idle && c.sun_surplus && c.cold_tank && c.daylight {
                    Some(Clause::HeadroomEntry)
                } else {
                    None
                }
            }
            PowerState::On => {
                if c.at_max_charge
                    && circuit.within_limit
                    && c.sun_surplus
                    && c.cold_tank
                    && c.sun_present
                {
                    Some(Clause::SaturatedHold)
                } else if headroom && circuit.within_limit && c.sun_surplus && c.cold_tank {
                    Some(Clause::HeadroomHold)
                } else {
                    None
                }
            }
        };

        self.decision(Appliance::WaterHeater, observed, clause, load, circuit, None)
    }

    /// Decide the space heater, given the state observed on its outlet and
    /// the state just issued to the water heater.
    #[must_use]
    pub fn space_heater(&self, observed: PowerState, water_heater: PowerState) -> Decision {
        let c = self.conditions;
        let load = self.snapshot.load_secondary;
        let circuit = CircuitConditions::derive(load, self.thresholds);
        let headroom =
            !c.cold_tank && self.snapshot.battery_soc > self.thresholds.min_space_heater_soc;

        let clause = match (water_heater, observed) {
            (PowerState::On, _) => None,
            (PowerState::Off, PowerState::Off) => {
                if c.at_max_charge && circuit.idle && c.sun_present {
                    Some(Clause::SaturatedEntry)
                } else if headroom && circuit.idle && c.sun_surplus && c.daylight {
                    Some(Clause::HeadroomEntry)
                } else {
                    None
                }
            }
            (PowerState::Off, PowerState::On) => {
                if c.at_max_charge && circuit.within_limit && c.sun_surplus && c.sun_present {
                    Some(Clause::SaturatedHold)
                } else if headroom && circuit.within_limit && c.sun_surplus {
                    Some(Clause::HeadroomHold)
                } else {
                    None
                }
            }
        };

        self.decision(
            Appliance::SpaceHeater,
            observed,
            clause,
            load,
            circuit,
            Some(water_heater),
        )
    }

    fn decision(
        &self,
        appliance: Appliance,
        previous: PowerState,
        clause: Option<Clause>,
        circuit_load: f64,
        circuit: CircuitConditions,
        water_heater: Option<PowerState>,
    ) -> Decision {
        Decision {
            appliance,
            previous,
            verdict: PowerState::from(clause.is_some()),
            clause,
            circuit_load,
            conditions: self.conditions,
            circuit,
            water_heater,
        }
    }
}
