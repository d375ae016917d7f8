//! Control loop: read, decide, actuate, repeat.
//!
//! One iteration is strictly sequential:
//!
//! 1. read a telemetry snapshot (failure ends the loop);
//! 2. water heater: query the outlet, decide, issue the verdict, log;
//! 3. sleep `interval`;
//! 4. space heater: query the outlet, decide against the water heater's
//!    issued verdict, issue, log;
//! 5. sleep `interval`.
//!
//! The verdict is issued even when it matches the observed state, which
//! re-asserts the relay in case it was toggled by hand.

use std::time::Duration;

use sunsink_domain::appliance::PowerState;
use sunsink_domain::decision::{Clause, Decision, DecisionEngine};
use sunsink_domain::error::SunsinkError;
use sunsink_domain::plug::PlugCredentials;
use sunsink_domain::telemetry::{TelemetryPlan, TelemetrySnapshot};
use sunsink_domain::thresholds::Thresholds;
use sunsink_domain::time::{Timestamp, now};
use tokio_util::sync::CancellationToken;

use crate::executor::CommandExecutor;
use crate::pause::pause;
use crate::ports::{PlugGateway, TelemetrySource};
use crate::telemetry::TelemetryReader;

/// Static inputs of the loop, resolved from configuration at startup.
#[derive(Debug, Clone)]
pub struct ControlSettings {
    pub plan: TelemetryPlan,
    pub water_heater: PlugCredentials,
    pub space_heater: PlugCredentials,
    pub thresholds: Thresholds,
    /// Pause after each appliance.
    pub interval: Duration,
}

/// What one iteration read and decided.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub started_at: Timestamp,
    pub snapshot: TelemetrySnapshot,
    pub water_heater: Decision,
    pub space_heater: Decision,
}

pub struct ControlLoop<S, G> {
    reader: TelemetryReader<S>,
    executor: CommandExecutor<G>,
    settings: ControlSettings,
    shutdown: CancellationToken,
}

impl<S, G> ControlLoop<S, G>
where
    S: TelemetrySource,
    G: PlugGateway,
{
    pub fn new(
        reader: TelemetryReader<S>,
        executor: CommandExecutor<G>,
        settings: ControlSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            reader,
            executor,
            settings,
            shutdown,
        }
    }

    /// Run cycles until shutdown or a fatal error.
    ///
    /// # Errors
    ///
    /// Returns [`SunsinkError::Telemetry`] when a snapshot cannot be read.
    /// Cancellation is not an error: the loop returns `Ok(())`.
    pub async fn run(&self) -> Result<(), SunsinkError> {
        tracing::info!(
            interval_secs = self.settings.interval.as_secs(),
            water_heater = %self.settings.water_heater.address,
            space_heater = %self.settings.space_heater.address,
            "control loop started"
        );
        loop {
            match self.run_cycle().await {
                Ok(_) => {}
                Err(err) if err.is_cancelled() => {
                    tracing::info!("control loop stopped");
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Run a single iteration, including both trailing sleeps.
    ///
    /// # Errors
    ///
    /// Returns [`SunsinkError::Telemetry`] when the snapshot cannot be read,
    /// or [`SunsinkError::Cancelled`] when shutdown interrupts the cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport, SunsinkError> {
        let started_at = now();
        let snapshot = self.reader.snapshot(&self.settings.plan).await?;
        let engine = DecisionEngine::new(&snapshot, &self.settings.thresholds);

        let observed = self.executor.query_state(&self.settings.water_heater).await?;
        let water_heater = engine.water_heater(observed);
        self.enact(&water_heater, &self.settings.water_heater, &snapshot)
            .await?;
        pause(&self.shutdown, self.settings.interval).await?;

        let observed = self.executor.query_state(&self.settings.space_heater).await?;
        let space_heater = engine.space_heater(observed, water_heater.verdict);
        self.enact(&space_heater, &self.settings.space_heater, &snapshot)
            .await?;
        pause(&self.shutdown, self.settings.interval).await?;

        Ok(CycleReport {
            started_at,
            snapshot,
            water_heater,
            space_heater,
        })
    }

    async fn enact(
        &self,
        decision: &Decision,
        credentials: &PlugCredentials,
        snapshot: &TelemetrySnapshot,
    ) -> Result<(), SunsinkError> {
        self.executor.switch(credentials, decision.verdict).await?;
        log_decision(decision, snapshot);
        Ok(())
    }
}

fn log_decision(decision: &Decision, snapshot: &TelemetrySnapshot) {
    let c = decision.conditions;
    tracing::info!(
        appliance = %decision.appliance,
        verdict = %decision.verdict,
        clause = decision.clause.map_or("none", Clause::as_str),
        was_on = decision.previous == PowerState::On,
        water_heater_on = decision.water_heater.map(PowerState::is_on),
        battery_soc = snapshot.battery_soc,
        circuit_load = decision.circuit_load,
        solar_power = snapshot.solar_power,
        string_voltage = snapshot.solar_string_voltage,
        tank_temperature = snapshot.tank_temperature,
        at_max_charge = c.at_max_charge,
        cold_tank = c.cold_tank,
        circuit_idle = decision.circuit.idle,
        circuit_within_limit = decision.circuit.within_limit,
        sun_present = c.sun_present,
        sun_surplus = c.sun_surplus,
        daylight = c.daylight,
        "{}: {}",
        decision.appliance,
        decision.verdict
    );
}
