//! Telemetry reader: one snapshot per control cycle.

use sunsink_domain::error::SunsinkError;
use sunsink_domain::telemetry::{Metric, TelemetryPlan, TelemetrySnapshot};

use crate::ports::TelemetrySource;

/// Assembles a [`TelemetrySnapshot`] from individual series reads.
pub struct TelemetryReader<S> {
    source: S,
}

impl<S: TelemetrySource> TelemetryReader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Read every metric the decision engine needs.
    ///
    /// Reads run sequentially in a fixed order: battery SoC, primary circuit
    /// load, secondary circuit load, solar power, tank temperature, string
    /// voltage. The first failure aborts the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SunsinkError::Telemetry`] if any series cannot be read.
    pub async fn snapshot(&self, plan: &TelemetryPlan) -> Result<TelemetrySnapshot, SunsinkError> {
        let battery_soc = self.source.read(Metric::BatterySoc, None).await?;
        let load_primary = self
            .source
            .read(Metric::CircuitLoad, Some(&plan.primary_circuit))
            .await?;
        let load_secondary = self
            .source
            .read(Metric::CircuitLoad, Some(&plan.secondary_circuit))
            .await?;
        let solar_power = self.source.read(Metric::SolarPower, None).await?;
        let tank_temperature = self.source.read(Metric::TankTemperature, None).await?;
        let solar_string_voltage = self
            .source
            .read(Metric::StringVoltage, Some(&plan.pv_string))
            .await?;

        let snapshot = TelemetrySnapshot {
            battery_soc,
            load_primary,
            load_secondary,
            solar_power,
            solar_string_voltage,
            tank_temperature,
        };
        tracing::debug!(?snapshot, "telemetry snapshot read");
        Ok(snapshot)
    }
}
