//! Telemetry port: latest scalar readings from the metrics backend.

use std::future::Future;

use sunsink_domain::error::SunsinkError;
use sunsink_domain::telemetry::Metric;

/// Read-only access to the time-series store.
///
/// Implementations return the most recent aggregated value of the series
/// identified by `metric` and the optional `dimension` (circuit id for
/// [`Metric::CircuitLoad`], string id for [`Metric::StringVoltage`]).
/// A series with no recent point reads as `0.0`.
///
/// # Errors
///
/// Returns [`SunsinkError::Telemetry`] when the backend is unreachable or
/// answers with an error. The caller aborts the cycle.
pub trait TelemetrySource: Send + Sync {
    fn read(
        &self,
        metric: Metric,
        dimension: Option<&str>,
    ) -> impl Future<Output = Result<f64, SunsinkError>> + Send;
}
