//! # sunsink-adapter-influxdb
//!
//! Telemetry source backed by the InfluxDB v2 HTTP query API.
//!
//! ## How it works
//!
//! Home Assistant exports its sensor states into an InfluxDB bucket, one
//! series per entity with the unit of measurement as `_measurement`. Each
//! [`Metric`] maps to one of those series through a [`SeriesCatalog`]. A read
//! sends a Flux query for the trailing hour averaged per minute and keeps
//! the last window of the CSV answer.
//!
//! Home Assistant only records a state when it changes, so a steady series
//! (a full battery, a PV string at night) can leave the hour empty. An empty
//! answer reads as `0.0`; the `full_soc_alt` threshold accounts for it.
//!
//! | Metric | Default entity id | Unit |
//! |--------|-------------------|------|
//! | battery SoC | `battery_state_of_charge` | `%` |
//! | circuit load | `load_{circuit}` | `W` |
//! | solar power | `pv_power` | `W` |
//! | string voltage | `pv{string}_voltage` | `V` |
//! | tank temperature | `tank_temperature` (domain `sensor`) | `°C` |
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `sunsink-app` and `sunsink-domain`.

mod config;
mod error;
pub mod flux;
pub mod response;

pub use config::{InfluxConfig, Series, SeriesCatalog};
pub use error::{InfluxError, ResponseError};

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use sunsink_app::ports::TelemetrySource;
use sunsink_domain::error::SunsinkError;
use sunsink_domain::telemetry::Metric;

/// Longest error body kept in [`InfluxError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Telemetry source querying InfluxDB over HTTP.
pub struct InfluxTelemetry {
    client: reqwest::Client,
    endpoint: String,
    config: InfluxConfig,
}

impl InfluxTelemetry {
    /// Create a telemetry source for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`InfluxError::Client`] if the HTTP client cannot be built.
    pub fn new(config: InfluxConfig) -> Result<Self, InfluxError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(InfluxError::Client)?;
        let endpoint = format!("{}/api/v2/query", config.url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    /// Latest one-minute mean of the series behind `metric`, or `0.0` when
    /// the series has no point in the trailing hour.
    ///
    /// # Errors
    ///
    /// Returns any transport, status or parsing error.
    pub async fn latest(&self, metric: Metric, dimension: Option<&str>) -> Result<f64, InfluxError> {
        let series = self.config.series.get(metric);
        let entity_id = series.entity_id_for(dimension);
        let query = flux::latest_mean(&self.config.bucket, series, &entity_id);

        let body = self.query(query).await?;
        let Some(value) = response::last_value(&body)? else {
            tracing::debug!(%metric, %entity_id, "no point in window, reading 0");
            return Ok(0.0);
        };

        tracing::debug!(%metric, %entity_id, value, "telemetry read");
        Ok(value)
    }

    /// Run a raw Flux query and return the CSV body.
    ///
    /// # Errors
    ///
    /// Returns [`InfluxError::Request`] on transport failure and
    /// [`InfluxError::Status`] on a non-success answer.
    pub async fn query(&self, flux: String) -> Result<String, InfluxError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("org", self.config.org.as_str())])
            .header(AUTHORIZATION, format!("Token {}", self.config.token))
            .header(CONTENT_TYPE, "application/vnd.flux")
            .header(ACCEPT, "application/csv")
            .body(flux)
            .send()
            .await
            .map_err(InfluxError::Request)?;

        let status = response.status();
        let body = response.text().await.map_err(InfluxError::Request)?;

        if !status.is_success() {
            let body = match body.char_indices().nth(MAX_ERROR_BODY) {
                Some((cut, _)) => body[..cut].to_string(),
                None => body,
            };
            return Err(InfluxError::Status { status, body });
        }

        Ok(body)
    }
}

impl TelemetrySource for InfluxTelemetry {
    async fn read(&self, metric: Metric, dimension: Option<&str>) -> Result<f64, SunsinkError> {
        Ok(self.latest(metric, dimension).await?)
    }
}
