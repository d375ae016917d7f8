//! End-to-end tests for the sunsinkd stack.
//!
//! The control loop runs against the real InfluxDB adapter, pointed at a
//! loopback server that answers Flux queries from a table of entity values,
//! and an in-memory plug gateway. The liveness router is exercised via
//! `tower::ServiceExt::oneshot`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use http_body_util::BodyExt;
use sunsink_adapter_http_axum::router;
use sunsink_adapter_influxdb::{InfluxConfig, InfluxTelemetry};
use sunsink_app::control_loop::{ControlLoop, ControlSettings};
use sunsink_app::executor::CommandExecutor;
use sunsink_app::ports::{PlugGateway, PlugSession};
use sunsink_app::telemetry::TelemetryReader;
use sunsink_domain::appliance::PowerState;
use sunsink_domain::decision::Clause;
use sunsink_domain::error::SunsinkError;
use sunsink_domain::plug::{PlugCredentials, PlugInfo};
use sunsink_domain::telemetry::TelemetryPlan;
use sunsink_domain::thresholds::Thresholds;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Fake InfluxDB
// ---------------------------------------------------------------------------

type Values = Arc<HashMap<&'static str, f64>>;

/// Extract the value of the `entity_id` filter from a Flux query.
fn entity_id(query: &str) -> Option<&str> {
    let marker = "r[\"entity_id\"] == \"";
    let start = query.find(marker)? + marker.len();
    let end = query[start..].find('"')?;
    Some(&query[start..start + end])
}

async fn handle_query(State(values): State<Values>, body: String) -> (StatusCode, String) {
    let Some(value) = entity_id(&body).and_then(|id| values.get(id)) else {
        return (StatusCode::OK, "\r\n".to_string());
    };
    let csv = format!(
        "#datatype,string,long,dateTime:RFC3339,double\r\n\
         #default,mean,,,\r\n\
         ,result,table,_time,_value\r\n\
         ,,0,2026-10-16T10:00:00Z,{value}\r\n\r\n"
    );
    (StatusCode::OK, csv)
}

async fn spawn_influx(values: &[(&'static str, f64)]) -> String {
    let values: Values = Arc::new(values.iter().copied().collect());
    let app = Router::new()
        .route("/api/v2/query", post(handle_query))
        .with_state(values);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A sunny noon with a full battery and a cold tank.
const SATURATED_NOON: &[(&str, f64)] = &[
    ("battery_state_of_charge", 100.0),
    ("load_l3", 400.0),
    ("load_l2", 300.0),
    ("pv_power", 2600.0),
    ("pv1_voltage", 320.0),
    ("tank_temperature", 48.0),
];

// ---------------------------------------------------------------------------
// In-memory plugs
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct Plugs {
    relays: Arc<Mutex<HashMap<String, bool>>>,
    switches: Arc<Mutex<Vec<(String, PowerState)>>>,
}

impl Plugs {
    fn switches(&self) -> Vec<(String, PowerState)> {
        self.switches.lock().unwrap().clone()
    }
}

struct Session {
    address: String,
    plugs: Plugs,
}

impl PlugGateway for Plugs {
    type Session = Session;

    async fn connect(&self, credentials: &PlugCredentials) -> Result<Session, SunsinkError> {
        Ok(Session {
            address: credentials.address.clone(),
            plugs: self.clone(),
        })
    }
}

impl PlugSession for Session {
    async fn device_info(&mut self) -> Result<PlugInfo, SunsinkError> {
        let device_on = self
            .plugs
            .relays
            .lock()
            .unwrap()
            .get(&self.address)
            .copied()
            .unwrap_or(false);
        Ok(PlugInfo {
            device_on,
            ..PlugInfo::default()
        })
    }

    async fn set_power(&mut self, state: PowerState) -> Result<(), SunsinkError> {
        self.plugs
            .relays
            .lock()
            .unwrap()
            .insert(self.address.clone(), state == PowerState::On);
        self.plugs
            .switches
            .lock()
            .unwrap()
            .push((self.address.clone(), state));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

fn settings() -> ControlSettings {
    ControlSettings {
        plan: TelemetryPlan {
            primary_circuit: "l3".to_string(),
            secondary_circuit: "l2".to_string(),
            pv_string: "1".to_string(),
        },
        water_heater: PlugCredentials::new("10.0.0.3", "me@example.com", "secret"),
        space_heater: PlugCredentials::new("10.0.0.2", "me@example.com", "secret"),
        thresholds: Thresholds {
            max_tank_temperature: 67.0,
            load_idle: 1000.0,
            max_load: 3000.0,
            min_water_heater_soc: 40.0,
            min_space_heater_soc: 60.0,
            min_solar_power: 2000.0,
            full_soc: 100.0,
            full_soc_alt: 0.0,
            string_voltage_present: 50.0,
            string_voltage_daylight: 150.0,
        },
        interval: Duration::from_millis(10),
    }
}

fn control_loop(
    influx_url: String,
    plugs: Plugs,
    shutdown: &CancellationToken,
) -> ControlLoop<InfluxTelemetry, Plugs> {
    let telemetry = InfluxTelemetry::new(InfluxConfig {
        url: influx_url,
        token: "t0k3n".to_string(),
        org: "home".to_string(),
        timeout_secs: 2,
        ..InfluxConfig::default()
    })
    .unwrap();
    ControlLoop::new(
        TelemetryReader::new(telemetry),
        CommandExecutor::new(plugs, Duration::from_millis(10), shutdown.clone()),
        settings(),
        shutdown.clone(),
    )
}

// ---------------------------------------------------------------------------
// Control cycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_turn_on_water_heater_and_hold_space_heater_off() {
    let url = spawn_influx(SATURATED_NOON).await;
    let plugs = Plugs::default();
    let shutdown = CancellationToken::new();

    let report = control_loop(url, plugs.clone(), &shutdown)
        .run_cycle()
        .await
        .unwrap();

    assert!((report.snapshot.battery_soc - 100.0).abs() < f64::EPSILON);
    assert!((report.snapshot.tank_temperature - 48.0).abs() < f64::EPSILON);
    assert_eq!(report.water_heater.verdict, PowerState::On);
    assert_eq!(report.water_heater.clause, Some(Clause::SaturatedEntry));
    assert_eq!(report.space_heater.verdict, PowerState::Off);
    assert_eq!(report.space_heater.water_heater, Some(PowerState::On));
    assert_eq!(
        plugs.switches(),
        vec![
            ("10.0.0.3".to_string(), PowerState::On),
            ("10.0.0.2".to_string(), PowerState::Off),
        ]
    );
}

#[tokio::test]
async fn should_heat_space_once_tank_is_hot() {
    let mut values = SATURATED_NOON.to_vec();
    values.retain(|(id, _)| *id != "tank_temperature");
    values.push(("tank_temperature", 70.0));
    let url = spawn_influx(&values).await;
    let plugs = Plugs::default();
    let shutdown = CancellationToken::new();

    let report = control_loop(url, plugs.clone(), &shutdown)
        .run_cycle()
        .await
        .unwrap();

    assert_eq!(report.water_heater.verdict, PowerState::Off);
    assert_eq!(report.space_heater.verdict, PowerState::On);
    assert_eq!(report.space_heater.clause, Some(Clause::SaturatedEntry));
}

#[tokio::test]
async fn should_read_empty_soc_window_as_saturated_battery() {
    // A battery sitting at full writes no point for the hour.
    let mut values = SATURATED_NOON.to_vec();
    values.retain(|(id, _)| *id != "battery_state_of_charge");
    let url = spawn_influx(&values).await;
    let plugs = Plugs::default();
    let shutdown = CancellationToken::new();

    let report = control_loop(url, plugs.clone(), &shutdown)
        .run_cycle()
        .await
        .unwrap();

    assert!(report.snapshot.battery_soc.abs() < f64::EPSILON);
    assert!(report.water_heater.conditions.at_max_charge);
    assert_eq!(report.water_heater.verdict, PowerState::On);
    assert_eq!(report.water_heater.clause, Some(Clause::SaturatedEntry));
    assert_eq!(
        plugs.switches(),
        vec![
            ("10.0.0.3".to_string(), PowerState::On),
            ("10.0.0.2".to_string(), PowerState::Off),
        ]
    );
}

#[tokio::test]
async fn should_stop_with_telemetry_error_when_backend_is_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let plugs = Plugs::default();
    let shutdown = CancellationToken::new();

    let err = control_loop(format!("http://{addr}"), plugs.clone(), &shutdown)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, SunsinkError::Telemetry(_)));
    assert!(plugs.switches().is_empty());
}

#[tokio::test]
async fn should_return_ok_when_shutdown_is_requested() {
    let url = spawn_influx(SATURATED_NOON).await;
    let plugs = Plugs::default();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn({
        let control = control_loop(url, plugs.clone(), &shutdown);
        async move { control.run().await }
    });

    while plugs.switches().len() < 2 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    shutdown.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.is_ok());
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let resp = router::build()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"OK");
}
