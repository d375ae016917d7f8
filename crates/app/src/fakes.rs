//! In-memory port implementations shared by the use-case tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use sunsink_domain::appliance::PowerState;
use sunsink_domain::error::SunsinkError;
use sunsink_domain::plug::{PlugAction, PlugCredentials, PlugInfo};
use sunsink_domain::telemetry::{Metric, TelemetryPlan, TelemetrySnapshot};

use crate::ports::{PlugGateway, PlugSession, TelemetrySource};

#[derive(Debug)]
pub(crate) struct Fault(pub(crate) &'static str);

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for Fault {}

pub(crate) fn plan() -> TelemetryPlan {
    TelemetryPlan {
        primary_circuit: "l3".to_string(),
        secondary_circuit: "l2".to_string(),
        pv_string: "1".to_string(),
    }
}

pub(crate) fn water_heater() -> PlugCredentials {
    PlugCredentials::new("10.0.0.3", "me@example.com", "secret")
}

pub(crate) fn space_heater() -> PlugCredentials {
    PlugCredentials::new("10.0.0.2", "me@example.com", "secret")
}

// ── Telemetry ─────────────────────────────────────────────────────────

type SeriesKey = (Metric, Option<String>);

#[derive(Default)]
pub(crate) struct FakeSource {
    values: HashMap<SeriesKey, f64>,
    reads: Mutex<Vec<SeriesKey>>,
}

impl FakeSource {
    /// Serve `snapshot` through the series named by [`plan`].
    pub(crate) fn from_snapshot(snapshot: &TelemetrySnapshot) -> Self {
        let plan = plan();
        let mut values = HashMap::new();
        values.insert((Metric::BatterySoc, None), snapshot.battery_soc);
        values.insert(
            (Metric::CircuitLoad, Some(plan.primary_circuit)),
            snapshot.load_primary,
        );
        values.insert(
            (Metric::CircuitLoad, Some(plan.secondary_circuit)),
            snapshot.load_secondary,
        );
        values.insert((Metric::SolarPower, None), snapshot.solar_power);
        values.insert((Metric::TankTemperature, None), snapshot.tank_temperature);
        values.insert(
            (Metric::StringVoltage, Some(plan.pv_string)),
            snapshot.solar_string_voltage,
        );
        Self {
            values,
            reads: Mutex::default(),
        }
    }

    pub(crate) fn without(mut self, metric: Metric) -> Self {
        self.values.retain(|(m, _), _| *m != metric);
        self
    }

    pub(crate) fn reads(&self) -> Vec<SeriesKey> {
        self.reads.lock().unwrap().clone()
    }
}

impl TelemetrySource for FakeSource {
    async fn read(&self, metric: Metric, dimension: Option<&str>) -> Result<f64, SunsinkError> {
        let key = (metric, dimension.map(str::to_string));
        self.reads.lock().unwrap().push(key.clone());
        self.values
            .get(&key)
            .copied()
            .ok_or_else(|| SunsinkError::Telemetry(Box::new(Fault("no data"))))
    }
}

// ── Plugs ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct GatewayState {
    relays: Mutex<HashMap<String, bool>>,
    commands: Mutex<Vec<(String, PlugAction)>>,
    connects: AtomicU32,
    connect_failures: AtomicU32,
    action_failures: AtomicU32,
}

/// Consume one scheduled failure, if any are left.
fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[derive(Clone, Default)]
pub(crate) struct FakeGateway {
    state: Arc<GatewayState>,
}

impl FakeGateway {
    pub(crate) fn with_plug(self, address: &str, state: PowerState) -> Self {
        self.state
            .relays
            .lock()
            .unwrap()
            .insert(address.to_string(), state.is_on());
        self
    }

    pub(crate) fn failing_connects(self, count: u32) -> Self {
        self.state.connect_failures.store(count, Ordering::SeqCst);
        self
    }

    pub(crate) fn failing_actions(self, count: u32) -> Self {
        self.state.action_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Commands that reached a relay, in order.
    pub(crate) fn commands(&self) -> Vec<(String, PlugAction)> {
        self.state.commands.lock().unwrap().clone()
    }

    pub(crate) fn connects(&self) -> u32 {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn relay(&self, address: &str) -> PowerState {
        let relays = self.state.relays.lock().unwrap();
        PowerState::from(relays.get(address).copied().unwrap_or(false))
    }
}

impl PlugGateway for FakeGateway {
    type Session = FakeSession;

    async fn connect(&self, credentials: &PlugCredentials) -> Result<FakeSession, SunsinkError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.state.connect_failures) {
            return Err(SunsinkError::Device(Box::new(Fault("connection refused"))));
        }
        Ok(FakeSession {
            state: Arc::clone(&self.state),
            address: credentials.address.clone(),
            failed: false,
        })
    }
}

pub(crate) struct FakeSession {
    state: Arc<GatewayState>,
    address: String,
    failed: bool,
}

impl FakeSession {
    fn command(&mut self, action: PlugAction) -> Result<(), SunsinkError> {
        assert!(!self.failed, "session reused after a failure");
        if take_failure(&self.state.action_failures) {
            self.failed = true;
            return Err(SunsinkError::Device(Box::new(Fault("session expired"))));
        }
        self.state
            .commands
            .lock()
            .unwrap()
            .push((self.address.clone(), action));
        Ok(())
    }
}

impl PlugSession for FakeSession {
    async fn device_info(&mut self) -> Result<PlugInfo, SunsinkError> {
        self.command(PlugAction::DeviceInfo)?;
        let relays = self.state.relays.lock().unwrap();
        Ok(PlugInfo {
            device_on: relays.get(&self.address).copied().unwrap_or(false),
            ..PlugInfo::default()
        })
    }

    async fn set_power(&mut self, state: PowerState) -> Result<(), SunsinkError> {
        self.command(PlugAction::switch_to(state))?;
        self.state
            .relays
            .lock()
            .unwrap()
            .insert(self.address.clone(), state.is_on());
        Ok(())
    }
}
