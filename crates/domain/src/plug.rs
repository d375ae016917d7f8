//! Smart outlet commands, credentials and responses.
//!
//! The outlet is treated as an opaque device exposing three operations.
//! The set is closed: there is no way to construct an unknown command.

use serde::{Deserialize, Serialize};

use crate::appliance::PowerState;

/// A command that can be sent to a smart outlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlugAction {
    /// Query device information, including the on/off flag.
    DeviceInfo,
    TurnOn,
    TurnOff,
}

impl PlugAction {
    /// The switching command that drives an outlet into `state`.
    #[must_use]
    pub fn switch_to(state: PowerState) -> Self {
        match state {
            PowerState::On => Self::TurnOn,
            PowerState::Off => Self::TurnOff,
        }
    }
}

impl std::fmt::Display for PlugAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeviceInfo => f.write_str("device_info"),
            Self::TurnOn => f.write_str("turn_on"),
            Self::TurnOff => f.write_str("turn_off"),
        }
    }
}

/// Address and account used to open a session with one outlet.
///
/// Passed to the gateway on every connection attempt; sessions are never
/// assumed to survive a failure. The password is redacted from `Debug`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct PlugCredentials {
    /// Host name or IP address of the outlet.
    pub address: String,
    /// Cloud account the outlet is bound to.
    pub username: String,
    pub password: String,
}

impl PlugCredentials {
    #[must_use]
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for PlugCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlugCredentials")
            .field("address", &self.address)
            .field("username", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Device information reported by an outlet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlugInfo {
    /// Whether the relay is closed.
    pub device_on: bool,
    /// User-assigned name, when the device reports one.
    pub nickname: Option<String>,
    /// Hardware model, e.g. `P110`.
    pub model: Option<String>,
    pub device_id: Option<String>,
    /// WiFi signal level as reported by the firmware.
    pub signal_level: Option<i64>,
}

impl PlugInfo {
    #[must_use]
    pub fn power_state(&self) -> PowerState {
        PowerState::from(self.device_on)
    }
}

/// Successful outcome of a [`PlugAction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlugResponse {
    /// Answer to [`PlugAction::DeviceInfo`].
    Info(PlugInfo),
    /// Acknowledgement of [`PlugAction::TurnOn`] / [`PlugAction::TurnOff`].
    Switched(PowerState),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_power_state_to_switch_action() {
        assert_eq!(PlugAction::switch_to(PowerState::On), PlugAction::TurnOn);
        assert_eq!(PlugAction::switch_to(PowerState::Off), PlugAction::TurnOff);
    }

    #[test]
    fn should_display_snake_case_action() {
        assert_eq!(PlugAction::DeviceInfo.to_string(), "device_info");
        assert_eq!(PlugAction::TurnOn.to_string(), "turn_on");
        assert_eq!(PlugAction::TurnOff.to_string(), "turn_off");
    }

    #[test]
    fn should_redact_secrets_in_debug_output() {
        let creds = PlugCredentials::new("192.168.1.20", "me@example.com", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("192.168.1.20"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("me@example.com"));
    }

    #[test]
    fn should_derive_power_state_from_info() {
        let info = PlugInfo {
            device_on: true,
            ..PlugInfo::default()
        };
        assert_eq!(info.power_state(), PowerState::On);
    }
}
