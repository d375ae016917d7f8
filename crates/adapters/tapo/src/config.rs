//! Tapo account configuration.

use serde::Deserialize;
use sunsink_domain::plug::PlugCredentials;

/// Account shared by every plug, plus transport settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TapoConfig {
    /// TP-Link cloud account email the plugs are bound to.
    pub username: String,
    pub password: String,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
}

impl Default for TapoConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            timeout_secs: 5,
        }
    }
}

impl TapoConfig {
    /// Credentials for the plug at `address`.
    #[must_use]
    pub fn credentials(&self, address: &str) -> PlugCredentials {
        PlugCredentials::new(address, &self.username, &self.password)
    }
}

impl std::fmt::Debug for TapoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapoConfig")
            .field("username", &"<redacted>")
            .field("password", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
