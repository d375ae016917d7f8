//! Resilient command executor for smart outlets.
//!
//! Outlets drop off WiFi, reboot and expire sessions. The executor hides all
//! of that from the control loop: a command is retried, on a fresh session,
//! after a fixed cooldown, until it succeeds. The only way out besides
//! success is the shutdown token.
//!
//! ```text
//!              connect ok              perform ok
//! Disconnected ──────────► Connected ───────────► done
//!      ▲   │ connect err        │ perform err
//!      │   ▼                    ▼
//!      └── Retrying ◄───────────┘
//!         (cooldown)
//! ```

use std::time::Duration;

use sunsink_domain::appliance::PowerState;
use sunsink_domain::error::{ErrorChain, SunsinkError};
use sunsink_domain::plug::{PlugAction, PlugCredentials, PlugResponse};
use tokio_util::sync::CancellationToken;

use crate::pause::{guarded, pause};
use crate::ports::{PlugGateway, PlugSession};

/// Where one command delivery currently stands.
enum Link<S> {
    Disconnected,
    Connected(S),
    Retrying,
}

/// Delivers [`PlugAction`]s through a [`PlugGateway`], retrying forever.
pub struct CommandExecutor<G> {
    gateway: G,
    cooldown: Duration,
    shutdown: CancellationToken,
}

impl<G: PlugGateway> CommandExecutor<G> {
    pub fn new(gateway: G, cooldown: Duration, shutdown: CancellationToken) -> Self {
        Self {
            gateway,
            cooldown,
            shutdown,
        }
    }

    /// Perform `action` on the outlet behind `credentials`.
    ///
    /// Every connection or command failure is logged at WARN and retried
    /// after the cooldown on a brand new session. There is no retry ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`SunsinkError::Cancelled`] once the shutdown token fires.
    /// Device failures are never returned.
    pub async fn execute(
        &self,
        action: PlugAction,
        credentials: &PlugCredentials,
    ) -> Result<PlugResponse, SunsinkError> {
        let address = credentials.address.as_str();
        let mut attempt: u32 = 1;
        let mut link = Link::Disconnected;

        loop {
            link = match link {
                Link::Disconnected => {
                    match guarded(&self.shutdown, self.gateway.connect(credentials)).await? {
                        Ok(session) => {
                            tracing::debug!(address, attempt, "plug session opened");
                            Link::Connected(session)
                        }
                        Err(err) => {
                            tracing::warn!(
                                address,
                                %action,
                                attempt,
                                error = %ErrorChain(&err),
                                "failed to open plug session, retrying"
                            );
                            Link::Retrying
                        }
                    }
                }
                Link::Connected(mut session) => {
                    match guarded(&self.shutdown, session.perform(action)).await? {
                        Ok(response) => return Ok(response),
                        Err(err) => {
                            tracing::warn!(
                                address,
                                %action,
                                attempt,
                                error = %ErrorChain(&err),
                                "plug command failed, retrying"
                            );
                            Link::Retrying
                        }
                    }
                }
                Link::Retrying => {
                    pause(&self.shutdown, self.cooldown).await?;
                    attempt = attempt.saturating_add(1);
                    Link::Disconnected
                }
            };
        }
    }

    /// Read the relay state of an outlet.
    ///
    /// # Errors
    ///
    /// Returns [`SunsinkError::Cancelled`] once the shutdown token fires.
    pub async fn query_state(
        &self,
        credentials: &PlugCredentials,
    ) -> Result<PowerState, SunsinkError> {
        match self.execute(PlugAction::DeviceInfo, credentials).await? {
            PlugResponse::Info(info) => Ok(info.power_state()),
            PlugResponse::Switched(state) => Ok(state),
        }
    }

    /// Drive an outlet into `state`.
    ///
    /// # Errors
    ///
    /// Returns [`SunsinkError::Cancelled`] once the shutdown token fires.
    pub async fn switch(
        &self,
        credentials: &PlugCredentials,
        state: PowerState,
    ) -> Result<(), SunsinkError> {
        self.execute(PlugAction::switch_to(state), credentials)
            .await
            .map(|_| ())
    }
}
