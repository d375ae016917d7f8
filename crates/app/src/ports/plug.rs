//! Plug port: sessions with smart outlets.
//!
//! A gateway opens a session from credentials; the session carries whatever
//! the transport needs (handshake keys, cookies, sequence numbers). A session
//! that failed once is never reused, the executor drops it and connects again.

use std::future::Future;

use sunsink_domain::appliance::PowerState;
use sunsink_domain::error::SunsinkError;
use sunsink_domain::plug::{PlugAction, PlugCredentials, PlugInfo, PlugResponse};

/// Opens sessions with outlets.
pub trait PlugGateway: Send + Sync {
    type Session: PlugSession;

    /// Authenticate against the outlet at `credentials.address`.
    ///
    /// # Errors
    ///
    /// Returns [`SunsinkError::Device`] when the outlet is unreachable or
    /// rejects the credentials.
    fn connect(
        &self,
        credentials: &PlugCredentials,
    ) -> impl Future<Output = Result<Self::Session, SunsinkError>> + Send;
}

/// An authenticated session with one outlet.
pub trait PlugSession: Send {
    /// Query device information, including the relay state.
    ///
    /// # Errors
    ///
    /// Returns [`SunsinkError::Device`] on transport or protocol failure.
    fn device_info(&mut self) -> impl Future<Output = Result<PlugInfo, SunsinkError>> + Send;

    /// Drive the relay into `state`.
    ///
    /// # Errors
    ///
    /// Returns [`SunsinkError::Device`] on transport or protocol failure.
    fn set_power(
        &mut self,
        state: PowerState,
    ) -> impl Future<Output = Result<(), SunsinkError>> + Send;

    /// Dispatch a [`PlugAction`] to the matching operation.
    fn perform(
        &mut self,
        action: PlugAction,
    ) -> impl Future<Output = Result<PlugResponse, SunsinkError>> + Send {
        async move {
            match action {
                PlugAction::DeviceInfo => self.device_info().await.map(PlugResponse::Info),
                PlugAction::TurnOn => self
                    .set_power(PowerState::On)
                    .await
                    .map(|()| PlugResponse::Switched(PowerState::On)),
                PlugAction::TurnOff => self
                    .set_power(PowerState::Off)
                    .await
                    .map(|()| PlugResponse::Switched(PowerState::Off)),
            }
        }
    }
}
