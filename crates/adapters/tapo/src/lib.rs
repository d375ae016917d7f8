//! # sunsink-adapter-tapo
//!
//! Plug gateway for TP-Link Tapo P1xx smart plugs on the local network.
//!
//! ## How it works
//!
//! Recent firmware only speaks KLAP (see [`klap`]): a two-step handshake
//! proving both sides know the cloud account, followed by AES-encrypted
//! JSON requests over plain HTTP. A [`TapoSession`] holds the session cookie
//! and cipher; it is opened per command by the executor and dropped on any
//! failure.
//!
//! | Exchange | Path | Body |
//! |----------|------|------|
//! | handshake 1 | `/app/handshake1` | local seed |
//! | handshake 2 | `/app/handshake2` | client proof |
//! | request | `/app/request?seq=N` | signature ‖ ciphertext |
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `sunsink-app` and `sunsink-domain`.

mod config;
mod error;
pub mod klap;
pub mod protocol;

pub use config::TapoConfig;
pub use error::{HandshakeError, TapoError};

use std::time::Duration;

use reqwest::header::{COOKIE, HeaderMap, SET_COOKIE};
use sunsink_app::ports::{PlugGateway, PlugSession};
use sunsink_domain::appliance::PowerState;
use sunsink_domain::error::SunsinkError;
use sunsink_domain::plug::{PlugCredentials, PlugInfo};

use crate::klap::{HASH_LEN, KlapCipher, SEED_LEN, Seed};
use crate::protocol::{DeviceInfoResult, GET_DEVICE_INFO, Request, Response, SET_DEVICE_INFO};

const SESSION_COOKIE: &str = "TP_SESSIONID";

/// Opens KLAP sessions with Tapo plugs.
#[derive(Clone)]
pub struct TapoGateway {
    client: reqwest::Client,
}

impl TapoGateway {
    /// Create a gateway with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TapoError::Client`] if the HTTP client cannot be built.
    pub fn new(config: &TapoConfig) -> Result<Self, TapoError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(TapoError::Client)?;
        Ok(Self { client })
    }

    /// Run both handshakes and derive the session cipher.
    ///
    /// # Errors
    ///
    /// Returns [`TapoError::Handshake`] when the plug rejects the account,
    /// or a transport error.
    pub async fn handshake(&self, credentials: &PlugCredentials) -> Result<TapoSession, TapoError> {
        let base = format!("http://{}/app", credentials.address);
        let auth = klap::auth_hash(&credentials.username, &credentials.password);
        let local: Seed = rand::random();

        let response = self
            .client
            .post(format!("{base}/handshake1"))
            .body(local.to_vec())
            .send()
            .await
            .map_err(TapoError::Request)?;
        check_status("handshake1", response.status())?;
        let cookie = session_cookie(response.headers())
            .ok_or(TapoError::Handshake(HandshakeError::MissingCookie))?;
        let answer = response.bytes().await.map_err(TapoError::Request)?;

        if answer.len() < SEED_LEN + HASH_LEN {
            return Err(TapoError::Handshake(HandshakeError::ShortAnswer(
                answer.len(),
            )));
        }
        let mut remote: Seed = [0; SEED_LEN];
        remote.copy_from_slice(&answer[..SEED_LEN]);
        if answer[SEED_LEN..SEED_LEN + HASH_LEN] != klap::server_proof(&local, &remote, &auth) {
            return Err(TapoError::Handshake(HandshakeError::HashMismatch));
        }

        let response = self
            .client
            .post(format!("{base}/handshake2"))
            .header(COOKIE, &cookie)
            .body(klap::client_proof(&local, &remote, &auth).to_vec())
            .send()
            .await
            .map_err(TapoError::Request)?;
        check_status("handshake2", response.status())?;

        tracing::debug!(address = %credentials.address, "KLAP handshake complete");
        Ok(TapoSession {
            client: self.client.clone(),
            endpoint: format!("{base}/request"),
            cookie,
            cipher: KlapCipher::new(&local, &remote, &auth),
        })
    }
}

impl PlugGateway for TapoGateway {
    type Session = TapoSession;

    async fn connect(&self, credentials: &PlugCredentials) -> Result<TapoSession, SunsinkError> {
        Ok(self.handshake(credentials).await?)
    }
}

/// An authenticated KLAP session with one plug.
pub struct TapoSession {
    client: reqwest::Client,
    endpoint: String,
    cookie: String,
    cipher: KlapCipher,
}

impl TapoSession {
    /// Send one encrypted request and return its checked `result`.
    async fn call(
        &mut self,
        method: &'static str,
        request: &Request<'_>,
    ) -> Result<Option<serde_json::Value>, TapoError> {
        let payload = serde_json::to_vec(request).map_err(TapoError::Json)?;
        let (seq, body) = self.cipher.seal(&payload);

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("seq", seq)])
            .header(COOKIE, &self.cookie)
            .body(body)
            .send()
            .await
            .map_err(TapoError::Request)?;
        check_status("request", response.status())?;
        let sealed = response.bytes().await.map_err(TapoError::Request)?;

        let plain = self.cipher.open(seq, &sealed).map_err(TapoError::Decrypt)?;
        let response: Response = serde_json::from_slice(&plain).map_err(TapoError::Json)?;
        response.into_result(method)
    }

    /// Query the plug's device information.
    ///
    /// # Errors
    ///
    /// Returns a [`TapoError`] on transport, protocol or device failure.
    pub async fn get_device_info(&mut self) -> Result<PlugInfo, TapoError> {
        let result = self
            .call(GET_DEVICE_INFO, &Request::new(GET_DEVICE_INFO, None))
            .await?
            .ok_or(TapoError::MissingResult {
                method: GET_DEVICE_INFO,
            })?;
        let raw: DeviceInfoResult = serde_json::from_value(result).map_err(TapoError::Json)?;
        Ok(raw.into())
    }

    /// Switch the relay.
    ///
    /// # Errors
    ///
    /// Returns a [`TapoError`] on transport, protocol or device failure.
    pub async fn set_device_on(&mut self, on: bool) -> Result<(), TapoError> {
        self.call(SET_DEVICE_INFO, &Request::set_device_on(on))
            .await
            .map(|_| ())
    }
}

impl PlugSession for TapoSession {
    async fn device_info(&mut self) -> Result<PlugInfo, SunsinkError> {
        Ok(self.get_device_info().await?)
    }

    async fn set_power(&mut self, state: PowerState) -> Result<(), SunsinkError> {
        Ok(self.set_device_on(state.is_on()).await?)
    }
}

fn check_status(stage: &'static str, status: reqwest::StatusCode) -> Result<(), TapoError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(TapoError::Status { stage, status })
    }
}

/// Extract `TP_SESSIONID=…` from the `Set-Cookie` headers.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .map(str::trim)
        .find(|pair| {
            pair.split_once('=')
                .is_some_and(|(name, _)| name == SESSION_COOKIE)
        })
        .map(str::to_string)
}
