//! Tapo adapter error types.

use sunsink_domain::error::SunsinkError;

/// Errors specific to the Tapo adapter.
#[derive(Debug, thiserror::Error)]
pub enum TapoError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// The plug could not be reached or the body could not be read.
    #[error("request to plug failed")]
    Request(#[source] reqwest::Error),

    /// The plug answered with a non-success status.
    #[error("plug answered {status} to {stage}")]
    Status {
        /// Which exchange failed: `handshake1`, `handshake2` or `request`.
        stage: &'static str,
        status: reqwest::StatusCode,
    },

    /// The KLAP handshake did not complete.
    #[error("handshake failed")]
    Handshake(#[source] HandshakeError),

    /// An encrypted response could not be opened.
    #[error("failed to decrypt plug response")]
    Decrypt(#[source] crate::klap::KlapError),

    /// The request could not be encoded or the response decoded.
    #[error("invalid JSON payload")]
    Json(#[source] serde_json::Error),

    /// The plug processed the request and reported an error code.
    #[error("{method} returned error code {code}")]
    Device { method: &'static str, code: i64 },

    /// A successful answer carried no `result` object.
    #[error("{method} returned no result")]
    MissingResult { method: &'static str },
}

/// Details about why a KLAP handshake failed.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// The first handshake answer did not set a `TP_SESSIONID` cookie.
    #[error("no session cookie in handshake answer")]
    MissingCookie,

    /// The first handshake answer is too short to hold seed and hash.
    #[error("handshake answer must be 48 bytes, got {0}")]
    ShortAnswer(usize),

    /// The plug's proof does not match our credentials.
    #[error("server hash mismatch, credentials rejected")]
    HashMismatch,
}

impl TapoError {
    /// Convert into a [`SunsinkError::Device`] for propagation across port
    /// boundaries.
    #[must_use]
    pub fn into_domain(self) -> SunsinkError {
        SunsinkError::Device(Box::new(self))
    }
}

impl From<TapoError> for SunsinkError {
    fn from(err: TapoError) -> Self {
        err.into_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_device_error() {
        let err = TapoError::Device {
            method: "set_device_info",
            code: -1008,
        };
        assert_eq!(err.to_string(), "set_device_info returned error code -1008");
    }

    #[test]
    fn should_display_status_error() {
        let err = TapoError::Status {
            stage: "handshake1",
            status: reqwest::StatusCode::FORBIDDEN,
        };
        assert_eq!(err.to_string(), "plug answered 403 Forbidden to handshake1");
    }

    #[test]
    fn should_display_short_answer() {
        let err = HandshakeError::ShortAnswer(12);
        assert_eq!(err.to_string(), "handshake answer must be 48 bytes, got 12");
    }

    #[test]
    fn should_convert_to_device_error() {
        let err: SunsinkError = TapoError::Handshake(HandshakeError::HashMismatch).into();
        assert!(matches!(err, SunsinkError::Device(_)));
    }
}
