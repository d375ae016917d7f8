//! Common error types used across the workspace.
//!
//! Each adapter defines its own typed error and converts into
//! [`SunsinkError`] at the port boundary, keeping the failure class
//! (telemetry vs device) the control loop reacts to.

use std::error::Error as StdError;

/// Boxed source error carried across port boundaries.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Top-level error for the application core.
#[derive(Debug, thiserror::Error)]
pub enum SunsinkError {
    /// The metrics backend could not answer a query.
    ///
    /// Fatal: decisions are never made on partial telemetry.
    #[error("telemetry unavailable")]
    Telemetry(#[source] BoxError),

    /// A smart outlet could not be reached or refused a command.
    ///
    /// Transient: the command executor retries these indefinitely.
    #[error("device command failed")]
    Device(#[source] BoxError),

    /// Shutdown was requested while an operation was waiting.
    #[error("operation cancelled")]
    Cancelled,
}

impl SunsinkError {
    /// Whether this error is the orderly-shutdown signal rather than a failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Displays an error followed by its chain of sources, `outer: inner: root`.
pub struct ErrorChain<'a>(pub &'a (dyn StdError + 'static));

impl std::fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(err) = source {
            write!(f, ": {err}")?;
            source = err.source();
        }
        Ok(())
    }
}
