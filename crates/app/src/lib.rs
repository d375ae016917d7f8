//! # sunsink-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `TelemetrySource`: read the latest value of a metric
//!   - `PlugGateway` / `PlugSession`: open a session with a smart outlet and
//!     issue commands on it
//! - Provide the **use-cases** driving those ports:
//!   - `TelemetryReader`: assemble one snapshot per cycle
//!   - `CommandExecutor`: deliver a plug command, retrying until it succeeds
//!   - `ControlLoop`: read, decide, actuate, repeat
//! - Orchestrate domain objects without knowing *how* telemetry or devices are reached
//!
//! ## Dependency rule
//! Depends on `sunsink-domain` only (plus `tokio` timers and a cancellation token).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod control_loop;
pub mod executor;
pub mod ports;
pub mod telemetry;

mod pause;

#[cfg(test)]
mod fakes;
