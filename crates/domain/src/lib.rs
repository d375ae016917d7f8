//! # sunsink-domain
//!
//! Pure domain model for the sunsink solar-surplus controller.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, timestamps
//! - Define the **telemetry snapshot** read once per control cycle
//! - Define **power state** and **plug actions/credentials** for smart outlets
//! - Define the **threshold configuration** the decisions are made against
//! - Contain the **decision engine**: the hysteresis rules turning a snapshot
//!   into on/off verdicts for the water heater and the space heater
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod appliance;
pub mod decision;
pub mod plug;
pub mod telemetry;
pub mod thresholds;
