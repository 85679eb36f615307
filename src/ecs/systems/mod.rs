//! Systems run by the `StepTick` schedule, one module per phase.

mod behavior;
mod environment;
mod lifecycle;
mod sensing;

pub use behavior::act_creatures;
pub use environment::advance_field;
pub use lifecycle::run_lifecycle;
pub use sensing::{refresh_sensors, sense_creatures};
