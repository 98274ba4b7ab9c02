//! BDD step definitions for thermowatch service

pub mod fleet_steps;
pub mod readiness_steps;
pub mod scheduler_steps;
pub mod temperature_steps;
