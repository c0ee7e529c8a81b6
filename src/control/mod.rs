//! Actuator control policy.

pub mod arbiter;
