//! Low-level drivers that sit below the adapters.

pub mod button;
pub mod indicator;
pub mod watchdog;
