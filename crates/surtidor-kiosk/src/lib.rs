//! Kiosk binary wiring: CLI, tracing bootstrap, the real-time session loop
//! and the background sync task.

pub mod cli;
pub mod input;
pub mod peripherals;
pub mod runtime;

pub use cli::KioskArgs;
