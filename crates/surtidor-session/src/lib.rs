//! Session state machine.
//!
//! One controller instance owns the live directory, the ledger and the
//! peripheral seams, and consumes the unified input event stream. Every
//! failure path is local and recoverable: the cycle always ends back at the
//! idle menu.

mod controller;
pub mod messages;

pub use controller::{
    Peripherals, SessionController, SessionState, SwapStats, Timeouts,
};
