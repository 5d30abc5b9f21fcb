//! Shared types for the surtidor dispensing controller.
//!
//! This crate holds the pieces every other crate agrees on: the centralized
//! default constants, the input-event alphabet, the time-source contract,
//! and the peripheral seam traits behind which the real drivers live.

pub mod clock;
pub mod defaults;
pub mod event;
pub mod peripherals;

pub use clock::{Clock, ManualClock, SystemClock};
pub use event::Event;
pub use peripherals::{Beeper, Dispenser, Screen, TagScanner, View};
