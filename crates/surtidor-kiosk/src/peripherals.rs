//! Tracing-backed peripheral implementations.
//!
//! The production drivers (LCD, relay, buzzer, card reader) are wired in
//! out of tree; these stand-ins log every actuation so the controller can be
//! exercised on a bench with nothing attached.

use tracing::{debug, info};

use surtidor_core::{Beeper, Dispenser, Screen, TagScanner, View};
use surtidor_session::Peripherals;

pub struct TraceScreen;

impl Screen for TraceScreen {
    fn show(&mut self, view: &View) {
        info!(?view, "screen");
    }
}

pub struct TraceDispenser;

impl Dispenser for TraceDispenser {
    fn activate(&mut self) {
        info!("relay on");
    }

    fn deactivate(&mut self) {
        info!("relay off");
    }
}

pub struct TraceBeeper;

impl Beeper for TraceBeeper {
    fn double_pulse(&mut self) {
        info!("double pulse");
    }
}

pub struct TraceTagGate;

impl TagScanner for TraceTagGate {
    fn pause(&mut self) {
        debug!("tag scanning paused");
    }

    fn resume(&mut self) {
        debug!("tag scanning resumed");
    }
}

/// The full log-backed bundle.
pub fn trace_peripherals() -> Peripherals {
    Peripherals {
        screen: Box::new(TraceScreen),
        dispenser: Box::new(TraceDispenser),
        beeper: Box::new(TraceBeeper),
        scanner: Box::new(TraceTagGate),
    }
}
