//! Peripheral seams.
//!
//! The real drivers (character display, relay GPIO, buzzer, proximity-card
//! reader) live out of tree; the controller talks to them through these
//! traits. [`View`] is the semantic screen model; turning a view into
//! pixels or LCD lines is the driver's problem, not the controller's.

/// Semantic screen content, one variant per thing the kiosk can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Idle menu. `today` carries the current day of year once the clock is
    /// synchronized.
    Menu { today: Option<i16> },
    /// DNI entry with the digits typed so far.
    EnterDni { buffer: String },
    /// PIN entry with the digits typed so far.
    EnterPin { buffer: String },
    /// "Please wait" while the directory lookup runs.
    Validating,
    /// Authenticated user summary.
    UserInfo { daily_limit: u8, remaining: u8 },
    /// Dispenser running.
    Dispensing,
    /// Transient error or completion message.
    Notice { message: String },
}

/// Display output.
pub trait Screen: Send {
    fn show(&mut self, view: &View);
}

/// Dispensing relay.
pub trait Dispenser: Send {
    fn activate(&mut self);
    fn deactivate(&mut self);
}

/// Audible feedback. Errors are signalled with a double pulse.
pub trait Beeper: Send {
    fn double_pulse(&mut self);
}

/// Gate for the tag reader. Scanning stays suspended for the whole non-idle
/// portion of a session so a queued read cannot re-trigger authentication
/// mid-flow.
pub trait TagScanner: Send {
    fn pause(&mut self);
    fn resume(&mut self);
}
