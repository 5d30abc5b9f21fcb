//! The session controller.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use surtidor_core::defaults::{
    DEFAULT_DISPENSE_MAX_SECS, DEFAULT_FORMAT_NOTICE_MS, DEFAULT_INPUT_TIMEOUT_SECS,
    DEFAULT_NOTICE_MS, DEFAULT_VALIDATING_MAX_SECS, DNI_LEN, KEY_ACCEPT, KEY_CANCEL, KEY_DELETE,
    KEY_STOP, PIN_LEN,
};
use surtidor_core::{Beeper, Clock, Dispenser, Event, Screen, TagScanner, View};
use surtidor_directory::{Directory, DirectoryError, Ledger, LookupOutcome};

use crate::messages::*;

/// Controller states. `Menu` is both the initial state and where every
/// session cycle terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Menu,
    EnterDni,
    EnterPin,
    Validating,
    ShowUser,
    Dispensing,
}

/// Timeout knobs, all measured from the last state entry (or last accepted
/// keystroke for the input states).
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub input: Duration,
    pub dispense_max: Duration,
    pub validating_max: Duration,
    pub notice: Duration,
    pub format_notice: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            input: Duration::from_secs(DEFAULT_INPUT_TIMEOUT_SECS),
            dispense_max: Duration::from_secs(DEFAULT_DISPENSE_MAX_SECS),
            validating_max: Duration::from_secs(DEFAULT_VALIDATING_MAX_SECS),
            notice: Duration::from_millis(DEFAULT_NOTICE_MS),
            format_notice: Duration::from_millis(DEFAULT_FORMAT_NOTICE_MS),
        }
    }
}

/// The peripheral bundle the controller drives.
pub struct Peripherals {
    pub screen: Box<dyn Screen>,
    pub dispenser: Box<dyn Dispenser>,
    pub beeper: Box<dyn Beeper>,
    pub scanner: Box<dyn TagScanner>,
}

/// Result of a completed directory swap.
#[derive(Debug, Clone, Copy)]
pub struct SwapStats {
    pub loaded: usize,
    pub replayed: usize,
}

/// Staged credentials for the validating state.
#[derive(Debug, Clone, Copy)]
enum AuthAttempt {
    DniPin { dni: u32, pin: u16 },
    Tag(u32),
}

#[derive(Debug, Clone, Copy)]
struct SelectedUser {
    index: usize,
    daily_limit: u8,
    remaining: u8,
}

/// A transient on-screen message with its own expiry.
///
/// While a notice is pending, keys and tags are dropped and ticks only check
/// the expiry, so the event loop never sleeps inside a handler. `next: None`
/// re-renders the current state without restamping its timeout clock.
struct PendingNotice {
    expires_at: Instant,
    next: Option<SessionState>,
}

/// Top-level orchestrator: consumes input events, drives directory lookups,
/// ledger updates and dispenser actuation.
pub struct SessionController {
    directory: Directory,
    ledger: Ledger,
    clock: Arc<dyn Clock>,
    peripherals: Peripherals,
    timeouts: Timeouts,

    state: SessionState,
    entered_at: Instant,
    dni_buffer: String,
    pin_buffer: String,
    attempt: Option<AuthAttempt>,
    selected: Option<SelectedUser>,
    notice: Option<PendingNotice>,
    /// Set once today's ledger entries have been replayed into the live
    /// directory; retried from the menu until the clock first syncs.
    ledger_replayed: bool,
}

impl SessionController {
    pub fn new(
        directory: Directory,
        ledger: Ledger,
        clock: Arc<dyn Clock>,
        peripherals: Peripherals,
        timeouts: Timeouts,
        now: Instant,
    ) -> Self {
        let mut controller = Self {
            directory,
            ledger,
            clock,
            peripherals,
            timeouts,
            state: SessionState::Menu,
            entered_at: now,
            dni_buffer: String::new(),
            pin_buffer: String::new(),
            attempt: None,
            selected: None,
            notice: None,
            ledger_replayed: false,
        };
        controller.enter(SessionState::Menu, now);
        controller
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the controller is at the idle menu with nothing on screen.
    /// This is the only condition under which a directory swap may run.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Menu && self.notice.is_none()
    }

    #[inline]
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Single dispatch point for all input.
    pub fn handle_event(&mut self, event: Event, now: Instant) {
        if self.notice.is_some() {
            if event == Event::Tick {
                self.tick_notice(now);
            }
            // Keys and tags are dropped while a notice is on screen.
            return;
        }
        match event {
            Event::Key(key) => self.on_key(key, now),
            Event::TagScanned(uid) => self.on_tag(uid, now),
            Event::Tick => self.on_tick(now),
        }
    }

    /// Replace the live directory from the persisted snapshot and replay
    /// today's ledger into it. Must only be called while [`Self::is_idle`];
    /// the sync service reaches this through the swap handshake, never
    /// directly.
    pub fn reload_directory(&mut self, snapshot: &Path) -> Result<SwapStats, DirectoryError> {
        debug_assert!(self.is_idle(), "directory swap outside the idle menu");
        let mut fresh = Directory::load_from_snapshot(snapshot, self.directory.capacity())?;
        let replayed = match self.ledger.replay_today(&mut fresh, self.clock.as_ref()) {
            Ok(n) => {
                self.ledger_replayed = true;
                n
            }
            Err(DirectoryError::ClockUnsynced) => {
                // Counters recover via the menu-tick retry once time syncs.
                self.ledger_replayed = false;
                0
            }
            Err(e) => {
                warn!(error = %e, "ledger replay failed after swap");
                self.ledger_replayed = true;
                0
            }
        };
        let loaded = fresh.len();
        self.directory = fresh;
        self.selected = None;
        info!(loaded, replayed, "directory swapped");
        Ok(SwapStats { loaded, replayed })
    }

    /// Force the dispenser off; called when the event loop exits.
    pub fn shutdown(&mut self) {
        self.peripherals.dispenser.deactivate();
    }

    // ── event handlers ────────────────────────────────────────────────

    fn on_key(&mut self, key: char, now: Instant) {
        match self.state {
            SessionState::Menu => {
                if key == KEY_ACCEPT {
                    info!("entry mode: dni+pin");
                    self.enter(SessionState::EnterDni, now);
                }
            }
            SessionState::EnterDni => match key {
                KEY_ACCEPT => {
                    if self.dni_buffer.len() == DNI_LEN {
                        self.enter(SessionState::EnterPin, now);
                    } else {
                        self.error_notice(MSG_DNI_FORMAT, self.timeouts.format_notice, None, now);
                    }
                }
                KEY_CANCEL => self.enter(SessionState::Menu, now),
                KEY_DELETE => {
                    if self.dni_buffer.pop().is_some() {
                        self.entered_at = now;
                        self.render_state();
                    }
                }
                '0'..='9' if self.dni_buffer.len() < DNI_LEN => {
                    self.dni_buffer.push(key);
                    self.entered_at = now;
                    self.render_state();
                }
                _ => {}
            },
            SessionState::EnterPin => match key {
                KEY_ACCEPT => {
                    if self.pin_buffer.len() == PIN_LEN {
                        self.stage_dni_pin();
                        self.enter(SessionState::Validating, now);
                    } else {
                        self.error_notice(MSG_PIN_FORMAT, self.timeouts.format_notice, None, now);
                    }
                }
                KEY_CANCEL => {
                    self.pin_buffer.clear();
                    self.enter(SessionState::EnterDni, now);
                }
                KEY_DELETE => {
                    if self.pin_buffer.pop().is_some() {
                        self.entered_at = now;
                        self.render_state();
                    }
                }
                '0'..='9' if self.pin_buffer.len() < PIN_LEN => {
                    self.pin_buffer.push(key);
                    self.entered_at = now;
                    self.render_state();
                }
                _ => {}
            },
            // Cancellable only by timeout.
            SessionState::Validating => {}
            SessionState::ShowUser => {
                let remaining = self.selected.map(|s| s.remaining).unwrap_or(0);
                if key == KEY_ACCEPT && remaining > 0 {
                    self.record_extraction();
                    self.enter(SessionState::Dispensing, now);
                } else if key == KEY_CANCEL {
                    self.enter(SessionState::Menu, now);
                }
            }
            SessionState::Dispensing => {
                if key == KEY_STOP {
                    self.peripherals.dispenser.deactivate();
                    info!("dispense stopped by user");
                    self.show_notice(
                        MSG_DISPENSE_DONE,
                        self.timeouts.notice,
                        Some(SessionState::Menu),
                        now,
                    );
                }
            }
        }
    }

    fn on_tag(&mut self, uid: u32, now: Instant) {
        // Scanning is paused for the whole non-idle stretch; drop any stray
        // event that slips through anyway.
        if self.state != SessionState::Menu {
            return;
        }
        debug!(uid, "tag scanned");
        self.attempt = Some(AuthAttempt::Tag(uid));
        self.enter(SessionState::Validating, now);
    }

    fn on_tick(&mut self, now: Instant) {
        match self.state {
            SessionState::Menu => {
                if !self.ledger_replayed {
                    self.replay_ledger();
                }
            }
            SessionState::EnterDni | SessionState::EnterPin | SessionState::ShowUser => {
                if self.elapsed(now) > self.timeouts.input {
                    self.error_notice(
                        MSG_TIMEOUT,
                        self.timeouts.notice,
                        Some(SessionState::Menu),
                        now,
                    );
                }
            }
            SessionState::Validating => {
                if self.elapsed(now) > self.timeouts.validating_max {
                    self.error_notice(
                        MSG_TIMEOUT,
                        self.timeouts.notice,
                        Some(SessionState::Menu),
                        now,
                    );
                } else {
                    self.validate(now);
                }
            }
            SessionState::Dispensing => {
                if self.elapsed(now) > self.timeouts.dispense_max {
                    self.peripherals.dispenser.deactivate();
                    info!("maximum dispense window reached");
                    self.show_notice(
                        MSG_DISPENSE_MAX,
                        self.timeouts.notice,
                        Some(SessionState::Menu),
                        now,
                    );
                }
            }
        }
    }

    // ── validation & accounting ───────────────────────────────────────

    fn validate(&mut self, now: Instant) {
        let outcome = match self.attempt {
            Some(AuthAttempt::DniPin { dni, pin }) => self.directory.lookup_by_dni_pin(dni, pin),
            Some(AuthAttempt::Tag(uid)) => match self.directory.lookup_by_rfid(uid) {
                Some(index) => LookupOutcome::Found(index),
                None => LookupOutcome::NotFound,
            },
            None => LookupOutcome::NotFound,
        };
        match outcome {
            LookupOutcome::PinMismatch => self.error_notice(
                MSG_PIN_MISMATCH,
                self.timeouts.notice,
                Some(SessionState::Menu),
                now,
            ),
            LookupOutcome::NotFound => self.error_notice(
                MSG_NOT_FOUND,
                self.timeouts.notice,
                Some(SessionState::Menu),
                now,
            ),
            LookupOutcome::Found(index) => {
                let today = self.clock.today();
                if today.is_none() {
                    warn!("clock unsynced; quota failing open");
                }
                let daily_limit = self
                    .directory
                    .get(index)
                    .map(|u| u.daily_limit)
                    .unwrap_or(0);
                let remaining = self.directory.remaining_quota(index, today);
                self.selected = Some(SelectedUser {
                    index,
                    daily_limit,
                    remaining,
                });
                self.enter(SessionState::ShowUser, now);
            }
        }
    }

    fn record_extraction(&mut self) {
        let Some(selected) = self.selected else {
            return;
        };
        match self.clock.today() {
            Some(today) => {
                let dni = self
                    .directory
                    .get(selected.index)
                    .map(|u| u.dni)
                    .unwrap_or(0);
                self.directory.record_use(selected.index, today);
                // Durability is best-effort: the dispense proceeds either way.
                if let Err(e) = self.ledger.append(dni, self.clock.now()) {
                    error!(error = %e, "ledger append failed; dispense proceeds");
                }
            }
            None => warn!("clock unsynced; dispensing without recording"),
        }
    }

    fn replay_ledger(&mut self) {
        match self
            .ledger
            .replay_today(&mut self.directory, self.clock.as_ref())
        {
            Ok(replayed) => {
                self.ledger_replayed = true;
                if replayed > 0 {
                    info!(replayed, "boot-time usage recovery complete");
                }
                self.render_state();
            }
            // Keep retrying from the menu until time first syncs.
            Err(DirectoryError::ClockUnsynced) => {}
            Err(e) => {
                warn!(error = %e, "ledger replay failed; continuing without recovery");
                self.ledger_replayed = true;
            }
        }
    }

    // ── state plumbing ────────────────────────────────────────────────

    fn enter(&mut self, state: SessionState, now: Instant) {
        if state == SessionState::Menu {
            self.reset_session();
            self.peripherals.scanner.resume();
        } else {
            self.peripherals.scanner.pause();
        }
        self.state = state;
        self.entered_at = now;
        if state == SessionState::Dispensing {
            self.peripherals.dispenser.activate();
            info!("dispenser activated");
        }
        self.render_state();
    }

    fn reset_session(&mut self) {
        self.dni_buffer.clear();
        self.pin_buffer.clear();
        self.attempt = None;
        self.selected = None;
    }

    fn render_state(&mut self) {
        let view = match self.state {
            SessionState::Menu => View::Menu {
                today: self.clock.today(),
            },
            SessionState::EnterDni => View::EnterDni {
                buffer: self.dni_buffer.clone(),
            },
            SessionState::EnterPin => View::EnterPin {
                buffer: self.pin_buffer.clone(),
            },
            SessionState::Validating => View::Validating,
            SessionState::ShowUser => {
                let (daily_limit, remaining) = self
                    .selected
                    .map(|s| (s.daily_limit, s.remaining))
                    .unwrap_or((0, 0));
                View::UserInfo {
                    daily_limit,
                    remaining,
                }
            }
            SessionState::Dispensing => View::Dispensing,
        };
        self.peripherals.screen.show(&view);
    }

    fn stage_dni_pin(&mut self) {
        let dni = self.dni_buffer.parse::<u32>().unwrap_or(0);
        let pin = self.pin_buffer.parse::<u16>().unwrap_or(0);
        self.attempt = Some(AuthAttempt::DniPin { dni, pin });
    }

    fn tick_notice(&mut self, now: Instant) {
        let Some(notice) = &self.notice else {
            return;
        };
        if now < notice.expires_at {
            return;
        }
        let next = notice.next;
        self.notice = None;
        match next {
            Some(state) => self.enter(state, now),
            // Re-render without restamping the input-timeout clock.
            None => self.render_state(),
        }
    }

    fn error_notice(
        &mut self,
        message: &'static str,
        duration: Duration,
        next: Option<SessionState>,
        now: Instant,
    ) {
        self.peripherals.beeper.double_pulse();
        self.show_notice(message, duration, next, now);
    }

    fn show_notice(
        &mut self,
        message: &'static str,
        duration: Duration,
        next: Option<SessionState>,
        now: Instant,
    ) {
        self.peripherals.screen.show(&View::Notice {
            message: message.to_string(),
        });
        self.notice = Some(PendingNotice {
            expires_at: now + duration,
            next,
        });
    }

    #[inline]
    fn elapsed(&self, now: Instant) -> Duration {
        now.duration_since(self.entered_at)
    }
}
