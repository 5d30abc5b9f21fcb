//! User records and the raw snapshot wire format.

use serde::Deserialize;

/// Sentinel for "this record has never been used".
pub const NEVER_USED: i16 = -1;

/// One authorized user, as held in memory.
///
/// `uses_today` is only meaningful while `last_use_day` equals the current
/// day of year; any other value means the counter is stale and reads as 0 on
/// the next access (lazy rollover).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserRecord {
    /// Tag UID packed into a `u32`; 0 = no tag assigned.
    pub rfid: u32,
    pub dni: u32,
    pub pin: u16,
    /// Extractions allowed per day.
    pub daily_limit: u8,
    /// Extractions performed on `last_use_day`.
    pub uses_today: u8,
    /// Day of year of the last use, or [`NEVER_USED`].
    pub last_use_day: i16,
}

impl UserRecord {
    /// Build a fresh record with clean counters.
    pub fn new(dni: u32, pin: u16, rfid: u32, daily_limit: u8) -> Self {
        Self {
            rfid,
            dni,
            pin,
            daily_limit,
            uses_today: 0,
            last_use_day: NEVER_USED,
        }
    }
}

/// Snapshot wire format for one user.
///
/// The upstream sheet export is sloppy: `extracciones` arrives as a number
/// or a numeric string depending on the cell format, and `rfid` is a hex
/// string. Every field defaults so a partially filled row still parses.
#[derive(Debug, Deserialize)]
pub(crate) struct RawUser {
    #[serde(default)]
    dni: u32,
    #[serde(default)]
    pin: u16,
    #[serde(default)]
    extracciones: Limit,
    #[serde(default)]
    rfid: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Limit {
    Number(i64),
    Text(String),
}

impl Default for Limit {
    fn default() -> Self {
        Limit::Number(0)
    }
}

impl Limit {
    fn value(&self) -> u8 {
        let n = match self {
            Limit::Number(n) => *n,
            Limit::Text(s) => s.trim().parse::<i64>().unwrap_or(0),
        };
        n.clamp(0, u8::MAX as i64) as u8
    }
}

impl RawUser {
    /// Parse one framed JSON object into a [`UserRecord`].
    ///
    /// Returns `None` for malformed JSON and for records carrying neither a
    /// DNI nor a tag (nothing could ever look them up).
    pub(crate) fn parse(bytes: &[u8]) -> Option<UserRecord> {
        let raw: RawUser = serde_json::from_slice(bytes).ok()?;
        let rfid = u32::from_str_radix(raw.rfid.trim(), 16).unwrap_or(0);
        if raw.dni == 0 && rfid == 0 {
            return None;
        }
        Some(UserRecord::new(raw.dni, raw.pin, rfid, raw.extracciones.value()))
    }
}
