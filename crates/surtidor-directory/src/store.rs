//! The in-memory directory and its streaming snapshot loader.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::{info, warn};

use surtidor_core::defaults::SNAPSHOT_RECORD_BUFFER;

use crate::error::DirectoryError;
use crate::record::{RawUser, UserRecord};

/// Outcome of a DNI+PIN lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Credentials match; index into the directory.
    Found(usize),
    /// The DNI exists but the PIN does not match.
    PinMismatch,
    /// No record carries this DNI.
    NotFound,
}

/// Bounded in-memory table of authorized users.
///
/// Lookup is a linear scan; the table tops out in the low thousands and is
/// consulted once per authentication attempt. The table is owned by the
/// session controller; the sync service never touches it directly.
#[derive(Debug)]
pub struct Directory {
    users: Vec<UserRecord>,
    capacity: usize,
}

impl Directory {
    /// Create an empty directory (e.g. first boot before any snapshot).
    pub fn empty(capacity: usize) -> Self {
        Self {
            users: Vec::new(),
            capacity,
        }
    }

    /// Build a directory from pre-parsed records, truncating at capacity.
    pub fn from_records(records: impl IntoIterator<Item = UserRecord>, capacity: usize) -> Self {
        let users: Vec<UserRecord> = records.into_iter().take(capacity).collect();
        Self { users, capacity }
    }

    /// Stream-load the persisted snapshot.
    ///
    /// Records are framed by balanced braces inside a bounded per-record
    /// buffer, so peak parse memory is one record regardless of snapshot
    /// size. A record that fails to parse, carries no identity, or exceeds
    /// the buffer is skipped without aborting the stream. Loading stops at
    /// `capacity`.
    pub fn load_from_snapshot(path: &Path, capacity: usize) -> Result<Self, DirectoryError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut users: Vec<UserRecord> = Vec::new();
        let mut buf: Vec<u8> = Vec::with_capacity(SNAPSHOT_RECORD_BUFFER);
        let mut capturing = false;
        let mut depth = 0usize;
        let mut skipped = 0usize;

        for byte in reader.bytes() {
            let c = byte?;

            if users.len() >= capacity {
                warn!(capacity, "snapshot truncated at directory capacity");
                break;
            }

            if c == b'{' {
                if !capturing {
                    capturing = true;
                    buf.clear();
                    depth = 0;
                }
                depth += 1;
            }

            if capturing {
                if buf.len() < SNAPSHOT_RECORD_BUFFER - 1 {
                    buf.push(c);
                } else {
                    warn!("record exceeds parse buffer, skipping");
                    capturing = false;
                    skipped += 1;
                    continue;
                }
            }

            if c == b'}' && capturing {
                depth -= 1;
                if depth == 0 {
                    match RawUser::parse(&buf) {
                        Some(user) => users.push(user),
                        None => {
                            warn!("unparseable or identity-less record skipped");
                            skipped += 1;
                        }
                    }
                    capturing = false;
                }
            }
        }

        info!(count = users.len(), skipped, "directory loaded from snapshot");
        Ok(Self { users, capacity })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&UserRecord> {
        self.users.get(index)
    }

    /// Look up by DNI, then verify the PIN. First match by DNI wins; the
    /// snapshot is expected not to carry duplicate DNIs.
    pub fn lookup_by_dni_pin(&self, dni: u32, pin: u16) -> LookupOutcome {
        for (i, user) in self.users.iter().enumerate() {
            if user.dni == dni {
                return if user.pin == pin {
                    LookupOutcome::Found(i)
                } else {
                    warn!(dni, "dni found but pin mismatch");
                    LookupOutcome::PinMismatch
                };
            }
        }
        LookupOutcome::NotFound
    }

    pub fn lookup_by_dni(&self, dni: u32) -> Option<usize> {
        self.users.iter().position(|u| u.dni == dni)
    }

    /// Look up by tag value. Zero is never a valid tag.
    pub fn lookup_by_rfid(&self, tag: u32) -> Option<usize> {
        if tag == 0 {
            return None;
        }
        self.users.iter().position(|u| u.rfid == tag)
    }

    /// Extractions remaining today for the given record.
    ///
    /// When the clock cannot report today, this fails open: the full daily
    /// limit is returned and the counters are left untouched. Otherwise a
    /// stale counter is rolled over in place before computing the remainder.
    pub fn remaining_quota(&mut self, index: usize, today: Option<i16>) -> u8 {
        let Some(user) = self.users.get_mut(index) else {
            return 0;
        };
        let Some(today) = today else {
            // Fail open: availability over restriction while unsynced.
            return user.daily_limit;
        };
        if user.last_use_day != today {
            user.uses_today = 0;
            user.last_use_day = today;
        }
        user.daily_limit.saturating_sub(user.uses_today)
    }

    /// Count one extraction for the given record, rolling the counter over
    /// first if the stored day is stale.
    pub fn record_use(&mut self, index: usize, today: i16) {
        let Some(user) = self.users.get_mut(index) else {
            return;
        };
        if user.last_use_day != today {
            user.uses_today = 0;
            user.last_use_day = today;
        }
        user.uses_today = user.uses_today.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::record::NEVER_USED;

    fn sample() -> Directory {
        Directory::from_records(
            [
                UserRecord::new(12_345_678, 4321, 0xDA98_3C03, 5),
                UserRecord::new(87_654_321, 1111, 0, 2),
            ],
            10,
        )
    }

    fn write_snapshot(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usuarios.json");
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_json_array() {
        let (_dir, path) = write_snapshot(
            r#"[
  {"dni": 12345678, "pin": 4321, "extracciones": 5, "rfid": "DA983C03"},
  {"dni": 87654321, "pin": 1111, "extracciones": "2", "rfid": ""}
]"#,
        );
        let directory = Directory::load_from_snapshot(&path, 10).unwrap();
        assert_eq!(directory.len(), 2);
        let first = directory.get(0).unwrap();
        assert_eq!(first.rfid, 0xDA98_3C03);
        assert_eq!(first.uses_today, 0);
        assert_eq!(first.last_use_day, NEVER_USED);
    }

    #[test]
    fn bad_record_does_not_abort_stream() {
        let (_dir, path) = write_snapshot(
            r#"[
  {"pin": 9999, "extracciones": 5},
  {"dni": 1, "pin": 2, "extracciones": 3, "rfid": ""}
]"#,
        );
        let directory = Directory::load_from_snapshot(&path, 10).unwrap();
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.get(0).unwrap().dni, 1);
    }

    #[test]
    fn oversized_record_is_skipped() {
        let filler = "x".repeat(400);
        let snapshot = format!(
            r#"[{{"dni": 7, "pin": 1, "extracciones": 1, "comentario": "{filler}"}},
               {{"dni": 8, "pin": 2, "extracciones": 1, "rfid": ""}}]"#
        );
        let (_dir, path) = write_snapshot(&snapshot);
        let directory = Directory::load_from_snapshot(&path, 10).unwrap();
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.get(0).unwrap().dni, 8);
    }

    #[test]
    fn truncates_at_capacity() {
        let (_dir, path) = write_snapshot(
            r#"[
  {"dni": 1, "pin": 1, "extracciones": 1, "rfid": ""},
  {"dni": 2, "pin": 2, "extracciones": 1, "rfid": ""},
  {"dni": 3, "pin": 3, "extracciones": 1, "rfid": ""}
]"#,
        );
        let directory = Directory::load_from_snapshot(&path, 2).unwrap();
        assert_eq!(directory.len(), 2);
        assert!(directory.lookup_by_dni(3).is_none());
    }

    #[test]
    fn missing_snapshot_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Directory::load_from_snapshot(&dir.path().join("nope.json"), 10);
        assert!(matches!(err, Err(DirectoryError::Io(_))));
    }

    #[test]
    fn dni_pin_lookup_outcomes() {
        let directory = sample();
        assert_eq!(
            directory.lookup_by_dni_pin(12_345_678, 4321),
            LookupOutcome::Found(0)
        );
        assert_eq!(
            directory.lookup_by_dni_pin(12_345_678, 9999),
            LookupOutcome::PinMismatch
        );
        assert_eq!(
            directory.lookup_by_dni_pin(55_555_555, 4321),
            LookupOutcome::NotFound
        );
    }

    #[test]
    fn rfid_lookup_rejects_zero() {
        let directory = sample();
        assert_eq!(directory.lookup_by_rfid(0xDA98_3C03), Some(0));
        assert_eq!(directory.lookup_by_rfid(0), None);
    }

    #[test]
    fn quota_rollover() {
        let mut directory = Directory::from_records(
            [UserRecord {
                rfid: 0,
                dni: 1,
                pin: 1,
                daily_limit: 5,
                uses_today: 2,
                last_use_day: 100,
            }],
            10,
        );
        assert_eq!(directory.remaining_quota(0, Some(100)), 3);
        assert_eq!(directory.remaining_quota(0, Some(101)), 5);
        assert_eq!(directory.get(0).unwrap().uses_today, 0);
        assert_eq!(directory.get(0).unwrap().last_use_day, 101);
    }

    #[test]
    fn quota_fails_open_when_unsynced() {
        let mut directory = Directory::from_records(
            [UserRecord {
                rfid: 0,
                dni: 1,
                pin: 1,
                daily_limit: 5,
                uses_today: 4,
                last_use_day: 100,
            }],
            10,
        );
        assert_eq!(directory.remaining_quota(0, None), 5);
        // Counters untouched by the fail-open path.
        assert_eq!(directory.get(0).unwrap().uses_today, 4);
    }

    #[test]
    fn record_use_rolls_over_first() {
        let mut directory = Directory::from_records(
            [UserRecord {
                rfid: 0,
                dni: 1,
                pin: 1,
                daily_limit: 5,
                uses_today: 3,
                last_use_day: 99,
            }],
            10,
        );
        directory.record_use(0, 100);
        let user = directory.get(0).unwrap();
        assert_eq!(user.uses_today, 1);
        assert_eq!(user.last_use_day, 100);
    }
}
