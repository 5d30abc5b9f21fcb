//! Append-only extraction ledger.
//!
//! Fixed-size binary records survive restarts; replaying today's entries
//! into the directory restores the daily counters a crash would otherwise
//! lose. Old entries are purged by rewriting to a temp file and renaming, so
//! a torn ledger is never visible.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use surtidor_core::Clock;

use crate::error::DirectoryError;
use crate::store::Directory;

/// On-disk record size: `u32` dni + `i64` timestamp, little-endian.
pub const LEDGER_RECORD_LEN: usize = 12;

/// One extraction event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessLogEntry {
    pub dni: u32,
    pub timestamp: i64,
}

impl AccessLogEntry {
    fn to_bytes(self) -> [u8; LEDGER_RECORD_LEN] {
        let mut bytes = [0u8; LEDGER_RECORD_LEN];
        bytes[..4].copy_from_slice(&self.dni.to_le_bytes());
        bytes[4..].copy_from_slice(&self.timestamp.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8; LEDGER_RECORD_LEN]) -> Self {
        let mut dni = [0u8; 4];
        let mut timestamp = [0u8; 8];
        dni.copy_from_slice(&bytes[..4]);
        timestamp.copy_from_slice(&bytes[4..]);
        Self {
            dni: u32::from_le_bytes(dni),
            timestamp: i64::from_le_bytes(timestamp),
        }
    }
}

/// Handle to the on-disk ledger file.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Append one extraction event. Appends are strictly sequential within
    /// the process; each successful dispense writes exactly one entry.
    pub fn append(&self, dni: u32, timestamp: i64) -> Result<(), DirectoryError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&AccessLogEntry { dni, timestamp }.to_bytes())?;
        Ok(())
    }

    /// Replay today's entries into the directory.
    ///
    /// Entries for users no longer present are skipped; a trailing partial
    /// record is tolerated. A missing ledger means nothing to replay. Fails
    /// when the clock cannot report today or an existing ledger cannot be
    /// read.
    pub fn replay_today(
        &self,
        directory: &mut Directory,
        clock: &dyn Clock,
    ) -> Result<usize, DirectoryError> {
        let today = clock.today().ok_or(DirectoryError::ClockUnsynced)?;

        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut reader = BufReader::new(file);
        let mut buf = [0u8; LEDGER_RECORD_LEN];
        let mut replayed = 0usize;

        loop {
            match reader.read_exact(&mut buf) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let entry = AccessLogEntry::from_bytes(&buf);
            if clock.day_of(entry.timestamp) == Some(today)
                && let Some(index) = directory.lookup_by_dni(entry.dni)
            {
                directory.record_use(index, today);
                replayed += 1;
            }
        }

        info!(replayed, "daily usage recovered from ledger");
        Ok(replayed)
    }

    /// Drop every entry not dated today, rewriting via temp-then-rename.
    ///
    /// Refuses to run without a synchronized clock; a purge against an
    /// unknown "today" would drop valid entries. Returns `(kept, dropped)`;
    /// running twice in a row is a no-op the second time.
    pub fn purge_old(&self, clock: &dyn Clock) -> Result<(usize, usize), DirectoryError> {
        let today = clock.today().ok_or(DirectoryError::ClockUnsynced)?;

        let source = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok((0, 0)),
            Err(e) => return Err(e.into()),
        };

        let tmp_path = self.path.with_extension("tmp");
        let mut kept = 0usize;
        let mut dropped = 0usize;

        {
            let mut reader = BufReader::new(source);
            let mut dest = File::create(&tmp_path)?;
            let mut buf = [0u8; LEDGER_RECORD_LEN];
            loop {
                match reader.read_exact(&mut buf) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                    Err(e) => return Err(e.into()),
                }
                let entry = AccessLogEntry::from_bytes(&buf);
                if clock.day_of(entry.timestamp) == Some(today) {
                    dest.write_all(&buf)?;
                    kept += 1;
                } else {
                    dropped += 1;
                }
            }
            dest.flush()?;
        }

        // On Windows, rename fails if the destination exists; remove it first.
        #[cfg(target_os = "windows")]
        {
            let _ = std::fs::remove_file(&self.path);
        }
        std::fs::rename(&tmp_path, &self.path)?;

        info!(kept, dropped, "ledger purged");
        Ok((kept, dropped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use surtidor_core::ManualClock;

    use crate::record::UserRecord;

    fn temp_ledger() -> (tempfile::TempDir, Ledger) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("cambios.bin"));
        (dir, ledger)
    }

    #[test]
    fn append_then_replay_restores_counters() {
        let (_dir, ledger) = temp_ledger();
        let clock = ManualClock::synced_on(100);
        ledger
            .append(12_345_678, ManualClock::timestamp_on(100, 60))
            .unwrap();
        ledger
            .append(12_345_678, ManualClock::timestamp_on(100, 120))
            .unwrap();
        // Yesterday's entry must not count.
        ledger
            .append(12_345_678, ManualClock::timestamp_on(99, 60))
            .unwrap();

        let mut directory =
            Directory::from_records([UserRecord::new(12_345_678, 4321, 0, 5)], 10);
        let replayed = ledger.replay_today(&mut directory, &clock).unwrap();
        assert_eq!(replayed, 2);
        let user = directory.get(0).unwrap();
        assert_eq!(user.uses_today, 2);
        assert_eq!(user.last_use_day, 100);
    }

    #[test]
    fn replay_skips_absent_users() {
        let (_dir, ledger) = temp_ledger();
        let clock = ManualClock::synced_on(100);
        ledger
            .append(99_999_999, ManualClock::timestamp_on(100, 60))
            .unwrap();
        let mut directory = Directory::from_records([UserRecord::new(1, 1, 0, 5)], 10);
        assert_eq!(ledger.replay_today(&mut directory, &clock).unwrap(), 0);
    }

    #[test]
    fn replay_without_ledger_is_zero() {
        let (_dir, ledger) = temp_ledger();
        let clock = ManualClock::synced_on(100);
        let mut directory = Directory::empty(10);
        assert_eq!(ledger.replay_today(&mut directory, &clock).unwrap(), 0);
    }

    #[test]
    fn replay_requires_synced_clock() {
        let (_dir, ledger) = temp_ledger();
        let clock = ManualClock::new();
        let mut directory = Directory::empty(10);
        assert!(matches!(
            ledger.replay_today(&mut directory, &clock),
            Err(DirectoryError::ClockUnsynced)
        ));
    }

    #[test]
    fn purge_keeps_only_today_and_is_idempotent() {
        let (_dir, ledger) = temp_ledger();
        let clock = ManualClock::synced_on(100);
        ledger
            .append(1, ManualClock::timestamp_on(98, 0))
            .unwrap();
        ledger
            .append(2, ManualClock::timestamp_on(100, 0))
            .unwrap();
        ledger
            .append(3, ManualClock::timestamp_on(99, 0))
            .unwrap();

        assert_eq!(ledger.purge_old(&clock).unwrap(), (1, 2));
        // Second run finds nothing left to drop.
        assert_eq!(ledger.purge_old(&clock).unwrap(), (1, 0));

        // The surviving entry is the one from day 100.
        let clock_today = ManualClock::synced_on(100);
        let mut directory = Directory::from_records(
            [
                UserRecord::new(1, 1, 0, 5),
                UserRecord::new(2, 2, 0, 5),
                UserRecord::new(3, 3, 0, 5),
            ],
            10,
        );
        ledger.replay_today(&mut directory, &clock_today).unwrap();
        assert_eq!(directory.get(0).unwrap().uses_today, 0);
        assert_eq!(directory.get(1).unwrap().uses_today, 1);
        assert_eq!(directory.get(2).unwrap().uses_today, 0);
    }

    #[test]
    fn purge_refuses_without_clock() {
        let (_dir, ledger) = temp_ledger();
        ledger.append(1, 0).unwrap();
        let clock = ManualClock::new();
        assert!(matches!(
            ledger.purge_old(&clock),
            Err(DirectoryError::ClockUnsynced)
        ));
        // The refusal leaves the file untouched.
        assert!(ledger.exists());
    }

    #[test]
    fn purge_with_no_ledger_is_noop() {
        let (_dir, ledger) = temp_ledger();
        let clock = ManualClock::synced_on(5);
        assert_eq!(ledger.purge_old(&clock).unwrap(), (0, 0));
        assert!(!ledger.exists());
    }

    #[test]
    fn trailing_partial_record_is_tolerated() {
        let (_dir, ledger) = temp_ledger();
        let clock = ManualClock::synced_on(100);
        ledger
            .append(1, ManualClock::timestamp_on(100, 0))
            .unwrap();
        // Simulate a crash mid-append.
        let mut file = OpenOptions::new()
            .append(true)
            .open(ledger.path())
            .unwrap();
        file.write_all(&[0xAB, 0xCD]).unwrap();

        let mut directory = Directory::from_records([UserRecord::new(1, 1, 0, 5)], 10);
        assert_eq!(ledger.replay_today(&mut directory, &clock).unwrap(), 1);
    }
}
