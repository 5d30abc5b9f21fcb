//! Default configuration values.
//!
//! Centralized default constants for use across all crates.

// ============================================================================
// Session Timeouts
// ============================================================================

/// Input timeout while waiting for keys (DNI/PIN entry, user screen), seconds.
pub const DEFAULT_INPUT_TIMEOUT_SECS: u64 = 30;
/// Maximum dispensing window before the relay is forced off, seconds.
pub const DEFAULT_DISPENSE_MAX_SECS: u64 = 10;
/// Maximum time allowed in the validating state, seconds.
pub const DEFAULT_VALIDATING_MAX_SECS: u64 = 30;
/// How long an error/completion notice stays on screen, milliseconds.
pub const DEFAULT_NOTICE_MS: u64 = 2000;
/// How long a wrong-digit-count notice stays on screen, milliseconds.
pub const DEFAULT_FORMAT_NOTICE_MS: u64 = 1500;
/// Controller tick period, milliseconds.
pub const DEFAULT_TICK_MS: u64 = 100;

// ============================================================================
// Input Alphabet
// ============================================================================

/// Accept / select key (also starts DNI+PIN entry from the menu).
pub const KEY_ACCEPT: char = 'A';
/// Backspace key during DNI/PIN entry.
pub const KEY_DELETE: char = 'B';
/// Cancel key.
pub const KEY_CANCEL: char = 'C';
/// Stop-dispense key.
pub const KEY_STOP: char = 'D';

/// Exact digit count a DNI must have before accept.
pub const DNI_LEN: usize = 8;
/// Exact digit count a PIN must have before accept.
pub const PIN_LEN: usize = 4;

// ============================================================================
// Directory Defaults
// ============================================================================

/// Maximum user records held in memory.
pub const DEFAULT_MAX_USERS: usize = 3000;
/// Per-record buffer for the streaming snapshot loader. A record larger than
/// this is skipped, bounding peak parse memory to one record.
pub const SNAPSHOT_RECORD_BUFFER: usize = 256;

// ============================================================================
// Sync Defaults
// ============================================================================

/// Period of the background directory sync cycle, seconds.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 100;
/// Delay before the first sync cycle after boot, seconds.
pub const DEFAULT_SYNC_STARTUP_DELAY_SECS: u64 = 10;
/// HTTP timeout for the snapshot fetch, seconds.
pub const DEFAULT_SNAPSHOT_HTTP_TIMEOUT_SECS: u64 = 15;
/// HTTP timeout for the version query, seconds.
pub const DEFAULT_VERSION_HTTP_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// Storage Defaults
// ============================================================================

/// Persisted directory snapshot file name (inside the data directory).
pub const SNAPSHOT_FILE: &str = "usuarios.json";
/// Append-only extraction ledger file name.
pub const LEDGER_FILE: &str = "cambios.bin";
/// Local key-value store file name.
pub const KV_FILE: &str = "kv.json";
/// Key under which the loaded snapshot version is persisted.
pub const VERSION_KEY: &str = "directory_version";

// ============================================================================
// Clock Defaults
// ============================================================================

/// Default UTC offset of the kiosk, minutes (UTC-3).
pub const DEFAULT_UTC_OFFSET_MINS: i32 = -180;
/// Years before this read as "clock never synchronized".
pub const MIN_SYNCED_YEAR: i32 = 2020;
