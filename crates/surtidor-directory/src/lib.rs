//! User directory and quota ledger.
//!
//! The directory is a bounded, fully memory-resident table of authorized
//! users, loaded by streaming the persisted JSON snapshot one record at a
//! time. The ledger is a durable append-only log of extraction events; it is
//! the source of truth for recovering daily counters after a restart.

mod error;
mod ledger;
mod record;
mod store;

pub use error::DirectoryError;
pub use ledger::{AccessLogEntry, LEDGER_RECORD_LEN, Ledger};
pub use record::{NEVER_USED, UserRecord};
pub use store::{Directory, LookupOutcome};
