//! Directory synchronization service.
//!
//! A low-priority background task that keeps the persisted snapshot in step
//! with the remote source of truth: it purges stale ledger entries, compares
//! version numbers, stream-fetches updated snapshots, and asks the session
//! controller over a single-slot handshake channel to swap the live
//! directory once it is idle.

mod error;
mod remote;
mod service;
mod version;

pub use error::SyncError;
pub use remote::{HttpRemote, RemoteDirectory};
pub use service::{
    SwapOutcome, SwapRejected, SwapRequest, SyncOptions, SyncService, swap_channel,
};
pub use version::VersionStore;
