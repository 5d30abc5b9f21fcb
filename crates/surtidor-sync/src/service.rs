//! The background sync cycle and the swap handshake.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use surtidor_core::Clock;
use surtidor_directory::Ledger;

use crate::remote::RemoteDirectory;
use crate::version::VersionStore;

/// Result of a completed swap, reported back on the ack channel.
#[derive(Debug, Clone, Copy)]
pub struct SwapOutcome {
    pub loaded: usize,
    pub replayed: usize,
}

/// Why a requested swap did not happen.
#[derive(Debug, Clone)]
pub enum SwapRejected {
    /// The controller is not at the idle menu. The service defers to its
    /// next cycle; it never retries within the same cycle.
    Busy,
    /// The controller tried and failed to load the new snapshot.
    Failed(String),
}

/// One swap request travelling from the sync service to the session loop.
///
/// The swap itself executes inside the controller's own task, so there is no
/// instant between "idle check" and "swap" in which the controller could
/// leave the menu.
pub struct SwapRequest {
    /// Version the freshly persisted snapshot claims to be.
    pub version: u32,
    pub ack: oneshot::Sender<Result<SwapOutcome, SwapRejected>>,
}

/// Build the single-slot handshake channel between the sync service and the
/// session loop.
pub fn swap_channel() -> (mpsc::Sender<SwapRequest>, mpsc::Receiver<SwapRequest>) {
    mpsc::channel(1)
}

/// Tuning for the sync service.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Where the persisted snapshot lives.
    pub snapshot_path: PathBuf,
    /// Period between cycles.
    pub interval: Duration,
    /// Delay before the first cycle after boot.
    pub startup_delay: Duration,
}

/// The background synchronization service.
///
/// Never touches the live directory: persisted state is its own, the
/// in-memory table belongs to the controller and changes only through the
/// swap handshake.
pub struct SyncService {
    remote: Arc<dyn RemoteDirectory>,
    versions: VersionStore,
    ledger: Ledger,
    clock: Arc<dyn Clock>,
    swap_tx: mpsc::Sender<SwapRequest>,
    options: SyncOptions,
}

impl SyncService {
    pub fn new(
        remote: Arc<dyn RemoteDirectory>,
        versions: VersionStore,
        ledger: Ledger,
        clock: Arc<dyn Clock>,
        swap_tx: mpsc::Sender<SwapRequest>,
        options: SyncOptions,
    ) -> Self {
        Self {
            remote,
            versions,
            ledger,
            clock,
            swap_tx,
            options,
        }
    }

    /// Run until the shutdown token fires.
    pub async fn run(self, shutdown: CancellationToken) {
        // Stagger the first cycle so boot-time work settles first.
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(self.options.startup_delay) => {}
        }

        let mut ticker = tokio::time::interval(self.options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = self.options.interval.as_secs(),
            "directory sync service started"
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("directory sync service stopped");
                    return;
                }

                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }
    }

    /// One full maintenance cycle: purge, version compare, fetch, swap.
    pub async fn run_cycle(&self) {
        self.purge_ledger().await;

        let local = self.versions.load();
        let remote = match self.remote.fetch_version().await {
            Ok(version) => version,
            Err(e) => {
                warn!(error = %e, "remote version query failed");
                return;
            }
        };
        if remote <= local {
            debug!(local, remote, "directory up to date");
            return;
        }
        info!(local, remote, "directory update available");

        let tmp_path = self.options.snapshot_path.with_extension("download");
        if let Err(e) = self.remote.fetch_snapshot(&tmp_path).await {
            warn!(error = %e, "snapshot fetch failed; keeping current directory");
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return;
        }

        // On Windows, rename fails if the destination exists; remove it first.
        #[cfg(target_os = "windows")]
        {
            let _ = tokio::fs::remove_file(&self.options.snapshot_path).await;
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.options.snapshot_path).await {
            error!(error = %e, "failed to replace persisted snapshot");
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return;
        }

        self.request_swap(remote).await;
    }

    async fn purge_ledger(&self) {
        if !self.clock.is_synced() || !self.ledger.exists() {
            return;
        }
        let ledger = self.ledger.clone();
        let clock = self.clock.clone();
        match tokio::task::spawn_blocking(move || ledger.purge_old(clock.as_ref())).await {
            Ok(Ok((kept, dropped))) => debug!(kept, dropped, "ledger purge complete"),
            Ok(Err(e)) => warn!(error = %e, "ledger purge failed"),
            Err(e) => warn!(error = %e, "ledger purge task aborted"),
        }
    }

    /// Ask the session loop to swap the live directory in. The persisted
    /// version only advances once the controller confirms the swap.
    async fn request_swap(&self, version: u32) {
        let (ack_tx, ack_rx) = oneshot::channel();
        let request = SwapRequest {
            version,
            ack: ack_tx,
        };
        if self.swap_tx.try_send(request).is_err() {
            debug!("swap request already pending; deferring");
            return;
        }
        match ack_rx.await {
            Ok(Ok(outcome)) => {
                if let Err(e) = self.versions.store(version) {
                    error!(error = %e, "failed to persist directory version");
                    return;
                }
                info!(
                    version,
                    loaded = outcome.loaded,
                    replayed = outcome.replayed,
                    "directory updated"
                );
            }
            Ok(Err(SwapRejected::Busy)) => {
                info!("controller busy; swap deferred to next cycle");
            }
            Ok(Err(SwapRejected::Failed(e))) => {
                error!(error = %e, "directory swap failed");
            }
            Err(_) => warn!("swap ack dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use surtidor_core::ManualClock;

    use crate::error::SyncError;

    struct MockRemote {
        version: u32,
        snapshot: String,
        fail_fetch: AtomicBool,
        fail_version: AtomicBool,
    }

    impl MockRemote {
        fn new(version: u32, snapshot: &str) -> Self {
            Self {
                version,
                snapshot: snapshot.to_string(),
                fail_fetch: AtomicBool::new(false),
                fail_version: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl RemoteDirectory for MockRemote {
        async fn fetch_version(&self) -> Result<u32, SyncError> {
            if self.fail_version.load(Ordering::SeqCst) {
                return Err(SyncError::Http("version endpoint unreachable".into()));
            }
            Ok(self.version)
        }

        async fn fetch_snapshot(&self, dest: &Path) -> Result<u64, SyncError> {
            if self.fail_fetch.load(Ordering::SeqCst) {
                return Err(SyncError::Http("snapshot endpoint unreachable".into()));
            }
            tokio::fs::write(dest, &self.snapshot).await?;
            Ok(self.snapshot.len() as u64)
        }
    }

    struct Fixture {
        service: SyncService,
        swap_rx: mpsc::Receiver<SwapRequest>,
        snapshot_path: PathBuf,
        versions: VersionStore,
        ledger: Ledger,
        _tmp: tempfile::TempDir,
    }

    fn fixture(remote: MockRemote, clock: ManualClock) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot_path = tmp.path().join("usuarios.json");
        let versions = VersionStore::new(tmp.path().join("kv.json"));
        let ledger = Ledger::new(tmp.path().join("cambios.bin"));
        let (swap_tx, swap_rx) = swap_channel();
        let service = SyncService::new(
            Arc::new(remote),
            versions.clone(),
            ledger.clone(),
            Arc::new(clock),
            swap_tx,
            SyncOptions {
                snapshot_path: snapshot_path.clone(),
                interval: Duration::from_secs(100),
                startup_delay: Duration::from_secs(0),
            },
        );
        Fixture {
            service,
            swap_rx,
            snapshot_path,
            versions,
            ledger,
            _tmp: tmp,
        }
    }

    /// Answer every swap request with the given response.
    fn auto_ack(
        mut swap_rx: mpsc::Receiver<SwapRequest>,
        response: Result<SwapOutcome, SwapRejected>,
    ) -> tokio::task::JoinHandle<Vec<u32>> {
        tokio::spawn(async move {
            let mut versions = Vec::new();
            while let Some(request) = swap_rx.recv().await {
                versions.push(request.version);
                let _ = request.ack.send(response.clone());
            }
            versions
        })
    }

    const SNAPSHOT_V2: &str = r#"[{"dni": 1, "pin": 1, "extracciones": 3, "rfid": ""}]"#;

    #[tokio::test]
    async fn up_to_date_directory_requests_nothing() {
        let mut fx = fixture(MockRemote::new(1, SNAPSHOT_V2), ManualClock::synced_on(10));
        fx.versions.store(1).unwrap();
        fx.service.run_cycle().await;
        assert!(fx.swap_rx.try_recv().is_err());
        assert!(!fx.snapshot_path.exists());
    }

    #[tokio::test]
    async fn confirmed_swap_persists_the_new_version() {
        let fx = fixture(MockRemote::new(2, SNAPSHOT_V2), ManualClock::synced_on(10));
        let ack = auto_ack(
            fx.swap_rx,
            Ok(SwapOutcome {
                loaded: 1,
                replayed: 0,
            }),
        );
        fx.service.run_cycle().await;
        assert_eq!(fx.versions.load(), 2);
        assert_eq!(
            std::fs::read_to_string(&fx.snapshot_path).unwrap(),
            SNAPSHOT_V2
        );
        drop(fx.service);
        assert_eq!(ack.await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn busy_controller_defers_the_version_bump() {
        let fx = fixture(MockRemote::new(2, SNAPSHOT_V2), ManualClock::synced_on(10));
        let _ack = auto_ack(fx.swap_rx, Err(SwapRejected::Busy));
        fx.service.run_cycle().await;
        // The persisted snapshot was replaced, but the version must not
        // advance until the swap actually completes.
        assert!(fx.snapshot_path.exists());
        assert_eq!(fx.versions.load(), 0);
    }

    #[tokio::test]
    async fn fetch_failure_leaves_everything_untouched() {
        let remote = MockRemote::new(2, SNAPSHOT_V2);
        remote.fail_fetch.store(true, Ordering::SeqCst);
        let mut fx = fixture(remote, ManualClock::synced_on(10));
        std::fs::write(&fx.snapshot_path, "old snapshot").unwrap();
        fx.service.run_cycle().await;
        assert_eq!(
            std::fs::read_to_string(&fx.snapshot_path).unwrap(),
            "old snapshot"
        );
        assert_eq!(fx.versions.load(), 0);
        assert!(fx.swap_rx.try_recv().is_err());
        assert!(!fx.snapshot_path.with_extension("download").exists());
    }

    #[tokio::test]
    async fn version_query_failure_is_soft() {
        let remote = MockRemote::new(2, SNAPSHOT_V2);
        remote.fail_version.store(true, Ordering::SeqCst);
        let mut fx = fixture(remote, ManualClock::synced_on(10));
        fx.service.run_cycle().await;
        assert!(fx.swap_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn cycle_purges_stale_ledger_entries() {
        let mut fx = fixture(MockRemote::new(0, SNAPSHOT_V2), ManualClock::synced_on(100));
        fx.ledger
            .append(1, ManualClock::timestamp_on(99, 0))
            .unwrap();
        fx.ledger
            .append(2, ManualClock::timestamp_on(100, 0))
            .unwrap();
        fx.service.run_cycle().await;
        let len = std::fs::metadata(fx.ledger.path()).unwrap().len();
        assert_eq!(len, surtidor_directory::LEDGER_RECORD_LEN as u64);
        assert!(fx.swap_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsynced_clock_skips_the_purge() {
        let fx = fixture(MockRemote::new(0, SNAPSHOT_V2), ManualClock::new());
        fx.ledger
            .append(1, ManualClock::timestamp_on(1, 0))
            .unwrap();
        fx.service.run_cycle().await;
        let len = std::fs::metadata(fx.ledger.path()).unwrap().len();
        assert_eq!(len, surtidor_directory::LEDGER_RECORD_LEN as u64);
    }
}
