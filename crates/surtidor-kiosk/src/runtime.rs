//! The real-time session loop.
//!
//! One task owns the controller and consumes everything that can touch it:
//! input events, timer ticks and swap requests from the sync service. The
//! swap therefore executes in the controller's own task, and the idle check
//! and the directory replacement cannot be separated by a state change.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use surtidor_core::Event;
use surtidor_session::SessionController;
use surtidor_sync::{SwapOutcome, SwapRejected, SwapRequest};

/// Drive the controller until shutdown.
pub async fn run_session_loop(
    mut controller: SessionController,
    mut input_rx: mpsc::Receiver<Event>,
    mut swap_rx: mpsc::Receiver<SwapRequest>,
    snapshot_path: PathBuf,
    tick: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                controller.shutdown();
                info!("session loop stopped");
                return;
            }

            Some(request) = swap_rx.recv() => {
                apply_swap(&mut controller, request, &snapshot_path);
            }

            Some(event) = input_rx.recv() => {
                controller.handle_event(event, Instant::now());
            }

            _ = ticker.tick() => {
                controller.handle_event(Event::Tick, Instant::now());
            }
        }
    }
}

/// Answer one swap request. Only an idle controller swaps; a busy one
/// rejects immediately so the sync service can defer to its next cycle.
fn apply_swap(controller: &mut SessionController, request: SwapRequest, snapshot_path: &Path) {
    let result = if controller.is_idle() {
        controller
            .reload_directory(snapshot_path)
            .map(|stats| SwapOutcome {
                loaded: stats.loaded,
                replayed: stats.replayed,
            })
            .map_err(|e| SwapRejected::Failed(e.to_string()))
    } else {
        debug!(version = request.version, "swap requested while busy");
        Err(SwapRejected::Busy)
    };
    let _ = request.ack.send(result);
}
