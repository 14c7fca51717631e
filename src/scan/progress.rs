//! Simulated scan progress
//!
//! The scan is one atomic request, so progress is synthesized: a spawned task
//! adds a random 0-15% every tick until it reaches the 90% cap. The owner
//! cancels it the moment the real response arrives and reports 100% itself.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Cap applied until the real response arrives
pub const SIMULATED_CAP: f64 = 90.0;

const MAX_STEP: f64 = 15.0;

/// Receives progress percentages (0 to 100)
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

pub struct ProgressTicker {
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    /// Start ticking on the current tokio runtime
    pub fn start(tick: Duration, on_progress: ProgressCallback) -> Self {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + tick, tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut progress = 0.0_f64;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let step = rand::thread_rng().gen_range(0.0..MAX_STEP);
                        progress = next_progress(progress, step);
                        on_progress(progress.round() as u8);
                        if progress >= SIMULATED_CAP {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            cancel_token,
            handle: Some(handle),
        }
    }

    /// Stop the ticker and wait for it, so no tick lands after this returns
    pub async fn finish(mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("[Progress] Ticker task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Advance by `step`, never exceeding the cap, never going backwards
pub fn next_progress(current: f64, step: f64) -> f64 {
    (current + step.max(0.0)).min(SIMULATED_CAP)
}
