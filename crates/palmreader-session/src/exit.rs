//! "Press back again to exit" counter.
//!
//! Counts back signals received on the dashboard and drops back to zero
//! once [`EXIT_WINDOW`] passes without another one. The count is advisory:
//! presentation decides what to show, and the host decides whether to quit.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

/// Quiet period after which the counter resets.
pub const EXIT_WINDOW: Duration = Duration::from_secs(2);

/// Debounced back-press counter.
#[derive(Clone)]
pub struct ExitConfirmation {
    inner: Arc<Inner>,
}

struct Inner {
    presses: watch::Sender<u32>,
    generation: AtomicU64,
    window: Duration,
}

impl Default for ExitConfirmation {
    fn default() -> Self {
        Self::new(EXIT_WINDOW)
    }
}

impl ExitConfirmation {
    pub fn new(window: Duration) -> Self {
        let (presses, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                presses,
                generation: AtomicU64::new(0),
                window,
            }),
        }
    }

    /// Record one back press and return the new count.
    ///
    /// Schedules a reset `window` from now; a later press supersedes it.
    /// Must be called from within a tokio runtime for the reset to happen.
    pub fn register_back(&self) -> u32 {
        let mut count = 0;
        let mut generation = 0;
        self.inner.presses.send_modify(|presses| {
            *presses += 1;
            count = *presses;
            generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        });
        debug!(presses = count, "back press registered");

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let inner = Arc::clone(&self.inner);
                runtime.spawn(async move {
                    tokio::time::sleep(inner.window).await;
                    inner.presses.send_if_modified(|presses| {
                        let stale = inner.generation.load(Ordering::SeqCst) != generation;
                        if stale || *presses == 0 {
                            return false;
                        }
                        *presses = 0;
                        true
                    });
                });
            }
            Err(_) => warn!("no runtime; back-press counter will not reset"),
        }

        count
    }

    /// Current press count.
    pub fn presses(&self) -> u32 {
        *self.inner.presses.borrow()
    }

    /// Whether presentation should prompt "press back again to exit".
    pub fn should_prompt(&self) -> bool {
        self.presses() > 1
    }

    /// Watch the counter change.
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.inner.presses.subscribe()
    }
}

// ── tests ────────────────────────────────────────────────────────────
