use std::{
    future::Future,
    sync::{Arc, Mutex},
};

use tokio::{
    runtime::Handle,
    sync::Mutex as AsyncMutex,
    time::{self, Duration},
};
use tokio_util::sync::CancellationToken;

use crate::utils::sync::lock;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = false;

use crate::{log_debug, log_warn};

#[derive(Default)]
struct PendingSlot {
    generation: u64,
    token: Option<CancellationToken>,
}

/// Debounces writes to one resource.
///
/// Each `request` replaces the pending one and fires `delay` after the last
/// call in a burst. Fired writes hold a write lock, so at most one is in
/// flight. Pending writes die with the runtime.
#[derive(Clone)]
pub struct CoalescingScheduler {
    name: &'static str,
    delay: Duration,
    pending: Arc<Mutex<PendingSlot>>,
    write_lock: Arc<AsyncMutex<()>>,
}

impl CoalescingScheduler {
    pub fn new(name: &'static str, delay: Duration) -> Self {
        Self {
            name,
            delay,
            pending: Arc::new(Mutex::new(PendingSlot::default())),
            write_lock: Arc::new(AsyncMutex::new(())),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules `op` after the delay, cancelling whatever was pending.
    /// `op` is only invoked once it actually fires.
    pub fn request<F, Fut>(&self, op: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            log_warn!("{} save dropped: no tokio runtime", self.name);
            return false;
        };

        let token = CancellationToken::new();
        let generation = {
            let mut slot = lock(&self.pending);
            if let Some(previous) = slot.token.replace(token.clone()) {
                previous.cancel();
            }
            slot.generation = slot.generation.wrapping_add(1);
            slot.generation
        };

        let name = self.name;
        let delay = self.delay;
        let pending = Arc::clone(&self.pending);
        let write_lock = Arc::clone(&self.write_lock);
        runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = time::sleep(delay) => {}
            }
            {
                let mut slot = lock(&pending);
                if slot.generation != generation {
                    return;
                }
                slot.token = None;
            }

            let _write = write_lock.lock().await;
            log_debug!("{name} save firing");
            op().await;
        });
        true
    }

    /// Drops the pending request, if any. A write already in flight finishes.
    pub fn cancel(&self) {
        let mut slot = lock(&self.pending);
        if let Some(token) = slot.token.take() {
            token.cancel();
        }
        slot.generation = slot.generation.wrapping_add(1);
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.pending).token.is_some()
    }
}
