//! Periodic tasks with an explicit stop handle, and approval polling on top
//!
//! A tick runs to completion before the next interval starts, so polls never
//! overlap. Stopping only prevents further ticks; a request already in flight
//! is allowed to finish.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use waybill_infra::api::{ApprovalRequest, WaybillApi};

/// Fast-then-slow polling cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub fast_interval: Duration,
    pub slow_interval: Duration,
    /// Number of cycles polled at `fast_interval`
    pub fast_cycles: u32,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            fast_interval: Duration::from_secs(2),
            slow_interval: Duration::from_secs(10),
            fast_cycles: 20,
        }
    }
}

impl PollSchedule {
    /// Delay after the tick numbered `cycle` (0-based)
    pub fn interval_for(&self, cycle: u32) -> Duration {
        if cycle < self.fast_cycles {
            self.fast_interval
        } else {
            self.slow_interval
        }
    }
}

/// Stops a [`PeriodicTask`]. Cloneable; stopping twice is a no-op.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Resolves once stop was requested or every stop handle is gone
async fn stop_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// A job run on a tokio timer following a [`PollSchedule`].
///
/// The first tick runs immediately. The job gets the 0-based cycle number
/// and returns `ControlFlow::Break(())` to finish. Dropping the task along
/// with all of its stop handles stops it as well.
pub struct PeriodicTask {
    handle: JoinHandle<u32>,
    stop: StopHandle,
}

impl PeriodicTask {
    pub fn spawn<F, Fut>(schedule: PollSchedule, mut job: F) -> Self
    where
        F: FnMut(u32) -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let (tx, mut rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut cycle = 0u32;
            loop {
                if *rx.borrow() {
                    break;
                }
                let flow = job(cycle).await;
                cycle += 1;
                if flow.is_break() {
                    debug!(cycles = cycle, "periodic task finished");
                    break;
                }

                let wait = schedule.interval_for(cycle - 1);
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = stop_requested(&mut rx) => {
                        debug!(cycles = cycle, "periodic task stopped");
                        break;
                    }
                }
            }
            cycle
        });

        Self {
            handle,
            stop: StopHandle { tx: Arc::new(tx) },
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to end; returns the number of ticks run
    pub async fn join(self) -> Result<u32, JoinError> {
        let PeriodicTask { handle, stop } = self;
        let cycles = handle.await;
        drop(stop);
        cycles
    }
}

/// Poll an approval request until it is approved, rejected or expired.
///
/// `on_update` sees every fetched state. A request the backend does not know
/// yet (404) and transport errors do not end the watch.
pub fn watch_approval<A, F>(
    api: Arc<A>,
    reference_id: impl Into<String>,
    schedule: PollSchedule,
    on_update: F,
) -> PeriodicTask
where
    A: WaybillApi + ?Sized + 'static,
    F: FnMut(&ApprovalRequest) + Send + 'static,
{
    let reference_id: String = reference_id.into();
    let on_update = Arc::new(Mutex::new(on_update));

    PeriodicTask::spawn(schedule, move |cycle| {
        let api = Arc::clone(&api);
        let reference_id = reference_id.clone();
        let on_update = Arc::clone(&on_update);
        async move {
            match api.approval_request(&reference_id).await {
                Ok(Some(request)) => {
                    if let Ok(mut notify) = on_update.lock() {
                        notify(&request);
                    }
                    if request.is_resolved() {
                        info!(reference_id = %reference_id, status = %request.status, "approval resolved");
                        ControlFlow::Break(())
                    } else if request.is_expired(Utc::now()) {
                        info!(reference_id = %reference_id, "approval request expired");
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                }
                Ok(None) => {
                    debug!(reference_id = %reference_id, cycle, "approval request not found yet");
                    ControlFlow::Continue(())
                }
                Err(e) => {
                    warn!(reference_id = %reference_id, cycle, error = %e, "approval poll failed");
                    ControlFlow::Continue(())
                }
            }
        }
    })
}
