//! Collapses bursts of "content changed" triggers into one delayed action.
//!
//! The editor calls [`DebounceScheduler::trigger`] on *every* change. Two
//! background tasks decide when the expensive action (a spell check) actually
//! runs. It guarantees:
//!
//! 1. The action never runs sooner than `delay` after the latest trigger of a
//!    burst.
//! 2. A burst of triggers closer together than `delay` produces one action.
//! 3. Triggers spaced further apart than `delay` each produce an action.
//! 4. At most one timer is live at a time.
//!
//! The manager task owns the timer slot and is the only one that arms or
//! extends a timer. The worker task only ever waits on the handle it was
//! given, so extending the live timer "under" a sleeping worker is safe.

use std::io;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::Sender;
use std::sync::mpsc::channel;
use std::time::Duration;

use crate::task::TaskHandle;
use crate::task::spawn_task;
use crate::timer::TimerHandle;

#[derive(Debug)]
pub struct DebounceScheduler {
    wakeup_tx: Sender<()>,
    delay: Duration,
    manager: TaskHandle,
    worker: TaskHandle,
}

impl DebounceScheduler {
    /// Start the manager/worker pair. `on_fire` runs on the worker thread
    /// once per expired timer.
    pub fn spawn<F>(name: &str, delay: Duration, on_fire: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (wakeup_tx, wakeup_rx) = channel();
        let (worker_tx, worker_rx) = channel();
        let worker = spawn_task(format!("{name}-debounce-worker"), move || {
            run_worker(worker_rx, on_fire);
        })?;
        let manager = spawn_task(format!("{name}-debounce-manager"), move || {
            run_manager(delay, wakeup_rx, worker_tx);
        })?;
        Ok(Self {
            wakeup_tx,
            delay,
            manager,
            worker,
        })
    }

    /// Record one "content changed" signal. Never blocks.
    pub fn trigger(&self) {
        if self.wakeup_tx.send(()).is_err() {
            tracing::warn!("debounce manager {} has exited", self.manager.name());
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_running(&self) -> bool {
        !self.manager.is_finished() && !self.worker.is_finished()
    }
}

fn run_manager(delay: Duration, wakeup_rx: Receiver<()>, worker_tx: Sender<TimerHandle>) {
    let mut slot: Option<TimerHandle> = None;
    while wakeup_rx.recv().is_ok() {
        if let Some(live) = slot.as_ref() {
            // `extend` refuses a timer that fired between the expiry check
            // and now, in which case we fall through and arm a fresh one.
            if !live.is_expired() && live.extend(delay) {
                continue;
            }
        }
        let timer = TimerHandle::new(delay);
        if worker_tx.send(timer.clone()).is_err() {
            tracing::debug!("debounce worker gone; manager exiting");
            return;
        }
        slot = Some(timer);
    }
    tracing::debug!("debounce wakeup channel closed; manager exiting");
}

fn run_worker<F>(worker_rx: Receiver<TimerHandle>, mut on_fire: F)
where
    F: FnMut(),
{
    while let Ok(timer) = worker_rx.recv() {
        timer.wait();
        on_fire();
    }
    tracing::debug!("debounce timer channel closed; worker exiting");
}
