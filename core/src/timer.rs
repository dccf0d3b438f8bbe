//! Extendable one-shot countdown shared between the debounce manager and
//! worker.
//!
//! The manager is the only caller of [`TimerHandle::extend`]; the worker is
//! the only caller of [`TimerHandle::wait`]. The deadline only ever moves
//! later, so a worker sleeping towards an old deadline simply re-checks and
//! goes back to sleep.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::Instant;

#[derive(Clone, Debug)]
pub struct TimerHandle {
    inner: Arc<TimerInner>,
}

#[derive(Debug)]
struct TimerInner {
    deadline: Mutex<Instant>,
    fired: AtomicBool,
}

impl TimerHandle {
    /// Arm a timer that expires `delay` from now.
    pub fn new(delay: Duration) -> Self {
        Self::with_deadline(Instant::now() + delay)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            inner: Arc::new(TimerInner {
                deadline: Mutex::new(deadline),
                fired: AtomicBool::new(false),
            }),
        }
    }

    pub fn deadline(&self) -> Instant {
        *self.lock()
    }

    /// True once a waiter has observed the deadline and returned from
    /// [`TimerHandle::wait`].
    pub fn has_fired(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }

    /// Non-blocking: true if the timer fired or its deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.has_fired() || Instant::now() >= self.deadline()
    }

    /// Push the deadline out to `now + delay` (never earlier than it already
    /// is). Returns `false` without touching anything if the timer has
    /// already fired; a fired timer must be replaced, not revived.
    pub fn extend(&self, delay: Duration) -> bool {
        let mut deadline = self.lock();
        if self.has_fired() {
            return false;
        }
        let candidate = Instant::now() + delay;
        if candidate > *deadline {
            *deadline = candidate;
        }
        true
    }

    /// Block the calling thread until the (possibly extended) deadline
    /// passes, then mark the timer as fired.
    pub fn wait(&self) {
        loop {
            let now = Instant::now();
            let remaining = {
                let deadline = self.lock();
                if now >= *deadline {
                    self.inner.fired.store(true, Ordering::Release);
                    return;
                }
                *deadline - now
            };
            thread::sleep(remaining);
        }
    }

    pub fn same_timer(&self, other: &TimerHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> MutexGuard<'_, Instant> {
        // The guarded value is a plain `Instant`; a panic while holding the
        // lock cannot leave it half-written.
        self.inner
            .deadline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
