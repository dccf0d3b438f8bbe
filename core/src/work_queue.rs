//! The deferred-mutation queue.
//!
//! Background threads never get a reference to application state. Instead
//! they compute whatever they need, wrap the result in a [`Mutation`] and
//! [`WorkSender::submit`] it. The thread that owns the state drains the
//! [`WorkQueue`] and applies each mutation in turn, so every state change is
//! serialized without locks.

use std::any::Any;
use std::fmt;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::mpsc::Sender;
use std::sync::mpsc::TryRecvError;
use std::sync::mpsc::channel;
use std::time::Duration;

/// A unit of work that runs on the state-owning thread.
pub type Mutation<S> = Box<dyn FnOnce(&mut S) -> anyhow::Result<()> + Send + 'static>;

/// Box a closure as a [`Mutation`].
pub fn mutation<S, F>(f: F) -> Mutation<S>
where
    F: FnOnce(&mut S) -> anyhow::Result<()> + Send + 'static,
{
    Box::new(f)
}

/// State that can absorb a failed mutation as a user-visible message.
pub trait MutationTarget {
    fn report_mutation_error(&mut self, message: String);
}

/// Create the process-wide work queue. The receiving half belongs to the
/// state-owning thread; the sending half is cloned into every producer.
pub fn work_queue<S>() -> (WorkSender<S>, WorkQueue<S>) {
    let (tx, rx) = channel();
    (WorkSender { tx }, WorkQueue { rx })
}

pub struct WorkSender<S> {
    tx: Sender<Mutation<S>>,
}

impl<S> Clone for WorkSender<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S> fmt::Debug for WorkSender<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WorkSender")
    }
}

impl<S> WorkSender<S> {
    /// Append a mutation to the tail of the queue. Never blocks. If the
    /// owning loop is gone the mutation is dropped and the error is logged.
    pub fn submit<F>(&self, mutation: F)
    where
        F: FnOnce(&mut S) -> anyhow::Result<()> + Send + 'static,
    {
        self.submit_boxed(Box::new(mutation));
    }

    pub fn submit_boxed(&self, mutation: Mutation<S>) {
        if !self.try_submit(mutation) {
            tracing::error!("failed to submit mutation: work queue closed");
        }
    }

    /// Submit a mutation that changes nothing. Pollers use this to mark a
    /// cycle that produced no usable result. Returns `false` once the owning
    /// loop is gone.
    pub fn submit_noop(&self) -> bool {
        self.try_submit(mutation(|_| Ok(())))
    }

    /// Like [`WorkSender::submit_boxed`] but reports whether the owning loop
    /// still exists, so long-running producers know when to stop.
    pub(crate) fn try_submit(&self, mutation: Mutation<S>) -> bool {
        self.tx.send(mutation).is_ok()
    }
}

pub struct WorkQueue<S> {
    rx: Receiver<Mutation<S>>,
}

impl<S> fmt::Debug for WorkQueue<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WorkQueue")
    }
}

impl<S> WorkQueue<S> {
    pub fn recv(&self) -> Option<Mutation<S>> {
        self.rx.recv().ok()
    }

    pub fn try_recv(&self) -> Result<Mutation<S>, TryRecvError> {
        self.rx.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Mutation<S>, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

impl<S: MutationTarget> WorkQueue<S> {
    /// Apply mutations in arrival order until every sender has been dropped.
    pub fn run_loop(&self, state: &mut S) {
        while let Ok(mutation) = self.rx.recv() {
            apply(state, mutation);
        }
        tracing::debug!("work queue closed; apply loop exiting");
    }

    /// Apply everything that is already queued without blocking. Returns the
    /// number of mutations applied.
    pub fn drain(&self, state: &mut S) -> usize {
        let mut applied = 0;
        while let Ok(mutation) = self.rx.try_recv() {
            apply(state, mutation);
            applied += 1;
        }
        applied
    }
}

/// Run one mutation against `state`. An error or a panic inside the mutation
/// is logged and turned into an error message on the state; it never escapes
/// to the caller. Returns whether the mutation completed cleanly.
pub fn apply<S: MutationTarget>(state: &mut S, mutation: Mutation<S>) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| mutation(state))) {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            tracing::error!("mutation failed: {err:#}");
            state.report_mutation_error(format!("Error: {err}"));
            false
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!("mutation panicked: {message}");
            state.report_mutation_error(format!("Internal error: {message}"));
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        values: Vec<u32>,
        errors: Vec<String>,
    }

    impl MutationTarget for Recorder {
        fn report_mutation_error(&mut self, message: String) {
            self.errors.push(message);
        }
    }

    #[test]
    fn drain_applies_in_submission_order() {
        let (tx, queue) = work_queue::<Recorder>();
        for n in 0..5 {
            tx.submit(move |s| {
                s.values.push(n);
                Ok(())
            });
        }
        let mut state = Recorder::default();
        assert_eq!(queue.drain(&mut state), 5);
        assert_eq!(state.values, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn failing_mutation_becomes_error_message() {
        let (tx, queue) = work_queue::<Recorder>();
        tx.submit(|_| Err(anyhow::anyhow!("channel vanished")));
        tx.submit(|s| {
            s.values.push(7);
            Ok(())
        });
        let mut state = Recorder::default();
        queue.drain(&mut state);
        assert_eq!(state.errors, vec!["Error: channel vanished".to_string()]);
        assert_eq!(state.values, vec![7]);
    }

    #[test]
    fn panicking_mutation_does_not_stop_the_loop() {
        let (tx, queue) = work_queue::<Recorder>();
        tx.submit(|_| panic!("bad index"));
        tx.submit(|s| {
            s.values.push(1);
            Ok(())
        });
        drop(tx);
        let mut state = Recorder::default();
        queue.run_loop(&mut state);
        assert_eq!(state.values, vec![1]);
        assert_eq!(state.errors, vec!["Internal error: bad index".to_string()]);
    }

    #[test]
    fn noop_changes_nothing() {
        let (tx, queue) = work_queue::<Recorder>();
        assert!(tx.submit_noop());
        let mut state = Recorder::default();
        assert_eq!(queue.drain(&mut state), 1);
        assert!(state.values.is_empty());
        assert!(state.errors.is_empty());
    }

    #[test]
    fn submit_after_close_is_swallowed() {
        let (tx, queue) = work_queue::<Recorder>();
        drop(queue);
        tx.submit(|_| Ok(()));
        assert!(!tx.submit_noop());
    }
}
