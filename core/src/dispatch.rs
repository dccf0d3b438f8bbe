use std::cell::Cell;
use std::fmt;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::mpsc::TryRecvError;
use std::time::Duration;

use crate::event::AppEvent;
use crate::work_queue::Mutation;
use crate::work_queue::WorkQueue;

/// How long the owning loop blocks on the work queue before it looks at the
/// event queue again.
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub enum LoopItem<S> {
    Event(AppEvent),
    Work(Mutation<S>),
}

impl<S> fmt::Debug for LoopItem<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopItem::Event(ev) => f.debug_tuple("Event").field(ev).finish(),
            LoopItem::Work(_) => f.write_str("Work(<mutation>)"),
        }
    }
}

/// Merges the event queue and the work queue for the state-owning thread.
///
/// Events are looked at first, but every event handed out is followed by at
/// most one already-queued mutation, so a steady stream of input (a large
/// paste, piped stdin) interleaves with background results instead of
/// holding them back until the event queue is empty.
pub struct Dispatcher<S> {
    events: Receiver<AppEvent>,
    work: WorkQueue<S>,
    /// Set after an event is returned; the next call serves pending work
    /// first.
    work_turn: Cell<bool>,
}

impl<S> Dispatcher<S> {
    pub fn new(events: Receiver<AppEvent>, work: WorkQueue<S>) -> Self {
        Self {
            events,
            work,
            work_turn: Cell::new(false),
        }
    }

    /// Block until either queue yields an item. Returns `None` once both
    /// queues are disconnected and empty.
    pub fn next_item(&self) -> Option<LoopItem<S>> {
        if self.work_turn.replace(false)
            && let Ok(mutation) = self.work.try_recv()
        {
            return Some(LoopItem::Work(mutation));
        }
        let mut events_open = true;
        loop {
            if events_open {
                match self.events.try_recv() {
                    Ok(ev) => {
                        self.work_turn.set(true);
                        return Some(LoopItem::Event(ev));
                    }
                    Err(TryRecvError::Disconnected) => events_open = false,
                    Err(TryRecvError::Empty) => {}
                }
            }
            match self.work.recv_timeout(EVENT_POLL_INTERVAL) {
                Ok(mutation) => return Some(LoopItem::Work(mutation)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        // Work queue disconnected; block on events as a last resort.
        if events_open {
            self.events.recv().ok().map(LoopItem::Event)
        } else {
            None
        }
    }

    pub fn work_queue(&self) -> &WorkQueue<S> {
        &self.work
    }
}
