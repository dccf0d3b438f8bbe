use std::sync::mpsc::Receiver;
use std::sync::mpsc::SyncSender;
use std::sync::mpsc::sync_channel;

/// Requests delivered to the state-owning loop. Unlike a
/// [`crate::work_queue::Mutation`], an event carries no ready-made state
/// change; the loop decides what to do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The editor has been quiet for the debounce window; check its spelling.
    RunSpellCheck,

    /// One line of user input from the front end.
    Input(String),

    /// Request to exit the application gracefully.
    ExitRequest,
}

/// Create the bounded event queue.
pub fn event_queue(capacity: usize) -> (AppEventSender, Receiver<AppEvent>) {
    let (tx, rx) = sync_channel(capacity);
    (AppEventSender::new(tx), rx)
}

#[derive(Clone, Debug)]
pub struct AppEventSender {
    tx: SyncSender<AppEvent>,
}

impl AppEventSender {
    pub fn new(tx: SyncSender<AppEvent>) -> Self {
        Self { tx }
    }

    /// Send an event to the owning loop, blocking while the queue is full.
    /// The loop never waits on a producer, so a full queue only delays the
    /// sender until the loop catches up. If the loop is gone we swallow the
    /// error and log it.
    pub fn send(&self, event: AppEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::error!("failed to send event: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn full_queue_blocks_until_drained() {
        let (tx, rx) = event_queue(1);
        tx.send(AppEvent::Input("first".to_string()));
        let producer = {
            let tx = tx.clone();
            thread::spawn(move || tx.send(AppEvent::RunSpellCheck))
        };
        assert_eq!(rx.recv().ok(), Some(AppEvent::Input("first".to_string())));
        assert_eq!(rx.recv().ok(), Some(AppEvent::RunSpellCheck));
        assert!(producer.join().is_ok());
    }

    #[test]
    fn send_after_close_is_swallowed() {
        let (tx, rx) = event_queue(4);
        drop(rx);
        tx.send(AppEvent::ExitRequest);
    }
}
