//! Forwards server-pushed [`RemoteEvent`]s to the owning loop.

use std::io;
use std::sync::mpsc::Receiver;

use crate::api::RemoteEvent;
use crate::state::ChatState;
use crate::task::TaskHandle;
use crate::task::spawn_task;
use crate::work_queue::Mutation;
use crate::work_queue::WorkSender;
use crate::work_queue::mutation;

/// Wrap one remote event. A failure while folding it surfaces through the
/// apply loop as an error message.
pub fn remote_event_mutation(event: RemoteEvent) -> Mutation<ChatState> {
    mutation(move |state: &mut ChatState| {
        state
            .apply_remote_event(event)
            .map_err(anyhow::Error::from)
    })
}

/// Submit every event from `events`, in arrival order, until either the
/// stream or the work queue closes.
pub fn spawn_remote_event_pump(
    events: Receiver<RemoteEvent>,
    work: WorkSender<ChatState>,
) -> io::Result<TaskHandle> {
    spawn_task("remote-event-pump", move || {
        while let Ok(event) = events.recv() {
            tracing::trace!("remote event: {event:?}");
            if !work.try_submit(remote_event_mutation(event)) {
                tracing::debug!("work queue closed; remote event pump exiting");
                return;
            }
        }
        tracing::debug!("remote event stream closed; pump exiting");
    })
}
