use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::api::ChatApi;
use crate::api::UserId;
use crate::pollers::run_periodic;
use crate::state::ChatState;
use crate::task::TaskHandle;
use crate::task::spawn_task;
use crate::work_queue::Mutation;
use crate::work_queue::WorkSender;
use crate::work_queue::mutation;

/// Fetch statuses for `users` and wrap the result in a mutation. `None` when
/// the fetch failed; the next cycle retries.
pub fn refresh_statuses(api: &dyn ChatApi, users: &[UserId]) -> Option<Mutation<ChatState>> {
    match api.fetch_statuses(users) {
        Ok(statuses) => Some(mutation(move |state: &mut ChatState| {
            state.apply_statuses(&statuses);
            Ok(())
        })),
        Err(e) => {
            tracing::warn!("status refresh failed: {e}");
            None
        }
    }
}

/// Refresh statuses immediately and then every `interval`, until the work
/// queue closes.
pub fn spawn_status_refresher(
    api: Arc<dyn ChatApi>,
    users: Vec<UserId>,
    interval: Duration,
    work: WorkSender<ChatState>,
) -> io::Result<TaskHandle> {
    spawn_task("status-refresher", move || {
        run_periodic(interval, || match refresh_statuses(api.as_ref(), &users) {
            Some(update) => work.try_submit(update),
            None => work.submit_noop(),
        });
        tracing::debug!("work queue closed; status refresher exiting");
    })
}
