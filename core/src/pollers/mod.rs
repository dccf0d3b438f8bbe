//! Background producers that feed the work queue on their own schedule.

pub mod remote_events;
pub mod status;
pub mod subprocess_log;
pub mod timezone;

use std::thread;
use std::time::Duration;

/// Run `tick` now and then once per `interval` until it returns `false`.
pub(crate) fn run_periodic<F>(interval: Duration, mut tick: F)
where
    F: FnMut() -> bool,
{
    while tick() {
        thread::sleep(interval);
    }
}
