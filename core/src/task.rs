//! Named background threads.
//!
//! Every producer in the core (pollers, the debounce pair, the subprocess log
//! drainer, one-shot spell checks) is started through [`spawn_task`]. Tasks
//! are daemons: nothing joins them on shutdown and they die with the process.
//! Each one also returns on its own once the channel it reads from or writes
//! to has been disconnected, so dropping the owning loop winds them down.

use std::io;
use std::thread;
use std::thread::JoinHandle;

#[derive(Debug)]
pub struct TaskHandle {
    name: String,
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Block until the task returns. Only useful in tests and for tasks that
    /// are known to terminate.
    pub fn join(self) -> thread::Result<()> {
        self.join.join()
    }
}

pub fn spawn_task<F>(name: impl Into<String>, f: F) -> io::Result<TaskHandle>
where
    F: FnOnce() + Send + 'static,
{
    let name = name.into();
    let join = thread::Builder::new().name(name.clone()).spawn(move || {
        f();
    })?;
    tracing::debug!("spawned background task {name}");
    Ok(TaskHandle { name, join })
}
