//! Concurrency and state core of the chatterm client.
//!
//! One thread owns a [`state::ChatState`]. Everything else (pollers, the
//! spell-check debouncer, helper-program logging) runs on background tasks
//! and talks to it through the work queue or the event queue.

pub mod api;
pub mod config;
pub mod debounce;
pub mod dispatch;
mod error;
pub mod event;
pub mod history;
pub mod message_log;
pub mod pollers;
pub mod runtime;
pub mod session;
pub mod spellcheck;
pub mod state;
pub mod subprocess;
pub mod task;
pub mod timer;
pub mod users;
pub mod work_queue;
pub mod zipper;

pub use error::ApiError;
pub use error::CoreErr;
pub use error::Result;
pub use runtime::Runtime;
pub use session::start_session;
pub use state::ChatState;
