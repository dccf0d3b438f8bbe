//! Wiring of the queues and every background task around one [`ChatState`].

use std::io;
use std::sync::Arc;
use std::sync::mpsc::channel;

use crate::api::ChatApi;
use crate::config::Config;
use crate::debounce::DebounceScheduler;
use crate::dispatch::Dispatcher;
use crate::dispatch::LoopItem;
use crate::event::AppEvent;
use crate::event::AppEventSender;
use crate::event::event_queue;
use crate::pollers::remote_events::spawn_remote_event_pump;
use crate::pollers::status::spawn_status_refresher;
use crate::pollers::subprocess_log::SubprocessLogger;
use crate::pollers::subprocess_log::spawn_subprocess_log_drainer;
use crate::pollers::timezone::SystemTimeZone;
use crate::pollers::timezone::spawn_timezone_monitor;
use crate::spellcheck::SpellChecker;
use crate::state::ChatState;
use crate::task::TaskHandle;
use crate::work_queue::WorkSender;
use crate::work_queue::work_queue;

struct SpellCheck {
    checker: SpellChecker,
    debounce: DebounceScheduler,
}

/// Everything the owning loop needs besides the state itself.
///
/// Background tasks are daemons. They are never joined; each one returns on
/// its own once the queue it feeds is gone, which happens when the runtime
/// is dropped.
pub struct Runtime {
    events: AppEventSender,
    work: WorkSender<ChatState>,
    dispatcher: Dispatcher<ChatState>,
    spell_check: Option<SpellCheck>,
    tasks: Vec<TaskHandle>,
}

impl Runtime {
    /// Create the queues, subscribe to live server changes and start the
    /// background tasks: remote event pump, status refresher, timezone
    /// monitor, subprocess log drainer and (if enabled) the spell-check
    /// debouncer.
    pub fn start(api: Arc<dyn ChatApi>, config: &Config, state: &ChatState) -> io::Result<Self> {
        let (events, events_rx) = event_queue(config.event_queue_capacity);
        let (work, work_rx) = work_queue::<ChatState>();
        let (log_tx, log_rx) = channel();
        let (remote_tx, remote_rx) = channel();

        let pump = spawn_remote_event_pump(remote_rx, work.clone())?;
        if let Err(e) = api.subscribe(remote_tx) {
            tracing::warn!("live updates unavailable: {e}");
        }

        let tasks = vec![
            pump,
            spawn_subprocess_log_drainer(
                log_rx,
                SubprocessLogger::new(config.subprocess_log_dir.clone()),
                work.clone(),
            )?,
            spawn_status_refresher(
                api,
                state.users().ids(),
                config.status_refresh_interval,
                work.clone(),
            )?,
            spawn_timezone_monitor(SystemTimeZone, config.timezone_poll_interval, work.clone())?,
        ];

        let spell_check = if config.spell_check.enabled {
            let sender = events.clone();
            let debounce = DebounceScheduler::spawn("spell-check", config.spell_check.delay, move || {
                sender.send(AppEvent::RunSpellCheck);
            })?;
            Some(SpellCheck {
                checker: SpellChecker::new(&config.spell_check, log_tx),
                debounce,
            })
        } else {
            tracing::info!("spell checking disabled");
            None
        };

        Ok(Self {
            events,
            work,
            dispatcher: Dispatcher::new(events_rx, work_rx),
            spell_check,
            tasks,
        })
    }

    pub fn events(&self) -> AppEventSender {
        self.events.clone()
    }

    pub fn work(&self) -> WorkSender<ChatState> {
        self.work.clone()
    }

    /// Block until the next event or mutation arrives.
    pub fn next_item(&self) -> Option<LoopItem<ChatState>> {
        self.dispatcher.next_item()
    }

    /// The editor text changed. Restarts the spell-check quiet period.
    pub fn content_changed(&self) {
        if let Some(spell) = &self.spell_check {
            spell.debounce.trigger();
        }
    }

    /// Check the current editor text in the background. Called when the
    /// debouncer reports the editor has gone quiet.
    pub fn start_spell_check(&mut self, state: &ChatState) {
        let Some(spell) = &self.spell_check else {
            return;
        };
        let text = state.editor_text();
        if text.trim().is_empty() {
            return;
        }
        match spell.checker.spawn_check(text.to_string(), self.work.clone()) {
            Ok(handle) => {
                self.tasks.retain(|t| !t.is_finished());
                self.tasks.push(handle);
            }
            Err(e) => tracing::error!("failed to start spell check: {e}"),
        }
    }

    pub fn spell_check_enabled(&self) -> bool {
        self.spell_check.is_some()
    }

    /// Names of background tasks that have not returned yet.
    pub fn running_tasks(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .tasks
            .iter()
            .filter(|t| !t.is_finished())
            .map(TaskHandle::name)
            .collect();
        if let Some(spell) = &self.spell_check
            && spell.debounce.is_running()
        {
            names.push("spell-check-debounce");
        }
        names
    }
}
