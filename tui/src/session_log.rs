use std::fs::File;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use chatterm_core::config::Config;
use chatterm_core::event::AppEvent;
use lazy_static::lazy_static;
use serde_json::json;

lazy_static! {
    static ref LOGGER: SessionLogger = SessionLogger::default();
}

#[derive(Default)]
struct SessionLogger {
    file: Mutex<Option<File>>,
}

impl SessionLogger {
    fn lock(&self) -> MutexGuard<'_, Option<File>> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self, path: PathBuf) -> std::io::Result<()> {
        let mut opts = OpenOptions::new();
        opts.create(true).truncate(true).write(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }

        let file = opts.open(path)?;
        *self.lock() = Some(file);
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.lock().is_some()
    }

    fn write_json_line(&self, value: serde_json::Value) {
        if let Some(file) = self.lock().as_mut()
            && let Ok(serialized) = serde_json::to_string(&value)
        {
            let _ = file.write_all(serialized.as_bytes());
            let _ = file.write_all(b"\n");
            let _ = file.flush();
        }
    }
}

fn now_ts() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn recording_requested() -> bool {
    std::env::var("CHATTERM_RECORD_SESSION")
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

pub(crate) fn maybe_init(config: &Config) {
    if !recording_requested() {
        return;
    }

    let path = match std::env::var("CHATTERM_SESSION_LOG_PATH") {
        Ok(path) => PathBuf::from(path),
        Err(_) => config.log_dir.join(format!(
            "session-{}.jsonl",
            chrono::Utc::now().format("%Y%m%dT%H%M%SZ")
        )),
    };

    if let Err(e) = LOGGER.open(path.clone()) {
        tracing::error!("failed to open session log {path:?}: {e}");
        return;
    }

    LOGGER.write_json_line(json!({
        "ts": now_ts(),
        "dir": "meta",
        "kind": "session_start",
        "server_url": config.server_url,
        "initial_channel": config.initial_channel,
        "spell_check": config.spell_check.enabled,
    }));
}

pub(crate) fn log_inbound_app_event(event: &AppEvent) {
    if !LOGGER.is_enabled() {
        return;
    }
    let value = match event {
        AppEvent::Input(line) => json!({
            "ts": now_ts(),
            "dir": "to_app",
            "kind": "input",
            "text": line,
        }),
        other => json!({
            "ts": now_ts(),
            "dir": "to_app",
            "kind": "app_event",
            "variant": format!("{other:?}"),
        }),
    };
    LOGGER.write_json_line(value);
}

/// Mutations are opaque, so only their arrival is recorded.
pub(crate) fn log_applied_mutation(ok: bool) {
    if !LOGGER.is_enabled() {
        return;
    }
    LOGGER.write_json_line(json!({
        "ts": now_ts(),
        "dir": "to_app",
        "kind": "mutation",
        "ok": ok,
    }));
}

pub(crate) fn log_session_end() {
    if !LOGGER.is_enabled() {
        return;
    }
    LOGGER.write_json_line(json!({
        "ts": now_ts(),
        "dir": "meta",
        "kind": "session_end",
    }));
}
