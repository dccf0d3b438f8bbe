use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use dirs::home_dir;
use serde::Deserialize;
use toml::Value as TomlValue;

use crate::error::CoreErr;
use crate::error::Result;

const CONFIG_TOML_FILE: &str = "config.toml";

pub const DEFAULT_INITIAL_CHANNEL: &str = "town-square";
const DEFAULT_SERVER_URL: &str = "localhost";
const DEFAULT_ASPELL_PATH: &str = "aspell";
const DEFAULT_SPELL_CHECK_DELAY_MS: u64 = 500;
const DEFAULT_STATUS_REFRESH_SECS: u64 = 30;
const DEFAULT_TIMEZONE_POLL_SECS: u64 = 300;
const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 512;

/// Application configuration loaded from disk and merged with overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server_url: String,
    pub team: Option<String>,
    pub username: Option<String>,

    /// Channel focused once the session has loaded.
    pub initial_channel: String,

    pub spell_check: SpellCheckConfig,

    pub status_refresh_interval: Duration,
    pub timezone_poll_interval: Duration,

    /// Bound of the event queue feeding the owning loop.
    pub event_queue_capacity: usize,

    /// Command history read once at startup.
    pub history_file: PathBuf,

    pub log_dir: PathBuf,

    /// Where failing helper-program output is written. `None` uses the system
    /// temp directory.
    pub subprocess_log_dir: Option<PathBuf>,

    /// Directory where config, history and logs live (`~/.chatterm` unless
    /// `CHATTERM_HOME` says otherwise).
    pub chatterm_home: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpellCheckConfig {
    pub enabled: bool,
    pub aspell_path: String,
    pub dictionary: Option<String>,
    /// Quiet time after the last edit before a check runs.
    pub delay: Duration,
}

/// Base config deserialized from `config.toml`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ConfigToml {
    pub server_url: Option<String>,
    pub team: Option<String>,
    pub username: Option<String>,
    pub initial_channel: Option<String>,
    #[serde(default)]
    pub spell_check: SpellCheckToml,
    pub status_refresh_secs: Option<u64>,
    pub timezone_poll_secs: Option<u64>,
    pub event_queue_capacity: Option<usize>,
    pub history_file: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub subprocess_log_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SpellCheckToml {
    pub enabled: Option<bool>,
    pub aspell_path: Option<String>,
    pub dictionary: Option<String>,
    pub delay_ms: Option<u64>,
}

/// Optional overrides for user configuration (e.g., from CLI flags).
#[derive(Default, Debug, Clone)]
pub struct ConfigOverrides {
    pub server_url: Option<String>,
    pub username: Option<String>,
    pub initial_channel: Option<String>,
    pub spell_check: Option<bool>,
}

impl Config {
    /// Load `config.toml` from the chatterm home, apply `-c key=value`
    /// overrides to the raw TOML, then apply the typed `overrides` (highest
    /// precedence).
    pub fn load_with_cli_overrides(
        cli_overrides: Vec<(String, TomlValue)>,
        overrides: ConfigOverrides,
    ) -> Result<Self> {
        let chatterm_home = find_chatterm_home()?;
        let cfg = load_config_as_toml_with_cli_overrides(&chatterm_home, cli_overrides)?;
        Self::load_from_base_config_with_overrides(cfg, overrides, chatterm_home)
    }

    pub fn load_from_base_config_with_overrides(
        cfg: ConfigToml,
        overrides: ConfigOverrides,
        chatterm_home: PathBuf,
    ) -> Result<Self> {
        let ConfigOverrides {
            server_url,
            username,
            initial_channel,
            spell_check,
        } = overrides;

        let status_refresh_secs = positive(
            "status_refresh_secs",
            cfg.status_refresh_secs.unwrap_or(DEFAULT_STATUS_REFRESH_SECS),
        )?;
        let timezone_poll_secs = positive(
            "timezone_poll_secs",
            cfg.timezone_poll_secs.unwrap_or(DEFAULT_TIMEZONE_POLL_SECS),
        )?;
        let event_queue_capacity = cfg
            .event_queue_capacity
            .unwrap_or(DEFAULT_EVENT_QUEUE_CAPACITY);
        if event_queue_capacity == 0 {
            return Err(CoreErr::Config(
                "event_queue_capacity must be at least 1".to_string(),
            ));
        }

        let spell_check = SpellCheckConfig {
            enabled: spell_check.or(cfg.spell_check.enabled).unwrap_or(true),
            aspell_path: cfg
                .spell_check
                .aspell_path
                .unwrap_or_else(|| DEFAULT_ASPELL_PATH.to_string()),
            dictionary: cfg.spell_check.dictionary,
            delay: Duration::from_millis(
                cfg.spell_check
                    .delay_ms
                    .unwrap_or(DEFAULT_SPELL_CHECK_DELAY_MS),
            ),
        };

        Ok(Self {
            server_url: server_url
                .or(cfg.server_url)
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            team: cfg.team,
            username: username.or(cfg.username),
            initial_channel: initial_channel
                .or(cfg.initial_channel)
                .unwrap_or_else(|| DEFAULT_INITIAL_CHANNEL.to_string()),
            spell_check,
            status_refresh_interval: Duration::from_secs(status_refresh_secs),
            timezone_poll_interval: Duration::from_secs(timezone_poll_secs),
            event_queue_capacity,
            history_file: cfg
                .history_file
                .unwrap_or_else(|| chatterm_home.join("history.txt")),
            log_dir: cfg.log_dir.unwrap_or_else(|| chatterm_home.join("log")),
            subprocess_log_dir: cfg.subprocess_log_dir,
            chatterm_home,
        })
    }
}

fn positive(key: &str, value: u64) -> Result<u64> {
    if value == 0 {
        return Err(CoreErr::Config(format!("{key} must be greater than zero")));
    }
    Ok(value)
}

/// Read `config.toml` as a raw TOML tree, apply the dotted-path overrides and
/// deserialize the result. A missing file is treated as empty.
pub fn load_config_as_toml_with_cli_overrides(
    chatterm_home: &Path,
    cli_overrides: Vec<(String, TomlValue)>,
) -> Result<ConfigToml> {
    let mut root = read_config_file(chatterm_home)?;
    for (path, value) in cli_overrides {
        apply_toml_override(&mut root, &path, value);
    }
    let cfg: ConfigToml = root.try_into()?;
    Ok(cfg)
}

fn read_config_file(chatterm_home: &Path) -> Result<TomlValue> {
    let path = chatterm_home.join(CONFIG_TOML_FILE);
    match std::fs::read_to_string(&path) {
        Ok(contents) => {
            let table: toml::Table = toml::from_str(&contents)?;
            Ok(TomlValue::Table(table))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("{} not found, using defaults", path.display());
            Ok(TomlValue::Table(toml::Table::new()))
        }
        Err(e) => {
            tracing::error!("failed to read {}: {e}", path.display());
            Err(e.into())
        }
    }
}

/// Set `value` at the dotted `path` inside `root`, creating intermediate
/// tables and replacing any non-table value found along the way.
fn apply_toml_override(root: &mut TomlValue, path: &str, value: TomlValue) {
    let mut current = root;
    let mut parts = path.split('.').peekable();
    while let Some(part) = parts.next() {
        if !current.is_table() {
            *current = TomlValue::Table(toml::Table::new());
        }
        let TomlValue::Table(table) = current else {
            return;
        };
        if parts.peek().is_none() {
            table.insert(part.to_string(), value);
            return;
        }
        current = table
            .entry(part.to_string())
            .or_insert_with(|| TomlValue::Table(toml::Table::new()));
    }
}

/// Returns the chatterm home directory: `$CHATTERM_HOME` when set and
/// non-empty, otherwise `~/.chatterm`. Does not verify that it exists.
pub fn find_chatterm_home() -> std::io::Result<PathBuf> {
    if let Ok(val) = std::env::var("CHATTERM_HOME")
        && !val.is_empty()
    {
        return Ok(PathBuf::from(val));
    }
    let mut p = home_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not find home directory",
        )
    })?;
    p.push(".chatterm");
    Ok(p)
}
