use chatterm_common::CliConfigOverrides;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version)]
pub struct Cli {
    /// JSON file with the channels, users, posts and statuses to serve.
    #[arg(long, value_name = "FILE")]
    pub fixture: PathBuf,

    /// Username to log in as. Defaults to `username` from config.toml.
    #[arg(long, short = 'u')]
    pub user: Option<String>,

    /// Channel to focus once the session has loaded.
    #[arg(long, short = 'C', value_name = "NAME")]
    pub channel: Option<String>,

    /// Server URL recorded in logs and the session header.
    #[arg(long = "server", value_name = "URL")]
    pub server_url: Option<String>,

    /// Do not run aspell on the editor contents.
    #[arg(long = "no-spell-check", default_value_t = false)]
    pub no_spell_check: bool,

    /// Log at info level instead of warn.
    #[arg(long, default_value_t = false)]
    pub debug: bool,

    #[clap(skip)]
    pub config_overrides: CliConfigOverrides,
}
