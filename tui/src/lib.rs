// Forbid accidental stdout/stderr writes in the *library* portion of the
// front end. The transcript goes through the `Write` handed to `App`.
#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::fs::OpenOptions;
use std::io::BufReader;
use std::sync::Arc;

use chatterm_core::Runtime;
use chatterm_core::api::ChatApi;
use chatterm_core::api::Credentials;
use chatterm_core::config::Config;
use chatterm_core::config::ConfigOverrides;
use chatterm_core::start_session;
use tracing_appender::non_blocking;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod app;
mod cli;
mod fixture_api;
mod session_log;

pub use app::App;
pub use app::spawn_input_reader;
pub use cli::Cli;
pub use fixture_api::Fixture;
pub use fixture_api::FixtureApi;

/// Environment variable holding the login password.
const PASSWORD_ENV_VAR: &str = "CHATTERM_PASSWORD";

pub fn run_main(cli: Cli) -> std::io::Result<()> {
    let overrides = ConfigOverrides {
        server_url: cli.server_url.clone(),
        username: cli.user.clone(),
        initial_channel: cli.channel.clone(),
        spell_check: cli.no_spell_check.then_some(false),
    };

    // Parse `-c` overrides from the CLI.
    let cli_kv_overrides = match cli.config_overrides.parse_overrides() {
        Ok(v) => v,
        #[allow(clippy::print_stderr)]
        Err(e) => {
            eprintln!("Error parsing -c overrides: {e}");
            std::process::exit(1);
        }
    };

    #[allow(clippy::print_stderr)]
    let config = match Config::load_with_cli_overrides(cli_kv_overrides, overrides) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error loading configuration: {err}");
            std::process::exit(1);
        }
    };

    std::fs::create_dir_all(&config.log_dir)?;
    // Open (or create) the log file, appending to it.
    let mut log_file_opts = OpenOptions::new();
    log_file_opts.create(true).append(true);

    // Only the current user may read the log.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        log_file_opts.mode(0o600);
    }

    let log_file = log_file_opts.open(config.log_dir.join("chatterm.log"))?;

    // Wrap file in non-blocking writer.
    let (non_blocking, _guard) = non_blocking(log_file);

    let default_filter = if cli.debug {
        "chatterm_core=info,chatterm_tui=info"
    } else {
        "chatterm_core=warn,chatterm_tui=warn"
    };

    // use RUST_LOG env var, defaulting based on debug flag.
    let env_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_target(false)
        .with_filter(env_filter());

    let _ = tracing_subscriber::registry().with(file_layer).try_init();

    session_log::maybe_init(&config);

    let result = run_line_app(cli, config).map_err(|err| std::io::Error::other(err.to_string()));
    session_log::log_session_end();
    result
}

fn run_line_app(cli: Cli, config: Config) -> color_eyre::Result<()> {
    color_eyre::install()?;

    // Forward panic reports through tracing so they land in the log file,
    // then chain to the previous hook for the usual report on stderr.
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("panic: {info}");
        prev_hook(info);
    }));

    let api: Arc<dyn ChatApi> = Arc::new(FixtureApi::load(&cli.fixture)?);
    let username = config
        .username
        .clone()
        .ok_or_else(|| color_eyre::eyre::eyre!("no username: pass --user or set `username` in config.toml"))?;
    let credentials = Credentials {
        username,
        password: std::env::var(PASSWORD_ENV_VAR).unwrap_or_default(),
    };

    let state = start_session(api.as_ref(), &config, &credentials)?;
    let runtime = Runtime::start(Arc::clone(&api), &config, &state)?;
    let _input = spawn_input_reader(BufReader::new(std::io::stdin()), runtime.events())?;

    let mut app = App::new(state, runtime, std::io::stdout().lock());
    app.run()?;
    Ok(())
}
