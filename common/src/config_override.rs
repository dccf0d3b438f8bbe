//! Support for `-c key=value` configuration overrides.
//!
//! [`CliConfigOverrides`] is meant to be embedded into a `clap`-derived CLI
//! struct with `#[clap(flatten)]`. Each `-c key=value` (or `--config
//! key=value`) is kept as a raw string until [`CliConfigOverrides::parse_overrides`]
//! turns it into a dotted path and a `toml::Value`.

use clap::ArgAction;
use clap::Parser;
use toml::Value;

#[derive(Parser, Debug, Default, Clone)]
pub struct CliConfigOverrides {
    /// Override a value from `~/.chatterm/config.toml`. Use a dotted path
    /// (`spell_check.delay_ms`) for nested values. The value is parsed as
    /// TOML; if that fails the raw string is used as a literal.
    ///
    /// Examples:
    ///   - `-c initial_channel=dev`
    ///   - `-c spell_check.delay_ms=250`
    ///   - `-c 'spell_check.dictionary="en_GB"'`
    #[arg(
        short = 'c',
        long = "config",
        value_name = "key=value",
        action = ArgAction::Append,
        global = true,
    )]
    pub raw_overrides: Vec<String>,
}

impl CliConfigOverrides {
    /// Split each raw override on its first `=` and parse the right-hand
    /// side.
    pub fn parse_overrides(&self) -> Result<Vec<(String, Value)>, String> {
        self.raw_overrides
            .iter()
            .map(|s| {
                let (key, value_str) = s
                    .split_once('=')
                    .ok_or_else(|| format!("Invalid override (missing '='): {s}"))?;
                let key = key.trim();
                if key.is_empty() {
                    return Err(format!("Empty key in override: {s}"));
                }
                Ok((key.to_string(), parse_value(value_str.trim())))
            })
            .collect()
    }
}

/// `-c initial_channel=dev` works without quoting: anything that is not a
/// valid TOML value becomes a string.
fn parse_value(raw: &str) -> Value {
    const KEY: &str = "v";
    toml::from_str::<toml::Table>(&format!("{KEY} = {raw}"))
        .ok()
        .and_then(|mut table| table.remove(KEY))
        .unwrap_or_else(|| Value::String(raw.to_string()))
}
