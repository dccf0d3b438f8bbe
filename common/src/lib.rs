#[cfg(feature = "cli")]
mod config_override;

#[cfg(feature = "cli")]
pub use config_override::CliConfigOverrides;
