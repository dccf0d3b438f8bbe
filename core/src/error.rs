use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreErr>;

#[derive(Error, Debug)]
pub enum CoreErr {
    /// The channel ring must always have a focused element, so it cannot be
    /// built from an empty list.
    #[error("cannot build the channel ring from an empty channel list")]
    EmptyZipper,

    /// A channel name that must resolve at startup did not match any channel.
    #[error("no channel named `{0}`")]
    UnknownChannel(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse config.toml: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failures reported by a [`crate::api::ChatApi`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("server rejected the supplied credentials")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),
}
