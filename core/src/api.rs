//! The boundary to the chat server.
//!
//! The wire protocol lives behind [`ChatApi`]; the core only sees the typed
//! results and wraps them into mutations.

use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc::Sender;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ApiError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Server-assigned key of a conversation.
    ChannelId
);
string_id!(
    /// Server-issued post identifier, unique across the server.
    PostId
);
string_id!(UserId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Public,
    Private,
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    /// URL-safe handle, e.g. `town-square`.
    pub name: String,
    pub display_name: String,
    pub kind: ChannelKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub message: String,
    pub create_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference {
    pub category: String,
    pub name: String,
    pub value: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Server-pushed changes folded into state by
/// [`crate::state::ChatState::apply_remote_event`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemoteEvent {
    Posted(Post),
    PostEdited(Post),
    PostDeleted { channel_id: ChannelId, post_id: PostId },
    StatusChanged { user_id: UserId, status: String },
    ChannelAdded(Channel),
}

/// Blocking client for the chat server. Implementations are shared between
/// the startup path and background pollers, hence `Send + Sync`.
pub trait ChatApi: Send + Sync {
    fn login(&self, credentials: &Credentials) -> Result<User, ApiError>;

    fn fetch_channels(&self) -> Result<Vec<Channel>, ApiError>;

    /// Recent history of one channel, in any order.
    fn fetch_posts(&self, channel: &ChannelId) -> Result<Vec<Post>, ApiError>;

    fn fetch_users(&self) -> Result<Vec<User>, ApiError>;

    fn fetch_preferences(&self) -> Result<Vec<Preference>, ApiError>;

    /// Current status (`online`, `away`, ...) keyed by user. Users the server
    /// has no status for may be missing from the map.
    fn fetch_statuses(&self, users: &[UserId]) -> Result<HashMap<UserId, String>, ApiError>;

    /// Start delivering live changes on `events`. The server side keeps the
    /// sender for as long as it pushes; dropping it ends the stream. Servers
    /// without push support drop it right away.
    fn subscribe(&self, events: Sender<RemoteEvent>) -> Result<(), ApiError> {
        drop(events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    use super::*;

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials {
            username: "ana".to_string(),
            password: "hunter2".to_string(),
        };
        let shown = format!("{creds:?}");
        assert!(shown.contains("ana"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn remote_events_are_tagged_by_type() {
        let event: RemoteEvent = serde_json::from_str(
            r#"{"type": "post_deleted", "channel_id": "c1", "post_id": "p9"}"#,
        )
        .expect("tagged event parses");
        assert_eq!(
            event,
            RemoteEvent::PostDeleted {
                channel_id: ChannelId::new("c1"),
                post_id: PostId::new("p9"),
            }
        );
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = ChannelId::new("c1");
        assert_eq!(id.to_string(), "c1");
        assert_eq!(id.as_str(), "c1");
    }
}
