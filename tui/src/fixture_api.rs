//! A [`ChatApi`] served from a JSON file instead of a live server.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::mpsc::Sender;

use chatterm_core::ApiError;
use chatterm_core::api::Channel;
use chatterm_core::api::ChannelId;
use chatterm_core::api::ChatApi;
use chatterm_core::api::Credentials;
use chatterm_core::api::Post;
use chatterm_core::api::Preference;
use chatterm_core::api::RemoteEvent;
use chatterm_core::api::User;
use chatterm_core::api::UserId;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    pub channels: Vec<Channel>,
    pub users: Vec<User>,
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub preferences: Vec<Preference>,
    #[serde(default)]
    pub statuses: HashMap<UserId, String>,
    /// Username to password. Users without an entry accept any password.
    #[serde(default)]
    pub passwords: HashMap<String, String>,
    /// Pushed to subscribers, in order, as soon as they subscribe.
    #[serde(default)]
    pub live_events: Vec<RemoteEvent>,
}

#[derive(Debug, Clone)]
pub struct FixtureApi {
    fixture: Fixture,
}

impl FixtureApi {
    pub fn new(fixture: Fixture) -> Self {
        Self { fixture }
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let fixture: Fixture = serde_json::from_str(&contents).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid fixture {}: {e}", path.display()),
            )
        })?;
        tracing::info!(
            "loaded fixture {} with {} channels and {} posts",
            path.display(),
            fixture.channels.len(),
            fixture.posts.len()
        );
        Ok(Self::new(fixture))
    }
}

impl ChatApi for FixtureApi {
    fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        let user = self
            .fixture
            .users
            .iter()
            .find(|u| u.username == credentials.username)
            .ok_or(ApiError::Unauthorized)?;
        match self.fixture.passwords.get(&user.username) {
            Some(expected) if *expected != credentials.password => Err(ApiError::Unauthorized),
            _ => Ok(user.clone()),
        }
    }

    fn fetch_channels(&self) -> Result<Vec<Channel>, ApiError> {
        Ok(self.fixture.channels.clone())
    }

    fn fetch_posts(&self, channel: &ChannelId) -> Result<Vec<Post>, ApiError> {
        if !self.fixture.channels.iter().any(|c| &c.id == channel) {
            return Err(ApiError::NotFound(format!("channel {channel}")));
        }
        Ok(self
            .fixture
            .posts
            .iter()
            .filter(|p| &p.channel_id == channel)
            .cloned()
            .collect())
    }

    fn fetch_users(&self) -> Result<Vec<User>, ApiError> {
        Ok(self.fixture.users.clone())
    }

    fn fetch_preferences(&self) -> Result<Vec<Preference>, ApiError> {
        Ok(self.fixture.preferences.clone())
    }

    fn fetch_statuses(&self, users: &[UserId]) -> Result<HashMap<UserId, String>, ApiError> {
        Ok(users
            .iter()
            .filter_map(|id| {
                self.fixture
                    .statuses
                    .get(id)
                    .map(|status| (id.clone(), status.clone()))
            })
            .collect())
    }

    fn subscribe(&self, events: Sender<RemoteEvent>) -> Result<(), ApiError> {
        for event in &self.fixture.live_events {
            events
                .send(event.clone())
                .map_err(|_| ApiError::Transport("subscriber went away".to_string()))?;
        }
        Ok(())
    }
}
