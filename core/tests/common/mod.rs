#![allow(clippy::expect_used, dead_code)]
use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc::Sender;
use std::sync::Mutex;

use chatterm_core::ApiError;
use chatterm_core::ChatState;
use chatterm_core::api::Channel;
use chatterm_core::api::ChannelId;
use chatterm_core::api::ChannelKind;
use chatterm_core::api::ChatApi;
use chatterm_core::api::Credentials;
use chatterm_core::api::Post;
use chatterm_core::api::PostId;
use chatterm_core::api::Preference;
use chatterm_core::api::RemoteEvent;
use chatterm_core::api::User;
use chatterm_core::api::UserId;
use chatterm_core::config::Config;
use chatterm_core::config::ConfigOverrides;
use chatterm_core::config::ConfigToml;
use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0)
        .single()
        .expect("valid timestamp")
}

pub fn channel(id: &str, name: &str, kind: ChannelKind) -> Channel {
    Channel {
        id: ChannelId::new(id),
        name: name.to_string(),
        display_name: name.to_string(),
        kind,
    }
}

pub fn post(id: &str, channel: &str, user: &str, text: &str, secs: i64) -> Post {
    Post {
        id: PostId::new(id),
        channel_id: ChannelId::new(channel),
        user_id: UserId::new(user),
        message: text.to_string(),
        create_at: at(secs),
    }
}

pub fn user(id: &str, name: &str) -> User {
    User {
        id: UserId::new(id),
        username: name.to_string(),
    }
}

/// In-memory server used by the integration tests.
#[derive(Default)]
pub struct FakeApi {
    pub channels: Vec<Channel>,
    pub posts: HashMap<ChannelId, Vec<Post>>,
    pub users: Vec<User>,
    pub preferences: Vec<Preference>,
    pub statuses: Mutex<Option<HashMap<UserId, String>>>,
    pub broken_history: Vec<ChannelId>,
    pub reject_login: bool,
    pub live_events: Vec<RemoteEvent>,
}

impl FakeApi {
    pub fn team() -> Self {
        let mut posts = HashMap::new();
        posts.insert(
            ChannelId::new("c-town"),
            vec![
                post("p2", "c-town", "u2", "second", 20),
                post("p1", "c-town", "u1", "first", 10),
            ],
        );
        Self {
            channels: vec![
                channel("c-town", "town-square", ChannelKind::Public),
                channel("c-dev", "dev", ChannelKind::Private),
                channel("c-bo", "bo", ChannelKind::Direct),
                channel("c-al", "al", ChannelKind::Direct),
            ],
            posts,
            users: vec![user("u1", "ana"), user("u2", "bo")],
            preferences: vec![Preference {
                category: "flagged_post".to_string(),
                name: "p2".to_string(),
                value: "true".to_string(),
            }],
            statuses: Mutex::new(Some(HashMap::from([(
                UserId::new("u1"),
                "online".to_string(),
            )]))),
            broken_history: Vec::new(),
            reject_login: false,
            live_events: Vec::new(),
        }
    }
}

impl ChatApi for FakeApi {
    fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        if self.reject_login {
            return Err(ApiError::Unauthorized);
        }
        self.users
            .iter()
            .find(|u| u.username == credentials.username)
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }

    fn fetch_channels(&self) -> Result<Vec<Channel>, ApiError> {
        Ok(self.channels.clone())
    }

    fn fetch_posts(&self, channel: &ChannelId) -> Result<Vec<Post>, ApiError> {
        if self.broken_history.contains(channel) {
            return Err(ApiError::Transport("connection reset".to_string()));
        }
        Ok(self.posts.get(channel).cloned().unwrap_or_default())
    }

    fn fetch_users(&self) -> Result<Vec<User>, ApiError> {
        Ok(self.users.clone())
    }

    fn fetch_preferences(&self) -> Result<Vec<Preference>, ApiError> {
        Ok(self.preferences.clone())
    }

    fn fetch_statuses(&self, _users: &[UserId]) -> Result<HashMap<UserId, String>, ApiError> {
        match &*self.statuses.lock().expect("statuses lock") {
            Some(statuses) => Ok(statuses.clone()),
            None => Err(ApiError::Transport("timed out".to_string())),
        }
    }

    fn subscribe(&self, events: Sender<RemoteEvent>) -> Result<(), ApiError> {
        for event in &self.live_events {
            events.send(event.clone()).expect("pump alive");
        }
        Ok(())
    }
}

pub fn credentials(username: &str) -> Credentials {
    Credentials {
        username: username.to_string(),
        password: "secret".to_string(),
    }
}

pub fn config(home: &Path) -> Config {
    Config::load_from_base_config_with_overrides(
        ConfigToml::default(),
        ConfigOverrides::default(),
        home.to_path_buf(),
    )
    .expect("default config")
}

pub fn state() -> ChatState {
    let api = FakeApi::team();
    ChatState::new(
        user("u1", "ana"),
        api.channels.clone(),
        api.users.clone(),
        Vec::new(),
    )
    .expect("state")
}
