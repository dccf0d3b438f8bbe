//! Per-channel transcript merging server posts with client-side messages.
//!
//! Ordering is by insertion, not by timestamp: every new entry is prepended
//! to `order` and [`ChannelMessageLog::render`] walks it backwards. A post
//! delivered late by the network therefore shows up where it arrived, not
//! where its `create_at` would sort it.

use std::collections::HashMap;
use std::collections::VecDeque;

use chrono::DateTime;
use chrono::Utc;

use crate::api::Post;
use crate::api::PostId;
use crate::users::UserDirectory;

/// Author shown for messages synthesized by the client itself.
pub const CLIENT_MESSAGE_LABEL: &str = "*chatterm";

/// Author shown for posts whose user is not in the directory.
pub const UNKNOWN_AUTHOR: &str = "<unknown>";

/// Identifier of a client message, unique within one channel's log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PostRef {
    Remote(PostId),
    Local(LocalId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessageKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMessage {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub kind: ClientMessageKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub reference: PostRef,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct ChannelMessageLog {
    /// Most recent first.
    order: VecDeque<PostRef>,
    remote: HashMap<PostId, Post>,
    local: HashMap<LocalId, ClientMessage>,
    /// Last issued local id. Monotonic, so ids are never reused.
    last_local: u64,
}

impl ChannelMessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a server post. Returns `true` if the post was new; a post whose
    /// id is already present is overwritten without being moved.
    pub fn add_remote(&mut self, post: Post) -> bool {
        let id = post.id.clone();
        match self.remote.insert(id.clone(), post) {
            Some(_) => false,
            None => {
                self.order.push_front(PostRef::Remote(id));
                true
            }
        }
    }

    /// Replace the content of a known post in place. Edits of posts this log
    /// has never seen are ignored and reported as `false`.
    pub fn edit_remote(&mut self, post: Post) -> bool {
        match self.remote.get_mut(&post.id) {
            Some(existing) => {
                *existing = post;
                true
            }
            None => false,
        }
    }

    pub fn remove_remote(&mut self, id: &PostId) -> Option<Post> {
        let removed = self.remote.remove(id)?;
        self.order
            .retain(|r| !matches!(r, PostRef::Remote(existing) if existing == id));
        Some(removed)
    }

    pub fn add_local(
        &mut self,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
        kind: ClientMessageKind,
    ) -> LocalId {
        self.last_local += 1;
        let id = LocalId(self.last_local);
        self.local.insert(
            id,
            ClientMessage {
                text: text.into(),
                timestamp,
                kind,
            },
        );
        self.order.push_front(PostRef::Local(id));
        id
    }

    pub fn remote_post(&self, id: &PostId) -> Option<&Post> {
        self.remote.get(id)
    }

    pub fn local_message(&self, id: LocalId) -> Option<&ClientMessage> {
        self.local.get(&id)
    }

    /// References, most recent first.
    pub fn references(&self) -> impl Iterator<Item = &PostRef> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The transcript, oldest first.
    pub fn render(&self, users: &UserDirectory) -> Vec<RenderedMessage> {
        self.order
            .iter()
            .rev()
            .filter_map(|reference| self.resolve(reference, users))
            .collect()
    }

    fn resolve(&self, reference: &PostRef, users: &UserDirectory) -> Option<RenderedMessage> {
        match reference {
            PostRef::Remote(id) => {
                let post = self.remote.get(id)?;
                Some(RenderedMessage {
                    reference: reference.clone(),
                    timestamp: post.create_at,
                    author: users
                        .username(&post.user_id)
                        .unwrap_or(UNKNOWN_AUTHOR)
                        .to_string(),
                    text: post.message.clone(),
                })
            }
            PostRef::Local(id) => {
                let msg = self.local.get(id)?;
                Some(RenderedMessage {
                    reference: reference.clone(),
                    timestamp: msg.timestamp,
                    author: CLIENT_MESSAGE_LABEL.to_string(),
                    text: msg.text.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChannelId;
    use crate::api::User;
    use crate::api::UserId;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0)
            .single()
            .unwrap_or_default()
    }

    fn post(id: &str, user: &str, text: &str, secs: i64) -> Post {
        Post {
            id: PostId::new(id),
            channel_id: ChannelId::new("c1"),
            user_id: UserId::new(user),
            message: text.to_string(),
            create_at: at(secs),
        }
    }

    fn users() -> UserDirectory {
        UserDirectory::from_users([User {
            id: UserId::new("u1"),
            username: "ana".to_string(),
        }])
    }

    fn texts(log: &ChannelMessageLog) -> Vec<String> {
        log.render(&users()).into_iter().map(|m| m.text).collect()
    }

    #[test]
    fn local_ids_count_up_and_render_oldest_first() {
        let mut log = ChannelMessageLog::new();
        let first = log.add_local("hi", at(1), ClientMessageKind::Info);
        let second = log.add_local("again", at(2), ClientMessageKind::Info);
        assert_eq!((first, second), (LocalId(1), LocalId(2)));

        let rendered: Vec<(DateTime<Utc>, String, String)> = log
            .render(&users())
            .into_iter()
            .map(|m| (m.timestamp, m.author, m.text))
            .collect();
        assert_eq!(
            rendered,
            vec![
                (at(1), CLIENT_MESSAGE_LABEL.to_string(), "hi".to_string()),
                (at(2), CLIENT_MESSAGE_LABEL.to_string(), "again".to_string()),
            ]
        );
    }

    #[test]
    fn edit_changes_text_but_not_position() {
        let mut log = ChannelMessageLog::new();
        assert!(log.add_remote(post("p1", "u1", "first", 1)));
        log.add_local("note", at(2), ClientMessageKind::Info);
        assert!(log.add_remote(post("p2", "u1", "second", 3)));

        assert!(log.edit_remote(post("p1", "u1", "first (edited)", 1)));
        assert_eq!(texts(&log), vec!["first (edited)", "note", "second"]);
        assert!(!log.edit_remote(post("nope", "u1", "ghost", 9)));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn re_adding_a_known_post_overwrites_in_place() {
        let mut log = ChannelMessageLog::new();
        log.add_remote(post("p1", "u1", "one", 1));
        log.add_remote(post("p2", "u1", "two", 2));
        assert!(!log.add_remote(post("p1", "u1", "one again", 1)));
        assert_eq!(texts(&log), vec!["one again", "two"]);
    }

    #[test]
    fn order_follows_insertion_not_timestamps() {
        let mut log = ChannelMessageLog::new();
        log.add_remote(post("late", "u1", "sent later, arrived first", 50));
        log.add_remote(post("early", "u1", "sent earlier, arrived second", 10));
        log.add_local("local", at(0), ClientMessageKind::Error);
        assert_eq!(
            texts(&log),
            vec![
                "sent later, arrived first",
                "sent earlier, arrived second",
                "local"
            ]
        );
    }

    #[test]
    fn unknown_author_and_removal() {
        let mut log = ChannelMessageLog::new();
        log.add_remote(post("p1", "ghost", "boo", 1));
        let rendered = log.render(&users());
        assert_eq!(rendered[0].author, UNKNOWN_AUTHOR);
        assert_eq!(rendered[0].reference, PostRef::Remote(PostId::new("p1")));

        assert!(log.remove_remote(&PostId::new("p1")).is_some());
        assert!(log.is_empty());
        assert!(log.remove_remote(&PostId::new("p1")).is_none());
    }

    #[test]
    fn local_ids_come_from_a_counter_not_the_log_size() {
        let mut log = ChannelMessageLog::new();
        log.add_local("a", at(1), ClientMessageKind::Info);
        log.add_remote(post("p1", "u1", "x", 2));
        log.add_remote(post("p2", "u1", "y", 3));
        log.remove_remote(&PostId::new("p1"));
        assert_eq!(log.len(), 2);

        let next = log.add_local("b", at(4), ClientMessageKind::Error);
        assert_eq!(next, LocalId(2));
        assert_eq!(log.last_local, 2);
        assert_eq!(
            log.local_message(next).map(|m| m.kind),
            Some(ClientMessageKind::Error)
        );
    }
}
