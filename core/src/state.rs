//! The single owned application state.
//!
//! Exactly one [`ChatState`] exists per process. It is created by
//! [`crate::session::start_session`], moved into the owning loop and mutated
//! only there, either directly in response to events or through mutations
//! drained from the work queue.

use std::collections::BTreeSet;
use std::collections::HashMap;

use chrono::Utc;

use crate::api::Channel;
use crate::api::ChannelId;
use crate::api::ChannelKind;
use crate::api::Post;
use crate::api::Preference;
use crate::api::RemoteEvent;
use crate::api::User;
use crate::api::UserId;
use crate::error::CoreErr;
use crate::error::Result;
use crate::history::InputHistory;
use crate::message_log::ChannelMessageLog;
use crate::message_log::ClientMessageKind;
use crate::message_log::LocalId;
use crate::message_log::PostRef;
use crate::message_log::RenderedMessage;
use crate::users::UserDirectory;
use crate::work_queue::MutationTarget;
use crate::zipper::Zipper;

/// Preference category whose entries name flagged posts.
pub const FLAGGED_POST_CATEGORY: &str = "flagged_post";

#[derive(Debug, Clone)]
pub struct ChannelState {
    pub info: Channel,
    pub log: ChannelMessageLog,
    /// Remote posts added while the channel was not focused.
    pub unread: usize,
}

impl ChannelState {
    fn new(info: Channel) -> Self {
        Self {
            info,
            log: ChannelMessageLog::new(),
            unread: 0,
        }
    }
}

/// One line of a rendered transcript with its flag marker resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub message: RenderedMessage,
    pub flagged: bool,
}

#[derive(Debug)]
pub struct ChatState {
    me: User,
    focus: Zipper<ChannelId>,
    channels: HashMap<ChannelId, ChannelState>,
    users: UserDirectory,
    preferences: Vec<Preference>,
    time_zone: Option<String>,
    editor: String,
    misspellings: BTreeSet<String>,
    history: InputHistory,
}

impl ChatState {
    /// Build the state with focus on the first channel of the ring. Fails if
    /// `channels` is empty.
    pub fn new(
        me: User,
        channels: Vec<Channel>,
        users: Vec<User>,
        preferences: Vec<Preference>,
    ) -> Result<Self> {
        let ring = ring_order(&channels);
        let focus = Zipper::new(ring)?;
        let channels = channels
            .into_iter()
            .map(|c| (c.id.clone(), ChannelState::new(c)))
            .collect();
        let mut users = UserDirectory::from_users(users);
        users.insert(me.clone());
        Ok(Self {
            me,
            focus,
            channels,
            users,
            preferences,
            time_zone: None,
            editor: String::new(),
            misspellings: BTreeSet::new(),
            history: InputHistory::default(),
        })
    }

    pub fn me(&self) -> &User {
        &self.me
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn history(&self) -> &InputHistory {
        &self.history
    }

    pub fn set_history(&mut self, history: InputHistory) {
        self.history = history;
    }

    /// Record a post fetched during bootstrap. Does not touch unread counts.
    pub fn seed_post(&mut self, post: Post) {
        match self.channels.get_mut(&post.channel_id) {
            Some(channel) => {
                channel.log.add_remote(post);
            }
            None => tracing::warn!("history for unknown channel {}", post.channel_id),
        }
    }

    pub fn focused_channel_id(&self) -> &ChannelId {
        self.focus.focus()
    }

    pub fn focused_channel(&self) -> Option<&ChannelState> {
        self.channels.get(self.focus.focus())
    }

    pub fn channel(&self, id: &ChannelId) -> Option<&ChannelState> {
        self.channels.get(id)
    }

    /// Channel ids in ring order.
    pub fn channel_ids(&self) -> impl Iterator<Item = &ChannelId> {
        self.focus.iter()
    }

    pub fn next_channel(&mut self) {
        self.focus.right();
        self.mark_focused_read();
    }

    pub fn prev_channel(&mut self) {
        self.focus.left();
        self.mark_focused_read();
    }

    /// Move focus to the nearest channel (rightward, wrapping) whose name or
    /// display name equals `name`. Posts an info message in the focused
    /// channel when nothing matches.
    pub fn focus_channel_by_name(&mut self, name: &str) -> bool {
        let channels = &self.channels;
        let found = self.focus.find_right(|id| {
            channels
                .get(id)
                .is_some_and(|c| c.info.name == name || c.info.display_name == name)
        });
        if found {
            self.mark_focused_read();
        } else {
            self.post_info(format!("No channel named {name}"));
        }
        found
    }

    pub fn channel_id_by_name(&self, name: &str) -> Option<&ChannelId> {
        self.focus.iter().find(|id| {
            self.channels
                .get(*id)
                .is_some_and(|c| c.info.name == name || c.info.display_name == name)
        })
    }

    fn mark_focused_read(&mut self) {
        if let Some(channel) = self.channels.get_mut(self.focus.focus()) {
            channel.unread = 0;
        }
    }

    /// Append a client message to the focused channel.
    pub fn post_client_message(
        &mut self,
        text: impl Into<String>,
        kind: ClientMessageKind,
    ) -> Option<LocalId> {
        let id = self.focus.focus().clone();
        self.post_client_message_to(&id, text, kind)
    }

    pub fn post_client_message_to(
        &mut self,
        channel: &ChannelId,
        text: impl Into<String>,
        kind: ClientMessageKind,
    ) -> Option<LocalId> {
        let text = text.into();
        match self.channels.get_mut(channel) {
            Some(state) => Some(state.log.add_local(text, Utc::now(), kind)),
            None => {
                tracing::warn!("dropping client message for unknown channel {channel}: {text}");
                None
            }
        }
    }

    pub fn post_error(&mut self, text: impl Into<String>) -> Option<LocalId> {
        self.post_client_message(text, ClientMessageKind::Error)
    }

    pub fn post_info(&mut self, text: impl Into<String>) -> Option<LocalId> {
        self.post_client_message(text, ClientMessageKind::Info)
    }

    /// Add a live post. Counts it as unread unless its channel is focused.
    pub fn add_remote_post(&mut self, post: Post) -> bool {
        let focused = &post.channel_id == self.focus.focus();
        match self.channels.get_mut(&post.channel_id) {
            Some(channel) => {
                let added = channel.log.add_remote(post);
                if added && !focused {
                    channel.unread += 1;
                }
                added
            }
            None => {
                tracing::warn!("post {} for unknown channel {}", post.id, post.channel_id);
                false
            }
        }
    }

    pub fn apply_remote_event(&mut self, event: RemoteEvent) -> Result<()> {
        match event {
            RemoteEvent::Posted(post) => {
                self.add_remote_post(post);
            }
            RemoteEvent::PostEdited(post) => match self.channels.get_mut(&post.channel_id) {
                Some(channel) => {
                    if !channel.log.edit_remote(post) {
                        tracing::debug!("ignoring edit of a post not in the log");
                    }
                }
                None => tracing::warn!("edit for unknown channel {}", post.channel_id),
            },
            RemoteEvent::PostDeleted {
                channel_id,
                post_id,
            } => match self.channels.get_mut(&channel_id) {
                Some(channel) => {
                    channel.log.remove_remote(&post_id);
                }
                None => tracing::warn!("delete for unknown channel {channel_id}"),
            },
            RemoteEvent::StatusChanged { user_id, status } => {
                if !self.users.set_status(&user_id, status) {
                    tracing::debug!("status for unknown user {user_id}");
                }
            }
            RemoteEvent::ChannelAdded(channel) => self.add_channel(channel)?,
        }
        Ok(())
    }

    /// Insert (or replace the metadata of) a channel and rebuild the ring,
    /// keeping focus where it was.
    pub fn add_channel(&mut self, channel: Channel) -> Result<()> {
        match self.channels.get_mut(&channel.id) {
            Some(existing) => existing.info = channel,
            None => {
                self.channels
                    .insert(channel.id.clone(), ChannelState::new(channel));
            }
        }
        let infos: Vec<Channel> = self.channels.values().map(|c| c.info.clone()).collect();
        self.focus.update_list(ring_order(&infos))
    }

    pub fn apply_statuses(&mut self, statuses: &HashMap<UserId, String>) {
        self.users.apply_statuses(statuses);
    }

    pub fn set_time_zone(&mut self, zone: impl Into<String>) {
        self.time_zone = Some(zone.into());
    }

    pub fn time_zone(&self) -> Option<&str> {
        self.time_zone.as_deref()
    }

    /// Replace the editor contents. Misspellings computed for older text no
    /// longer apply and are cleared.
    pub fn set_editor_text(&mut self, text: impl Into<String>) {
        self.editor = text.into();
        self.misspellings.clear();
    }

    pub fn editor_text(&self) -> &str {
        &self.editor
    }

    /// Record the editor contents as a client message in the focused channel
    /// and clear the editor. Does nothing for blank input.
    pub fn send_editor(&mut self) -> Option<LocalId> {
        if self.editor.trim().is_empty() {
            return None;
        }
        let text = std::mem::take(&mut self.editor);
        self.misspellings.clear();
        self.post_info(text)
    }

    /// Store spell-check results, but only if they were computed for the
    /// current editor contents.
    pub fn set_misspellings(&mut self, checked_text: &str, words: BTreeSet<String>) -> bool {
        if checked_text != self.editor {
            tracing::debug!("discarding stale spell-check results");
            return false;
        }
        self.misspellings = words;
        true
    }

    pub fn misspellings(&self) -> &BTreeSet<String> {
        &self.misspellings
    }

    pub fn preference(&self, category: &str, name: &str) -> Option<&str> {
        self.preferences
            .iter()
            .find(|p| p.category == category && p.name == name)
            .map(|p| p.value.as_str())
    }

    pub fn is_flagged(&self, reference: &PostRef) -> bool {
        match reference {
            PostRef::Remote(id) => self
                .preference(FLAGGED_POST_CATEGORY, id.as_str())
                .is_some_and(|v| v == "true"),
            PostRef::Local(_) => false,
        }
    }

    /// Transcript of the focused channel, oldest first.
    pub fn render_focused(&self) -> Vec<TranscriptLine> {
        self.focused_channel()
            .map(|channel| {
                channel
                    .log
                    .render(&self.users)
                    .into_iter()
                    .map(|message| TranscriptLine {
                        flagged: self.is_flagged(&message.reference),
                        message,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl MutationTarget for ChatState {
    fn report_mutation_error(&mut self, message: String) {
        if self.post_error(message.clone()).is_none() {
            tracing::error!("could not surface mutation error: {message}");
        }
    }
}

/// Ring order: non-direct channels sorted by name, then direct channels
/// sorted by display name.
fn ring_order(channels: &[Channel]) -> Vec<ChannelId> {
    let (mut direct, mut named): (Vec<&Channel>, Vec<&Channel>) = channels
        .iter()
        .partition(|c| c.kind == ChannelKind::Direct);
    named.sort_by(|a, b| a.name.cmp(&b.name));
    direct.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    named
        .into_iter()
        .chain(direct)
        .map(|c| c.id.clone())
        .collect()
}

/// Fail with [`CoreErr::UnknownChannel`] unless `name` resolves, then focus it.
pub(crate) fn focus_initial(state: &mut ChatState, name: &str) -> Result<()> {
    let id = state
        .channel_id_by_name(name)
        .cloned()
        .ok_or_else(|| CoreErr::UnknownChannel(name.to_string()))?;
    state.focus.find_right(|c| *c == id);
    state.mark_focused_read();
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    use super::*;
    use crate::api::PostId;
    use crate::message_log::CLIENT_MESSAGE_LABEL;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    fn channel(id: &str, name: &str, kind: ChannelKind) -> Channel {
        Channel {
            id: ChannelId::new(id),
            name: name.to_string(),
            display_name: name.to_string(),
            kind,
        }
    }

    fn post(id: &str, channel: &str, text: &str) -> Post {
        Post {
            id: PostId::new(id),
            channel_id: ChannelId::new(channel),
            user_id: UserId::new("u1"),
            message: text.to_string(),
            create_at: Utc::now(),
        }
    }

    fn state() -> ChatState {
        ChatState::new(
            User {
                id: UserId::new("u1"),
                username: "ana".to_string(),
            },
            vec![
                channel("c-town", "town-square", ChannelKind::Public),
                channel("c-dm", "bo", ChannelKind::Direct),
                channel("c-dev", "dev", ChannelKind::Private),
            ],
            Vec::new(),
            vec![Preference {
                category: FLAGGED_POST_CATEGORY.to_string(),
                name: "p-flag".to_string(),
                value: "true".to_string(),
            }],
        )
        .expect("state")
    }

    fn ring(state: &ChatState) -> Vec<&str> {
        state.channel_ids().map(ChannelId::as_str).collect()
    }

    #[test]
    fn empty_channel_list_is_rejected() {
        let me = User {
            id: UserId::new("u1"),
            username: "ana".to_string(),
        };
        assert_matches!(
            ChatState::new(me, Vec::new(), Vec::new(), Vec::new()),
            Err(CoreErr::EmptyZipper)
        );
    }

    #[test]
    fn ring_puts_direct_messages_last() {
        let state = state();
        assert_eq!(ring(&state), vec!["c-dev", "c-town", "c-dm"]);
    }

    #[test]
    fn unread_counts_clear_on_focus() {
        let mut state = state();
        assert!(state.add_remote_post(post("p1", "c-town", "hello")));
        assert!(state.add_remote_post(post("p2", "c-dev", "mine")));
        assert_eq!(state.channel(&ChannelId::new("c-town")).map(|c| c.unread), Some(1));
        assert_eq!(state.channel(&ChannelId::new("c-dev")).map(|c| c.unread), Some(0));

        state.next_channel();
        assert_eq!(state.focused_channel_id().as_str(), "c-town");
        assert_eq!(state.channel(&ChannelId::new("c-town")).map(|c| c.unread), Some(0));
    }

    #[test]
    fn jump_by_name_reports_missing_channel() {
        let mut state = state();
        assert!(state.focus_channel_by_name("bo"));
        assert_eq!(state.focused_channel_id().as_str(), "c-dm");

        assert!(!state.focus_channel_by_name("nowhere"));
        assert_eq!(state.focused_channel_id().as_str(), "c-dm");
        let lines = state.render_focused();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].message.author, CLIENT_MESSAGE_LABEL);
        assert_eq!(lines[0].message.text, "No channel named nowhere");
    }

    #[test]
    fn remote_events_fold_into_logs() {
        let mut state = state();
        state
            .apply_remote_event(RemoteEvent::Posted(post("p-flag", "c-dev", "v1")))
            .expect("posted");
        state
            .apply_remote_event(RemoteEvent::PostEdited(post("p-flag", "c-dev", "v2")))
            .expect("edited");
        let lines = state.render_focused();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].message.text, "v2");
        assert!(lines[0].flagged);

        state
            .apply_remote_event(RemoteEvent::PostDeleted {
                channel_id: ChannelId::new("c-dev"),
                post_id: PostId::new("p-flag"),
            })
            .expect("deleted");
        assert!(state.render_focused().is_empty());

        state
            .apply_remote_event(RemoteEvent::StatusChanged {
                user_id: UserId::new("u1"),
                status: "away".to_string(),
            })
            .expect("status");
        assert_eq!(
            state.users().get(&UserId::new("u1")).map(|u| u.status.as_str()),
            Some("away")
        );
    }

    #[test]
    fn added_channel_joins_ring_without_moving_focus() {
        let mut state = state();
        state.next_channel();
        state
            .apply_remote_event(RemoteEvent::ChannelAdded(channel(
                "c-alpha",
                "alpha",
                ChannelKind::Public,
            )))
            .expect("added");
        assert_eq!(ring(&state), vec!["c-alpha", "c-dev", "c-town", "c-dm"]);
        assert_eq!(state.focused_channel_id().as_str(), "c-town");
    }

    #[test]
    fn stale_misspellings_are_discarded() {
        let mut state = state();
        state.set_editor_text("helo wrld");
        let words: BTreeSet<String> = ["helo".to_string()].into();
        assert!(!state.set_misspellings("helo", words.clone()));
        assert!(state.misspellings().is_empty());
        assert!(state.set_misspellings("helo wrld", words));
        assert_eq!(state.misspellings().len(), 1);

        state.set_editor_text("hello world");
        assert!(state.misspellings().is_empty());
    }

    #[test]
    fn send_editor_posts_and_clears() {
        let mut state = state();
        state.set_editor_text("   ");
        assert_eq!(state.send_editor(), None);
        state.set_editor_text("ship it");
        assert_eq!(state.send_editor(), Some(LocalId(1)));
        assert_eq!(state.editor_text(), "");
        assert_eq!(state.render_focused()[0].message.text, "ship it");
    }

    #[test]
    fn mutation_errors_land_in_focused_channel() {
        let mut state = state();
        state.report_mutation_error("Error: boom".to_string());
        let channel = state.focused_channel().expect("focused");
        let id = match channel.log.references().next() {
            Some(PostRef::Local(id)) => *id,
            other => panic!("unexpected reference {other:?}"),
        };
        assert_eq!(
            channel.log.local_message(id).map(|m| m.kind),
            Some(ClientMessageKind::Error)
        );
    }

    #[test]
    fn initial_focus_must_resolve() {
        let mut state = state();
        focus_initial(&mut state, "town-square").expect("focus");
        assert_eq!(state.focused_channel_id().as_str(), "c-town");
        assert_matches!(
            focus_initial(&mut state, "missing"),
            Err(CoreErr::UnknownChannel(name)) if name == "missing"
        );
    }
}
