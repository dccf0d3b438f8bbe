use crate::api::ChatApi;
use crate::api::Credentials;
use crate::config::Config;
use crate::error::Result;
use crate::history::InputHistory;
use crate::message_log::ClientMessageKind;
use crate::state::ChatState;
use crate::state::focus_initial;

/// Log in and build the initial [`ChatState`].
///
/// Login, channel, user and preference failures are fatal, as is an
/// `initial_channel` that names no channel. A channel whose history cannot be
/// fetched starts empty with an error message in its log.
pub fn start_session(
    api: &dyn ChatApi,
    config: &Config,
    credentials: &Credentials,
) -> Result<ChatState> {
    let me = api.login(credentials)?;
    tracing::info!("logged in to {} as {}", config.server_url, me.username);

    let channels = api.fetch_channels()?;
    let users = api.fetch_users()?;
    let preferences = api.fetch_preferences()?;
    let channel_ids: Vec<_> = channels.iter().map(|c| c.id.clone()).collect();

    let mut state = ChatState::new(me, channels, users, preferences)?;

    for id in &channel_ids {
        match api.fetch_posts(id) {
            Ok(mut posts) => {
                posts.sort_by_key(|p| p.create_at);
                for post in posts {
                    state.seed_post(post);
                }
            }
            Err(e) => {
                tracing::warn!("failed to load history for {id}: {e}");
                state.post_client_message_to(
                    id,
                    format!("Could not load channel history: {e}"),
                    ClientMessageKind::Error,
                );
            }
        }
    }

    focus_initial(&mut state, &config.initial_channel)?;

    match InputHistory::load(&config.history_file) {
        Ok(history) => state.set_history(history),
        Err(e) => tracing::warn!(
            "failed to read history from {}: {e}",
            config.history_file.display()
        ),
    }

    tracing::info!(
        "session ready: {} channels, {} users",
        channel_ids.len(),
        state.users().len()
    );
    Ok(state)
}
