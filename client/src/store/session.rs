use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use super::{remove, toggle};
use crate::api::User;
use crate::storage::{LocalStorage, TOKEN_KEY, USER_KEY, read_json, write_json};

/// Authentication lifecycle and the identity's channel relationships.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub current_user: Option<User>,
    /// An authentication request is outstanding.
    pub loading: bool,
    /// The last authentication attempt failed.
    pub error: bool,
    /// Bumped whenever owned-channel metadata changes. Carries no data;
    /// views re-fetch channel details when it moves.
    pub channel_update_trigger: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    LoginStart,
    LoginSuccess(User),
    LoginFailure,
    /// The attempt was abandoned with its view; only `loading` is reset.
    LoginCancelled,
    Logout,
    /// Toggle membership of a channel ID in `subscribed_channels`.
    Subscription(String),
    /// A channel the identity now owns.
    CreateChannel(String),
    ChannelDeleted(String),
    ChannelUpdated,
}

/// Storage side effect a transition asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persist {
    Nothing,
    /// Write the current identity under the user key.
    Identity,
    /// Remove the identity and the auth token.
    Clear,
}

impl SessionState {
    /// Apply one transition. Pure apart from the returned persistence request.
    pub fn reduce(&mut self, action: SessionAction) -> Persist {
        match action {
            SessionAction::LoginStart => {
                self.loading = true;
                self.error = false;
                Persist::Nothing
            }
            SessionAction::LoginSuccess(user) => {
                self.loading = false;
                self.error = false;
                self.current_user = Some(user);
                Persist::Identity
            }
            SessionAction::LoginFailure => {
                self.loading = false;
                self.error = true;
                Persist::Nothing
            }
            SessionAction::LoginCancelled => {
                self.loading = false;
                Persist::Nothing
            }
            SessionAction::Logout => {
                self.current_user = None;
                self.loading = false;
                self.error = false;
                Persist::Clear
            }
            SessionAction::Subscription(channel_id) => {
                let Some(user) = self.current_user.as_mut() else {
                    warn!(%channel_id, "subscription toggle ignored: no session");
                    return Persist::Nothing;
                };
                toggle(&mut user.subscribed_channels, &channel_id);
                Persist::Identity
            }
            SessionAction::CreateChannel(channel_id) => {
                let Some(user) = self.current_user.as_mut() else {
                    warn!(%channel_id, "channel creation ignored: no session");
                    return Persist::Nothing;
                };
                user.channels.push(channel_id);
                Persist::Identity
            }
            SessionAction::ChannelDeleted(channel_id) => {
                let Some(user) = self.current_user.as_mut() else {
                    warn!(%channel_id, "channel deletion ignored: no session");
                    return Persist::Nothing;
                };
                remove(&mut user.channels, &channel_id);
                Persist::Identity
            }
            SessionAction::ChannelUpdated => {
                self.channel_update_trigger += 1;
                Persist::Nothing
            }
        }
    }
}

/// Owns [`SessionState`] and its durable slice (identity + token).
pub struct SessionStore {
    state: watch::Sender<SessionState>,
    storage: Arc<dyn LocalStorage>,
}

impl SessionStore {
    /// Build the store, restoring the last persisted identity if any.
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        let current_user: Option<User> = read_json(storage.as_ref(), USER_KEY);
        if let Some(user) = &current_user {
            info!(user_id = %user.id, "restored session from local storage");
        }

        let (state, _) = watch::channel(SessionState {
            current_user,
            ..Default::default()
        });
        Self { state, storage }
    }

    pub fn dispatch(&self, action: SessionAction) {
        let mut persist = Persist::Nothing;
        self.state.send_modify(|state| persist = state.reduce(action));

        match persist {
            Persist::Nothing => {}
            Persist::Identity => {
                let user = self.state.borrow().current_user.clone();
                if let Some(user) = user
                    && let Err(e) = write_json(self.storage.as_ref(), USER_KEY, &user)
                {
                    warn!(error = %e, "failed to persist identity");
                }
            }
            Persist::Clear => {
                for key in [USER_KEY, TOKEN_KEY] {
                    if let Err(e) = self.storage.remove(key) {
                        warn!(%key, error = %e, "failed to clear persisted session");
                    }
                }
            }
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().current_user.clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.state.borrow().current_user.is_some()
    }

    /// Change notifications for the view layer.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}
