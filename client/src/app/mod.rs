//! View-layer coordinator.
//!
//! Each handler mirrors one user action: check prerequisites, validate the form,
//! await the API call inside the caller's [`ViewScope`], then dispatch into the
//! stores and emit a [`Notice`]. Stores only ever change after the remote call
//! succeeded, so there is nothing to roll back except lifecycle flags.

pub mod notice;
pub mod scope;
pub mod theme;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::try_join_all;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub use notice::{Notice, NoticeLevel};
pub use scope::ViewScope;
pub use theme::Theme;

use crate::api::{ApiClient, Channel, Comment, User, Video};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::storage::{FileStorage, LocalStorage, TOKEN_KEY};
use crate::store::{SessionAction, SessionStore, Stores, VideoAction, VideoStore};
use crate::validation::{
    ChannelForm, CommentForm, SignInForm, SignUpForm, UserUpdateForm, ValidationErrors, VideoForm,
};

/// Home-page filter chips. "All" means the random feed.
pub const FILTER_CATEGORIES: [&str; 19] = [
    "All",
    "Web Development",
    "Gaming",
    "Sports",
    "Music",
    "React",
    "MongoDB",
    "Funny",
    "Cricket",
    "Football",
    "Animation",
    "Live",
    "Game Development",
    "Movies",
    "Tech",
    "Education",
    "Coding",
    "Vlogs",
    "News",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    All,
    Tag(String),
}

impl Feed {
    /// Map a filter chip label to a feed.
    pub fn from_filter(label: &str) -> Self {
        if label.eq_ignore_ascii_case("all") || label.trim().is_empty() {
            Self::All
        } else {
            Self::Tag(label.to_lowercase())
        }
    }
}

/// Watch page payload: the video (also held by the video store) and its channel.
#[derive(Debug, Clone)]
pub struct VideoPage {
    pub video: Video,
    pub channel: Channel,
}

#[derive(Debug, Clone)]
pub struct ChannelPage {
    pub channel: Channel,
    pub videos: Vec<Video>,
}

#[derive(Debug, Clone, Copy)]
enum Vote {
    Like,
    Dislike,
}

pub struct App {
    api: ApiClient,
    storage: Arc<dyn LocalStorage>,
    stores: Stores,
    notices: mpsc::UnboundedSender<Notice>,
    default_theme: Theme,
    owned_channels: Mutex<Option<OwnedChannels>>,
}

/// Owned-channel records, valid for one identity, one set of owned IDs and one
/// value of `channel_update_trigger`.
struct OwnedChannels {
    user_id: String,
    channel_ids: Vec<String>,
    trigger: u64,
    channels: Vec<Channel>,
}

impl App {
    /// Build the app and the receiving end of its notice stream.
    pub fn new(
        api: ApiClient,
        storage: Arc<dyn LocalStorage>,
        default_theme: Theme,
    ) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Self {
            api,
            stores: Stores::new(storage.clone()),
            storage,
            notices: tx,
            default_theme,
            owned_channels: Mutex::new(None),
        };
        (app, rx)
    }

    /// File-backed storage and an API client, both from config.
    pub fn from_config(config: &ClientConfig) -> Result<(Self, mpsc::UnboundedReceiver<Notice>)> {
        let api = ApiClient::new(
            &config.api.base_url,
            Duration::from_secs(config.api.timeout_secs),
        )?;
        let storage = Arc::new(FileStorage::open(&config.storage.path)?);
        Ok(Self::new(api, storage, config.ui.default_theme))
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn session(&self) -> &SessionStore {
        &self.stores.session
    }

    pub fn video(&self) -> &VideoStore {
        &self.stores.video
    }

    // ── Notices & prerequisites ─────────────────────────────────────

    fn notify_success(&self, message: impl Into<String>) {
        // The receiver may be gone (headless use); notices are best-effort.
        let _ = self.notices.send(Notice::success(message));
    }

    fn notify_error(&self, message: impl Into<String>) {
        let _ = self.notices.send(Notice::error(message));
    }

    /// Log and surface a failed call. Cancelled calls stay silent.
    fn fail<T>(&self, err: ClientError, message: &str) -> Result<T> {
        if !err.is_cancelled() {
            error!(error = %err, "{message}");
            self.notify_error(message);
        }
        Err(err)
    }

    /// Log a failed read that the UI does not announce.
    fn quiet_fail<T>(&self, err: ClientError, what: &str) -> Result<T> {
        if !err.is_cancelled() {
            error!(error = %err, "failed to load {what}");
        }
        Err(err)
    }

    fn check<T>(&self, parsed: std::result::Result<T, ValidationErrors>) -> Result<T> {
        parsed.map_err(|e| {
            self.notify_error(e.first_message());
            ClientError::Validation(e)
        })
    }

    fn prerequisite<T>(&self, message: &'static str) -> Result<T> {
        self.notify_error(message);
        Err(ClientError::Prerequisite(message))
    }

    fn require_user(&self, message: &'static str) -> Result<User> {
        match self.stores.session.current_user() {
            Some(user) => Ok(user),
            None => self.prerequisite(message),
        }
    }

    fn token(&self) -> Result<String> {
        match self.storage.get(TOKEN_KEY) {
            Some(token) if !token.is_empty() => Ok(token),
            _ => {
                self.notify_error("Session expired. Please sign in again.");
                Err(ClientError::NotSignedIn)
            }
        }
    }

    // ── Session ─────────────────────────────────────────────────────

    pub async fn sign_in(&self, scope: &ViewScope, form: SignInForm) -> Result<User> {
        let body = self.check(form.validate())?;
        self.stores.session.dispatch(SessionAction::LoginStart);

        match scope.run(self.api.sign_in(&body)).await {
            Ok(resp) => {
                if let Err(e) = self.storage.set(TOKEN_KEY, &resp.token) {
                    warn!(error = %e, "failed to persist auth token");
                }
                info!(user_id = %resp.user.id, "signed in");
                self.stores
                    .session
                    .dispatch(SessionAction::LoginSuccess(resp.user.clone()));
                self.notify_success("Welcome Back!");
                Ok(resp.user)
            }
            Err(e) if e.is_cancelled() => {
                self.stores.session.dispatch(SessionAction::LoginCancelled);
                Err(e)
            }
            Err(e) => {
                self.stores.session.dispatch(SessionAction::LoginFailure);
                self.fail(e, "Login failed! Check credentials.")
            }
        }
    }

    pub async fn sign_up(&self, scope: &ViewScope, form: SignUpForm) -> Result<()> {
        let body = self.check(form.validate())?;
        match scope.run(self.api.sign_up(&body)).await {
            Ok(()) => {
                info!(username = %body.username, "account created");
                self.notify_success("Account created! Please Sign in.");
                Ok(())
            }
            Err(e) => self.fail(e, "Registration failed! Email or Username might be taken."),
        }
    }

    pub fn sign_out(&self) {
        self.stores.session.dispatch(SessionAction::Logout);
        self.stores.video.dispatch(VideoAction::Clear);
        info!("signed out");
        self.notify_success("Logged out successfully");
    }

    pub async fn update_profile(&self, scope: &ViewScope, form: UserUpdateForm) -> Result<User> {
        let user = self.require_user("Please sign in to update your profile.")?;
        let body = self.check(form.validate())?;
        let token = self.token()?;

        match scope.run(self.api.update_user(&token, &user.id, &body)).await {
            Ok(updated) => {
                self.stores
                    .session
                    .dispatch(SessionAction::LoginSuccess(updated.clone()));
                self.notify_success("Profile updated successfully!");
                Ok(updated)
            }
            Err(e) => self.fail(e, "Failed to update profile."),
        }
    }

    pub async fn delete_account(&self, scope: &ViewScope) -> Result<()> {
        let user = self.require_user("Please sign in to delete your account.")?;
        let token = self.token()?;

        match scope.run(self.api.delete_user(&token, &user.id)).await {
            Ok(()) => {
                info!(user_id = %user.id, "account deleted");
                self.stores.session.dispatch(SessionAction::Logout);
                self.stores.video.dispatch(VideoAction::Clear);
                self.notify_success("Account deleted successfully");
                Ok(())
            }
            Err(e) => self.fail(e, "Failed to delete account"),
        }
    }

    /// Re-fetch the identity so optimistic subscription/channel edits converge
    /// on server state. Returns `None` without a session.
    pub async fn refresh_session(&self, scope: &ViewScope) -> Result<Option<User>> {
        let Some(user) = self.stores.session.current_user() else {
            return Ok(None);
        };
        match scope.run(self.api.find_user(&user.id)).await {
            Ok(fresh) => {
                self.stores
                    .session
                    .dispatch(SessionAction::LoginSuccess(fresh.clone()));
                Ok(Some(fresh))
            }
            Err(e) => self.quiet_fail(e, "session identity"),
        }
    }

    // ── Browsing ────────────────────────────────────────────────────

    pub async fn home_feed(&self, scope: &ViewScope, feed: &Feed) -> Result<Vec<Video>> {
        let result = match feed {
            Feed::All => scope.run(self.api.random_videos()).await,
            Feed::Tag(tag) => {
                scope
                    .run(self.api.videos_by_tags(&[tag.to_lowercase()]))
                    .await
            }
        };
        result.or_else(|e| self.quiet_fail(e, "home feed"))
    }

    /// Videos sharing any of `tags`; the random feed when there are none.
    pub async fn recommendations(&self, scope: &ViewScope, tags: &[String]) -> Result<Vec<Video>> {
        let result = if tags.is_empty() {
            scope.run(self.api.random_videos()).await
        } else {
            scope.run(self.api.videos_by_tags(tags)).await
        };
        result.or_else(|e| self.quiet_fail(e, "recommendations"))
    }

    /// Blank queries are not sent.
    pub async fn search(&self, scope: &ViewScope, query: &str) -> Result<Vec<Video>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        scope
            .run(self.api.search_videos(query))
            .await
            .or_else(|e| self.quiet_fail(e, "search results"))
    }

    // ── Watch page ──────────────────────────────────────────────────

    /// Load a video and its channel, make it current, then count the view.
    pub async fn open_video(&self, scope: &ViewScope, video_id: &str) -> Result<VideoPage> {
        self.stores.video.dispatch(VideoAction::FetchStart);

        let fetched = scope
            .run(async {
                let video = self.api.find_video(video_id).await?;
                let channel = self.api.find_channel(&video.channel_id).await?;
                Ok::<_, ClientError>((video, channel))
            })
            .await;

        match fetched {
            Ok((video, channel)) => {
                self.stores
                    .video
                    .dispatch(VideoAction::FetchSuccess(video.clone()));
                if let Err(e) = scope.run(self.api.add_view(video_id)).await {
                    warn!(%video_id, error = %e, "failed to register view");
                }
                Ok(VideoPage { video, channel })
            }
            Err(e) if e.is_cancelled() => {
                self.stores.video.dispatch(VideoAction::RequestCancelled);
                Err(e)
            }
            Err(e) => {
                self.stores.video.dispatch(VideoAction::FetchFailure);
                self.quiet_fail(e, "video")
            }
        }
    }

    /// Replace the current video with the server's copy, discarding any local
    /// drift in the like/dislike sets. `None` when no video is open.
    pub async fn refresh_video(&self, scope: &ViewScope) -> Result<Option<Video>> {
        let Some(video_id) = self.stores.video.current_video_id() else {
            return Ok(None);
        };
        let video = scope
            .run(self.api.find_video(&video_id))
            .await
            .or_else(|e| self.quiet_fail(e, "video"))?;

        if self.stores.video.current_video_id().as_deref() != Some(video_id.as_str()) {
            warn!(%video_id, "navigated away before refresh completed");
            return Ok(None);
        }
        self.stores
            .video
            .dispatch(VideoAction::FetchSuccess(video.clone()));
        Ok(Some(video))
    }

    pub fn leave_video(&self) {
        self.stores.video.dispatch(VideoAction::Clear);
    }

    pub async fn toggle_like(&self, scope: &ViewScope) -> Result<()> {
        self.vote(scope, Vote::Like).await
    }

    pub async fn toggle_dislike(&self, scope: &ViewScope) -> Result<()> {
        self.vote(scope, Vote::Dislike).await
    }

    async fn vote(&self, scope: &ViewScope, vote: Vote) -> Result<()> {
        let user = match vote {
            Vote::Like => self.require_user("Please sign in to like videos!")?,
            Vote::Dislike => self.require_user("Please sign in to dislike videos!")?,
        };
        let Some(video_id) = self.stores.video.current_video_id() else {
            return self.prerequisite("Open a video first.");
        };
        let token = self.token()?;

        let result = match vote {
            Vote::Like => scope.run(self.api.like(&token, &video_id)).await,
            Vote::Dislike => scope.run(self.api.dislike(&token, &video_id)).await,
        };
        if let Err(e) = result {
            return self.quiet_fail(e, "vote acknowledgement");
        }

        // The response belongs to `video_id`; skip it if the view moved on.
        if self.stores.video.current_video_id().as_deref() != Some(video_id.as_str()) {
            warn!(%video_id, "vote acknowledged after navigation; not applied");
            return Ok(());
        }
        let action = match vote {
            Vote::Like => VideoAction::Like(user.id),
            Vote::Dislike => VideoAction::Dislike(user.id),
        };
        self.stores.video.dispatch(action);
        Ok(())
    }

    /// Follow or unfollow `channel`, keeping its displayed subscriber count in
    /// step. Returns whether the identity is now subscribed.
    pub async fn toggle_subscription(&self, scope: &ViewScope, channel: &mut Channel) -> Result<bool> {
        let user = self.require_user("Please sign in to subscribe!")?;
        let token = self.token()?;
        let was_subscribed = user.is_subscribed_to(&channel.id);

        let result = if was_subscribed {
            scope.run(self.api.unsubscribe(&token, &channel.id)).await
        } else {
            scope.run(self.api.subscribe(&token, &channel.id)).await
        };
        if let Err(e) = result {
            return self.quiet_fail(e, "subscription acknowledgement");
        }

        self.stores
            .session
            .dispatch(SessionAction::Subscription(channel.id.clone()));
        channel.subscribers = if was_subscribed {
            channel.subscribers.saturating_sub(1)
        } else {
            channel.subscribers + 1
        };
        info!(channel_id = %channel.id, subscribed = !was_subscribed, "subscription toggled");
        Ok(!was_subscribed)
    }

    // ── Channels ────────────────────────────────────────────────────

    /// Every channel the identity owns, fetched concurrently. The result is
    /// reused until the identity, its owned IDs or `channel_update_trigger` change.
    pub async fn my_channels(&self, scope: &ViewScope) -> Result<Vec<Channel>> {
        let state = self.stores.session.snapshot();
        let Some(user) = state.current_user else {
            return Ok(Vec::new());
        };
        let trigger = state.channel_update_trigger;

        if let Some(cached) = self.owned_cache().as_ref()
            && cached.user_id == user.id
            && cached.channel_ids == user.channels
            && cached.trigger == trigger
        {
            return Ok(cached.channels.clone());
        }

        let fetches = user.channels.iter().map(|id| self.api.find_channel(id));
        let channels = scope
            .run(try_join_all(fetches))
            .await
            .or_else(|e| self.quiet_fail(e, "owned channels"))?;

        *self.owned_cache() = Some(OwnedChannels {
            user_id: user.id,
            channel_ids: user.channels,
            trigger,
            channels: channels.clone(),
        });
        Ok(channels)
    }

    fn owned_cache(&self) -> std::sync::MutexGuard<'_, Option<OwnedChannels>> {
        self.owned_channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn open_channel(&self, scope: &ViewScope, channel_id: &str) -> Result<ChannelPage> {
        scope
            .run(async {
                let channel = self.api.find_channel(channel_id).await?;
                let videos = self.api.channel_videos(channel_id).await?;
                Ok::<_, ClientError>(ChannelPage { channel, videos })
            })
            .await
            .or_else(|e| self.quiet_fail(e, "channel"))
    }

    pub async fn create_channel(&self, scope: &ViewScope, form: ChannelForm) -> Result<Channel> {
        self.require_user("Please sign in to create a channel.")?;
        let input = self.check(form.validate())?;
        let token = self.token()?;

        match scope.run(self.api.create_channel(&token, &input)).await {
            Ok(channel) => {
                info!(channel_id = %channel.id, handle = %channel.handle, "channel created");
                self.stores
                    .session
                    .dispatch(SessionAction::CreateChannel(channel.id.clone()));
                self.notify_success("Channel created successfully!");
                Ok(channel)
            }
            Err(e) if e.is_conflict() => {
                self.fail(e, "Handle already taken! Please choose another one.")
            }
            Err(e) => self.fail(e, "Failed to create channel. Please try again."),
        }
    }

    pub async fn update_channel(
        &self,
        scope: &ViewScope,
        channel_id: &str,
        form: ChannelForm,
    ) -> Result<Channel> {
        self.require_user("Please sign in to edit a channel.")?;
        let input = self.check(form.validate())?;
        let token = self.token()?;

        match scope
            .run(self.api.update_channel(&token, channel_id, &input))
            .await
        {
            Ok(channel) => {
                self.stores.session.dispatch(SessionAction::ChannelUpdated);
                self.notify_success("Channel updated successfully!");
                Ok(channel)
            }
            Err(e) if e.is_conflict() => {
                self.fail(e, "Handle already taken! Please choose another one.")
            }
            Err(e) => self.fail(e, "Failed to update channel. Please try again."),
        }
    }

    pub async fn delete_channel(&self, scope: &ViewScope, channel_id: &str) -> Result<()> {
        self.require_user("Please sign in to delete a channel.")?;
        let token = self.token()?;

        match scope.run(self.api.delete_channel(&token, channel_id)).await {
            Ok(()) => {
                info!(%channel_id, "channel deleted");
                self.stores
                    .session
                    .dispatch(SessionAction::ChannelDeleted(channel_id.to_string()));
                self.notify_success("Channel deleted successfully");
                Ok(())
            }
            Err(e) => self.fail(e, "Failed to delete channel"),
        }
    }

    // ── Videos ──────────────────────────────────────────────────────

    /// Publish a new video to one of the identity's channels (the first owned
    /// channel when `channel_id` is `None`). The uploaded video becomes current.
    pub async fn upload_video(
        &self,
        scope: &ViewScope,
        channel_id: Option<&str>,
        form: VideoForm,
    ) -> Result<Video> {
        let user = self.require_user("Please sign in to upload videos!")?;
        let Some(first_channel) = user.channels.first() else {
            return self.prerequisite("Please create a channel first to upload videos!");
        };
        let channel_id = channel_id.unwrap_or(first_channel);
        if !user.owns_channel(channel_id) {
            return self.prerequisite("You can only upload to your own channels.");
        }

        let mut input = self.check(form.validate())?;
        if input.video_url.is_none() {
            return self.prerequisite("Video URL is required for new uploads");
        }
        input.tags.get_or_insert_with(Vec::new);
        let token = self.token()?;

        self.stores.video.dispatch(VideoAction::UploadStart);
        match scope
            .run(self.api.create_video(&token, &input, channel_id))
            .await
        {
            Ok(video) => {
                info!(video_id = %video.id, %channel_id, "video uploaded");
                self.stores
                    .video
                    .dispatch(VideoAction::UploadSuccess(video.clone()));
                Ok(video)
            }
            Err(e) if e.is_cancelled() => {
                self.stores.video.dispatch(VideoAction::RequestCancelled);
                Err(e)
            }
            Err(e) => {
                self.stores.video.dispatch(VideoAction::UploadFailure);
                self.fail(e, "Something went wrong!")
            }
        }
    }

    /// Update an existing video; the edited record becomes current.
    pub async fn edit_video(&self, scope: &ViewScope, video_id: &str, form: VideoForm) -> Result<Video> {
        self.require_user("Please sign in to edit videos!")?;
        let input = self.check(form.validate())?;
        let token = self.token()?;

        self.stores.video.dispatch(VideoAction::UploadStart);
        match scope
            .run(self.api.update_video(&token, video_id, &input))
            .await
        {
            Ok(video) => {
                info!(%video_id, "video updated");
                self.stores
                    .video
                    .dispatch(VideoAction::UploadSuccess(video.clone()));
                Ok(video)
            }
            Err(e) if e.is_cancelled() => {
                self.stores.video.dispatch(VideoAction::RequestCancelled);
                Err(e)
            }
            Err(e) => {
                self.stores.video.dispatch(VideoAction::UploadFailure);
                self.fail(e, "Something went wrong!")
            }
        }
    }

    pub async fn delete_video(&self, scope: &ViewScope, video_id: &str) -> Result<()> {
        self.require_user("Please sign in to delete videos!")?;
        let token = self.token()?;

        match scope.run(self.api.delete_video(&token, video_id)).await {
            Ok(()) => {
                info!(%video_id, "video deleted");
                if self.stores.video.current_video_id().as_deref() == Some(video_id) {
                    self.stores.video.dispatch(VideoAction::Clear);
                }
                self.notify_success("Video deleted successfully");
                Ok(())
            }
            Err(e) => self.fail(e, "Failed to delete video"),
        }
    }

    // ── Comments ────────────────────────────────────────────────────

    pub async fn comments(&self, scope: &ViewScope, video_id: &str) -> Result<Vec<Comment>> {
        scope
            .run(self.api.comments(video_id))
            .await
            .or_else(|e| self.quiet_fail(e, "comments"))
    }

    /// Public profile of a comment's author.
    pub async fn comment_author(&self, scope: &ViewScope, user_id: &str) -> Result<User> {
        scope
            .run(self.api.find_user(user_id))
            .await
            .or_else(|e| self.quiet_fail(e, "comment author"))
    }

    pub async fn add_comment(&self, scope: &ViewScope, video_id: &str, form: CommentForm) -> Result<Comment> {
        self.require_user("Please sign in to comment.")?;
        let input = self.check(form.validate())?;
        let token = self.token()?;

        match scope.run(self.api.add_comment(&token, video_id, &input)).await {
            Ok(comment) => {
                self.notify_success("Comment posted!");
                Ok(comment)
            }
            Err(e) => self.fail(e, "Failed to post comment"),
        }
    }

    pub async fn edit_comment(&self, scope: &ViewScope, comment_id: &str, form: CommentForm) -> Result<()> {
        self.require_user("Please sign in to edit comments.")?;
        let input = self.check(form.validate())?;
        let token = self.token()?;

        match scope
            .run(self.api.update_comment(&token, comment_id, &input))
            .await
        {
            Ok(()) => {
                self.notify_success("Comment Updated");
                Ok(())
            }
            Err(e) => self.fail(e, "Failed to update comment"),
        }
    }

    pub async fn delete_comment(&self, scope: &ViewScope, comment_id: &str) -> Result<()> {
        if comment_id.trim().is_empty() {
            return self.prerequisite("Error: Comment ID is missing!");
        }
        self.require_user("Please sign in to delete comments.")?;
        let token = self.token()?;

        match scope.run(self.api.delete_comment(&token, comment_id)).await {
            Ok(()) => {
                self.notify_success("Comment Deleted");
                Ok(())
            }
            Err(e) => self.fail(e, "Failed to delete comment"),
        }
    }

    // ── Preferences ─────────────────────────────────────────────────

    pub fn theme(&self) -> Theme {
        theme::load_theme(self.storage.as_ref(), self.default_theme)
    }

    pub fn set_theme(&self, theme: Theme) {
        theme::save_theme(self.storage.as_ref(), theme);
    }

    pub fn toggle_theme(&self) -> Theme {
        let next = self.theme().toggled();
        self.set_theme(next);
        next
    }
}
