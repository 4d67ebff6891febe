use tokio::sync::watch;
use tracing::warn;

use super::{remove, toggle};
use crate::api::Video;

/// The one video currently on screen plus its fetch/upload lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoState {
    pub current_video: Option<Video>,
    pub loading: bool,
    pub error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoAction {
    FetchStart,
    FetchSuccess(Video),
    FetchFailure,
    /// Toggle an identity's like. Adding it also withdraws a dislike.
    Like(String),
    /// Toggle an identity's dislike. Adding it also withdraws a like.
    Dislike(String),
    UploadStart,
    UploadSuccess(Video),
    UploadFailure,
    /// A fetch or upload was abandoned with its view; only `loading` is reset.
    RequestCancelled,
    /// Navigation away: forget the current video.
    Clear,
}

impl VideoState {
    pub fn reduce(&mut self, action: VideoAction) {
        match action {
            VideoAction::FetchStart | VideoAction::UploadStart => {
                self.loading = true;
                self.error = false;
            }
            VideoAction::FetchSuccess(video) | VideoAction::UploadSuccess(video) => {
                self.loading = false;
                self.error = false;
                self.current_video = Some(video);
            }
            VideoAction::FetchFailure | VideoAction::UploadFailure => {
                self.loading = false;
                self.error = true;
            }
            VideoAction::RequestCancelled => self.loading = false,
            VideoAction::Like(user_id) => {
                let Some(video) = self.current_video.as_mut() else {
                    warn!(%user_id, "like ignored: no current video");
                    return;
                };
                if toggle(&mut video.likes, &user_id) {
                    remove(&mut video.dislikes, &user_id);
                }
            }
            VideoAction::Dislike(user_id) => {
                let Some(video) = self.current_video.as_mut() else {
                    warn!(%user_id, "dislike ignored: no current video");
                    return;
                };
                if toggle(&mut video.dislikes, &user_id) {
                    remove(&mut video.likes, &user_id);
                }
            }
            VideoAction::Clear => *self = Self::default(),
        }
    }
}

/// Owns [`VideoState`]. Nothing here is persisted.
pub struct VideoStore {
    state: watch::Sender<VideoState>,
}

impl Default for VideoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(VideoState::default());
        Self { state }
    }

    pub fn dispatch(&self, action: VideoAction) {
        self.state.send_modify(|state| state.reduce(action));
    }

    pub fn snapshot(&self) -> VideoState {
        self.state.borrow().clone()
    }

    pub fn current_video(&self) -> Option<Video> {
        self.state.borrow().current_video.clone()
    }

    pub fn current_video_id(&self) -> Option<String> {
        self.state
            .borrow()
            .current_video
            .as_ref()
            .map(|v| v.id.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<VideoState> {
        self.state.subscribe()
    }
}
