//! Client-side state containers.
//!
//! Each store is the sole writer of its state: callers dispatch actions, the
//! store applies the reducer and notifies subscribers. Stores never touch the
//! network. They are built once at start-up and handed to the view layer by
//! reference.

pub mod session;
pub mod video;

use std::sync::Arc;

use crate::storage::LocalStorage;

pub use session::{SessionAction, SessionState, SessionStore};
pub use video::{VideoAction, VideoState, VideoStore};

/// Both stores, constructed together over one storage backend.
pub struct Stores {
    pub session: SessionStore,
    pub video: VideoStore,
}

impl Stores {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            session: SessionStore::new(storage),
            video: VideoStore::new(),
        }
    }
}

/// Add `id` if absent, remove it if present. Returns true when it was added.
pub(crate) fn toggle(set: &mut Vec<String>, id: &str) -> bool {
    match set.iter().position(|x| x == id) {
        Some(index) => {
            set.remove(index);
            false
        }
        None => {
            set.push(id.to_string());
            true
        }
    }
}

/// Remove `id` if present; no-op otherwise.
pub(crate) fn remove(set: &mut Vec<String>, id: &str) {
    set.retain(|x| x != id);
}
