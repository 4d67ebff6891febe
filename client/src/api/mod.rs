//! Remote HTTP/JSON API boundary.

pub mod client;
pub mod models;

pub use client::ApiClient;
pub use models::{Channel, Comment, SignInResponse, User, Video};
