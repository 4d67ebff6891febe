use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The server sometimes sends `null` for list fields; read it as empty.
fn nullable_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The authenticated identity, as returned by sign-in and profile endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Channels owned by this identity.
    #[serde(default, deserialize_with = "nullable_list")]
    pub channels: Vec<String>,
    /// Channels this identity follows.
    #[serde(default, deserialize_with = "nullable_list")]
    pub subscribed_channels: Vec<String>,
}

impl User {
    pub fn is_subscribed_to(&self, channel_id: &str) -> bool {
        self.subscribed_channels.iter().any(|c| c == channel_id)
    }

    pub fn owns_channel(&self, channel_id: &str) -> bool {
        self.channels.iter().any(|c| c == channel_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    #[serde(rename = "_id")]
    pub id: String,
    pub channel_name: String,
    #[serde(default)]
    pub handle: String,
    /// Owning user ID.
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub channel_avatar: Option<String>,
    #[serde(default)]
    pub channel_banner: Option<String>,
    #[serde(default)]
    pub subscribers: u64,
    #[serde(default, deserialize_with = "nullable_list")]
    pub videos: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub views: u64,
    #[serde(default, deserialize_with = "nullable_list")]
    pub tags: Vec<String>,
    /// Identity IDs that liked this video.
    #[serde(default, deserialize_with = "nullable_list")]
    pub likes: Vec<String>,
    /// Identity IDs that disliked this video.
    #[serde(default, deserialize_with = "nullable_list")]
    pub dislikes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub video_id: String,
    #[serde(default)]
    pub user_id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Result of a successful sign-in: the bearer token plus the identity.
#[derive(Debug, Clone)]
pub struct SignInResponse {
    pub token: String,
    pub user: User,
}

/// Body of a video upload: the validated form plus the target channel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVideo<'a> {
    #[serde(flatten)]
    pub input: &'a crate::validation::VideoInput,
    pub channel_id: &'a str,
}

/// Body of a new comment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment<'a> {
    pub description: &'a str,
    pub video_id: &'a str,
}
