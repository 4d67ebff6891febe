//! Form schemas. Each form validates independently and yields the request body
//! the API expects, or every issue found in field order.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Minimum username length (sign-up and profile update).
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Minimum password length on sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Minimum channel handle length.
pub const MIN_HANDLE_LENGTH: usize = 3;

/// Maximum length of channel and video descriptions.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Maximum video title length.
pub const MAX_TITLE_LENGTH: usize = 100;

/// Maximum comment length.
pub const MAX_COMMENT_LENGTH: usize = 500;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

static HANDLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("handle pattern is valid"));

/// One failed constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub field: &'static str,
    pub message: String,
}

impl Issue {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Ordered, non-empty list of issues from one validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    issues: Vec<Issue>,
}

impl ValidationErrors {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// The message surfaced to the user.
    pub fn first_message(&self) -> &str {
        self.issues.first().map(|i| i.message.as_str()).unwrap_or("Invalid input")
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.issues.iter().any(|i| i.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.first_message())
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Default)]
struct Checker {
    issues: Vec<Issue>,
}

impl Checker {
    fn min_len(&mut self, field: &'static str, value: &str, min: usize, message: &str) {
        if value.chars().count() < min {
            self.issues.push(Issue::new(field, message));
        }
    }

    fn max_len(&mut self, field: &'static str, value: &str, max: usize, message: &str) {
        if value.chars().count() > max {
            self.issues.push(Issue::new(field, message));
        }
    }

    fn email(&mut self, field: &'static str, value: &str, message: &str) {
        if !is_email(value) {
            self.issues.push(Issue::new(field, message));
        }
    }

    fn url(&mut self, field: &'static str, value: &str, message: &str) {
        if !is_url(value) {
            self.issues.push(Issue::new(field, message));
        }
    }

    /// Empty means "not provided"; anything else must be a URL.
    fn optional_url(&mut self, field: &'static str, value: &str, message: &str) {
        if !value.is_empty() {
            self.url(field, value, message);
        }
    }

    fn handle_chars(&mut self, field: &'static str, value: &str, message: &str) {
        if !HANDLE.is_match(value) {
            self.issues.push(Issue::new(field, message));
        }
    }

    fn finish<T>(self, parsed: T) -> Result<T, ValidationErrors> {
        if self.issues.is_empty() {
            Ok(parsed)
        } else {
            Err(ValidationErrors::new(self.issues))
        }
    }
}

/// Absolute URL check (anything `Url::parse` accepts without a base).
pub fn is_url(value: &str) -> bool {
    reqwest::Url::parse(value).is_ok()
}

/// Conventional `local@domain.tld` check: no leading, trailing or doubled dots,
/// alphanumeric domain labels, alphabetic TLD of at least two characters.
pub fn is_email(value: &str) -> bool {
    // The pattern cannot express the dot rules without lookahead.
    !value.starts_with('.') && !value.contains("..") && EMAIL.is_match(value)
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

// ── Sign up ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignUpForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl SignUpForm {
    pub fn validate(self) -> Result<SignUpRequest, ValidationErrors> {
        let mut c = Checker::default();
        c.min_len(
            "username",
            &self.username,
            MIN_USERNAME_LENGTH,
            "Username must be at least 3 characters",
        );
        c.email("email", &self.email, "Invalid email address");
        c.min_len(
            "password",
            &self.password,
            MIN_PASSWORD_LENGTH,
            "Password must be at least 6 characters",
        );
        c.optional_url("avatar", &self.avatar, "Invalid Avatar URL");
        c.finish(SignUpRequest {
            username: self.username,
            email: self.email,
            password: self.password,
            avatar: non_empty(self.avatar),
        })
    }
}

// ── Sign in ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignInForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

impl SignInForm {
    pub fn validate(self) -> Result<SignInRequest, ValidationErrors> {
        let mut c = Checker::default();
        c.min_len("username", &self.username, 1, "Username is required");
        c.min_len("password", &self.password, 1, "Password is required");
        c.finish(SignInRequest {
            username: self.username,
            password: self.password,
        })
    }
}

// ── Profile update ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserUpdateForm {
    pub username: String,
    pub email: String,
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserUpdateForm {
    pub fn validate(self) -> Result<UserUpdate, ValidationErrors> {
        let mut c = Checker::default();
        c.min_len(
            "username",
            &self.username,
            MIN_USERNAME_LENGTH,
            "Username must be at least 3 characters",
        );
        c.email("email", &self.email, "Invalid email address");
        c.optional_url("avatar", &self.avatar, "Invalid Avatar URL");
        c.finish(UserUpdate {
            username: self.username,
            email: self.email,
            avatar: non_empty(self.avatar),
        })
    }
}

// ── Channel ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChannelForm {
    pub channel_name: String,
    pub handle: String,
    pub description: Option<String>,
    pub channel_avatar: String,
    pub channel_banner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInput {
    pub channel_name: String,
    pub handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_banner: Option<String>,
}

impl ChannelForm {
    pub fn validate(self) -> Result<ChannelInput, ValidationErrors> {
        let mut c = Checker::default();
        c.min_len("channelName", &self.channel_name, 1, "Channel Name is required");
        c.min_len(
            "handle",
            &self.handle,
            MIN_HANDLE_LENGTH,
            "Handle must be atleast 3 characters",
        );
        c.handle_chars(
            "handle",
            &self.handle,
            "Handle can only contain letters, numbers, and underscores",
        );
        if let Some(description) = &self.description {
            c.max_len(
                "description",
                description,
                MAX_DESCRIPTION_LENGTH,
                "Description cannot exceed 500 characters",
            );
        }
        c.optional_url("channelAvatar", &self.channel_avatar, "Invalid Avatar URL");
        c.optional_url("channelBanner", &self.channel_banner, "Invalid Banner URL");
        c.finish(ChannelInput {
            channel_name: self.channel_name,
            handle: self.handle,
            description: self.description,
            channel_avatar: non_empty(self.channel_avatar),
            channel_banner: non_empty(self.channel_banner),
        })
    }
}

// ── Video ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VideoForm {
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: String,
    pub video_url: String,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInput {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub thumbnail_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// `None` leaves the stored tags alone on edit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Split a comma-separated tag field, dropping blanks.
pub fn parse_tags(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

impl VideoForm {
    pub fn validate(self) -> Result<VideoInput, ValidationErrors> {
        let mut c = Checker::default();
        c.min_len("title", &self.title, 1, "Video Title is required");
        c.max_len(
            "title",
            &self.title,
            MAX_TITLE_LENGTH,
            "Title too long (max 100 chars)",
        );
        if let Some(description) = &self.description {
            c.max_len(
                "description",
                description,
                MAX_DESCRIPTION_LENGTH,
                "Description cannot exceed 500 characters",
            );
        }
        c.url("thumbnailUrl", &self.thumbnail_url, "Invalid Thumbnail URL");
        c.min_len("thumbnailUrl", &self.thumbnail_url, 1, "Thumbnail URL is required");
        c.optional_url("videoUrl", &self.video_url, "Invalid Video URL");
        c.finish(VideoInput {
            title: self.title,
            description: self.description,
            thumbnail_url: self.thumbnail_url,
            video_url: non_empty(self.video_url),
            tags: self.tags,
        })
    }
}

// ── Comment ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentInput {
    pub description: String,
}

impl CommentForm {
    pub fn validate(self) -> Result<CommentInput, ValidationErrors> {
        let mut c = Checker::default();
        c.min_len("description", &self.description, 1, "Comment cannot be empty");
        c.max_len(
            "description",
            &self.description,
            MAX_COMMENT_LENGTH,
            "Comment is too long (max 500 chars)",
        );
        c.finish(CommentInput {
            description: self.description,
        })
    }
}
