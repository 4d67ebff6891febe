use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::models::{Channel, Comment, NewComment, NewVideo, SignInResponse, User, Video};
use crate::error::{ClientError, Result};
use crate::validation::{
    ChannelInput, CommentInput, SignInRequest, SignUpRequest, UserUpdate, VideoInput,
};

/// Thin typed wrapper over the remote REST API. Holds no session state;
/// authenticated calls take the bearer token explicitly.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

fn seg(id: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(id)
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, %path, "api request");
        self.http
            .request(method, format!("{}{}", self.base_url, path))
    }

    fn authed(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.request(method, path).bearer_auth(token)
    }

    /// Send and return the raw body, mapping non-2xx to `ClientError::Status`.
    async fn execute(&self, req: RequestBuilder) -> Result<Vec<u8>> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status,
                message: error_message(status, &body),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let bytes = self.execute(req).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_ack(&self, req: RequestBuilder) -> Result<()> {
        self.execute(req).await.map(|_| ())
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        body: &B,
    ) -> Result<T> {
        self.send(req.json(body)).await
    }

    // ── Auth ────────────────────────────────────────────────────────

    /// Accepts both `{ token, details: {..} }` and `{ token, ..identity }`.
    pub async fn sign_in(&self, body: &SignInRequest) -> Result<SignInResponse> {
        let mut value: serde_json::Value = self
            .send_json(self.request(Method::POST, "/auth/signin"), body)
            .await?;

        let token = value
            .get("token")
            .and_then(|t| t.as_str())
            .map(String::from)
            .ok_or_else(|| {
                <serde_json::Error as serde::de::Error>::custom("sign-in response has no token")
            })?;

        let details = value.get_mut("details").map(serde_json::Value::take);
        let identity = match details {
            Some(details) => details,
            None => {
                if let Some(obj) = value.as_object_mut() {
                    obj.remove("token");
                }
                value
            }
        };
        let user: User = serde_json::from_value(identity)?;
        Ok(SignInResponse { token, user })
    }

    pub async fn sign_up(&self, body: &SignUpRequest) -> Result<()> {
        self.send_ack(self.request(Method::POST, "/auth/signup").json(body))
            .await
    }

    // ── Users ───────────────────────────────────────────────────────

    pub async fn find_user(&self, user_id: &str) -> Result<User> {
        self.send(self.request(Method::GET, &format!("/users/find/{}", seg(user_id))))
            .await
    }

    pub async fn update_user(&self, token: &str, user_id: &str, body: &UserUpdate) -> Result<User> {
        let req = self.authed(Method::PUT, &format!("/users/{}", seg(user_id)), token);
        self.send_json(req, body).await
    }

    pub async fn delete_user(&self, token: &str, user_id: &str) -> Result<()> {
        self.send_ack(self.authed(Method::DELETE, &format!("/users/{}", seg(user_id)), token))
            .await
    }

    pub async fn subscribe(&self, token: &str, channel_id: &str) -> Result<()> {
        let path = format!("/users/sub/{}", seg(channel_id));
        self.send_ack(self.authed(Method::PUT, &path, token)).await
    }

    pub async fn unsubscribe(&self, token: &str, channel_id: &str) -> Result<()> {
        let path = format!("/users/unsub/{}", seg(channel_id));
        self.send_ack(self.authed(Method::PUT, &path, token)).await
    }

    pub async fn like(&self, token: &str, video_id: &str) -> Result<()> {
        let path = format!("/users/like/{}", seg(video_id));
        self.send_ack(self.authed(Method::PUT, &path, token)).await
    }

    pub async fn dislike(&self, token: &str, video_id: &str) -> Result<()> {
        let path = format!("/users/dislike/{}", seg(video_id));
        self.send_ack(self.authed(Method::PUT, &path, token)).await
    }

    // ── Videos ──────────────────────────────────────────────────────

    pub async fn random_videos(&self) -> Result<Vec<Video>> {
        self.send(self.request(Method::GET, "/videos/random")).await
    }

    pub async fn videos_by_tags(&self, tags: &[String]) -> Result<Vec<Video>> {
        let req = self
            .request(Method::GET, "/videos/tags")
            .query(&[("tags", tags.join(","))]);
        self.send(req).await
    }

    pub async fn search_videos(&self, query: &str) -> Result<Vec<Video>> {
        let req = self.request(Method::GET, "/videos/search").query(&[("q", query)]);
        self.send(req).await
    }

    pub async fn channel_videos(&self, channel_id: &str) -> Result<Vec<Video>> {
        let path = format!("/videos/channel/{}", seg(channel_id));
        self.send(self.request(Method::GET, &path)).await
    }

    pub async fn find_video(&self, video_id: &str) -> Result<Video> {
        let path = format!("/videos/find/{}", seg(video_id));
        self.send(self.request(Method::GET, &path)).await
    }

    /// Server-side view counter; unauthenticated.
    pub async fn add_view(&self, video_id: &str) -> Result<()> {
        let path = format!("/videos/view/{}", seg(video_id));
        self.send_ack(self.request(Method::PUT, &path)).await
    }

    pub async fn create_video(
        &self,
        token: &str,
        input: &VideoInput,
        channel_id: &str,
    ) -> Result<Video> {
        let body = NewVideo { input, channel_id };
        self.send_json(self.authed(Method::POST, "/videos", token), &body)
            .await
    }

    pub async fn update_video(&self, token: &str, video_id: &str, input: &VideoInput) -> Result<Video> {
        let path = format!("/videos/{}", seg(video_id));
        self.send_json(self.authed(Method::PUT, &path, token), input)
            .await
    }

    pub async fn delete_video(&self, token: &str, video_id: &str) -> Result<()> {
        let path = format!("/videos/{}", seg(video_id));
        self.send_ack(self.authed(Method::DELETE, &path, token)).await
    }

    // ── Channels ────────────────────────────────────────────────────

    pub async fn find_channel(&self, channel_id: &str) -> Result<Channel> {
        let path = format!("/channels/find/{}", seg(channel_id));
        self.send(self.request(Method::GET, &path)).await
    }

    pub async fn create_channel(&self, token: &str, input: &ChannelInput) -> Result<Channel> {
        self.send_json(self.authed(Method::POST, "/channels", token), input)
            .await
    }

    pub async fn update_channel(
        &self,
        token: &str,
        channel_id: &str,
        input: &ChannelInput,
    ) -> Result<Channel> {
        let path = format!("/channels/{}", seg(channel_id));
        self.send_json(self.authed(Method::PUT, &path, token), input)
            .await
    }

    pub async fn delete_channel(&self, token: &str, channel_id: &str) -> Result<()> {
        let path = format!("/channels/{}", seg(channel_id));
        self.send_ack(self.authed(Method::DELETE, &path, token)).await
    }

    // ── Comments ────────────────────────────────────────────────────

    pub async fn comments(&self, video_id: &str) -> Result<Vec<Comment>> {
        let path = format!("/comments/{}", seg(video_id));
        self.send(self.request(Method::GET, &path)).await
    }

    pub async fn add_comment(&self, token: &str, video_id: &str, input: &CommentInput) -> Result<Comment> {
        let body = NewComment {
            description: &input.description,
            video_id,
        };
        self.send_json(self.authed(Method::POST, "/comments", token), &body)
            .await
    }

    pub async fn update_comment(&self, token: &str, comment_id: &str, input: &CommentInput) -> Result<()> {
        let path = format!("/comments/{}", seg(comment_id));
        self.send_ack(self.authed(Method::PUT, &path, token).json(input))
            .await
    }

    pub async fn delete_comment(&self, token: &str, comment_id: &str) -> Result<()> {
        let path = format!("/comments/{}", seg(comment_id));
        self.send_ack(self.authed(Method::DELETE, &path, token)).await
    }
}

/// Prefer the API's `{ "message": .. }` body; fall back to raw text, then the reason phrase.
fn error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from));
    match from_json {
        Some(message) => message,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    }
}
