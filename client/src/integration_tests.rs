//! Integration tests for the client core: every flow runs through `App` against
//! an in-process mock of the REST API, so stores, storage and HTTP are exercised
//! together.
//!
//! Each test spins up its own mock server on an ephemeral port.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::extract::{Path, Query, Request, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::middleware::{self, Next};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use tokio::sync::mpsc;

    use crate::api::{ApiClient, Channel, Comment, User, Video};
    use crate::app::{App, Feed, Notice, Theme, ViewScope};
    use crate::error::ClientError;
    use crate::storage::{FileStorage, LocalStorage, MemoryStorage, TOKEN_KEY, USER_KEY};
    use crate::store::SessionStore;
    use crate::validation::{
        ChannelForm, CommentForm, SignInForm, SignUpForm, UserUpdateForm, VideoForm,
    };

    // ── Mock API ─────────────────────────────────────────────────

    #[derive(Default)]
    struct MockState {
        users: HashMap<String, User>,
        passwords: HashMap<String, String>,
        channels: HashMap<String, Channel>,
        videos: HashMap<String, Video>,
        comments: Vec<Comment>,
        /// "METHOD /path?query" for every request received.
        requests: Vec<String>,
        next_id: u64,
    }

    impl MockState {
        fn id(&mut self, prefix: &str) -> String {
            self.next_id += 1;
            format!("{prefix}{}", self.next_id)
        }
    }

    type Shared = Arc<Mutex<MockState>>;

    fn user(id: &str, username: &str, channels: &[&str]) -> User {
        User {
            id: id.into(),
            username: username.into(),
            email: format!("{username}@example.com"),
            avatar: None,
            channels: channels.iter().map(|c| c.to_string()).collect(),
            subscribed_channels: vec![],
        }
    }

    fn video(id: &str, channel_id: &str, tags: &[&str]) -> Video {
        Video {
            id: id.into(),
            title: format!("Video {id}"),
            description: None,
            thumbnail_url: format!("https://img.example.com/{id}.png"),
            video_url: Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".into()),
            channel_id: channel_id.into(),
            user_id: Some("u2".into()),
            views: 0,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            likes: vec![],
            dislikes: vec![],
            created_at: None,
        }
    }

    /// alice (u1) owns nothing; bob (u2) owns channel c2 with two cooking videos.
    fn seeded() -> Shared {
        let mut s = MockState {
            next_id: 100,
            ..Default::default()
        };
        s.users.insert("u1".into(), user("u1", "alice", &[]));
        s.users.insert("u2".into(), user("u2", "bob", &["c2"]));
        s.passwords.insert("alice".into(), "secret1".into());
        s.passwords.insert("bob".into(), "secret2".into());
        s.channels.insert(
            "c2".into(),
            Channel {
                id: "c2".into(),
                channel_name: "Bob Cooks".into(),
                handle: "bobcooks".into(),
                owner: "u2".into(),
                description: Some("Weeknight dinners".into()),
                channel_avatar: None,
                channel_banner: None,
                subscribers: 10,
                videos: vec!["v1".into(), "v2".into()],
            },
        );
        let mut v1 = video("v1", "c2", &["cooking"]);
        v1.dislikes.push("u3".into());
        s.videos.insert("v1".into(), v1);
        s.videos.insert("v2".into(), video("v2", "c2", &["cooking", "pasta"]));
        Arc::new(Mutex::new(s))
    }

    fn message(status: StatusCode, msg: &str) -> Response {
        (status, Json(json!({ "message": msg }))).into_response()
    }

    fn caller(headers: &HeaderMap) -> Option<String> {
        headers
            .get("authorization")?
            .to_str()
            .ok()?
            .strip_prefix("Bearer token-")
            .map(String::from)
    }

    async fn record(State(s): State<Shared>, req: Request, next: Next) -> Response {
        let line = format!("{} {}", req.method(), req.uri());
        s.lock().unwrap().requests.push(line);
        next.run(req).await
    }

    async fn sign_in(State(s): State<Shared>, Json(body): Json<Value>) -> Response {
        let username = body["username"].as_str().unwrap_or_default();
        if username == "slowpoke" {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        let password = body["password"].as_str().unwrap_or_default();
        let s = s.lock().unwrap();
        if s.passwords.get(username).map(String::as_str) != Some(password) {
            return message(StatusCode::BAD_REQUEST, "Wrong credentials!");
        }
        let user = s.users.values().find(|u| u.username == username).unwrap();
        Json(json!({ "token": format!("token-{}", user.id), "details": user })).into_response()
    }

    async fn sign_up(State(s): State<Shared>, Json(body): Json<Value>) -> Response {
        let username = body["username"].as_str().unwrap_or_default().to_string();
        let mut s = s.lock().unwrap();
        if s.passwords.contains_key(&username) {
            return message(StatusCode::CONFLICT, "Username taken");
        }
        let id = s.id("u");
        s.passwords
            .insert(username.clone(), body["password"].as_str().unwrap_or_default().into());
        s.users.insert(id.clone(), user(&id, &username, &[]));
        (StatusCode::CREATED, "User has been created!").into_response()
    }

    async fn find_user(State(s): State<Shared>, Path(id): Path<String>) -> Response {
        match s.lock().unwrap().users.get(&id) {
            Some(u) => Json(u.clone()).into_response(),
            None => message(StatusCode::NOT_FOUND, "User not found!"),
        }
    }

    async fn subscribe(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
        set_subscription(s, headers, id, true)
    }

    async fn unsubscribe(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
        set_subscription(s, headers, id, false)
    }

    fn set_subscription(s: Shared, headers: HeaderMap, channel_id: String, on: bool) -> Response {
        let Some(uid) = caller(&headers) else {
            return message(StatusCode::UNAUTHORIZED, "You are not authenticated!");
        };
        let mut s = s.lock().unwrap();
        let subs = &mut s.users.get_mut(&uid).unwrap().subscribed_channels;
        let had = subs.contains(&channel_id);
        if on && !had {
            subs.push(channel_id.clone());
        } else if !on {
            subs.retain(|c| c != &channel_id);
        }
        if let Some(ch) = s.channels.get_mut(&channel_id) {
            match (on, had) {
                (true, false) => ch.subscribers += 1,
                (false, true) => ch.subscribers -= 1,
                _ => {}
            }
        }
        "ok".into_response()
    }

    async fn like(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
        vote(s, headers, id, true)
    }

    async fn dislike(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
        vote(s, headers, id, false)
    }

    fn vote(s: Shared, headers: HeaderMap, video_id: String, up: bool) -> Response {
        let Some(uid) = caller(&headers) else {
            return message(StatusCode::UNAUTHORIZED, "You are not authenticated!");
        };
        let mut s = s.lock().unwrap();
        let Some(v) = s.videos.get_mut(&video_id) else {
            return message(StatusCode::NOT_FOUND, "Video not found!");
        };
        let (add, other) = if up {
            (&mut v.likes, &mut v.dislikes)
        } else {
            (&mut v.dislikes, &mut v.likes)
        };
        if let Some(i) = add.iter().position(|x| x == &uid) {
            add.remove(i);
        } else {
            add.push(uid.clone());
            other.retain(|x| x != &uid);
        }
        "ok".into_response()
    }

    async fn find_video(State(s): State<Shared>, Path(id): Path<String>) -> Response {
        if id == "slow" {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        match s.lock().unwrap().videos.get(&id) {
            Some(v) => Json(v.clone()).into_response(),
            None => message(StatusCode::NOT_FOUND, "Video not found!"),
        }
    }

    async fn add_view(State(s): State<Shared>, Path(id): Path<String>) -> Response {
        if let Some(v) = s.lock().unwrap().videos.get_mut(&id) {
            v.views += 1;
        }
        "The view has been increased.".into_response()
    }

    async fn random_videos(State(s): State<Shared>) -> Response {
        let s = s.lock().unwrap();
        let mut all: Vec<Video> = s.videos.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Json(all).into_response()
    }

    async fn videos_by_tags(State(s): State<Shared>, Query(q): Query<HashMap<String, String>>) -> Response {
        let tags: Vec<String> = q
            .get("tags")
            .map(|t| t.split(',').map(String::from).collect())
            .unwrap_or_default();
        let s = s.lock().unwrap();
        let mut hits: Vec<Video> = s
            .videos
            .values()
            .filter(|v| v.tags.iter().any(|t| tags.contains(t)))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.id.cmp(&b.id));
        Json(hits).into_response()
    }

    async fn create_video(State(s): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
        let Some(uid) = caller(&headers) else {
            return message(StatusCode::UNAUTHORIZED, "You are not authenticated!");
        };
        let mut s = s.lock().unwrap();
        let id = s.id("v");
        let channel_id = body["channelId"].as_str().unwrap_or_default();
        let mut v = video(&id, channel_id, &[]);
        v.title = body["title"].as_str().unwrap_or_default().into();
        v.video_url = body["videoUrl"].as_str().map(String::from);
        v.user_id = Some(uid);
        v.tags = serde_json::from_value(body["tags"].clone()).unwrap_or_default();
        s.videos.insert(id, v.clone());
        (StatusCode::CREATED, Json(v)).into_response()
    }

    async fn delete_video(State(s): State<Shared>, Path(id): Path<String>) -> Response {
        match s.lock().unwrap().videos.remove(&id) {
            Some(_) => "The video has been deleted.".into_response(),
            None => message(StatusCode::NOT_FOUND, "Video not found!"),
        }
    }

    async fn find_channel(State(s): State<Shared>, Path(id): Path<String>) -> Response {
        match s.lock().unwrap().channels.get(&id) {
            Some(c) => Json(c.clone()).into_response(),
            None => message(StatusCode::NOT_FOUND, "Channel not found!"),
        }
    }

    async fn channel_videos(State(s): State<Shared>, Path(id): Path<String>) -> Response {
        let s = s.lock().unwrap();
        let mut list: Vec<Video> = s.videos.values().filter(|v| v.channel_id == id).cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        Json(list).into_response()
    }

    async fn create_channel(State(s): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
        let Some(uid) = caller(&headers) else {
            return message(StatusCode::UNAUTHORIZED, "You are not authenticated!");
        };
        let handle = body["handle"].as_str().unwrap_or_default().to_string();
        let mut s = s.lock().unwrap();
        if s.channels.values().any(|c| c.handle == handle) {
            return message(StatusCode::CONFLICT, "Handle already exists");
        }
        let id = s.id("c");
        let channel = Channel {
            id: id.clone(),
            channel_name: body["channelName"].as_str().unwrap_or_default().into(),
            handle,
            owner: uid.clone(),
            description: body["description"].as_str().map(String::from),
            channel_avatar: None,
            channel_banner: None,
            subscribers: 0,
            videos: vec![],
        };
        s.channels.insert(id.clone(), channel.clone());
        s.users.get_mut(&uid).unwrap().channels.push(id);
        (StatusCode::CREATED, Json(channel)).into_response()
    }

    async fn delete_channel(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
        let Some(uid) = caller(&headers) else {
            return message(StatusCode::UNAUTHORIZED, "You are not authenticated!");
        };
        let mut s = s.lock().unwrap();
        s.channels.remove(&id);
        s.users.get_mut(&uid).unwrap().channels.retain(|c| c != &id);
        "Channel deleted".into_response()
    }

    async fn comments_for(State(s): State<Shared>, Path(video_id): Path<String>) -> Response {
        let s = s.lock().unwrap();
        let list: Vec<Comment> = s.comments.iter().filter(|c| c.video_id == video_id).cloned().collect();
        Json(list).into_response()
    }

    async fn add_comment(State(s): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
        let Some(uid) = caller(&headers) else {
            return message(StatusCode::UNAUTHORIZED, "You are not authenticated!");
        };
        let mut s = s.lock().unwrap();
        let comment = Comment {
            id: s.id("m"),
            video_id: body["videoId"].as_str().unwrap_or_default().into(),
            user_id: uid,
            description: body["description"].as_str().unwrap_or_default().into(),
            created_at: None,
        };
        s.comments.push(comment.clone());
        Json(comment).into_response()
    }

    async fn delete_comment(State(s): State<Shared>, Path(id): Path<String>) -> Response {
        s.lock().unwrap().comments.retain(|c| c.id != id);
        "The comment has been deleted.".into_response()
    }

    async fn update_user(
        State(s): State<Shared>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(body): Json<Value>,
    ) -> Response {
        if caller(&headers).as_deref() != Some(id.as_str()) {
            return message(StatusCode::FORBIDDEN, "You can update only your account!");
        }
        let mut s = s.lock().unwrap();
        let Some(u) = s.users.get_mut(&id) else {
            return message(StatusCode::NOT_FOUND, "User not found!");
        };
        if let Some(name) = body["username"].as_str() {
            u.username = name.into();
        }
        if let Some(email) = body["email"].as_str() {
            u.email = email.into();
        }
        u.avatar = body["avatar"].as_str().map(String::from).or(u.avatar.take());
        Json(u.clone()).into_response()
    }

    async fn delete_user(State(s): State<Shared>, headers: HeaderMap, Path(id): Path<String>) -> Response {
        if caller(&headers).as_deref() != Some(id.as_str()) {
            return message(StatusCode::FORBIDDEN, "You can delete only your account!");
        }
        s.lock().unwrap().users.remove(&id);
        "User has been deleted.".into_response()
    }

    /// Only the fields present in the body change.
    async fn update_video(
        State(s): State<Shared>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(body): Json<Value>,
    ) -> Response {
        if caller(&headers).is_none() {
            return message(StatusCode::UNAUTHORIZED, "You are not authenticated!");
        }
        let mut s = s.lock().unwrap();
        let Some(v) = s.videos.get_mut(&id) else {
            return message(StatusCode::NOT_FOUND, "Video not found!");
        };
        if let Some(title) = body["title"].as_str() {
            v.title = title.into();
        }
        if let Some(thumbnail) = body["thumbnailUrl"].as_str() {
            v.thumbnail_url = thumbnail.into();
        }
        if let Some(url) = body["videoUrl"].as_str() {
            v.video_url = Some(url.into());
        }
        if let Some(description) = body["description"].as_str() {
            v.description = Some(description.into());
        }
        if let Some(tags) = body.get("tags") {
            v.tags = serde_json::from_value(tags.clone()).unwrap_or_default();
        }
        Json(v.clone()).into_response()
    }

    async fn update_channel(
        State(s): State<Shared>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(body): Json<Value>,
    ) -> Response {
        if caller(&headers).is_none() {
            return message(StatusCode::UNAUTHORIZED, "You are not authenticated!");
        }
        let handle = body["handle"].as_str().unwrap_or_default().to_string();
        let mut s = s.lock().unwrap();
        if s.channels.values().any(|c| c.handle == handle && c.id != id) {
            return message(StatusCode::CONFLICT, "Handle already exists");
        }
        let Some(ch) = s.channels.get_mut(&id) else {
            return message(StatusCode::NOT_FOUND, "Channel not found!");
        };
        ch.channel_name = body["channelName"].as_str().unwrap_or_default().into();
        ch.handle = handle;
        ch.description = body["description"].as_str().map(String::from);
        Json(ch.clone()).into_response()
    }

    async fn spawn_mock(state: Shared) -> String {
        let router = Router::new()
            .route("/api/auth/signin", post(sign_in))
            .route("/api/auth/signup", post(sign_up))
            .route("/api/users/find/{id}", get(find_user))
            .route("/api/users/{id}", put(update_user).delete(delete_user))
            .route("/api/users/sub/{id}", put(subscribe))
            .route("/api/users/unsub/{id}", put(unsubscribe))
            .route("/api/users/like/{id}", put(like))
            .route("/api/users/dislike/{id}", put(dislike))
            .route("/api/videos", post(create_video))
            .route("/api/videos/random", get(random_videos))
            .route("/api/videos/tags", get(videos_by_tags))
            .route("/api/videos/find/{id}", get(find_video))
            .route("/api/videos/view/{id}", put(add_view))
            .route("/api/videos/channel/{id}", get(channel_videos))
            .route("/api/videos/{id}", put(update_video).delete(delete_video))
            .route("/api/channels", post(create_channel))
            .route("/api/channels/find/{id}", get(find_channel))
            .route("/api/channels/{id}", put(update_channel).delete(delete_channel))
            .route("/api/comments", post(add_comment))
            .route(
                "/api/comments/{id}",
                get(comments_for).delete(delete_comment),
            )
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn build_app(base_url: &str, storage: Arc<dyn LocalStorage>) -> (App, mpsc::UnboundedReceiver<Notice>) {
        let api = ApiClient::new(base_url, Duration::from_secs(5)).unwrap();
        App::new(api, storage, Theme::Dark)
    }

    async fn signed_in(
        mock: &Shared,
        username: &str,
        password: &str,
    ) -> (App, mpsc::UnboundedReceiver<Notice>, Arc<MemoryStorage>) {
        let base = spawn_mock(mock.clone()).await;
        let storage = Arc::new(MemoryStorage::new());
        let (app, mut rx) = build_app(&base, storage.clone());
        let form = SignInForm {
            username: username.into(),
            password: password.into(),
        };
        app.sign_in(&ViewScope::new(), form).await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), Notice::success("Welcome Back!"));
        (app, rx, storage)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Notice>) -> Vec<Notice> {
        let mut out = Vec::new();
        while let Ok(n) = rx.try_recv() {
            out.push(n);
        }
        out
    }

    // ── Session ──────────────────────────────────────────────────

    #[tokio::test]
    async fn test_sign_in_persists_and_restores_session() {
        let mock = seeded();
        let base = spawn_mock(mock.clone()).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        {
            let storage = Arc::new(FileStorage::open(&path).unwrap());
            let (app, mut rx) = build_app(&base, storage.clone());
            let form = SignInForm {
                username: "alice".into(),
                password: "secret1".into(),
            };
            let user = app.sign_in(&ViewScope::new(), form).await.unwrap();
            assert_eq!(user.id, "u1");
            assert_eq!(rx.try_recv().unwrap().message, "Welcome Back!");

            let state = app.session().snapshot();
            assert!(!state.loading);
            assert!(!state.error);
            assert_eq!(storage.get(TOKEN_KEY).as_deref(), Some("token-u1"));
        }

        // A fresh process over the same file starts signed in.
        let storage = Arc::new(FileStorage::open(&path).unwrap());
        let restored = SessionStore::new(storage);
        assert_eq!(restored.current_user().unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_failed_sign_in_sets_error() {
        let mock = seeded();
        let base = spawn_mock(mock.clone()).await;
        let storage = Arc::new(MemoryStorage::new());
        let (app, mut rx) = build_app(&base, storage.clone());

        let form = SignInForm {
            username: "alice".into(),
            password: "wrong".into(),
        };
        let err = app.sign_in(&ViewScope::new(), form).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));

        let state = app.session().snapshot();
        assert!(state.error);
        assert!(!state.loading);
        assert!(state.current_user.is_none());
        assert_eq!(storage.get(TOKEN_KEY), None);
        assert_eq!(
            rx.try_recv().unwrap(),
            Notice::error("Login failed! Check credentials.")
        );
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_server() {
        let mock = seeded();
        let base = spawn_mock(mock.clone()).await;
        let (app, mut rx) = build_app(&base, Arc::new(MemoryStorage::new()));

        let form = SignUpForm {
            username: "carol".into(),
            email: "not-an-email".into(),
            password: "secret3".into(),
            avatar: String::new(),
        };
        let err = app.sign_up(&ViewScope::new(), form).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(rx.try_recv().unwrap().message, "Invalid email address");
        assert!(mock.lock().unwrap().requests.is_empty());
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let mock = seeded();
        let base = spawn_mock(mock.clone()).await;
        let (app, mut rx) = build_app(&base, Arc::new(MemoryStorage::new()));
        let scope = ViewScope::new();

        let form = SignUpForm {
            username: "carol".into(),
            email: "carol@example.com".into(),
            password: "secret3".into(),
            avatar: String::new(),
        };
        app.sign_up(&scope, form.clone()).await.unwrap();
        assert_eq!(rx.try_recv().unwrap().message, "Account created! Please Sign in.");
        assert!(!app.session().is_signed_in(), "sign-up does not sign in");

        assert!(app.sign_up(&scope, form).await.is_err());
        assert_eq!(
            rx.try_recv().unwrap().message,
            "Registration failed! Email or Username might be taken."
        );

        let signin = SignInForm {
            username: "carol".into(),
            password: "secret3".into(),
        };
        let user = app.sign_in(&scope, signin).await.unwrap();
        assert_eq!(user.username, "carol");
    }

    #[tokio::test]
    async fn test_sign_out_clears_storage() {
        let mock = seeded();
        let (app, mut rx, storage) = signed_in(&mock, "alice", "secret1").await;
        assert!(storage.get(USER_KEY).is_some());

        app.open_video(&ViewScope::new(), "v1").await.unwrap();
        app.sign_out();

        assert_eq!(storage.get(USER_KEY), None);
        assert_eq!(storage.get(TOKEN_KEY), None);
        assert!(app.video().current_video().is_none());
        assert!(SessionStore::new(storage).current_user().is_none());
        assert_eq!(drain(&mut rx), vec![Notice::success("Logged out successfully")]);
    }

    // ── Subscriptions ────────────────────────────────────────────

    #[tokio::test]
    async fn test_subscription_toggle_round_trip() {
        let mock = seeded();
        let (app, _rx, storage) = signed_in(&mock, "alice", "secret1").await;
        let scope = ViewScope::new();

        let mut page = app.open_channel(&scope, "c2").await.unwrap();
        assert_eq!(page.videos.len(), 2);
        assert_eq!(page.channel.subscribers, 10);

        let now = app.toggle_subscription(&scope, &mut page.channel).await.unwrap();
        assert!(now);
        assert_eq!(page.channel.subscribers, 11);
        assert!(app.session().current_user().unwrap().is_subscribed_to("c2"));
        assert!(storage.get(USER_KEY).unwrap().contains("c2"));
        assert!(mock.lock().unwrap().users["u1"].is_subscribed_to("c2"));

        let now = app.toggle_subscription(&scope, &mut page.channel).await.unwrap();
        assert!(!now);
        assert_eq!(page.channel.subscribers, 10);
        assert!(!app.session().current_user().unwrap().is_subscribed_to("c2"));

        // Local and server views agree after a refresh.
        let fresh = app.refresh_session(&scope).await.unwrap().unwrap();
        assert!(fresh.subscribed_channels.is_empty());
        assert_eq!(mock.lock().unwrap().channels["c2"].subscribers, 10);
    }

    // ── Watch page ───────────────────────────────────────────────

    #[tokio::test]
    async fn test_like_and_dislike_are_exclusive() {
        let mock = seeded();
        let (app, _rx, _) = signed_in(&mock, "alice", "secret1").await;
        let scope = ViewScope::new();

        let page = app.open_video(&scope, "v1").await.unwrap();
        assert_eq!(page.channel.id, "c2");
        assert_eq!(mock.lock().unwrap().videos["v1"].views, 1);

        app.toggle_like(&scope).await.unwrap();
        let v = app.video().current_video().unwrap();
        assert_eq!(v.likes, vec!["u1".to_string()]);
        assert_eq!(v.dislikes, vec!["u3".to_string()]);

        app.toggle_dislike(&scope).await.unwrap();
        let v = app.video().current_video().unwrap();
        assert!(v.likes.is_empty());
        assert_eq!(v.dislikes, vec!["u3".to_string(), "u1".to_string()]);

        let server = app.refresh_video(&scope).await.unwrap().unwrap();
        assert_eq!(server.likes, v.likes);
        assert_eq!(server.dislikes, v.dislikes);
    }

    #[tokio::test]
    async fn test_teardown_suppresses_late_result() {
        let mock = seeded();
        let base = spawn_mock(mock.clone()).await;
        let (app, mut rx) = build_app(&base, Arc::new(MemoryStorage::new()));

        let scope = ViewScope::new();
        let handle = scope.cancel_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.cancel();
        });

        let err = app.open_video(&scope, "slow").await.unwrap_err();
        assert!(err.is_cancelled());

        let state = app.video().snapshot();
        assert!(state.current_video.is_none());
        assert!(!state.loading, "the abandoned fetch is no longer outstanding");
        assert!(!state.error, "cancellation is not a failure");
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_sign_in_resets_loading() {
        let mock = seeded();
        let base = spawn_mock(mock.clone()).await;
        let storage = Arc::new(MemoryStorage::new());
        let (app, mut rx) = build_app(&base, storage.clone());

        let scope = ViewScope::new();
        let handle = scope.cancel_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.cancel();
        });

        let form = SignInForm {
            username: "slowpoke".into(),
            password: "whatever".into(),
        };
        let err = app.sign_in(&scope, form).await.unwrap_err();
        assert!(err.is_cancelled());

        let state = app.session().snapshot();
        assert!(!state.loading);
        assert!(!state.error);
        assert!(state.current_user.is_none());
        assert_eq!(storage.get(TOKEN_KEY), None);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_missing_video_sets_error() {
        let mock = seeded();
        let base = spawn_mock(mock.clone()).await;
        let (app, _rx) = build_app(&base, Arc::new(MemoryStorage::new()));

        let err = app.open_video(&ViewScope::new(), "nope").await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        let state = app.video().snapshot();
        assert!(state.error);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_feeds_and_recommendations() {
        let mock = seeded();
        let base = spawn_mock(mock.clone()).await;
        let (app, _rx) = build_app(&base, Arc::new(MemoryStorage::new()));
        let scope = ViewScope::new();

        let all = app.home_feed(&scope, &Feed::All).await.unwrap();
        assert_eq!(all.len(), 2);

        let pasta = app
            .home_feed(&scope, &Feed::from_filter("Pasta"))
            .await
            .unwrap();
        assert_eq!(pasta.iter().map(|v| v.id.as_str()).collect::<Vec<_>>(), ["v2"]);

        let related = app
            .recommendations(&scope, &["cooking".to_string()])
            .await
            .unwrap();
        assert_eq!(related.len(), 2);

        let requests = mock.lock().unwrap().requests.clone();
        assert!(requests.contains(&"GET /api/videos/tags?tags=pasta".to_string()));
    }

    // ── Channels & uploads ───────────────────────────────────────

    #[tokio::test]
    async fn test_duplicate_handle_is_reported() {
        let mock = seeded();
        let (app, mut rx, _) = signed_in(&mock, "alice", "secret1").await;

        let form = ChannelForm {
            channel_name: "Alice Also Cooks".into(),
            handle: "bobcooks".into(),
            ..Default::default()
        };
        let err = app.create_channel(&ViewScope::new(), form).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(
            rx.try_recv().unwrap(),
            Notice::error("Handle already taken! Please choose another one.")
        );
        assert!(app.session().current_user().unwrap().channels.is_empty());
    }

    #[tokio::test]
    async fn test_create_channel_then_upload() {
        let mock = seeded();
        let (app, mut rx, storage) = signed_in(&mock, "alice", "secret1").await;
        let scope = ViewScope::new();

        let form = ChannelForm {
            channel_name: "Alice Codes".into(),
            handle: "alicecodes".into(),
            ..Default::default()
        };
        let channel = app.create_channel(&scope, form).await.unwrap();
        assert_eq!(rx.try_recv().unwrap().message, "Channel created successfully!");
        assert!(app.session().current_user().unwrap().owns_channel(&channel.id));
        assert!(storage.get(USER_KEY).unwrap().contains(&channel.id));

        let mine = app.my_channels(&scope).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].handle, "alicecodes");

        let upload = VideoForm {
            title: "Rust in ten minutes".into(),
            thumbnail_url: "https://img.example.com/rust.png".into(),
            video_url: "https://youtu.be/dQw4w9WgXcQ".into(),
            tags: Some(vec!["coding".into()]),
            ..Default::default()
        };
        let video = app.upload_video(&scope, None, upload).await.unwrap();
        assert_eq!(video.channel_id, channel.id);
        assert_eq!(video.tags, vec!["coding".to_string()]);

        let state = app.video().snapshot();
        assert!(!state.loading);
        assert_eq!(state.current_video.unwrap().id, video.id);

        app.delete_video(&scope, &video.id).await.unwrap();
        assert!(app.video().current_video().is_none());
        assert!(!mock.lock().unwrap().videos.contains_key(&video.id));

        app.delete_channel(&scope, &channel.id).await.unwrap();
        assert!(app.session().current_user().unwrap().channels.is_empty());
    }

    #[tokio::test]
    async fn test_upload_without_url_is_refused() {
        let mock = seeded();
        let (app, mut rx, _) = signed_in(&mock, "bob", "secret2").await;
        let before = mock.lock().unwrap().requests.len();

        let upload = VideoForm {
            title: "No source".into(),
            thumbnail_url: "https://img.example.com/x.png".into(),
            ..Default::default()
        };
        let err = app
            .upload_video(&ViewScope::new(), Some("c2"), upload)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Prerequisite(_)));
        assert_eq!(
            rx.try_recv().unwrap().message,
            "Video URL is required for new uploads"
        );
        assert_eq!(mock.lock().unwrap().requests.len(), before);
    }

    // ── Account & edits ──────────────────────────────────────────

    #[tokio::test]
    async fn test_update_profile_replaces_identity() {
        let mock = seeded();
        let (app, mut rx, storage) = signed_in(&mock, "alice", "secret1").await;

        let form = UserUpdateForm {
            username: "alice_w".into(),
            email: "alice@wonder.land".into(),
            avatar: "https://img.example.com/alice.png".into(),
        };
        let updated = app.update_profile(&ViewScope::new(), form).await.unwrap();
        assert_eq!(updated.username, "alice_w");
        assert_eq!(rx.try_recv().unwrap().message, "Profile updated successfully!");

        let current = app.session().current_user().unwrap();
        assert_eq!(current, updated);
        assert_eq!(current.avatar.as_deref(), Some("https://img.example.com/alice.png"));
        let persisted = storage.get(USER_KEY).unwrap();
        assert!(persisted.contains("alice_w"));
        assert!(persisted.contains("alice@wonder.land"));
        assert_eq!(mock.lock().unwrap().users["u1"].username, "alice_w");
    }

    #[tokio::test]
    async fn test_delete_account_signs_out() {
        let mock = seeded();
        let (app, mut rx, storage) = signed_in(&mock, "alice", "secret1").await;

        app.delete_account(&ViewScope::new()).await.unwrap();
        assert_eq!(rx.try_recv().unwrap().message, "Account deleted successfully");
        assert!(!app.session().is_signed_in());
        assert_eq!(storage.get(USER_KEY), None);
        assert_eq!(storage.get(TOKEN_KEY), None);
        assert!(!mock.lock().unwrap().users.contains_key("u1"));
    }

    #[tokio::test]
    async fn test_update_channel_bumps_trigger_and_refreshes_owned_list() {
        let mock = seeded();
        let (app, mut rx, _) = signed_in(&mock, "bob", "secret2").await;
        let scope = ViewScope::new();
        let finds = |mock: &Shared| {
            mock.lock()
                .unwrap()
                .requests
                .iter()
                .filter(|r| r.starts_with("GET /api/channels/find/"))
                .count()
        };

        let mine = app.my_channels(&scope).await.unwrap();
        assert_eq!(mine[0].channel_name, "Bob Cooks");
        app.my_channels(&scope).await.unwrap();
        assert_eq!(finds(&mock), 1, "unchanged trigger reuses the owned list");

        let form = ChannelForm {
            channel_name: "Bob Bakes".into(),
            handle: "bobbakes".into(),
            ..Default::default()
        };
        let channel = app.update_channel(&scope, "c2", form).await.unwrap();
        assert_eq!(channel.channel_name, "Bob Bakes");
        assert_eq!(rx.try_recv().unwrap().message, "Channel updated successfully!");
        assert_eq!(app.session().snapshot().channel_update_trigger, 1);

        let mine = app.my_channels(&scope).await.unwrap();
        assert_eq!(mine[0].channel_name, "Bob Bakes");
        assert_eq!(finds(&mock), 2);
    }

    #[tokio::test]
    async fn test_update_channel_duplicate_handle() {
        let mock = seeded();
        let (app, mut rx, _) = signed_in(&mock, "bob", "secret2").await;
        let scope = ViewScope::new();

        let second = ChannelForm {
            channel_name: "Bob Bakes".into(),
            handle: "bobbakes".into(),
            ..Default::default()
        };
        app.create_channel(&scope, second).await.unwrap();
        drain(&mut rx);

        let clash = ChannelForm {
            channel_name: "Bob Cooks".into(),
            handle: "bobbakes".into(),
            ..Default::default()
        };
        let err = app.update_channel(&scope, "c2", clash).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(
            rx.try_recv().unwrap(),
            Notice::error("Handle already taken! Please choose another one.")
        );
        assert_eq!(app.session().snapshot().channel_update_trigger, 0);
        assert_eq!(mock.lock().unwrap().channels["c2"].handle, "bobcooks");
    }

    #[tokio::test]
    async fn test_edit_video_without_tags_keeps_them() {
        let mock = seeded();
        let (app, _rx, _) = signed_in(&mock, "bob", "secret2").await;
        let scope = ViewScope::new();
        app.open_video(&scope, "v2").await.unwrap();

        let form = VideoForm {
            title: "Carbonara".into(),
            thumbnail_url: "https://img.example.com/carbonara.png".into(),
            ..Default::default()
        };
        let edited = app.edit_video(&scope, "v2", form).await.unwrap();
        assert_eq!(edited.title, "Carbonara");
        assert_eq!(edited.tags, vec!["cooking".to_string(), "pasta".to_string()]);

        let state = app.video().snapshot();
        assert!(!state.loading && !state.error);
        assert_eq!(state.current_video.unwrap(), edited);

        let retag = VideoForm {
            title: "Carbonara".into(),
            thumbnail_url: "https://img.example.com/carbonara.png".into(),
            tags: Some(vec!["italian".into()]),
            ..Default::default()
        };
        app.edit_video(&scope, "v2", retag).await.unwrap();
        assert_eq!(mock.lock().unwrap().videos["v2"].tags, vec!["italian".to_string()]);
    }

    // ── Comments ─────────────────────────────────────────────────

    #[tokio::test]
    async fn test_comment_lifecycle() {
        let mock = seeded();
        let (app, mut rx, _) = signed_in(&mock, "alice", "secret1").await;
        let scope = ViewScope::new();

        let form = CommentForm {
            description: "Great recipe!".into(),
        };
        let comment = app.add_comment(&scope, "v1", form).await.unwrap();
        assert_eq!(rx.try_recv().unwrap().message, "Comment posted!");

        let listed = app.comments(&scope, "v1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].user_id, "u1");
        let author = app.comment_author(&scope, &listed[0].user_id).await.unwrap();
        assert_eq!(author.username, "alice");

        app.delete_comment(&scope, &comment.id).await.unwrap();
        assert_eq!(rx.try_recv().unwrap().message, "Comment Deleted");
        assert!(app.comments(&scope, "v1").await.unwrap().is_empty());
    }
}
