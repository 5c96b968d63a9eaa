//! An in-memory stand-in for the tube backend, served by axum on a random local port.
//!
//! Every request is recorded as `"METHOD /api/path"`, and any such line can be made to fail
//! with a chosen status before it reaches its handler.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    rc::Rc,
    sync::{Arc, Mutex, MutexGuard},
};

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tube_frontend_rs::{
    ClientConfig, RemoteClient, SessionStore,
    storage::{MemoryStorage, TokenStorage},
};

pub const CREATED_AT: &str = "2024-03-01T10:00:00.000Z";

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ChannelRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner: String,
    pub subscribers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub category: String,
    pub video_url: String,
    pub channel_id: Option<String>,
    pub views: u64,
    pub likes: Vec<String>,
    pub dislikes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CommentRecord {
    pub id: String,
    pub video_id: String,
    pub text: String,
    pub user_id: String,
}

#[derive(Default)]
pub struct Db {
    next_id: u64,
    pub users: Vec<UserRecord>,
    pub tokens: HashMap<String, String>,
    pub channels: Vec<ChannelRecord>,
    pub videos: Vec<VideoRecord>,
    pub comments: Vec<CommentRecord>,
    pub requests: Vec<String>,
    pub failures: HashMap<String, (StatusCode, String)>,
}

impl Db {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn issue_token(&mut self, user_id: &str) -> String {
        let token = format!("token-{user_id}");
        self.tokens.insert(token.clone(), user_id.to_string());
        token
    }

    fn viewer(&self, headers: &HeaderMap) -> Option<String> {
        let token = headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        self.tokens.get(token).cloned()
    }

    fn video_json(&self, video: &VideoRecord, viewer: Option<&str>) -> Value {
        let channel = video
            .channel_id
            .as_ref()
            .and_then(|id| self.channels.iter().find(|c| &c.id == id))
            .map(|c| json!({ "_id": c.id, "channelName": c.name }));
        json!({
            "_id": video.id,
            "title": video.title,
            "description": "",
            "category": video.category,
            "videoUrl": video.video_url,
            "thumbnailUrl": "",
            "views": video.views,
            "likes": video.likes,
            "dislikes": video.dislikes,
            "isLiked": viewer.is_some_and(|u| video.likes.iter().any(|l| l == u)),
            "isDisliked": viewer.is_some_and(|u| video.dislikes.iter().any(|d| d == u)),
            "channelId": channel,
            "createdAt": CREATED_AT,
        })
    }

    fn channel_json(&self, channel: &ChannelRecord, viewer: Option<&str>) -> Value {
        let videos: Vec<&str> = self
            .videos
            .iter()
            .filter(|v| v.channel_id.as_deref() == Some(channel.id.as_str()))
            .map(|v| v.id.as_str())
            .collect();
        json!({
            "_id": channel.id,
            "channelName": channel.name,
            "description": channel.description,
            "channelBanner": "",
            "owner": channel.owner,
            "subscribers": channel.subscribers,
            "isSubscribed": viewer.is_some_and(|u| channel.subscribers.iter().any(|s| s == u)),
            "videos": videos,
        })
    }
}

type Shared = Arc<Mutex<Db>>;
type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn fail(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "message": message })))
}

fn toggle_membership(members: &mut Vec<String>, user: &str) -> bool {
    if let Some(index) = members.iter().position(|m| m == user) {
        members.remove(index);
        false
    } else {
        members.push(user.to_string());
        true
    }
}

pub struct Backend {
    pub db: Shared,
    pub api_url: String,
}

impl Backend {
    pub async fn start() -> Backend {
        let db: Shared = Arc::default();
        let app = Router::new()
            .nest("/api", routes())
            .layer(middleware::from_fn_with_state(db.clone(), record))
            .with_state(db.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Backend {
            db,
            api_url: format!("http://{address}/api"),
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::default().with_api_url(self.api_url.clone())
    }

    pub fn client(&self) -> RemoteClient {
        RemoteClient::new(&self.config()).unwrap()
    }

    pub fn session_with(&self, storage: Rc<dyn TokenStorage>) -> Rc<SessionStore> {
        SessionStore::open(self.client(), storage)
    }

    pub fn anonymous_session(&self) -> Rc<SessionStore> {
        self.session_with(Rc::new(MemoryStorage::default()))
    }

    /// A session that already went through login and resolution for `token`.
    pub async fn session_for(&self, token: &str) -> Rc<SessionStore> {
        let session = self.anonymous_session();
        session.login(token).await.unwrap();
        session
    }

    pub fn db(&self) -> MutexGuard<'_, Db> {
        self.db.lock().unwrap()
    }

    /// Returns `(user id, token)`.
    pub fn add_user(&self, username: &str) -> (String, String) {
        let mut db = self.db();
        let id = db.id("u");
        db.users.push(UserRecord {
            id: id.clone(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "secret".to_string(),
        });
        let token = db.issue_token(&id);
        (id, token)
    }

    pub fn add_channel(&self, owner: &str, name: &str) -> String {
        let mut db = self.db();
        let id = db.id("c");
        db.channels.push(ChannelRecord {
            id: id.clone(),
            name: name.to_string(),
            description: String::new(),
            owner: owner.to_string(),
            subscribers: Vec::new(),
        });
        id
    }

    /// A video whose like list holds `likes` made-up fans.
    pub fn add_video(&self, channel: Option<&str>, title: &str, category: &str, likes: usize) -> String {
        let mut db = self.db();
        let id = db.id("v");
        db.videos.push(VideoRecord {
            id: id.clone(),
            title: title.to_string(),
            category: category.to_string(),
            video_url: format!("https://www.youtube.com/watch?v={id}abcdefgh"),
            channel_id: channel.map(str::to_string),
            views: 0,
            likes: (0..likes).map(|n| format!("fan-{n}")).collect(),
            dislikes: Vec::new(),
        });
        id
    }

    pub fn add_comment(&self, video: &str, author: &str, text: &str) -> String {
        let mut db = self.db();
        let id = db.id("m");
        db.comments.push(CommentRecord {
            id: id.clone(),
            video_id: video.to_string(),
            text: text.to_string(),
            user_id: author.to_string(),
        });
        id
    }

    /// Make `line` (e.g. `"POST /api/videos/v1/like"`) answer `status` with `body`.
    pub fn fail_with(&self, line: &str, status: u16, body: &str) {
        self.db().failures.insert(
            line.to_string(),
            (StatusCode::from_u16(status).unwrap(), body.to_string()),
        );
    }

    pub fn heal(&self, line: &str) {
        self.db().failures.remove(line);
    }

    pub fn requests(&self) -> Vec<String> {
        self.db().requests.clone()
    }

    pub fn count_requests(&self, line: &str) -> usize {
        self.db().requests.iter().filter(|r| *r == line).count()
    }

    pub fn video(&self, id: &str) -> VideoRecord {
        self.db()
            .videos
            .iter()
            .find(|v| v.id == id)
            .cloned()
            .unwrap()
    }
}

async fn record(State(db): State<Shared>, request: Request, next: Next) -> Response {
    let line = format!("{} {}", request.method(), request.uri().path());
    let injected = {
        let mut db = db.lock().unwrap();
        db.requests.push(line.clone());
        db.failures.get(&line).cloned()
    };
    match injected {
        Some((status, body)) => (status, body).into_response(),
        None => next.run(request).await,
    }
}

fn routes() -> Router<Shared> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/profile", get(profile))
        .route("/videos", get(list_videos).post(create_video))
        .route("/videos/search", get(search_videos))
        .route("/videos/{id}", get(get_video))
        .route("/videos/{id}/views", patch(increment_views))
        .route("/videos/{id}/like", post(like_video))
        .route("/videos/{id}/dislike", post(dislike_video))
        .route("/videos/{id}/status", get(video_status))
        .route("/comments", post(add_comment))
        .route("/comments/{id}", get(list_comments).delete(delete_comment))
        .route("/channels", post(create_channel))
        .route("/channels/{id}", get(get_channel).delete(delete_channel))
        .route("/channels/user/{user_id}", get(channel_for_user))
        .route("/channels/{id}/subscribe", post(subscribe))
}

#[derive(Deserialize)]
struct Credentials {
    #[serde(default)]
    username: String,
    email: String,
    password: String,
}

async fn register(State(db): State<Shared>, Json(form): Json<Credentials>) -> Reply {
    let mut db = db.lock().unwrap();
    if db.users.iter().any(|u| u.email == form.email) {
        return Err(fail(StatusCode::BAD_REQUEST, "User already exists"));
    }
    let id = db.id("u");
    db.users.push(UserRecord {
        id: id.clone(),
        username: form.username,
        email: form.email,
        password: form.password,
    });
    let token = db.issue_token(&id);
    Ok(Json(json!({ "message": "User registered successfully", "token": token })))
}

async fn login(State(db): State<Shared>, Json(form): Json<Credentials>) -> Reply {
    let mut db = db.lock().unwrap();
    let Some(user) = db
        .users
        .iter()
        .find(|u| u.email == form.email && u.password == form.password)
        .cloned()
    else {
        return Err(fail(StatusCode::BAD_REQUEST, "Invalid credentials"));
    };
    let token = db.issue_token(&user.id);
    Ok(Json(json!({
        "token": token,
        "user": { "_id": user.id, "username": user.username, "email": user.email },
    })))
}

async fn profile(State(db): State<Shared>, headers: HeaderMap) -> Reply {
    let db = db.lock().unwrap();
    let viewer = db
        .viewer(&headers)
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Not authorized, token failed"))?;
    let user = db.users.iter().find(|u| u.id == viewer).unwrap();
    Ok(Json(json!({ "_id": user.id, "username": user.username, "email": user.email })))
}

async fn list_videos(State(db): State<Shared>, headers: HeaderMap) -> Reply {
    let db = db.lock().unwrap();
    let viewer = db.viewer(&headers);
    let videos: Vec<Value> = db
        .videos
        .iter()
        .map(|v| db.video_json(v, viewer.as_deref()))
        .collect();
    Ok(Json(Value::Array(videos)))
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    query: String,
}

async fn search_videos(State(db): State<Shared>, Query(search): Query<SearchQuery>) -> Reply {
    let db = db.lock().unwrap();
    let needle = search.query.to_lowercase();
    let videos: Vec<Value> = db
        .videos
        .iter()
        .filter(|v| {
            let channel_name = v
                .channel_id
                .as_ref()
                .and_then(|id| db.channels.iter().find(|c| &c.id == id))
                .map(|c| c.name.to_lowercase())
                .unwrap_or_default();
            v.title.to_lowercase().contains(&needle)
                || v.category.to_lowercase().contains(&needle)
                || channel_name.contains(&needle)
        })
        .map(|v| db.video_json(v, None))
        .collect();
    Ok(Json(Value::Array(videos)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoForm {
    title: String,
    #[serde(default)]
    category: String,
    video_url: String,
    channel_id: String,
}

async fn create_video(
    State(db): State<Shared>,
    headers: HeaderMap,
    Json(form): Json<VideoForm>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let mut db = db.lock().unwrap();
    let viewer = db
        .viewer(&headers)
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Not authorized"))?;
    let owns = db
        .channels
        .iter()
        .any(|c| c.id == form.channel_id && c.owner == viewer);
    if !owns {
        return Err(fail(StatusCode::FORBIDDEN, "Not your channel"));
    }
    let id = db.id("v");
    let video = VideoRecord {
        id,
        title: form.title,
        category: form.category,
        video_url: form.video_url,
        channel_id: Some(form.channel_id),
        views: 0,
        likes: Vec::new(),
        dislikes: Vec::new(),
    };
    let body = db.video_json(&video, Some(viewer.as_str()));
    db.videos.push(video);
    Ok((StatusCode::CREATED, Json(body)))
}

async fn get_video(State(db): State<Shared>, Path(id): Path<String>, headers: HeaderMap) -> Reply {
    let db = db.lock().unwrap();
    let viewer = db.viewer(&headers);
    let video = db
        .videos
        .iter()
        .find(|v| v.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Video not found"))?;
    Ok(Json(db.video_json(video, viewer.as_deref())))
}

async fn increment_views(State(db): State<Shared>, Path(id): Path<String>) -> Reply {
    let mut db = db.lock().unwrap();
    let video = db
        .videos
        .iter_mut()
        .find(|v| v.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Video not found"))?;
    video.views += 1;
    Ok(Json(json!({ "views": video.views })))
}

async fn like_video(State(db): State<Shared>, Path(id): Path<String>, headers: HeaderMap) -> Reply {
    let mut db = db.lock().unwrap();
    let viewer = db
        .viewer(&headers)
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Not authorized"))?;
    let video = db
        .videos
        .iter_mut()
        .find(|v| v.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Video not found"))?;
    let is_liked = toggle_membership(&mut video.likes, &viewer);
    Ok(Json(json!({ "likes": video.likes, "isLiked": is_liked })))
}

async fn dislike_video(
    State(db): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    let mut db = db.lock().unwrap();
    let viewer = db
        .viewer(&headers)
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Not authorized"))?;
    let video = db
        .videos
        .iter_mut()
        .find(|v| v.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Video not found"))?;
    let is_disliked = toggle_membership(&mut video.dislikes, &viewer);
    Ok(Json(json!({ "dislikes": video.dislikes.len(), "isDisliked": is_disliked })))
}

async fn video_status(
    State(db): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    let db = db.lock().unwrap();
    let viewer = db
        .viewer(&headers)
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Not authorized"))?;
    let video = db
        .videos
        .iter()
        .find(|v| v.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Video not found"))?;
    Ok(Json(json!({
        "isLiked": video.likes.contains(&viewer),
        "isDisliked": video.dislikes.contains(&viewer),
        "likes": video.likes.len(),
        "dislikes": video.dislikes.len(),
    })))
}

async fn list_comments(State(db): State<Shared>, Path(video_id): Path<String>) -> Reply {
    let db = db.lock().unwrap();
    let comments: Vec<Value> = db
        .comments
        .iter()
        .filter(|c| c.video_id == video_id)
        .map(|c| {
            let username = db
                .users
                .iter()
                .find(|u| u.id == c.user_id)
                .map(|u| u.username.clone());
            json!({
                "_id": c.id,
                "videoId": c.video_id,
                "text": c.text,
                "userId": { "_id": c.user_id, "username": username },
                "createdAt": CREATED_AT,
            })
        })
        .collect();
    Ok(Json(Value::Array(comments)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentForm {
    video_id: String,
    text: String,
}

async fn add_comment(
    State(db): State<Shared>,
    headers: HeaderMap,
    Json(form): Json<CommentForm>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let mut db = db.lock().unwrap();
    let viewer = db
        .viewer(&headers)
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Not authorized"))?;
    let id = db.id("m");
    db.comments.push(CommentRecord {
        id: id.clone(),
        video_id: form.video_id.clone(),
        text: form.text.clone(),
        user_id: viewer.clone(),
    });
    // like the real backend, the author comes back unpopulated
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "_id": id,
            "videoId": form.video_id,
            "text": form.text,
            "userId": viewer,
            "createdAt": CREATED_AT,
        })),
    ))
}

async fn delete_comment(
    State(db): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    let mut db = db.lock().unwrap();
    let viewer = db
        .viewer(&headers)
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Not authorized"))?;
    let index = db
        .comments
        .iter()
        .position(|c| c.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Comment not found"))?;
    if db.comments[index].user_id != viewer {
        return Err(fail(StatusCode::FORBIDDEN, "Not your comment"));
    }
    db.comments.remove(index);
    Ok(Json(json!({ "message": "Comment deleted" })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelForm {
    channel_name: String,
    #[serde(default)]
    description: String,
}

async fn create_channel(
    State(db): State<Shared>,
    headers: HeaderMap,
    Json(form): Json<ChannelForm>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let mut db = db.lock().unwrap();
    let viewer = db
        .viewer(&headers)
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Not authorized"))?;
    if db.channels.iter().any(|c| c.owner == viewer) {
        return Err(fail(StatusCode::BAD_REQUEST, "User already has a channel"));
    }
    let id = db.id("c");
    let channel = ChannelRecord {
        id,
        name: form.channel_name,
        description: form.description,
        owner: viewer.clone(),
        subscribers: Vec::new(),
    };
    let body = db.channel_json(&channel, Some(viewer.as_str()));
    db.channels.push(channel);
    Ok((StatusCode::CREATED, Json(body)))
}

async fn get_channel(
    State(db): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    let db = db.lock().unwrap();
    let viewer = db.viewer(&headers);
    let channel = db
        .channels
        .iter()
        .find(|c| c.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Channel not found"))?;
    Ok(Json(db.channel_json(channel, viewer.as_deref())))
}

async fn channel_for_user(
    State(db): State<Shared>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    let db = db.lock().unwrap();
    let viewer = db.viewer(&headers);
    let channel = db
        .channels
        .iter()
        .find(|c| c.owner == user_id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Channel not found"))?;
    Ok(Json(db.channel_json(channel, viewer.as_deref())))
}

async fn delete_channel(
    State(db): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    let mut db = db.lock().unwrap();
    let viewer = db
        .viewer(&headers)
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Not authorized"))?;
    let index = db
        .channels
        .iter()
        .position(|c| c.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Channel not found"))?;
    if db.channels[index].owner != viewer {
        return Err(fail(StatusCode::FORBIDDEN, "Not your channel"));
    }
    db.channels.remove(index);
    db.videos.retain(|v| v.channel_id.as_deref() != Some(id.as_str()));
    Ok(Json(json!({ "message": "Channel and related videos deleted" })))
}

async fn subscribe(State(db): State<Shared>, Path(id): Path<String>, headers: HeaderMap) -> Reply {
    let mut db = db.lock().unwrap();
    let viewer = db
        .viewer(&headers)
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Not authorized"))?;
    let channel = db
        .channels
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Channel not found"))?;
    let is_subscribed = toggle_membership(&mut channel.subscribers, &viewer);
    Ok(Json(json!({
        "subscribers": channel.subscribers.len(),
        "isSubscribed": is_subscribed,
    })))
}

/// An API URL nothing listens on.
pub async fn dead_api_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{address}/api")
}

/// Runs `test` inside a tokio `LocalSet`, where the views spawn their engagement requests.
pub async fn local<F: std::future::Future>(test: F) -> F::Output {
    tokio::task::LocalSet::new().run_until(test).await
}
