//! Typed wrappers around the backend's REST endpoints.
//!
//! Every method maps to exactly one request. Nothing here keeps state besides the
//! HTTP client and the base URL; tokens are passed in by the caller.

use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tube_types::{
    AuthResponse, Channel, ChannelLookup, Comment, DislikeResponse, LikeResponse, LoginRequest,
    NewChannel, NewComment, NewVideo, RegisterRequest, SubscribeResponse, User, Video,
    VideoStatus,
};

use crate::{ClientConfig, ClientError};

#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RemoteClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidApiUrl {
            url: config.api_url.clone(),
            reason,
        };
        let base_url = Url::parse(&config.api_url).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("not a hierarchical URL".to_string()));
        }

        let builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(config.timeout);
        let http = builder.build().map_err(ClientError::transport)?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // checked in `new`: the base URL can always take path segments
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str], token: Option<&str>) -> RequestBuilder {
        let builder = self.http.request(method, self.endpoint(segments));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and turn non-2xx answers into errors. Returns the raw body of successful answers.
    async fn execute(&self, builder: RequestBuilder) -> Result<String, ClientError> {
        let response = builder.send().await.map_err(ClientError::transport)?;
        let status = response.status();
        let url = response.url().clone();
        let body = response.text().await.map_err(ClientError::transport)?;
        if status.is_success() {
            Ok(body)
        } else {
            log::debug!("{url} answered {status}: {body}");
            Err(ClientError::from_status(status.as_u16(), &body))
        }
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let body = self.execute(builder).await?;
        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// For toggle endpoints: a 2xx answer whose body doesn't carry the expected state is `None`.
    async fn acknowledgement<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Option<T>, ClientError> {
        let body = self.execute(builder).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str(&body)
            .inspect_err(|e| log::warn!("Toggle answer without usable state ({e}): {body}"))
            .ok())
    }

    pub async fn register(&self, form: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        self.json(self.request(Method::POST, &["users", "register"], None).json(form))
            .await
    }

    pub async fn login(&self, form: &LoginRequest) -> Result<AuthResponse, ClientError> {
        self.json(self.request(Method::POST, &["users", "login"], None).json(form))
            .await
    }

    pub async fn profile(&self, token: &str) -> Result<User, ClientError> {
        self.json(self.request(Method::GET, &["users", "profile"], Some(token)))
            .await
    }

    pub async fn videos(&self) -> Result<Vec<Video>, ClientError> {
        self.json(self.request(Method::GET, &["videos"], None)).await
    }

    /// The token is optional; with one, the backend fills in `isLiked`/`isDisliked`.
    pub async fn video(&self, id: &str, token: Option<&str>) -> Result<Video, ClientError> {
        self.json(self.request(Method::GET, &["videos", id], token))
            .await
    }

    pub async fn search_videos(&self, query: &str) -> Result<Vec<Video>, ClientError> {
        self.json(
            self.request(Method::GET, &["videos", "search"], None)
                .query(&[("query", query)]),
        )
        .await
    }

    pub async fn create_video(&self, token: &str, video: &NewVideo) -> Result<Video, ClientError> {
        self.json(self.request(Method::POST, &["videos"], Some(token)).json(video))
            .await
    }

    pub async fn increment_views(&self, id: &str) -> Result<(), ClientError> {
        self.execute(self.request(Method::PATCH, &["videos", id, "views"], None))
            .await
            .map(drop)
    }

    pub async fn like_video(
        &self,
        token: &str,
        id: &str,
    ) -> Result<Option<LikeResponse>, ClientError> {
        self.acknowledgement(self.request(Method::POST, &["videos", id, "like"], Some(token)))
            .await
    }

    pub async fn dislike_video(
        &self,
        token: &str,
        id: &str,
    ) -> Result<Option<DislikeResponse>, ClientError> {
        self.acknowledgement(self.request(Method::POST, &["videos", id, "dislike"], Some(token)))
            .await
    }

    pub async fn video_status(&self, token: &str, id: &str) -> Result<VideoStatus, ClientError> {
        self.json(self.request(Method::GET, &["videos", id, "status"], Some(token)))
            .await
    }

    pub async fn comments(&self, video_id: &str) -> Result<Vec<Comment>, ClientError> {
        self.json(self.request(Method::GET, &["comments", video_id], None))
            .await
    }

    pub async fn add_comment(
        &self,
        token: &str,
        comment: &NewComment,
    ) -> Result<Comment, ClientError> {
        self.json(self.request(Method::POST, &["comments"], Some(token)).json(comment))
            .await
    }

    pub async fn delete_comment(&self, token: &str, id: &str) -> Result<(), ClientError> {
        self.execute(self.request(Method::DELETE, &["comments", id], Some(token)))
            .await
            .map(drop)
    }

    pub async fn create_channel(
        &self,
        token: &str,
        channel: &NewChannel,
    ) -> Result<Channel, ClientError> {
        let lookup: ChannelLookup = self
            .json(self.request(Method::POST, &["channels"], Some(token)).json(channel))
            .await?;
        lookup
            .into_channel()
            .ok_or_else(|| ClientError::Decode("channel creation answered without a channel".to_string()))
    }

    /// With a token the backend reports whether the caller is subscribed.
    pub async fn channel(&self, id: &str, token: Option<&str>) -> Result<Channel, ClientError> {
        self.json(self.request(Method::GET, &["channels", id], token))
            .await
    }

    /// The channel owned by `user_id`. "No channel yet" is `Ok(None)`, not an error.
    pub async fn channel_for_user(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<Option<Channel>, ClientError> {
        let lookup = self
            .json::<ChannelLookup>(self.request(
                Method::GET,
                &["channels", "user", user_id],
                Some(token),
            ))
            .await;
        match lookup {
            Ok(lookup) => Ok(lookup.into_channel()),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }

    pub async fn delete_channel(&self, token: &str, id: &str) -> Result<(), ClientError> {
        self.execute(self.request(Method::DELETE, &["channels", id], Some(token)))
            .await
            .map(drop)
    }

    pub async fn subscribe(
        &self,
        token: &str,
        channel_id: &str,
    ) -> Result<Option<SubscribeResponse>, ClientError> {
        self.acknowledgement(self.request(
            Method::POST,
            &["channels", channel_id, "subscribe"],
            Some(token),
        ))
        .await
    }
}
