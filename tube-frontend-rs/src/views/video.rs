use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use optimist::{EngagementState, ListenerKey, PendingToggle, ToggleError};
use tube_types::{Channel, Comment, NewComment, UserRef, Video, youtube_embed_url};

use crate::{
    ClientError, EngagementEngine, EngagementKey, SessionStore,
    engagement::{dislike_state, like_state, subscription_state},
    validate::{self, ValidationError},
};

/// The player page: one video, its channel's subscription, and its comments.
pub struct VideoView {
    session: Rc<SessionStore>,
    engine: EngagementEngine,
    video: RefCell<Option<Video>>,
    channel: RefCell<Option<Channel>>,
    comments: RefCell<Vec<Comment>>,
    disposed: Cell<bool>,
}

impl VideoView {
    pub fn new(session: Rc<SessionStore>) -> Self {
        Self {
            engine: super::engine_for(&session),
            session,
            video: RefCell::new(None),
            channel: RefCell::new(None),
            comments: RefCell::new(Vec::new()),
            disposed: Cell::new(false),
        }
    }

    /// Count a view, then [`fetch`](Self::fetch) the video.
    pub async fn load(&self, id: &str) -> Result<Video, ClientError> {
        if let Err(e) = self.session.api().increment_views(id).await {
            log::error!("Error incrementing video views: {e}");
        }
        self.fetch(id).await
    }

    /// Fetch the video, its channel and its comments without counting a view.
    ///
    /// Only the video itself is required; the other lookups are logged and skipped on failure.
    pub async fn fetch(&self, id: &str) -> Result<Video, ClientError> {
        let api = self.session.api();
        let token = self.session.token();
        let video = api
            .video(id, token.as_deref())
            .await
            .inspect_err(|e| log::error!("Error fetching video {id}: {e}"))?;
        if self.disposed.get() {
            return Ok(video);
        }
        self.engine
            .track(EngagementKey::like(&video.id), like_state(&video));
        self.engine
            .track(EngagementKey::dislike(&video.id), dislike_state(&video));
        *self.video.borrow_mut() = Some(video.clone());

        if let Some(channel_id) = video.channel().map(|channel| channel.id().to_string()) {
            match api.channel(&channel_id, token.as_deref()).await {
                Ok(channel) if !self.disposed.get() => {
                    self.engine.track(
                        EngagementKey::subscribe(&channel.id),
                        subscription_state(&channel),
                    );
                    *self.channel.borrow_mut() = Some(channel);
                }
                Ok(_) => {}
                Err(e) => log::error!("Error fetching channel {channel_id}: {e}"),
            }
        }

        match api.comments(id).await {
            Ok(comments) if !self.disposed.get() => *self.comments.borrow_mut() = comments,
            Ok(_) => {}
            Err(e) => log::error!("Error fetching comments: {e}"),
        }

        Ok(video)
    }

    pub fn video(&self) -> Option<Video> {
        self.video.borrow().clone()
    }

    pub fn channel(&self) -> Option<Channel> {
        self.channel.borrow().clone()
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.comments.borrow().clone()
    }

    fn video_id(&self) -> Option<String> {
        self.video.borrow().as_ref().map(|video| video.id.clone())
    }

    fn channel_id(&self) -> Option<String> {
        self.video
            .borrow()
            .as_ref()
            .and_then(Video::channel)
            .map(|channel| channel.id().to_string())
    }

    /// Other videos from `feed` to list next to the player.
    pub fn related(&self, feed: &[Video]) -> Vec<Video> {
        let current = self.video_id();
        feed.iter()
            .filter(|video| video.channel().is_some())
            .filter(|video| current.as_deref() != Some(video.id.as_str()))
            .cloned()
            .collect()
    }

    /// Embeddable player URL, for YouTube links.
    pub fn embed_url(&self) -> Option<String> {
        self.video
            .borrow()
            .as_ref()
            .and_then(|video| youtube_embed_url(&video.video_url))
    }

    pub fn like(&self) -> Result<PendingToggle, ToggleError> {
        super::toggle(
            &self.engine,
            &self.session,
            self.video_id().map(EngagementKey::like),
        )
    }

    pub fn dislike(&self) -> Result<PendingToggle, ToggleError> {
        super::toggle(
            &self.engine,
            &self.session,
            self.video_id().map(EngagementKey::dislike),
        )
    }

    /// Fails with `TargetMissing` when the video has no channel.
    pub fn subscribe(&self) -> Result<PendingToggle, ToggleError> {
        super::toggle(
            &self.engine,
            &self.session,
            self.channel_id().map(EngagementKey::subscribe),
        )
    }

    pub fn like_state(&self) -> Option<EngagementState> {
        self.engine.state(&EngagementKey::like(self.video_id()?))
    }

    pub fn dislike_state(&self) -> Option<EngagementState> {
        self.engine.state(&EngagementKey::dislike(self.video_id()?))
    }

    pub fn subscription_state(&self) -> Option<EngagementState> {
        self.engine.state(&EngagementKey::subscribe(self.channel_id()?))
    }

    /// Re-read the caller's like and dislike flags from the server.
    pub async fn refresh_status(&self) -> Result<(), ClientError> {
        let token = self.session.token().ok_or(ClientError::Unauthenticated)?;
        let Some(id) = self.video_id() else {
            return Ok(());
        };
        let status = self.session.api().video_status(&token, &id).await?;
        if self.disposed.get() {
            return Ok(());
        }

        let like = EngagementKey::like(&id);
        let likes = status.likes.map(|likes| likes.get());
        if let Some(state) = super::status_state(&self.engine, &like, status.is_liked, likes) {
            self.engine.reconcile(&like, state);
        }
        let dislike = EngagementKey::dislike(&id);
        let dislikes = status.dislikes.map(|dislikes| dislikes.get());
        if let Some(state) =
            super::status_state(&self.engine, &dislike, status.is_disliked, dislikes)
        {
            self.engine.reconcile(&dislike, state);
        }
        Ok(())
    }

    /// Post a comment. The saved comment is shown with the current user as its author.
    pub async fn add_comment(&self, text: &str) -> Result<Comment, ClientError> {
        let token = self.session.token().ok_or(ClientError::Unauthenticated)?;
        validate::comment(text)?;
        let video_id = self
            .video_id()
            .ok_or(ValidationError::Required("video"))?;

        let mut saved = self
            .session
            .api()
            .add_comment(
                &token,
                &NewComment {
                    video_id,
                    text: text.to_string(),
                },
            )
            .await
            .inspect_err(|e| log::error!("Error adding comment: {e}"))?;

        // the backend answers with a bare author id
        if let Some(user) = self.session.user() {
            saved.user_id = Some(UserRef::Summary {
                id: user.id,
                username: Some(user.username),
            });
        }
        if !self.disposed.get() {
            self.comments.borrow_mut().push(saved.clone());
        }
        Ok(saved)
    }

    pub async fn delete_comment(&self, comment_id: &str) -> Result<(), ClientError> {
        let token = self.session.token().ok_or(ClientError::Unauthenticated)?;
        self.session
            .api()
            .delete_comment(&token, comment_id)
            .await
            .inspect_err(|e| log::error!("Error deleting comment: {e}"))?;
        if !self.disposed.get() {
            self.comments
                .borrow_mut()
                .retain(|comment| comment.id != comment_id);
        }
        Ok(())
    }

    /// Only the author may delete a comment.
    pub fn can_delete(&self, comment: &Comment) -> bool {
        match (self.session.user_id(), comment.author_id()) {
            (Some(user), Some(author)) => user == author,
            _ => false,
        }
    }

    pub fn register_listener(
        &self,
        listener: impl Fn(&EngagementKey, EngagementState) + 'static,
    ) -> ListenerKey {
        self.engine.register_listener(listener)
    }

    pub fn unregister_listener(&self, key: ListenerKey) {
        self.engine.unregister_listener(key);
    }

    pub fn dispose(&self) {
        self.disposed.set(true);
        self.engine.dispose();
    }
}
