//! Binds the generic sync engine to the like/dislike/subscribe endpoints.

use std::fmt;

use optimist::{EngagementState, RemoteFailure, SyncEngine, ToggleRemote};
use tube_types::{Channel, DislikeResponse, LikeResponse, SubscribeResponse, Video};

use crate::RemoteClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleKind {
    Like,
    Dislike,
    Subscribe,
}

/// One toggle dimension on one target: a video for likes and dislikes, a channel for subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EngagementKey {
    pub target: String,
    pub kind: ToggleKind,
}

impl EngagementKey {
    pub fn like(video_id: impl Into<String>) -> Self {
        Self {
            target: video_id.into(),
            kind: ToggleKind::Like,
        }
    }

    pub fn dislike(video_id: impl Into<String>) -> Self {
        Self {
            target: video_id.into(),
            kind: ToggleKind::Dislike,
        }
    }

    pub fn subscribe(channel_id: impl Into<String>) -> Self {
        Self {
            target: channel_id.into(),
            kind: ToggleKind::Subscribe,
        }
    }
}

impl fmt::Display for EngagementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            ToggleKind::Like => "like",
            ToggleKind::Dislike => "dislike",
            ToggleKind::Subscribe => "subscribe",
        };
        write!(f, "{verb}:{}", self.target)
    }
}

pub type EngagementEngine = SyncEngine<EngagementKey, RemoteClient>;

pub fn like_state(video: &Video) -> EngagementState {
    EngagementState::new(video.is_liked, video.likes.get())
}

pub fn dislike_state(video: &Video) -> EngagementState {
    EngagementState::new(video.is_disliked, video.dislikes.get())
}

pub fn subscription_state(channel: &Channel) -> EngagementState {
    EngagementState::new(channel.is_subscribed, channel.subscribers.get())
}

fn liked(response: LikeResponse) -> EngagementState {
    EngagementState::new(response.is_liked, response.likes.get())
}

fn disliked(response: DislikeResponse) -> EngagementState {
    EngagementState::new(response.is_disliked, response.dislikes.get())
}

fn subscribed(response: SubscribeResponse) -> EngagementState {
    EngagementState::new(response.is_subscribed, response.subscribers.get())
}

impl ToggleRemote<EngagementKey> for RemoteClient {
    async fn toggle(
        &self,
        key: &EngagementKey,
        token: &str,
    ) -> Result<Option<EngagementState>, RemoteFailure> {
        log::debug!("Sending toggle {key}");
        let state = match key.kind {
            ToggleKind::Like => self.like_video(token, &key.target).await?.map(liked),
            ToggleKind::Dislike => self.dislike_video(token, &key.target).await?.map(disliked),
            ToggleKind::Subscribe => self.subscribe(token, &key.target).await?.map(subscribed),
        };
        Ok(state)
    }
}
