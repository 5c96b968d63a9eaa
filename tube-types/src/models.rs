use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Tally;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A user as embedded in other records: either a bare id or a populated summary.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum UserRef {
    Summary {
        #[serde(rename = "_id")]
        id: String,
        #[serde(default)]
        username: Option<String>,
    },
    Id(String),
}

impl UserRef {
    pub fn id(&self) -> &str {
        match self {
            UserRef::Summary { id, .. } => id,
            UserRef::Id(id) => id,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            UserRef::Summary { username, .. } => username.as_deref(),
            UserRef::Id(_) => None,
        }
    }
}

/// A channel as embedded in a video: either a bare id or a populated summary.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ChannelRef {
    Summary {
        #[serde(rename = "_id")]
        id: String,
        #[serde(rename = "channelName", default)]
        channel_name: Option<String>,
    },
    Id(String),
}

impl ChannelRef {
    pub fn id(&self) -> &str {
        match self {
            ChannelRef::Summary { id, .. } => id,
            ChannelRef::Id(id) => id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            ChannelRef::Summary { channel_name, .. } => channel_name.as_deref(),
            ChannelRef::Id(_) => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub video_url: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: Tally,
    #[serde(default)]
    pub dislikes: Tally,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub is_disliked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Video {
    pub fn channel(&self) -> Option<&ChannelRef> {
        self.channel_id.as_ref()
    }

    pub fn channel_name(&self) -> &str {
        self.channel()
            .and_then(ChannelRef::name)
            .unwrap_or("Unknown Channel")
    }
}

/// A channel's video list entry: populated, or just an id.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum VideoRef {
    Full(Box<Video>),
    Id(String),
}

impl VideoRef {
    pub fn id(&self) -> &str {
        match self {
            VideoRef::Full(video) => &video.id,
            VideoRef::Id(id) => id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    #[serde(rename = "_id")]
    pub id: String,
    pub channel_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub channel_banner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserRef>,
    #[serde(default)]
    pub subscribers: Tally,
    #[serde(default)]
    pub is_subscribed: bool,
    #[serde(default)]
    pub videos: Vec<VideoRef>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub video_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn author_id(&self) -> Option<&str> {
        self.user_id.as_ref().map(UserRef::id)
    }
}
