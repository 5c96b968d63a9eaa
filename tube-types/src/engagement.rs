//! Response bodies of the engagement endpoints, plus the tolerant counter type they share.
//!
//! The backend is inconsistent about counters: `/like` answers with the full list
//! of user ids (`likes: [...]`) while `/dislike` answers with a plain number
//! (`dislikes: 3`). [`Tally`] accepts both and only keeps the count.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Channel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tally(u64);

impl Tally {
    pub fn new(count: u64) -> Self {
        Tally(count)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for Tally {
    fn from(count: u64) -> Self {
        Tally(count)
    }
}

impl Serialize for Tally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for Tally {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u64),
            Ids(Vec<serde_json::Value>),
            Null(()),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Count(count) => Tally(count),
            Raw::Ids(ids) => Tally(ids.len() as u64),
            Raw::Null(()) => Tally(0),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub likes: Tally,
    pub is_liked: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DislikeResponse {
    pub dislikes: Tally,
    pub is_disliked: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
    pub subscribers: Tally,
    pub is_subscribed: bool,
}

/// `GET /videos/:id/status`. Counts are optional; older backends only send the flags.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub is_disliked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<Tally>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dislikes: Option<Tally>,
}

/// `GET /channels/user/:userId` answers either with the channel or with `{ "channel": ... }`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ChannelLookup {
    // Must come first: every object would otherwise match `Wrapped` with `channel: None`.
    Bare(Box<Channel>),
    Wrapped {
        #[serde(default)]
        channel: Option<Box<Channel>>,
    },
}

impl ChannelLookup {
    pub fn into_channel(self) -> Option<Channel> {
        match self {
            ChannelLookup::Bare(channel) => Some(*channel),
            ChannelLookup::Wrapped { channel } => channel.map(|channel| *channel),
        }
    }
}
