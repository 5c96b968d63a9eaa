pub mod engagement;
pub mod models;
pub mod requests;

use std::sync::LazyLock;

use regex::Regex;

pub use engagement::{
    ChannelLookup, DislikeResponse, LikeResponse, SubscribeResponse, Tally, VideoStatus,
};
pub use models::{Channel, ChannelRef, Comment, User, UserRef, Video, VideoRef};
pub use requests::{AuthResponse, LoginRequest, NewChannel, NewComment, NewVideo, RegisterRequest};

/// Category filter that matches every video.
pub const ALL_CATEGORIES: &str = "All";

/// Categories offered by the home feed filter bar, in display order.
pub const CATEGORIES: &[&str] = &[
    ALL_CATEGORIES,
    "Music",
    "Gaming",
    "Education",
    "Web Development",
    "JavaScript",
    "Sports",
    "Fun Video",
    "Food",
];

static YOUTUBE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:https?://)?(?:www\.)?(?:youtube\.com/(?:watch\?v=|embed/)|youtu\.be/)([^\s&?/]+)",
    )
    .expect("static regex is valid")
});

/// Turns a YouTube watch, short-link, or embed URL into an embeddable player URL.
///
/// Returns `None` for anything else (e.g. a direct link to a video file), which
/// callers play back as-is.
pub fn youtube_embed_url(url: &str) -> Option<String> {
    let captures = YOUTUBE_URL.captures(url)?;
    let id = captures.get(1)?.as_str();
    Some(format!("https://www.youtube.com/embed/{id}"))
}
