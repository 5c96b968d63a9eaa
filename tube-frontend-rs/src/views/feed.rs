use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use optimist::{EngagementState, ListenerKey, PendingToggle, ToggleError};
use tube_types::{ALL_CATEGORIES, Video};

use crate::{ClientError, EngagementEngine, EngagementKey, SessionStore, engagement::like_state};

/// Shorter queries clear the results instead of hitting the search endpoint.
pub const MIN_SEARCH_LEN: usize = 2;

/// The home page: every video that belongs to a channel, a category filter, search, and likes.
pub struct FeedView {
    session: Rc<SessionStore>,
    engine: EngagementEngine,
    videos: RefCell<Vec<Video>>,
    category: RefCell<String>,
    search_results: RefCell<Vec<Video>>,
    disposed: Cell<bool>,
}

impl FeedView {
    pub fn new(session: Rc<SessionStore>) -> Self {
        Self {
            engine: super::engine_for(&session),
            session,
            videos: RefCell::new(Vec::new()),
            category: RefCell::new(ALL_CATEGORIES.to_string()),
            search_results: RefCell::new(Vec::new()),
            disposed: Cell::new(false),
        }
    }

    /// Fetch the feed. Videos whose channel is gone are left out.
    pub async fn load(&self) -> Result<usize, ClientError> {
        let videos = self
            .session
            .api()
            .videos()
            .await
            .inspect_err(|e| log::error!("Failed to fetch videos: {e}"))?;
        if self.disposed.get() {
            return Ok(0);
        }

        let videos: Vec<Video> = videos
            .into_iter()
            .filter(|video| video.channel().is_some())
            .collect();
        for video in &videos {
            self.engine
                .track(EngagementKey::like(&video.id), like_state(video));
        }
        let count = videos.len();
        *self.videos.borrow_mut() = videos;
        Ok(count)
    }

    /// The loaded videos in the selected category.
    pub fn videos(&self) -> Vec<Video> {
        let category = self.category.borrow();
        self.videos
            .borrow()
            .iter()
            .filter(|video| *category == ALL_CATEGORIES || video.category == *category)
            .cloned()
            .collect()
    }

    /// Every loaded video, ignoring the category filter.
    pub fn all_videos(&self) -> Vec<Video> {
        self.videos.borrow().clone()
    }

    pub fn select_category(&self, category: &str) {
        *self.category.borrow_mut() = category.to_string();
    }

    pub fn category(&self) -> String {
        self.category.borrow().clone()
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Video>, ClientError> {
        if query.chars().count() < MIN_SEARCH_LEN {
            self.search_results.borrow_mut().clear();
            return Ok(Vec::new());
        }

        let results = self
            .session
            .api()
            .search_videos(query)
            .await
            .inspect_err(|e| log::error!("Error fetching search results: {e}"))?;
        if !self.disposed.get() {
            *self.search_results.borrow_mut() = results.clone();
        }
        Ok(results)
    }

    pub fn search_results(&self) -> Vec<Video> {
        self.search_results.borrow().clone()
    }

    pub fn like(&self, video_id: &str) -> Result<PendingToggle, ToggleError> {
        super::toggle(&self.engine, &self.session, Some(EngagementKey::like(video_id)))
    }

    pub fn like_state(&self, video_id: &str) -> Option<EngagementState> {
        self.engine.state(&EngagementKey::like(video_id))
    }

    /// Ask the server whether the current user likes each loaded video.
    /// Does nothing when logged out. Returns how many cards were updated.
    pub async fn refresh_like_status(&self) -> usize {
        let Some(token) = self.session.token() else {
            return 0;
        };
        let ids: Vec<String> = self
            .videos
            .borrow()
            .iter()
            .map(|video| video.id.clone())
            .collect();

        let mut refreshed = 0;
        for id in ids {
            let status = match self.session.api().video_status(&token, &id).await {
                Ok(status) => status,
                Err(e) => {
                    log::error!("Error fetching like status for {id}: {e}");
                    continue;
                }
            };
            if self.disposed.get() {
                break;
            }
            let key = EngagementKey::like(&id);
            let count = status.likes.map(|likes| likes.get());
            if let Some(state) = super::status_state(&self.engine, &key, status.is_liked, count) {
                self.engine.reconcile(&key, state);
                refreshed += 1;
            }
        }
        refreshed
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
