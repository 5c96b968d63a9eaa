use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use tube_types::{Channel, NewChannel, NewVideo, Video};

use crate::{
    ClientError, SessionStore,
    validate::{self, ValidationError},
};

/// The logged-in user's own channel: create it, upload to it, delete it.
pub struct ChannelView {
    session: Rc<SessionStore>,
    channel: RefCell<Option<Channel>>,
    disposed: Cell<bool>,
}

impl ChannelView {
    pub fn new(session: Rc<SessionStore>) -> Self {
        Self {
            channel: RefCell::new(session.channel()),
            session,
            disposed: Cell::new(false),
        }
    }

    /// Look up the user's channel. Having none is `Ok(None)`.
    pub async fn load(&self) -> Result<Option<Channel>, ClientError> {
        let (Some(token), Some(user_id)) = (self.session.token(), self.session.user_id()) else {
            return Err(ClientError::Unauthenticated);
        };
        let channel = self
            .session
            .api()
            .channel_for_user(&token, &user_id)
            .await
            .inspect_err(|e| log::error!("Error fetching channel: {e}"))?;
        if !self.disposed.get() {
            self.channel.borrow_mut().clone_from(&channel);
        }
        Ok(channel)
    }

    pub fn channel(&self) -> Option<Channel> {
        self.channel.borrow().clone()
    }

    pub async fn create_channel(&self, form: &NewChannel) -> Result<Channel, ClientError> {
        let token = self.session.token().ok_or(ClientError::Unauthenticated)?;
        validate::channel(form)?;

        let channel = self
            .session
            .api()
            .create_channel(&token, form)
            .await
            .inspect_err(|e| log::error!("Error creating channel: {e}"))?;
        log::info!("Created channel {} ({})", channel.channel_name, channel.id);

        self.session.set_channel(Some(channel.clone()));
        if !self.disposed.get() {
            *self.channel.borrow_mut() = Some(channel.clone());
        }
        Ok(channel)
    }

    /// Delete the channel and, on the server, every video in it.
    pub async fn delete_channel(&self) -> Result<(), ClientError> {
        let token = self.session.token().ok_or(ClientError::Unauthenticated)?;
        let channel_id = self
            .channel()
            .or_else(|| self.session.channel())
            .map(|channel| channel.id)
            .ok_or(ValidationError::ChannelRequired)?;

        match self.session.api().delete_channel(&token, &channel_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                log::error!("Error deleting channel {channel_id}: {e}");
                return Err(ClientError::NotFound {
                    message: Some("Channel not found or already deleted.".to_string()),
                });
            }
            Err(e) => {
                log::error!("Error deleting channel {channel_id}: {e}");
                return Err(e);
            }
        }

        log::info!("Deleted channel {channel_id} and its videos");
        self.session.set_channel(None);
        if !self.disposed.get() {
            self.channel.borrow_mut().take();
        }
        Ok(())
    }

    /// Publish a video on the user's channel. `form.channel_id` is filled in here.
    pub async fn upload_video(&self, form: NewVideo) -> Result<Video, ClientError> {
        let token = self.session.token().ok_or(ClientError::Unauthenticated)?;
        let channel = self
            .channel()
            .or_else(|| self.session.channel())
            .ok_or(ValidationError::ChannelRequired)?;
        validate::video(&form)?;

        let form = NewVideo {
            channel_id: channel.id,
            ..form
        };
        self.session
            .api()
            .create_video(&token, &form)
            .await
            .inspect_err(|e| log::error!("Error uploading video: {e}"))
    }

    pub fn dispose(&self) {
        self.disposed.set(true);
    }
}
