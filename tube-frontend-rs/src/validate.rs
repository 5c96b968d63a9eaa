//! Form checks that run before anything touches the network.

use tube_types::{LoginRequest, NewChannel, NewVideo, RegisterRequest};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("email should start with a lowercase letter")]
    EmailCase,

    #[error("comment cannot be empty")]
    EmptyComment,

    #[error("you need to create a channel first")]
    ChannelRequired,
}

fn required(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(())
    }
}

pub fn email(email: &str) -> Result<(), ValidationError> {
    required(email, "email")?;
    match email.chars().next() {
        Some(first) if first.is_lowercase() => Ok(()),
        _ => Err(ValidationError::EmailCase),
    }
}

pub fn register(form: &RegisterRequest) -> Result<(), ValidationError> {
    required(&form.username, "username")?;
    email(&form.email)?;
    required(&form.password, "password")
}

pub fn login(form: &LoginRequest) -> Result<(), ValidationError> {
    email(&form.email)?;
    required(&form.password, "password")
}

pub fn comment(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        Err(ValidationError::EmptyComment)
    } else {
        Ok(())
    }
}

pub fn channel(form: &NewChannel) -> Result<(), ValidationError> {
    required(&form.channel_name, "channel name")
}

/// The channel id is filled in by the caller, so only the user-entered fields are checked.
pub fn video(form: &NewVideo) -> Result<(), ValidationError> {
    required(&form.title, "title")?;
    required(&form.video_url, "video URL")
}
