use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] storybox_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No story description provided")]
    EmptyDescription,
    #[error("Story ID cannot be empty")]
    EmptyStoryId,
    #[error("Setting key cannot be empty")]
    EmptySettingKey,
    #[error("Story not found for id/prefix: {0}")]
    StoryNotFound(String),
    #[error("{0}")]
    AmbiguousStoryId(String),
    #[error("Unsupported photo type: {0} (use .jpg, .png, .gif or .webp)")]
    UnsupportedPhoto(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Local storage is unavailable; `{0}` needs it")]
    StorageRequired(&'static str),
    #[error("Refusing to clear local data without --yes")]
    ClearNotConfirmed,
    #[error("Not signed in. Run `storybox login` first.")]
    NotSignedIn,
}
