use crate::media::track::{MediaConstraints, MediaStream};
use async_trait::async_trait;
use thiserror::Error;

/// Result of a non-prompting permission query for camera + microphone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Prompt,
}

/// Raw platform failure; `name` follows the DOM exception naming
/// (`NotAllowedError`, `NotFoundError`, `NotReadableError`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name}: {message}")]
pub struct DeviceError {
    pub name: String,
    pub message: String,
}

impl DeviceError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Platform capture capabilities the host application provides.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// `None` when the platform cannot query permissions without prompting.
    async fn query_permission(&self) -> Option<PermissionStatus>;

    /// May block on a user prompt for as long as the user takes to answer.
    async fn get_user_media(&self, constraints: MediaConstraints)
    -> Result<MediaStream, DeviceError>;

    async fn get_display_media(&self) -> Result<MediaStream, DeviceError>;
}
