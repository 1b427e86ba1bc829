use crate::error::MediaError;
use crate::media::devices::{DeviceError, MediaDevices, PermissionStatus};
use crate::media::track::{MediaConstraints, MediaStream, TrackKind};
use meshcall_core::MediaPermissionState;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Acquires and releases local media and tracks the permission state.
pub struct MediaCaptureController {
    devices: Arc<dyn MediaDevices>,
    permission: MediaPermissionState,
}

impl MediaCaptureController {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            devices,
            permission: MediaPermissionState::Unknown,
        }
    }

    pub fn permission_state(&self) -> MediaPermissionState {
        self.permission
    }

    /// Queries permission without prompting. Platforms without a query
    /// capability leave the state untouched.
    pub async fn check_permission(&mut self) -> MediaPermissionState {
        match self.devices.query_permission().await {
            Some(PermissionStatus::Granted) => self.advance(MediaPermissionState::Granted, false),
            Some(PermissionStatus::Denied) => self.advance(MediaPermissionState::Denied, false),
            Some(PermissionStatus::Prompt) => self.advance(MediaPermissionState::Prompt, false),
            None => debug!("Permission query unavailable, staying {:?}", self.permission),
        }
        self.permission
    }

    pub async fn acquire(&mut self, constraints: MediaConstraints) -> Result<MediaStream, MediaError> {
        info!(
            "Acquiring local media (audio: {}, video: {})",
            constraints.audio, constraints.video
        );

        match self.devices.get_user_media(constraints).await {
            Ok(stream) => {
                self.advance(MediaPermissionState::Granted, false);
                Ok(stream)
            }
            Err(e) => Err(self.on_device_error(e)),
        }
    }

    /// The user-initiated retry after a denial: reopens the prompt and makes
    /// exactly one acquisition attempt.
    pub async fn retry(&mut self, constraints: MediaConstraints) -> Result<MediaStream, MediaError> {
        self.advance(MediaPermissionState::Prompt, true);
        self.acquire(constraints).await
    }

    pub async fn acquire_display(&self) -> Result<MediaStream, MediaError> {
        self.devices.get_display_media().await.map_err(|e| {
            warn!("Display capture failed: {}", e);
            MediaError::classify(&e.name, &e.message)
        })
    }

    /// Stops every track of `stream`. Releasing twice is a no-op.
    pub fn release(&self, stream: &MediaStream) {
        let stopped = stream.tracks().iter().filter(|t| t.stop()).count();
        if stopped > 0 {
            debug!("Released {} track(s) of stream {}", stopped, stream.id());
        }
    }

    /// Flips `enabled` on the existing tracks of `kind`; nothing is reacquired.
    /// Returns whether any track matched.
    pub fn set_track_enabled(&self, stream: &MediaStream, kind: TrackKind, enabled: bool) -> bool {
        let mut matched = false;
        for track in stream.tracks_of(kind) {
            track.set_enabled(enabled);
            matched = true;
        }
        matched
    }

    fn on_device_error(&mut self, e: DeviceError) -> MediaError {
        let err = MediaError::classify(&e.name, &e.message);
        warn!("Media acquisition failed: {} ({:?})", e, err);
        if err == MediaError::PermissionDenied {
            self.advance(MediaPermissionState::Denied, false);
        }
        err
    }

    fn advance(&mut self, next: MediaPermissionState, user_retry: bool) {
        if self.permission.can_transition_to(next, user_retry) {
            self.permission = next;
        } else {
            debug!(
                "Ignoring permission transition {:?} -> {:?}",
                self.permission, next
            );
        }
    }
}
