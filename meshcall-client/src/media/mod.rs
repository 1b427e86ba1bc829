mod capture;
mod devices;
mod track;

pub use capture::MediaCaptureController;
pub use devices::{DeviceError, MediaDevices, PermissionStatus};
pub use track::{MediaConstraints, MediaStream, MediaTrack, TrackKind};
