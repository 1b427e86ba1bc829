use meshcall_client::{
    CallError, CallState, DeviceError, MediaError, MediaPermissionState, PermissionStatus,
};

use crate::integration::init_tracing;
use crate::utils::{MockMediaDevices, MockTransportFactory, ScriptedConnector, spawn_call};

#[tokio::test]
async fn test_permission_denied_waits_for_retry() {
    init_tracing();

    let (connector, mut wires) = ScriptedConnector::new();
    let devices = MockMediaDevices::with_permission(Some(PermissionStatus::Denied));
    let handle = spawn_call(devices.clone(), connector.clone(), MockTransportFactory::new());

    // Denied up front: surfaced without touching the camera.
    assert_eq!(
        handle.start_call("r1", "t1").await,
        Err(CallError::Media(MediaError::PermissionDenied))
    );
    assert_eq!(devices.user_media_calls(), 0);
    assert_eq!(connector.connects(), 0);

    let status = handle.status();
    assert_eq!(status.permission, MediaPermissionState::Denied);
    assert!(matches!(
        status.state,
        CallState::Error {
            retriable: true,
            ..
        }
    ));

    // The user clicks retry but dismisses the prompt again.
    devices
        .fail_user_media(Some(DeviceError::new("NotAllowedError", "dismissed")))
        .await;
    assert_eq!(
        handle.retry_media().await,
        Err(CallError::Media(MediaError::PermissionDenied))
    );
    assert_eq!(devices.user_media_calls(), 1);

    // Second click, access granted.
    devices.fail_user_media(None).await;
    handle.retry_media().await.expect("retry_media");
    assert_eq!(devices.user_media_calls(), 2);
    assert_eq!(handle.status().permission, MediaPermissionState::Granted);

    let mut wire = wires.recv().await.expect("signaling opened");
    assert!(matches!(wire.recv().await, Some(meshcall_core::SignalMessage::Join { .. })));
    assert_eq!(connector.connects(), 1);
    assert_eq!(handle.state(), CallState::JoiningSignaling);

    // Retry only applies to a retriable error.
    assert!(matches!(
        handle.retry_media().await,
        Err(CallError::InvalidState(_))
    ));
    assert_eq!(devices.user_media_calls(), 2);

    handle.end_call().await.expect("end_call");
}
