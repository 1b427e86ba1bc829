use meshcall_client::{CallSession, CallState, WebSocketConnector};
use meshcall_relay::{RelayService, StaticTokens};
use std::sync::Arc;

use crate::integration::init_tracing;
use crate::utils::{MockMediaDevices, MockTransportFactory, start_relay, test_config};

#[tokio::test]
async fn test_auth_error_ends_call() {
    init_tracing();

    let url = start_relay(RelayService::new(StaticTokens::new().with_room("r1", "t1"))).await;

    let devices = MockMediaDevices::new();
    let transports = MockTransportFactory::new();
    let handle = CallSession::spawn(
        test_config(),
        devices.clone(),
        Arc::new(WebSocketConnector::new(url)),
        transports.clone(),
    );

    handle.start_call("r1", "wrong").await.expect("join sent");

    let state = handle
        .wait_for_state(CallState::is_error)
        .await
        .expect("session alive");
    let CallState::Error { message, retriable } = state else {
        unreachable!()
    };
    assert!(message.contains("invalid token"), "{message}");
    assert!(!retriable);

    // No offers were made and local media was released.
    assert_eq!(transports.created_count().await, 0);
    let stream = devices.stream(0).await.expect("camera stream");
    assert!(!stream.is_active());
    assert!(handle.participants().is_empty());
}
