use meshcall_client::{CallSession, CallState, WebSocketConnector};
use meshcall_core::RoomId;
use meshcall_relay::{RelayService, StaticTokens};
use std::sync::Arc;

use crate::integration::init_tracing;
use crate::utils::{MockMediaDevices, MockTransportFactory, start_relay, test_config, wait_until};

#[tokio::test]
async fn test_restart_rejoins_with_fresh_id() {
    init_tracing();

    let service = RelayService::new(StaticTokens::new().with_room("r1", "t1"));
    let url = start_relay(service.clone()).await;
    let room = RoomId::from("r1");

    let handle = CallSession::spawn(
        test_config(),
        MockMediaDevices::new(),
        Arc::new(WebSocketConnector::new(url)),
        MockTransportFactory::new(),
    );
    assert_eq!(handle.local_id(), None);

    handle.start_call("r1", "t1").await.expect("first start_call");
    handle
        .wait_for_state(|s| *s == CallState::Active)
        .await
        .expect("first call active");
    let first = handle.local_id().expect("first id");
    assert_eq!(service.room_members(&room), vec![first.clone()]);

    // Restart right away, before the relay has necessarily seen the old
    // socket go.
    handle.end_call().await.expect("end_call");
    handle.start_call("r1", "t1").await.expect("second start_call");
    let state = handle
        .wait_for_state(|s| *s == CallState::Active || s.is_error())
        .await
        .expect("second call settled");
    assert_eq!(state, CallState::Active);

    let second = handle.local_id().expect("second id");
    assert_ne!(first, second);
    assert_eq!(handle.status().local_id, Some(second.clone()));

    let svc = &service;
    let (room_ref, second_ref) = (&room, &second);
    assert!(
        wait_until(3000, move || async move {
            svc.room_members(room_ref) == vec![second_ref.clone()]
        })
        .await,
        "relay should only list the new id"
    );

    handle.end_call().await.expect("end_call");
}
