use meshcall_client::{CallSession, CallState, ConnectionState, WebSocketConnector};
use meshcall_core::SdpType;
use meshcall_relay::{RelayService, StaticTokens};
use std::sync::Arc;

use crate::integration::init_tracing;
use crate::utils::{
    MockMediaDevices, MockTransportFactory, start_relay, test_config, wait_for_peer_state,
    wait_until,
};

#[tokio::test]
async fn test_two_clients_connect_via_relay() {
    init_tracing();

    let url = start_relay(RelayService::new(StaticTokens::new().with_room("r1", "t1"))).await;

    let transports_b = MockTransportFactory::new();
    let b = CallSession::spawn(
        test_config(),
        MockMediaDevices::new(),
        Arc::new(WebSocketConnector::new(url.clone())),
        transports_b.clone(),
    );
    b.start_call("r1", "t1").await.expect("B start_call");
    b.wait_for_state(|s| *s == CallState::Active)
        .await
        .expect("B active");

    let transports_a = MockTransportFactory::new();
    let a = CallSession::spawn(
        test_config(),
        MockMediaDevices::new(),
        Arc::new(WebSocketConnector::new(url)),
        transports_a.clone(),
    );
    a.start_call("r1", "t1").await.expect("A start_call");

    let a_id = a.local_id().expect("A id");
    let b_id = b.local_id().expect("B id");

    assert!(
        wait_for_peer_state(&a, &b_id, ConnectionState::Connected).await,
        "A never saw B connected"
    );
    assert!(
        wait_for_peer_state(&b, &a_id, ConnectionState::Connected).await,
        "B never saw A connected"
    );

    // Exactly one transport each way: A offered, B answered.
    assert_eq!(transports_a.created_count().await, 1);
    assert_eq!(transports_b.created_count().await, 1);

    let at_a = transports_a.latest(&b_id).await.expect("A's transport for B");
    let log = at_a.log().await;
    assert_eq!(log.local_description.map(|d| d.sdp_type), Some(SdpType::Offer));
    assert_eq!(log.remote_description.map(|d| d.sdp_type), Some(SdpType::Answer));

    let at_b = transports_b.latest(&a_id).await.expect("B's transport for A");
    let log = at_b.log().await;
    assert_eq!(log.remote_description.map(|d| d.sdp_type), Some(SdpType::Offer));
    assert_eq!(log.local_description.map(|d| d.sdp_type), Some(SdpType::Answer));

    assert!(a.remote_streams().contains(&b_id));
    assert!(b.remote_streams().contains(&a_id));

    // A hangs up; B hears about it through the relay.
    a.end_call().await.expect("A end_call");
    assert_eq!(a.state(), CallState::Ended);
    let (b_ref, a_ref) = (&b, &a_id);
    assert!(
        wait_until(3000, move || async move { b_ref.participant(a_ref).is_none() }).await,
        "B still lists A"
    );
    assert!(!b.remote_streams().contains(&a_id));

    b.end_call().await.expect("B end_call");
}
