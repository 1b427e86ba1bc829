use meshcall_client::{CallState, ConnectionState};
use meshcall_core::{IceCandidate, ParticipantId, SessionDescription, SignalMessage};

use crate::integration::{admit, init_tracing};
use crate::utils::{
    MockMediaDevices, MockTransportFactory, ScriptedConnector, is_answer_to, is_offer_to,
    spawn_call, wait_for_peer_state,
};

#[tokio::test]
async fn test_failed_peer_stays_down() {
    init_tracing();

    let (connector, mut wires) = ScriptedConnector::new();
    let transports = MockTransportFactory::new();
    let handle = spawn_call(MockMediaDevices::new(), connector, transports.clone());

    handle.start_call("r1", "t1").await.expect("start_call");
    let mut wire = wires.recv().await.expect("signaling opened");
    admit(&mut wire, &handle, &["B"]).await;

    let me = handle.local_id().expect("local id");
    let b = ParticipantId::from("B");

    wire.recv_matching(|m| is_offer_to(m, &b))
        .await
        .expect("offer to B");
    wire.send(&SignalMessage::answer(
        b.clone(),
        me.clone(),
        SessionDescription::answer("v=0 from B"),
    ));
    wire.send(&SignalMessage::candidate(
        b.clone(),
        me.clone(),
        IceCandidate::new("candidate:B 1"),
    ));
    assert!(wait_for_peer_state(&handle, &b, ConnectionState::Connected).await);

    let first = transports.latest(&b).await.expect("transport for B");
    first.fail().await;
    assert!(wait_for_peer_state(&handle, &b, ConnectionState::Failed).await);
    assert_eq!(transports.created_count().await, 1);

    // Stragglers from B that were already in flight.
    wire.send(&SignalMessage::candidate(
        b.clone(),
        me.clone(),
        IceCandidate::new("candidate:B 2"),
    ));
    wire.send(&SignalMessage::answer(
        b.clone(),
        me.clone(),
        SessionDescription::answer("v=0 late"),
    ));
    // Nor does a stranger's answer add anyone to the call.
    let stranger = ParticipantId::from("Z");
    wire.send(&SignalMessage::answer(
        stranger.clone(),
        me.clone(),
        SessionDescription::answer("v=0 stray"),
    ));

    let sent = wire.drain(300).await;
    assert!(sent.is_empty(), "nothing goes back to B: {sent:?}");
    assert_eq!(transports.created_count().await, 1);
    assert!(!handle.remote_streams().contains(&b));
    assert!(handle.participant(&stranger).is_none());
    assert_eq!(
        handle.participant(&b).map(|p| p.connection_state),
        Some(ConnectionState::Failed)
    );

    // A fresh offer from B brings up a new connection.
    wire.send(&SignalMessage::offer(
        b.clone(),
        me.clone(),
        SessionDescription::offer("v=0 retry from B"),
    ));
    wire.recv_matching(|m| is_answer_to(m, &b))
        .await
        .expect("answer to B");
    wire.send(&SignalMessage::candidate(
        b.clone(),
        me.clone(),
        IceCandidate::new("candidate:B 3"),
    ));

    assert!(wait_for_peer_state(&handle, &b, ConnectionState::Connected).await);
    assert_eq!(transports.created_count().await, 2);
    let second = transports.latest(&b).await.expect("new transport for B");
    assert_ne!(second.generation, first.generation);
    assert_eq!(handle.state(), CallState::Active);

    handle.end_call().await.expect("end_call");
}
