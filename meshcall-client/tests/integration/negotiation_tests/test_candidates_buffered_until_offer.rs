use meshcall_client::{CallState, ConnectionState};
use meshcall_core::{IceCandidate, ParticipantId, SessionDescription, SignalMessage};

use crate::integration::{admit, init_tracing};
use crate::utils::{
    MockMediaDevices, MockTransportFactory, ScriptedConnector, is_answer_to, spawn_call,
    wait_for_peer_state, wait_until,
};

#[tokio::test]
async fn test_candidates_buffered_until_offer() {
    init_tracing();

    let (connector, mut wires) = ScriptedConnector::new();
    let transports = MockTransportFactory::new();
    let handle = spawn_call(MockMediaDevices::new(), connector, transports.clone());

    handle.start_call("r1", "t1").await.expect("start_call");
    let mut wire = wires.recv().await.expect("signaling opened");
    admit(&mut wire, &handle, &[]).await;
    handle
        .wait_for_state(|s| *s == CallState::Active)
        .await
        .expect("call active");

    let me = handle.local_id().expect("local id");
    let b = ParticipantId::from("B");
    let c1 = IceCandidate::new("candidate:1 1 udp 1 10.0.0.2 5001 typ host");
    let c2 = IceCandidate::new("candidate:2 1 udp 1 10.0.0.2 5002 typ host");

    // Candidates outrun the offer.
    wire.send(&SignalMessage::candidate(b.clone(), me.clone(), c1.clone()));
    wire.send(&SignalMessage::candidate(b.clone(), me.clone(), c2.clone()));
    wire.send(&SignalMessage::offer(
        b.clone(),
        me.clone(),
        SessionDescription::offer("v=0 from B"),
    ));

    wire.recv_matching(|m| is_answer_to(m, &b))
        .await
        .expect("answer to B");

    let transport = transports.latest(&b).await.expect("transport for B");
    assert_eq!(transport.log().await.candidates, vec![c1.clone(), c2.clone()]);
    assert_eq!(transports.created_count().await, 1);

    // After the remote description, candidates apply straight away.
    let c3 = IceCandidate::new("candidate:3 1 udp 1 10.0.0.2 5003 typ host");
    wire.send(&SignalMessage::candidate(b.clone(), me.clone(), c3.clone()));
    let t = transport.clone();
    assert!(wait_until(2000, move || {
        let t = t.clone();
        async move { t.log().await.candidates.len() == 3 }
    })
    .await);
    assert_eq!(transport.log().await.candidates, vec![c1, c2, c3]);

    assert!(wait_for_peer_state(&handle, &b, ConnectionState::Connected).await);
    handle.end_call().await.expect("end_call");
}
