use meshcall_client::{CandidateDisposition, PeerConnectionRegistry, RemoteStreamRegistry};
use meshcall_core::{IceCandidate, ParticipantId, SessionDescription};
use tokio::sync::mpsc;

use crate::integration::init_tracing;
use crate::utils::MockTransportFactory;

#[tokio::test]
async fn test_candidate_buffer_flushes_in_order() {
    init_tracing();

    let factory = MockTransportFactory::new();
    let (events_tx, _events_rx) = mpsc::channel(64);
    let mut registry =
        PeerConnectionRegistry::new(factory.clone(), events_tx, RemoteStreamRegistry::new());

    let b = ParticipantId::from("B");
    let first = IceCandidate::new("candidate:1");
    let second = IceCandidate::new("candidate:2");

    assert_eq!(
        registry.on_remote_candidate(&b, first.clone()).await.expect("buffer"),
        CandidateDisposition::Buffered
    );
    assert_eq!(
        registry.on_remote_candidate(&b, second.clone()).await.expect("buffer"),
        CandidateDisposition::Buffered
    );
    assert_eq!(registry.get(&b).expect("entry").pending_candidates().len(), 2);

    let entry = registry.get_mut(&b).expect("entry");
    let flushed = entry
        .set_remote_description(SessionDescription::offer("v=0"))
        .await
        .expect("remote description");
    assert_eq!(flushed, 2);
    assert!(entry.pending_candidates().is_empty());

    let third = IceCandidate::new("candidate:3");
    assert_eq!(
        entry.on_remote_candidate(third.clone()).await,
        CandidateDisposition::Applied
    );

    // Applied exactly once each, in arrival order.
    let log = factory.latest(&b).await.expect("transport").log().await;
    assert_eq!(log.candidates, vec![first, second, third]);
}
