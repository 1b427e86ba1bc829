use meshcall_client::{PeerConnectionRegistry, RemoteStreamRegistry, TrackKind};
use meshcall_core::ParticipantId;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::integration::init_tracing;
use crate::utils::{MockRemoteTrack, MockTransportFactory};

#[tokio::test]
async fn test_close_all_is_idempotent() {
    init_tracing();

    let factory = MockTransportFactory::new();
    let streams = RemoteStreamRegistry::new();
    let (events_tx, _events_rx) = mpsc::channel(64);
    let mut registry = PeerConnectionRegistry::new(factory.clone(), events_tx, streams.clone());

    // Nothing to close yet.
    registry.close_all().await;
    registry.close_all().await;
    assert!(registry.is_empty());

    let b = ParticipantId::from("B");
    let c = ParticipantId::from("C");
    let b_generation = registry.get_or_create(&b).await.expect("B").generation();
    registry.get_or_create(&c).await.expect("C");

    let track = Arc::new(MockRemoteTrack {
        id: "video-B".into(),
        stream_id: "stream-B".into(),
        kind: TrackKind::Video,
    });
    assert!(registry.on_remote_track(&b, b_generation, track.clone()));
    assert!(streams.contains(&b));

    registry.close_all().await;
    assert!(registry.is_empty());
    assert!(streams.is_empty());
    for transport in factory.created().await {
        assert!(transport.log().await.closed);
    }

    registry.close_all().await;
    assert!(registry.is_empty());

    // A late track from a closed entry is not published.
    assert!(!registry.on_remote_track(&b, b_generation, track));
    assert!(streams.is_empty());
}
