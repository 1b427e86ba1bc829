use meshcall_client::{
    MediaConstraints, MediaStream, PeerConnectionRegistry, RemoteStreamRegistry,
};
use meshcall_core::ParticipantId;
use tokio::sync::mpsc;

use crate::integration::init_tracing;
use crate::utils::MockTransportFactory;

#[tokio::test]
async fn test_get_or_create_is_memoized() {
    init_tracing();

    let factory = MockTransportFactory::new();
    let (events_tx, _events_rx) = mpsc::channel(64);
    let mut registry =
        PeerConnectionRegistry::new(factory.clone(), events_tx, RemoteStreamRegistry::new());

    let local = MediaStream::with_kinds("camera", MediaConstraints::default());
    registry.set_local_tracks(local.tracks().to_vec());

    let b = ParticipantId::from("B");
    let first = registry.get_or_create(&b).await.expect("create").generation();
    let second = registry.get_or_create(&b).await.expect("reuse").generation();
    assert_eq!(first, second);
    assert_eq!(factory.created_count().await, 1);
    assert_eq!(registry.len(), 1);

    // Local tracks were attached at creation.
    let log = factory.latest(&b).await.expect("transport").log().await;
    let expected: Vec<String> = local.tracks().iter().map(|t| t.id().to_owned()).collect();
    assert_eq!(log.track_ids, expected);

    let c = ParticipantId::from("C");
    let other = registry.get_or_create(&c).await.expect("create").generation();
    assert_ne!(other, first);
    assert!(registry.is_current(&b, first));
    assert!(!registry.is_current(&b, other));

    // A recreated entry gets a new generation; the old one is stale.
    assert!(registry.remove(&b).await);
    assert!(!registry.remove(&b).await);
    let recreated = registry.get_or_create(&b).await.expect("recreate").generation();
    assert!(!registry.is_current(&b, first));
    assert!(registry.is_current(&b, recreated));
}
