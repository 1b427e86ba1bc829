use meshcall_client::{
    NegotiationState, Negotiator, PeerConnectionRegistry, RemoteStreamRegistry,
};
use meshcall_core::{ParticipantId, SessionDescription, SignalMessage};
use tokio::sync::mpsc;

use crate::integration::init_tracing;
use crate::utils::{MockTransportFactory, RecordingSignals, is_answer_to, is_offer_to};

#[tokio::test]
async fn test_glare_smaller_id_yields() {
    init_tracing();

    let a = ParticipantId::from("A");
    let b = ParticipantId::from("B");
    let c = ParticipantId::from("C");
    let their_offer = SessionDescription::offer("v=0 from B");

    // "A" < "B": A is polite and answers B's offer on a fresh transport.
    let factory = MockTransportFactory::new();
    let (events_tx, mut events_rx) = mpsc::channel(64);
    let mut registry =
        PeerConnectionRegistry::new(factory.clone(), events_tx, RemoteStreamRegistry::new());
    let signals = RecordingSignals::default();
    let polite = Negotiator::new(a.clone());

    let update = polite
        .originate(&mut registry, &signals, &b)
        .await
        .expect("offer sent");
    assert_eq!(update.state, NegotiationState::OfferSent);
    let first_generation = registry.get(&b).expect("entry").generation();

    let update = polite
        .handle_signal(
            &mut registry,
            &signals,
            SignalMessage::offer(b.clone(), a.clone(), their_offer.clone()),
        )
        .await
        .expect("yielded");
    assert_eq!(update.state, NegotiationState::AnswerExchanged);
    assert!(update.failure.is_none());

    let entry = registry.get(&b).expect("fresh entry");
    assert_ne!(entry.generation(), first_generation);
    assert!(entry.remote_description_set());

    let created = factory.created().await;
    assert_eq!(created.len(), 2);
    assert!(created[0].log().await.closed);

    let sent = signals.take();
    assert_eq!(sent.len(), 2);
    assert!(is_offer_to(&sent[0], &b));
    assert!(is_answer_to(&sent[1], &b));

    // Callbacks of the discarded transport go nowhere.
    let mut relayed_from_stale = false;
    while let Ok(event) = events_rx.try_recv() {
        let stale = event.generation() == first_generation;
        polite
            .handle_transport_event(&mut registry, &signals, event)
            .await;
        relayed_from_stale |= stale && !signals.take().is_empty();
    }
    assert!(!relayed_from_stale);

    // "C" > "B": C keeps its own offer and ignores B's.
    let factory = MockTransportFactory::new();
    let (events_tx, _events_rx) = mpsc::channel(64);
    let mut registry =
        PeerConnectionRegistry::new(factory.clone(), events_tx, RemoteStreamRegistry::new());
    let signals = RecordingSignals::default();
    let impolite = Negotiator::new(c.clone());

    impolite.originate(&mut registry, &signals, &b).await;
    let ignored = impolite
        .handle_signal(
            &mut registry,
            &signals,
            SignalMessage::offer(b.clone(), c.clone(), their_offer),
        )
        .await;
    assert!(ignored.is_none());
    assert_eq!(
        registry.get(&b).expect("entry").negotiation(),
        NegotiationState::OfferSent
    );
    assert_eq!(factory.created_count().await, 1);

    let sent = signals.take();
    assert_eq!(sent.len(), 1);
    assert!(is_offer_to(&sent[0], &b));
}
