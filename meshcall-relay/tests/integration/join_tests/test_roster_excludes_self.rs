use meshcall_core::{ParticipantId, SignalMessage};
use meshcall_relay::{OpenRooms, RelayService};

use crate::integration::init_tracing;
use crate::utils::{TestClient, start_relay};

#[tokio::test]
async fn test_roster_excludes_self() {
    init_tracing();

    let url = start_relay(RelayService::new(OpenRooms)).await;

    let mut a = TestClient::join(&url, "A", "r1", "t1").await;
    assert_eq!(
        a.recv().await,
        Some(SignalMessage::Participants { payload: vec![] })
    );

    let mut b = TestClient::join(&url, "B", "r1", "t1").await;
    assert_eq!(
        b.recv().await,
        Some(SignalMessage::Participants {
            payload: vec![ParticipantId::from("A")]
        })
    );

    // Existing members are not told about the newcomer; it calls them.
    assert!(a.is_quiet(200).await);

    a.close().await;
    b.close().await;
}
