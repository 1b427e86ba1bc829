pub mod connection_tests;
pub mod media_tests;
pub mod registry_tests;

use meshcall_client::CallHandle;
use meshcall_core::{ParticipantId, SignalMessage};
use tracing::Level;

use crate::utils::ScriptedWire;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Plays the relay for a client that just called `start_call`: checks the
/// join and hands out `roster`.
pub async fn admit(wire: &mut ScriptedWire, handle: &CallHandle, roster: &[&str]) {
    match wire.recv().await {
        Some(SignalMessage::Join { client_id, .. }) => assert_eq!(Some(client_id), handle.local_id()),
        other => panic!("expected join, got {other:?}"),
    }
    wire.send(&SignalMessage::Participants {
        payload: roster.iter().map(|id| ParticipantId::from(*id)).collect(),
    });
}
