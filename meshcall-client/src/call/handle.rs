use crate::call::call_command::CallCommand;
use crate::call::call_state::{CallState, CallStatus};
use crate::error::CallError;
use crate::registry::RemoteStreamRegistry;
use dashmap::DashMap;
use meshcall_core::{Participant, ParticipantId, RoomId};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Cloneable front end of a running [`CallSession`](crate::CallSession).
#[derive(Clone)]
pub struct CallHandle {
    commands: mpsc::Sender<CallCommand>,
    status: watch::Receiver<CallStatus>,
    participants: Arc<DashMap<ParticipantId, Participant>>,
    remote_streams: RemoteStreamRegistry,
}

impl CallHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<CallCommand>,
        status: watch::Receiver<CallStatus>,
        participants: Arc<DashMap<ParticipantId, Participant>>,
        remote_streams: RemoteStreamRegistry,
    ) -> Self {
        Self {
            commands,
            status,
            participants,
            remote_streams,
        }
    }

    /// Our `clientId` on the relay for the current or most recent call;
    /// `None` before the first `start_call`.
    pub fn local_id(&self) -> Option<ParticipantId> {
        self.status.borrow().local_id.clone()
    }

    pub async fn start_call(
        &self,
        room_id: impl Into<RoomId>,
        room_token: impl Into<String>,
    ) -> Result<(), CallError> {
        let room_id = room_id.into();
        let room_token = room_token.into();
        self.request(|reply| CallCommand::Start {
            room_id,
            room_token,
            reply,
        })
        .await
    }

    /// Returns whether audio is enabled afterwards.
    pub async fn toggle_mute(&self) -> Result<bool, CallError> {
        self.request(|reply| CallCommand::ToggleMute { reply }).await
    }

    pub async fn toggle_video(&self) -> Result<bool, CallError> {
        self.request(|reply| CallCommand::ToggleVideo { reply }).await
    }

    pub async fn toggle_screen_share(&self) -> Result<bool, CallError> {
        self.request(|reply| CallCommand::ToggleScreenShare { reply })
            .await
    }

    pub async fn retry_media(&self) -> Result<(), CallError> {
        self.request(|reply| CallCommand::RetryMedia { reply }).await
    }

    pub async fn end_call(&self) -> Result<(), CallError> {
        self.request(|reply| CallCommand::End { reply }).await
    }

    /// Returns `false` when `id` is not in the call.
    pub async fn set_participant_profile(
        &self,
        id: ParticipantId,
        display_name: impl Into<String>,
        avatar_ref: Option<String>,
    ) -> Result<bool, CallError> {
        let display_name = display_name.into();
        self.request(|reply| CallCommand::SetParticipantProfile {
            id,
            display_name,
            avatar_ref,
            reply,
        })
        .await
    }

    pub fn status(&self) -> CallStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> CallState {
        self.status.borrow().state.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CallStatus> {
        self.status.clone()
    }

    /// Waits until the call state satisfies `pred` and returns it.
    pub async fn wait_for_state(
        &self,
        mut pred: impl FnMut(&CallState) -> bool,
    ) -> Result<CallState, CallError> {
        let mut status = self.status.clone();
        let matched = status
            .wait_for(|s| pred(&s.state))
            .await
            .map_err(|_| CallError::SessionClosed)?;
        Ok(matched.state.clone())
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<Participant> {
        self.participants.get(id).map(|p| p.clone())
    }

    pub fn participants(&self) -> Vec<Participant> {
        self.participants.iter().map(|p| p.value().clone()).collect()
    }

    pub fn remote_streams(&self) -> &RemoteStreamRegistry {
        &self.remote_streams
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, CallError>>) -> CallCommand,
    ) -> Result<T, CallError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| CallError::SessionClosed)?;
        rx.await.map_err(|_| CallError::SessionClosed)?
    }
}
