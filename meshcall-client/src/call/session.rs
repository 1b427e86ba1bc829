use crate::call::call_command::CallCommand;
use crate::call::call_state::{CallState, CallStatus, LocalMediaState};
use crate::call::handle::CallHandle;
use crate::config::CallConfig;
use crate::error::{CallError, MediaError, SignalingError};
use crate::media::{MediaCaptureController, MediaDevices, MediaStream, TrackKind};
use crate::negotiation::{Negotiator, PeerUpdate};
use crate::registry::{PeerConnectionRegistry, RemoteStreamRegistry};
use crate::signaling::{
    SignalingChannel, SignalingConnector, SignalingEvent, SignalingEvents, WebSocketConnector,
};
use crate::transport::{TransportEvent, TransportFactory, WebRtcTransportFactory};
use dashmap::DashMap;
use meshcall_core::{
    MediaPermissionState, Participant, ParticipantId, Room, RoomId, SignalMessage,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Owns everything one call needs and mutates it from a single task.
pub struct CallSession {
    local_id: ParticipantId,
    config: CallConfig,
    capture: MediaCaptureController,
    connector: Arc<dyn SignalingConnector>,
    signaling: Option<SignalingChannel>,
    signaling_rx: Option<SignalingEvents>,
    registry: PeerConnectionRegistry,
    negotiator: Negotiator,
    command_rx: mpsc::Receiver<CallCommand>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    room: Option<Room>,
    participants: Arc<DashMap<ParticipantId, Participant>>,
    local_stream: Option<MediaStream>,
    screen_stream: Option<MediaStream>,
    status_tx: watch::Sender<CallStatus>,
}

impl CallSession {
    pub fn new(
        config: CallConfig,
        devices: Arc<dyn MediaDevices>,
        connector: Arc<dyn SignalingConnector>,
        transports: Arc<dyn TransportFactory>,
    ) -> (Self, CallHandle) {
        let local_id = ParticipantId::generate();
        let (command_tx, command_rx) = mpsc::channel(64);
        let (transport_tx, transport_rx) = mpsc::channel(256);
        let (status_tx, status_rx) = watch::channel(CallStatus::default());

        let remote_streams = RemoteStreamRegistry::new();
        let participants = Arc::new(DashMap::new());

        let handle = CallHandle::new(
            command_tx,
            status_rx,
            participants.clone(),
            remote_streams.clone(),
        );

        let session = Self {
            negotiator: Negotiator::new(local_id.clone()),
            local_id,
            config,
            capture: MediaCaptureController::new(devices),
            connector,
            signaling: None,
            signaling_rx: None,
            registry: PeerConnectionRegistry::new(transports, transport_tx, remote_streams),
            command_rx,
            transport_rx,
            room: None,
            participants,
            local_stream: None,
            screen_stream: None,
            status_tx,
        };
        (session, handle)
    }

    /// Builds a session and runs it on the current runtime.
    pub fn spawn(
        config: CallConfig,
        devices: Arc<dyn MediaDevices>,
        connector: Arc<dyn SignalingConnector>,
        transports: Arc<dyn TransportFactory>,
    ) -> CallHandle {
        let (session, handle) = Self::new(config, devices, connector, transports);
        tokio::spawn(session.run());
        handle
    }

    /// Websocket signaling and webrtc-rs transports, both taken from `config`.
    pub fn spawn_default(config: CallConfig, devices: Arc<dyn MediaDevices>) -> CallHandle {
        let connector = Arc::new(WebSocketConnector::new(config.signaling_url.clone()));
        let transports = Arc::new(WebRtcTransportFactory::new(config.ice_servers.clone()));
        Self::spawn(config, devices, connector, transports)
    }

    /// Client id of the current or most recent call.
    pub fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    pub async fn run(mut self) {
        info!("Call session started");

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("All call handles dropped. Shutting down session.");
                            break;
                        }
                    }
                }

                evt = recv_signaling(&mut self.signaling_rx) => {
                    match evt {
                        Some(e) => self.handle_signaling_event(e).await,
                        None => self.signaling_rx = None,
                    }
                }

                evt = self.transport_rx.recv() => {
                    if let Some(e) = evt {
                        self.handle_transport_event(e).await;
                    }
                }
            }
        }

        self.teardown().await;
        info!("Call session finished");
    }

    async fn handle_command(&mut self, cmd: CallCommand) {
        match cmd {
            CallCommand::Start {
                room_id,
                room_token,
                reply,
            } => {
                let _ = reply.send(self.start(room_id, room_token).await);
            }
            CallCommand::ToggleMute { reply } => {
                let _ = reply.send(self.toggle_track(TrackKind::Audio));
            }
            CallCommand::ToggleVideo { reply } => {
                let _ = reply.send(self.toggle_track(TrackKind::Video));
            }
            CallCommand::ToggleScreenShare { reply } => {
                let _ = reply.send(self.toggle_screen_share().await);
            }
            CallCommand::RetryMedia { reply } => {
                let _ = reply.send(self.retry_media().await);
            }
            CallCommand::End { reply } => {
                self.end().await;
                let _ = reply.send(Ok(()));
            }
            CallCommand::SetParticipantProfile {
                id,
                display_name,
                avatar_ref,
                reply,
            } => {
                let updated = match self.participants.get_mut(&id) {
                    Some(mut p) => {
                        p.display_name = display_name;
                        p.avatar_ref = avatar_ref;
                        true
                    }
                    None => false,
                };
                let _ = reply.send(Ok(updated));
            }
        }
    }

    async fn start(&mut self, room_id: RoomId, room_token: String) -> Result<(), CallError> {
        let state = self.state();
        if !state.can_start() {
            return Err(CallError::InvalidState(state.name()));
        }

        // Every call joins under a fresh client id.
        self.local_id = ParticipantId::generate();
        self.negotiator = Negotiator::new(self.local_id.clone());
        let local_id = self.local_id.clone();
        self.status_tx.send_modify(|s| s.local_id = Some(local_id));

        info!("Starting call in room {} as {}", room_id, self.local_id);
        self.room = Some(Room::new(room_id, room_token));
        self.set_state(CallState::PermissionPending);

        let permission = self.capture.check_permission().await;
        if permission == MediaPermissionState::Denied {
            // No automatic acquire after a denial; only `retry_media` asks again.
            return Err(self.fail(MediaError::PermissionDenied.into()));
        }

        self.acquire_and_join(false).await
    }

    async fn retry_media(&mut self) -> Result<(), CallError> {
        let state = self.state();
        let retriable = matches!(state, CallState::Error { retriable: true, .. });
        if !retriable || self.room.is_none() {
            return Err(CallError::InvalidState(state.name()));
        }
        self.acquire_and_join(true).await
    }

    async fn acquire_and_join(&mut self, user_retry: bool) -> Result<(), CallError> {
        self.set_state(CallState::AcquiringMedia);

        let constraints = self.config.media;
        let acquired = if user_retry {
            self.capture.retry(constraints).await
        } else {
            self.capture.acquire(constraints).await
        };

        let stream = match acquired {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail(e.into())),
        };

        self.registry.set_local_tracks(stream.tracks().to_vec());
        let media = LocalMediaState {
            audio_enabled: stream.first_track(TrackKind::Audio).is_some(),
            video_enabled: stream.first_track(TrackKind::Video).is_some(),
            screen_sharing: false,
        };
        self.local_stream = Some(stream);
        self.status_tx.send_modify(|s| s.media = media);

        self.join_signaling().await
    }

    async fn join_signaling(&mut self) -> Result<(), CallError> {
        self.set_state(CallState::JoiningSignaling);

        let Some(room) = self.room.as_mut() else {
            return Err(CallError::InvalidState("idle"));
        };
        let room_id = room.id.clone();
        let room_token = room.take_token().unwrap_or_default();

        match self
            .connector
            .connect(room_id, self.local_id.clone(), room_token)
            .await
        {
            Ok((channel, events)) => {
                self.signaling = Some(channel);
                self.signaling_rx = Some(events);
                Ok(())
            }
            Err(e) => {
                self.teardown().await;
                Err(self.fail(e.into()))
            }
        }
    }

    fn toggle_track(&mut self, kind: TrackKind) -> Result<bool, CallError> {
        let Some(stream) = self.local_stream.as_ref() else {
            return Err(CallError::InvalidState(self.state().name()));
        };

        let media = self.status_tx.borrow().media;
        let enabled = match kind {
            TrackKind::Audio => !media.audio_enabled,
            TrackKind::Video => !media.video_enabled,
        };
        if !self.capture.set_track_enabled(stream, kind, enabled) {
            return Err(CallError::InvalidState("capturing without that track"));
        }

        self.status_tx.send_modify(|s| match kind {
            TrackKind::Audio => s.media.audio_enabled = enabled,
            TrackKind::Video => s.media.video_enabled = enabled,
        });
        debug!("{:?} enabled: {}", kind, enabled);
        Ok(enabled)
    }

    async fn toggle_screen_share(&mut self) -> Result<bool, CallError> {
        if let Some(screen) = self.screen_stream.take() {
            if let Some(camera) = self
                .local_stream
                .as_ref()
                .and_then(|s| s.first_track(TrackKind::Video))
            {
                self.registry.replace_video_source(camera).await;
            }
            self.capture.release(&screen);
            self.status_tx.send_modify(|s| s.media.screen_sharing = false);
            info!("Screen share stopped");
            return Ok(false);
        }

        if self.local_stream.is_none() {
            return Err(CallError::InvalidState(self.state().name()));
        }

        let screen = self.capture.acquire_display().await?;
        let Some(track) = screen.first_track(TrackKind::Video) else {
            self.capture.release(&screen);
            return Err(MediaError::MediaAccess("display capture has no video track".into()).into());
        };

        let switched = self.registry.replace_video_source(track).await;
        self.screen_stream = Some(screen);
        self.status_tx.send_modify(|s| s.media.screen_sharing = true);
        info!("Screen share started on {} connection(s)", switched);
        Ok(true)
    }

    async fn end(&mut self) {
        if matches!(self.state(), CallState::Idle | CallState::Ended) {
            return;
        }
        self.set_state(CallState::Ending);
        self.teardown().await;
    }

    async fn handle_signaling_event(&mut self, event: SignalingEvent) {
        match event {
            SignalingEvent::Roster(ids) => {
                info!("Joined room with {} existing participant(s)", ids.len());
                if self.state() == CallState::JoiningSignaling {
                    self.set_state(CallState::Active);
                }
                for id in &ids {
                    self.add_participant(id.clone());
                }

                let Some(signaling) = self.signaling.as_ref() else {
                    return;
                };
                let mut updates = Vec::new();
                for id in &ids {
                    if let Some(update) = self
                        .negotiator
                        .originate(&mut self.registry, signaling, id)
                        .await
                    {
                        updates.push(update);
                    }
                }
                updates.into_iter().for_each(|u| self.apply_update(u));
            }

            SignalingEvent::Signal(msg) => {
                // Only an offer introduces someone the roster did not list.
                if let SignalMessage::Offer { from, .. } = &msg {
                    if !self.participants.contains_key(from) {
                        self.add_participant(from.clone());
                    }
                }

                let Some(signaling) = self.signaling.as_ref() else {
                    return;
                };
                let update = self
                    .negotiator
                    .handle_signal(&mut self.registry, signaling, msg)
                    .await;
                if let Some(update) = update {
                    self.apply_update(update);
                }
            }

            SignalingEvent::ParticipantLeft(id) => {
                info!("Participant {} left", id);
                if let Some(signaling) = self.signaling.as_ref() {
                    self.negotiator
                        .close_peer(&mut self.registry, signaling, &id)
                        .await;
                }
                self.participants.remove(&id);
                if let Some(room) = self.room.as_mut() {
                    room.remove_member(&id);
                }
            }

            SignalingEvent::AuthRejected(message) => {
                error!("Signaling rejected the join: {}", message);
                self.teardown().await;
                self.fail(SignalingError::Auth(message).into());
            }

            SignalingEvent::Disconnected => {
                if matches!(self.state(), CallState::Ending | CallState::Ended) {
                    return;
                }
                error!("Lost connection to the signaling relay");
                self.teardown().await;
                self.fail(SignalingError::TransportClosed.into());
            }
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        let Some(signaling) = self.signaling.as_ref() else {
            debug!("Dropping transport event outside of a call");
            return;
        };
        let update = self
            .negotiator
            .handle_transport_event(&mut self.registry, signaling, event)
            .await;
        if let Some(update) = update {
            self.apply_update(update);
        }
    }

    fn add_participant(&mut self, id: ParticipantId) {
        if id == self.local_id {
            return;
        }
        if let Some(room) = self.room.as_mut() {
            room.add_member(id.clone());
        }
        self.participants
            .entry(id.clone())
            .or_insert_with(|| Participant::new(id));
    }

    fn apply_update(&mut self, update: PeerUpdate) {
        if let Some(failure) = &update.failure {
            warn!("{}", failure);
        }
        if let Some(mut participant) = self.participants.get_mut(&update.participant) {
            participant.connection_state = update.state.connection_state();
        }
    }

    /// Releases everything the call holds. Every step is best-effort and the
    /// whole thing is safe to repeat.
    async fn teardown(&mut self) {
        self.registry.close_all().await;

        if let Some(mut channel) = self.signaling.take() {
            channel.close();
        }
        self.signaling_rx = None;

        if let Some(screen) = self.screen_stream.take() {
            self.capture.release(&screen);
        }
        if let Some(stream) = self.local_stream.take() {
            self.capture.release(&stream);
        }
        self.registry.set_local_tracks(Vec::new());

        self.participants.clear();
        self.room = None;

        self.status_tx
            .send_modify(|s| s.media = LocalMediaState::default());
        self.set_state(CallState::Ended);
        info!("Call torn down");
    }

    /// Moves the call to `error` and hands the error back for the caller.
    fn fail(&mut self, err: CallError) -> CallError {
        warn!("Call failed: {}", err);
        self.set_state(CallState::Error {
            message: err.to_string(),
            retriable: err.is_user_retriable(),
        });
        err
    }

    fn state(&self) -> CallState {
        self.status_tx.borrow().state.clone()
    }

    /// Publishes `state` together with the latest permission observation.
    fn set_state(&mut self, state: CallState) {
        debug!("Call state -> {}", state.name());
        let permission = self.capture.permission_state();
        self.status_tx.send_modify(|s| {
            s.state = state;
            s.permission = permission;
        });
    }
}

async fn recv_signaling(rx: &mut Option<SignalingEvents>) -> Option<SignalingEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
