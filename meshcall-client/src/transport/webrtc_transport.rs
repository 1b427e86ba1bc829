use crate::media::{MediaTrack, TrackKind};
use crate::transport::peer_transport::{PeerTransport, TransportFactory};
use crate::transport::transport_event::{RemoteTrack, TransportEvent, TransportState};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use meshcall_core::{IceCandidate, IceServerConfig, ParticipantId, SdpType, SessionDescription};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

/// Builds webrtc-rs peer connections configured with the call's ICE servers.
#[derive(Clone)]
pub struct WebRtcTransportFactory {
    ice_servers: Vec<IceServerConfig>,
}

impl WebRtcTransportFactory {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self { ice_servers }
    }

    fn rtc_configuration(&self) -> RTCConfiguration {
        let ice_servers = self
            .ice_servers
            .iter()
            .filter(|s| !s.urls.is_empty())
            .map(|s| RTCIceServer {
                urls: s.urls.clone(),
                username: s.username.clone().unwrap_or_default(),
                credential: s.credential.clone().unwrap_or_default(),
                ..Default::default()
            })
            .collect();

        RTCConfiguration {
            ice_servers,
            ..Default::default()
        }
    }
}

#[async_trait]
impl TransportFactory for WebRtcTransportFactory {
    async fn create(
        &self,
        participant: ParticipantId,
        generation: u64,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>> {
        let transport =
            WebRtcTransport::new(participant, generation, self.rtc_configuration(), events).await?;
        Ok(Arc::new(transport))
    }
}

pub struct WebRtcTransport {
    pub participant: ParticipantId,
    pub peer_connection: Arc<RTCPeerConnection>,
}

impl WebRtcTransport {
    /// Creates the peer connection and wires its callbacks into `event_tx`.
    pub async fn new(
        participant: ParticipantId,
        generation: u64,
        rtc_config: RTCConfiguration,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = event_tx.clone();
        let pid_state = participant.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let pid = pid_state.clone();

                Box::pin(async move {
                    info!("Peer connection state for {}: {:?}", pid, s);
                    let Some(state) = map_state(s) else { return };
                    let _ = tx
                        .send(TransportEvent::StateChanged {
                            participant: pid,
                            generation,
                            state,
                        })
                        .await;
                })
            },
        ));

        let ice_tx = event_tx.clone();
        let pid_ice = participant.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let pid = pid_ice.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx
                    .send(TransportEvent::LocalCandidate {
                        participant: pid,
                        generation,
                        candidate: from_rtc_candidate(init),
                    })
                    .await;
            })
        }));

        let track_tx = event_tx;
        let pid_track = participant.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                let pid = pid_track.clone();

                Box::pin(async move {
                    debug!(
                        "Remote {:?} track {} arrived from {}",
                        track.kind(),
                        track.id(),
                        pid
                    );
                    let _ = tx
                        .send(TransportEvent::RemoteTrack {
                            participant: pid,
                            generation,
                            track: Arc::new(WebRtcRemoteTrack::new(track)),
                        })
                        .await;
                })
            },
        ));

        Ok(Self {
            participant,
            peer_connection,
        })
    }
}

#[async_trait]
impl PeerTransport for WebRtcTransport {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        from_rtc_description(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        from_rtc_description(answer)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_local_description(to_rtc_description(desc)?)
            .await
            .context("Failed to set local description")?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(to_rtc_description(desc)?)
            .await
            .context("Failed to set remote description")?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer_connection
            .add_ice_candidate(to_rtc_candidate(candidate))
            .await
            .context("Failed to add ICE candidate")?;
        Ok(())
    }

    async fn add_track(&self, track: Arc<MediaTrack>) -> Result<()> {
        let sender = self
            .peer_connection
            .add_track(track.rtc_track())
            .await
            .context("Failed to add local track")?;

        // RTCP has to be drained for the interceptors (NACK, reports) to run.
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while sender.read(&mut buf).await.is_ok() {}
        });
        Ok(())
    }

    async fn replace_track(&self, kind: TrackKind, track: Arc<MediaTrack>) -> Result<bool> {
        let wanted = match kind {
            TrackKind::Audio => RTPCodecType::Audio,
            TrackKind::Video => RTPCodecType::Video,
        };

        for sender in self.peer_connection.get_senders().await {
            let Some(current) = sender.track().await else {
                continue;
            };
            if current.kind() != wanted {
                continue;
            }
            sender
                .replace_track(Some(track.rtc_track()))
                .await
                .context("Failed to replace outgoing track")?;
            return Ok(true);
        }

        warn!("No {:?} sender to replace for {}", kind, self.participant);
        Ok(false)
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

pub struct WebRtcRemoteTrack {
    inner: Arc<TrackRemote>,
}

impl WebRtcRemoteTrack {
    pub fn new(inner: Arc<TrackRemote>) -> Self {
        Self { inner }
    }

    /// The underlying RTP track, for decoding and rendering.
    pub fn inner(&self) -> &Arc<TrackRemote> {
        &self.inner
    }
}

impl fmt::Debug for WebRtcRemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebRtcRemoteTrack")
            .field("id", &self.inner.id())
            .field("stream_id", &self.inner.stream_id())
            .finish()
    }
}

impl RemoteTrack for WebRtcRemoteTrack {
    fn id(&self) -> String {
        self.inner.id()
    }

    fn stream_id(&self) -> String {
        self.inner.stream_id()
    }

    fn kind(&self) -> TrackKind {
        TrackKind::from_codec_type(self.inner.kind()).unwrap_or(TrackKind::Video)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn map_state(s: RTCPeerConnectionState) -> Option<TransportState> {
    match s {
        RTCPeerConnectionState::New => Some(TransportState::New),
        RTCPeerConnectionState::Connecting => Some(TransportState::Connecting),
        RTCPeerConnectionState::Connected => Some(TransportState::Connected),
        RTCPeerConnectionState::Disconnected => Some(TransportState::Disconnected),
        RTCPeerConnectionState::Failed => Some(TransportState::Failed),
        RTCPeerConnectionState::Closed => Some(TransportState::Closed),
        _ => None,
    }
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription> {
    let rtc = match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
        SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp)?,
        SdpType::Rollback => bail!("rollback descriptions are not exchanged"),
    };
    Ok(rtc)
}

fn from_rtc_description(desc: RTCSessionDescription) -> Result<SessionDescription> {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        other => bail!("unsupported SDP type {:?}", other),
    };
    Ok(SessionDescription {
        sdp_type,
        sdp: desc.sdp,
    })
}

fn to_rtc_candidate(c: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: c.candidate,
        sdp_mid: c.sdp_mid,
        sdp_mline_index: c.sdp_m_line_index,
        username_fragment: c.username_fragment,
    }
}

fn from_rtc_candidate(c: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: c.candidate,
        sdp_mid: c.sdp_mid,
        sdp_m_line_index: c.sdp_mline_index,
        username_fragment: c.username_fragment,
    }
}
