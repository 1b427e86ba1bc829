use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use uuid::Uuid;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub fn from_codec_type(codec: RTPCodecType) -> Option<Self> {
        match codec {
            RTPCodecType::Audio => Some(Self::Audio),
            RTPCodecType::Video => Some(Self::Video),
            _ => None,
        }
    }

    fn codec_capability(self) -> RTCRtpCodecCapability {
        match self {
            Self::Audio => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            Self::Video => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// A local capture track.
///
/// The webrtc sample track is shared by every peer connection that sends it;
/// `enabled` and `ended` belong to the capture side and are only flipped by
/// the capture controller.
pub struct MediaTrack {
    id: String,
    kind: TrackKind,
    label: String,
    enabled: AtomicBool,
    ended: AtomicBool,
    /// Frames swallowed while disabled, reported with the next real one.
    skipped: AtomicU16,
    rtc: Arc<TrackLocalStaticSample>,
}

impl fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("enabled", &self.is_enabled())
            .field("ended", &self.is_ended())
            .finish()
    }
}

impl MediaTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>, stream_id: &str) -> Self {
        let id = Uuid::new_v4().to_string();
        let rtc = Arc::new(TrackLocalStaticSample::new(
            kind.codec_capability(),
            id.clone(),
            stream_id.to_owned(),
        ));

        Self {
            id,
            kind,
            label: label.into(),
            enabled: AtomicBool::new(true),
            ended: AtomicBool::new(false),
            skipped: AtomicU16::new(0),
            rtc,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// Returns `false` if the track had already been stopped.
    pub(crate) fn stop(&self) -> bool {
        !self.ended.swap(true, Ordering::SeqCst)
    }

    pub fn rtc_track(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        self.rtc.clone()
    }

    /// Feeds one captured frame to every connection sending this track.
    ///
    /// A disabled track sends nothing. The frames it swallowed are passed on
    /// as `prev_dropped_packets` with the next frame, so the packetizer moves
    /// the RTP timestamp past the gap. A stopped track drops the frame.
    pub async fn write_sample(&self, sample: &Sample) -> webrtc::error::Result<()> {
        if self.is_ended() {
            return Ok(());
        }

        if !self.is_enabled() {
            let _ = self
                .skipped
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    Some(n.saturating_add(1))
                });
            return Ok(());
        }

        let skipped = self.skipped.swap(0, Ordering::SeqCst);
        if skipped == 0 {
            return self.rtc.write_sample(sample).await;
        }

        let resumed = Sample {
            data: sample.data.clone(),
            timestamp: sample.timestamp,
            duration: sample.duration,
            packet_timestamp: sample.packet_timestamp,
            prev_dropped_packets: sample.prev_dropped_packets.saturating_add(skipped),
            prev_padding_packets: sample.prev_padding_packets,
        };
        self.rtc.write_sample(&resumed).await
    }

    pub(crate) fn skipped_samples(&self) -> u16 {
        self.skipped.load(Ordering::SeqCst)
    }
}

/// A group of local tracks captured together.
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<Arc<MediaTrack>>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>, tracks: Vec<Arc<MediaTrack>>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    /// Builds a stream with one fresh track per requested kind.
    pub fn with_kinds(label: &str, constraints: MediaConstraints) -> Self {
        let id = Uuid::new_v4().to_string();
        let mut tracks = Vec::new();
        if constraints.audio {
            tracks.push(Arc::new(MediaTrack::new(
                TrackKind::Audio,
                format!("{label} audio"),
                &id,
            )));
        }
        if constraints.video {
            tracks.push(Arc::new(MediaTrack::new(
                TrackKind::Video,
                format!("{label} video"),
                &id,
            )));
        }
        Self { id, tracks }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[Arc<MediaTrack>] {
        &self.tracks
    }

    pub fn tracks_of(&self, kind: TrackKind) -> impl Iterator<Item = &Arc<MediaTrack>> {
        self.tracks.iter().filter(move |t| t.kind() == kind)
    }

    pub fn first_track(&self, kind: TrackKind) -> Option<Arc<MediaTrack>> {
        self.tracks_of(kind).next().cloned()
    }

    pub fn is_active(&self) -> bool {
        self.tracks.iter().any(|t| !t.is_ended())
    }
}
