use crate::error::NegotiationError;
use crate::media::{LocalTrack, RemoteTrack};
use crate::peer::{
    ConnectivityState, OfferOptions, PeerConnection, PeerConnectionFactory, PeerEventSink,
};
use anyhow::Result;
use async_trait::async_trait;
use stagelink_core::{IceCandidateInit, IceServerConfig, ParticipantId, SdpKind, SessionDescription};
use std::sync::Arc;
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
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::track::track_remote::TrackRemote;

impl From<RTCPeerConnectionState> for ConnectivityState {
    fn from(state: RTCPeerConnectionState) -> Self {
        match state {
            RTCPeerConnectionState::Connecting => ConnectivityState::Connecting,
            RTCPeerConnectionState::Connected => ConnectivityState::Connected,
            RTCPeerConnectionState::Disconnected => ConnectivityState::Disconnected,
            RTCPeerConnectionState::Failed => ConnectivityState::Failed,
            RTCPeerConnectionState::Closed => ConnectivityState::Closed,
            _ => ConnectivityState::New,
        }
    }
}

fn rtc_ice_servers(servers: &[IceServerConfig]) -> Vec<RTCIceServer> {
    servers
        .iter()
        .map(|server| RTCIceServer {
            urls: server.urls.clone(),
            username: server.username.clone().unwrap_or_default(),
            credential: server.credential.clone().unwrap_or_default(),
        })
        .collect()
}

/// Separates calls made in the wrong signaling state from other failures.
fn classify(err: webrtc::Error) -> NegotiationError {
    match err {
        webrtc::Error::ErrIncorrectSignalingState
        | webrtc::Error::ErrSignalingStateProposedTransitionInvalid { .. }
        | webrtc::Error::ErrSignalingStateCannotRollback
        | webrtc::Error::ErrNoRemoteDescription
        | webrtc::Error::ErrConnectionClosed => NegotiationError::InvalidState(err.to_string()),
        other => NegotiationError::Backend(other.into()),
    }
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription, NegotiationError> {
    let rtc = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp),
        SdpKind::Pranswer => RTCSessionDescription::pranswer(desc.sdp),
        SdpKind::Rollback => {
            return Err(NegotiationError::InvalidState(
                "rollback descriptions are not supported".to_owned(),
            ));
        }
    };
    rtc.map_err(classify)
}

/// Native peer connections on webrtc-rs.
#[derive(Debug, Clone)]
pub struct RtcPeerConnectionFactory {
    ice_servers: Vec<IceServerConfig>,
}

impl RtcPeerConnectionFactory {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self { ice_servers }
    }
}

#[async_trait]
impl PeerConnectionFactory for RtcPeerConnectionFactory {
    async fn create(&self, events: PeerEventSink) -> Result<Arc<dyn PeerConnection>, NegotiationError> {
        let connection = RtcPeerConnection::new(&self.ice_servers, events).await?;
        Ok(Arc::new(connection))
    }
}

pub struct RtcPeerConnection {
    remote: ParticipantId,
    peer_connection: Arc<RTCPeerConnection>,
}

impl RtcPeerConnection {
    /// Builds the connection and routes its callbacks into `events`.
    pub async fn new(ice_servers: &[IceServerConfig], events: PeerEventSink) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: rtc_ice_servers(ice_servers),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_events = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let events = state_events.clone();

                Box::pin(async move {
                    info!(
                        "Peer connection state changed for {} (gen {}): {}",
                        events.remote(),
                        events.generation(),
                        s
                    );
                    events.connectivity(ConnectivityState::from(s));
                })
            },
        ));

        let ice_events = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let events = ice_events.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                match candidate.to_json() {
                    Ok(init) => events.ice_candidate(IceCandidateInit {
                        candidate: init.candidate,
                        sdp_mid: init.sdp_mid,
                        sdp_m_line_index: init.sdp_mline_index,
                        username_fragment: init.username_fragment,
                    }),
                    Err(e) => warn!("Failed to serialize local ICE candidate: {}", e),
                }
            })
        }));

        let track_events = events.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>, _: Arc<RTCRtpReceiver>, _: Arc<RTCRtpTransceiver>| {
                let events = track_events.clone();

                Box::pin(async move {
                    let track = RemoteTrack::from_rtc(track);
                    debug!("Remote {} track {} from {}", track.kind, track.id, events.remote());
                    events.track(track);
                })
            },
        ));

        Ok(Self {
            remote: events.remote().clone(),
            peer_connection,
        })
    }

    async fn ensure_receivers(&self, options: OfferOptions) -> Result<(), NegotiationError> {
        let transceivers = self.peer_connection.get_transceivers().await;

        for (kind, wanted) in [
            (RTPCodecType::Audio, options.receive_audio),
            (RTPCodecType::Video, options.receive_video),
        ] {
            if !wanted || transceivers.iter().any(|t| t.kind() == kind) {
                continue;
            }
            self.peer_connection
                .add_transceiver_from_kind(
                    kind,
                    Some(RTCRtpTransceiverInit {
                        direction: RTCRtpTransceiverDirection::Recvonly,
                        send_encodings: vec![],
                    }),
                )
                .await
                .map_err(classify)?;
        }
        Ok(())
    }
}

#[async_trait]
impl PeerConnection for RtcPeerConnection {
    async fn add_track(&self, track: &LocalTrack) -> Result<(), NegotiationError> {
        let sender = self
            .peer_connection
            .add_track(track.rtc())
            .await
            .map_err(classify)?;

        // RTCP has to be drained for interceptors (NACK, reports) to work.
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while sender.read(&mut buf).await.is_ok() {}
        });
        Ok(())
    }

    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription, NegotiationError> {
        self.ensure_receivers(options).await?;
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .map_err(classify)?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(classify)?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), NegotiationError> {
        let desc = to_rtc_description(desc)?;
        self.peer_connection
            .set_local_description(desc)
            .await
            .map_err(classify)
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), NegotiationError> {
        let desc = to_rtc_description(desc)?;
        self.peer_connection
            .set_remote_description(desc)
            .await
            .map_err(classify)
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<(), NegotiationError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .map_err(classify)
    }

    fn close(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No runtime to close peer connection to {}", self.remote);
            return;
        };
        let peer_connection = self.peer_connection.clone();
        let remote = self.remote.clone();
        runtime.spawn(async move {
            if let Err(e) = peer_connection.close().await {
                debug!("Closing peer connection to {} failed: {}", remote, e);
            }
        });
    }
}
