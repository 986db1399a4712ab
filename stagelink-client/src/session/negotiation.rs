use crate::error::{NegotiationError, PlaybackError};
use crate::media::{LocalTrack, RemoteStream, RenderTarget};
use crate::peer::{
    LinkHandle, OfferOptions, PeerEvent, PeerEventKind, PeerRegistry, SignalingEvent,
    SignalingState,
};
use crate::session::session::SessionInner;
use stagelink_core::{
    IceCandidateInit, InboundSignal, OutboundSignal, ParticipantId, SessionDescription,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

enum AnswerClaim {
    Apply(LinkHandle),
    Duplicate,
    WrongState(SignalingState),
}

fn is_superseded(err: &NegotiationError) -> bool {
    matches!(
        err,
        NegotiationError::Superseded(_) | NegotiationError::SessionClosed
    )
}

impl SessionInner {
    /// Handles one inbound signaling frame of session `epoch`.
    pub(crate) async fn handle_frame(&self, epoch: u64, text: &str) {
        let signal = match InboundSignal::decode(text) {
            Ok(signal) => signal,
            Err(e) => {
                warn!("Invalid signaling frame: {}", e);
                return;
            }
        };
        debug!("Signaling frame: {}", signal.kind());

        match signal {
            InboundSignal::UserJoined { user_id, user_name } => {
                self.on_user_joined(epoch, user_id, user_name).await
            }
            InboundSignal::UserLeft { user_id } => self.on_user_left(epoch, user_id).await,
            InboundSignal::Offer { offer, sender_id } => {
                self.handle_offer(epoch, sender_id, offer).await
            }
            InboundSignal::Answer { answer, sender_id } => {
                self.handle_answer(epoch, sender_id, answer).await
            }
            InboundSignal::IceCandidate {
                candidate,
                sender_id,
            } => self.handle_remote_candidate(epoch, sender_id, candidate).await,
            InboundSignal::StreamEnded { message } => {
                info!(
                    "Stream ended: {}",
                    message.as_deref().unwrap_or("no reason given")
                );
                if let Some(observer) = self.teardown(Some(epoch), "stream ended by host") {
                    observer.on_stream_ended().await;
                }
            }
            InboundSignal::UserList { users } => {
                if let Some(observer) = self.observer(epoch) {
                    observer.on_user_list(users).await;
                }
            }
            InboundSignal::Error { error } => warn!("Signaling server error: {}", error),
            InboundSignal::Unknown => debug!("Ignoring unknown signaling frame"),
        }
    }

    async fn on_user_joined(&self, epoch: u64, user_id: ParticipantId, user_name: String) {
        info!("User joined: {} ({})", user_id, user_name);
        let Some(ctx) = self.peer_context(epoch) else {
            return;
        };

        if let Some(observer) = &ctx.observer {
            observer.on_user_joined(user_id.clone(), user_name).await;
        }

        if ctx.role.is_host() && ctx.capture_active {
            self.initiate_offer(epoch, &ctx.registry, user_id, &ctx.tracks)
                .await;
        }
    }

    async fn on_user_left(&self, epoch: u64, user_id: ParticipantId) {
        info!("User left: {}", user_id);
        let Some(ctx) = self.peer_context(epoch) else {
            return;
        };

        ctx.registry.remove(&user_id);
        if let Some(observer) = &ctx.observer {
            observer.on_user_left(user_id).await;
        }
    }

    /// Host side: opens a link to a new viewer and sends it an offer.
    async fn initiate_offer(
        &self,
        epoch: u64,
        registry: &PeerRegistry,
        remote: ParticipantId,
        tracks: &[LocalTrack],
    ) {
        if registry.contains(&remote) {
            info!("Peer link to {} already exists, not offering again", remote);
            return;
        }

        let link = match registry.create_or_replace(&remote, tracks).await {
            Ok(link) => link,
            Err(e) if is_superseded(&e) => return,
            Err(e) => {
                error!("Failed to create peer link to {}: {}", remote, e);
                return;
            }
        };

        match self.send_offer(epoch, registry, &link).await {
            Ok(()) => info!("Offer sent to {}", remote),
            Err(e) if is_superseded(&e) => {
                debug!("Offer to {} abandoned: {}", remote, e)
            }
            Err(e) => {
                error!("Error creating offer for {}: {}", remote, e);
                registry.remove_if_current(&remote, link.generation);
            }
        }
    }

    async fn send_offer(
        &self,
        epoch: u64,
        registry: &PeerRegistry,
        link: &LinkHandle,
    ) -> Result<(), NegotiationError> {
        registry.apply(link, SignalingEvent::LocalOffer)?;

        let offer = link
            .connection
            .create_offer(OfferOptions::default())
            .await?;
        link.connection.set_local_description(offer.clone()).await?;
        registry.ensure_current(link)?;

        self.send(
            epoch,
            &OutboundSignal::Offer {
                offer,
                target_user_id: link.remote.clone(),
            },
        )?;
        Ok(())
    }

    /// Any role: answers a remote offer, replacing a link that already
    /// negotiated.
    pub(crate) async fn handle_offer(
        &self,
        epoch: u64,
        sender: ParticipantId,
        offer: SessionDescription,
    ) {
        info!("Offer received from {}", sender);
        let Some(ctx) = self.peer_context(epoch) else {
            return;
        };

        // A fresh link is claimed in place; anything else is replaced.
        let claimed = ctx
            .registry
            .with_link(&sender, |link| {
                (link.is_fresh() && link.apply(SignalingEvent::RemoteOffer).is_ok())
                    .then(|| link.handle())
            })
            .flatten();

        let link = match claimed {
            Some(link) => link,
            None => {
                if let Some(existing) = ctx.registry.snapshot(&sender) {
                    info!(
                        "Replacing peer link to {} in state {} to accept a new offer",
                        sender, existing.signaling
                    );
                }
                let link = match ctx.registry.create_or_replace(&sender, &ctx.tracks).await {
                    Ok(link) => link,
                    Err(e) if is_superseded(&e) => return,
                    Err(e) => {
                        error!("Failed to create peer link to {}: {}", sender, e);
                        return;
                    }
                };
                if let Err(e) = ctx.registry.apply(&link, SignalingEvent::RemoteOffer) {
                    debug!("New link to {} taken by a concurrent offer: {}", sender, e);
                    return;
                }
                link
            }
        };

        match self.send_answer(epoch, &ctx.registry, &link, offer).await {
            Ok(()) => info!("Answer sent to {}", sender),
            Err(e) if is_superseded(&e) => {
                debug!("Offer from {} superseded: {}", sender, e)
            }
            Err(e) => {
                error!("Error handling offer from {}: {}", sender, e);
                ctx.registry.remove_if_current(&sender, link.generation);
            }
        }
    }

    async fn send_answer(
        &self,
        epoch: u64,
        registry: &PeerRegistry,
        link: &LinkHandle,
        offer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        link.connection.set_remote_description(offer).await?;
        registry.ensure_current(link)?;

        let answer = link.connection.create_answer().await?;
        link.connection.set_local_description(answer.clone()).await?;
        registry.apply(link, SignalingEvent::LocalAnswer)?;

        self.send(
            epoch,
            &OutboundSignal::Answer {
                answer,
                target_user_id: link.remote.clone(),
            },
        )?;
        Ok(())
    }

    /// Host side: completes an offer we sent.
    pub(crate) async fn handle_answer(
        &self,
        epoch: u64,
        sender: ParticipantId,
        answer: SessionDescription,
    ) {
        info!("Answer received from {}", sender);
        let Some(ctx) = self.peer_context(epoch) else {
            return;
        };

        let claim = ctx.registry.with_link(&sender, |link| {
            if link.signaling() == SignalingState::Stable && link.has_remote_description() {
                return AnswerClaim::Duplicate;
            }
            match link.apply(SignalingEvent::RemoteAnswer) {
                Ok(_) => AnswerClaim::Apply(link.handle()),
                Err(_) => AnswerClaim::WrongState(link.signaling()),
            }
        });

        let link = match claim {
            None => {
                warn!("No peer link to {} for its answer", sender);
                return;
            }
            Some(AnswerClaim::Duplicate) => {
                info!("Ignoring duplicate answer from {}", sender);
                return;
            }
            Some(AnswerClaim::WrongState(state)) => {
                warn!(
                    "Cannot apply answer from {}: signaling state is {}",
                    sender, state
                );
                return;
            }
            Some(AnswerClaim::Apply(link)) => link,
        };

        match link.connection.set_remote_description(answer).await {
            Ok(()) => info!("Remote answer applied for {}", sender),
            Err(NegotiationError::InvalidState(reason)) => {
                warn!(
                    "Answer from {} hit an invalid state ({}), dropping the link",
                    sender, reason
                );
                ctx.registry.remove_if_current(&sender, link.generation);
            }
            Err(e) => {
                error!("Error applying answer from {}: {}", sender, e);
                ctx.registry
                    .with_current(&link, |l| l.rollback_remote_answer());
            }
        }
    }

    /// Early candidates, with no link to go to yet, are dropped.
    pub(crate) async fn handle_remote_candidate(
        &self,
        epoch: u64,
        sender: ParticipantId,
        candidate: IceCandidateInit,
    ) {
        let Some(ctx) = self.peer_context(epoch) else {
            return;
        };
        let Some(link) = ctx.registry.get(&sender) else {
            debug!("Dropping ICE candidate from {}: no peer link", sender);
            return;
        };

        if let Err(e) = link.connection.add_ice_candidate(candidate).await {
            warn!("Error adding ICE candidate from {}: {}", sender, e);
        }
    }

    /// Handles something a peer connection of session `epoch` reported.
    pub(crate) async fn handle_peer_event(&self, epoch: u64, event: PeerEvent) {
        let Some(ctx) = self.peer_context(epoch) else {
            return;
        };
        let PeerEvent {
            remote,
            generation,
            kind,
        } = event;

        if !ctx.registry.is_current(&remote, generation) {
            debug!("Ignoring event from superseded link to {} (gen {})", remote, generation);
            return;
        }

        match kind {
            PeerEventKind::IceCandidate(candidate) => {
                let signal = OutboundSignal::IceCandidate {
                    candidate,
                    target_user_id: remote.clone(),
                };
                if let Err(e) = self.send(epoch, &signal) {
                    debug!("Local ICE candidate for {} not sent: {}", remote, e);
                }
            }
            PeerEventKind::Track(track) => {
                info!("Remote {} track received from {}", track.kind, remote);
                let Some(stream) = ctx.registry.record_track(&remote, generation, track) else {
                    return;
                };
                if let Some(target) = &ctx.render_target {
                    show_remote_stream(target.clone(), &stream);
                }
                if let Some(observer) = &ctx.observer {
                    observer.on_remote_stream(stream, remote).await;
                }
            }
            PeerEventKind::ConnectivityChanged(state) => {
                info!("Connection state with {}: {}", remote, state);
                ctx.registry
                    .with_link(&remote, |link| link.set_connectivity(state));
                if state.is_lost() {
                    warn!("Connection with {} {}, removing it", remote, state);
                    ctx.registry.remove_if_current(&remote, generation);
                }
            }
        }
    }
}

/// Re-attaches on every new track; playback starts only for a new stream id.
fn show_remote_stream(target: Arc<dyn RenderTarget>, stream: &RemoteStream) {
    let playing = target.source_id().as_deref() == Some(stream.id.as_str());
    target.attach_remote(stream);
    if playing {
        return;
    }

    tokio::spawn(async move {
        match target.play().await {
            Ok(()) => debug!("Remote playback started"),
            Err(PlaybackError::Aborted) => {}
            Err(e) => error!("Error playing remote stream: {}", e),
        }
    });
}
