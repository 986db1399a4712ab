use crate::config::ClientConfig;
use crate::error::{ConnectionError, SessionError};
use crate::media::{MediaDevices, MediaLifecycle, NoMediaDevices, RenderTarget};
use crate::peer::{PeerConnectionFactory, PeerRegistry, RtcPeerConnectionFactory};
use crate::session::dispatcher::Dispatcher;
use crate::session::session_state::{ActiveSession, PeerContext};
use crate::session::{LocalParticipant, NoopObserver, SessionObserver, SessionSnapshot};
use crate::signaling::{SignalingChannel, SignalingTransport, TokenProvider, WsTransport};
use stagelink_core::{OutboundSignal, Role, RoomId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

/// Client side of one live stream: join a room as host or viewer, end it,
/// clean up. A `Session` can be joined again after it ends.
pub struct Session {
    inner: Arc<SessionInner>,
}

pub struct SessionBuilder {
    config: ClientConfig,
    tokens: Arc<dyn TokenProvider>,
    transport: Option<Arc<dyn SignalingTransport>>,
    peers: Option<Arc<dyn PeerConnectionFactory>>,
    devices: Option<Arc<dyn MediaDevices>>,
    observer: Option<Arc<dyn SessionObserver>>,
}

impl SessionBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn transport(mut self, transport: impl SignalingTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn peer_factory(mut self, factory: impl PeerConnectionFactory + 'static) -> Self {
        self.peers = Some(Arc::new(factory));
        self
    }

    pub fn media_devices(mut self, devices: impl MediaDevices + 'static) -> Self {
        self.devices = Some(Arc::new(devices));
        self
    }

    pub fn observer(mut self, observer: impl SessionObserver) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Unset collaborators fall back to the WebSocket transport, webrtc-rs
    /// peer connections and no capture devices.
    pub fn build(self) -> Session {
        let peers = self.peers.unwrap_or_else(|| {
            Arc::new(RtcPeerConnectionFactory::new(self.config.ice_servers.clone()))
        });

        Session {
            inner: Arc::new(SessionInner {
                tokens: self.tokens,
                transport: self.transport.unwrap_or_else(|| Arc::new(WsTransport)),
                peers,
                devices: self.devices.unwrap_or_else(|| Arc::new(NoMediaDevices)),
                observer: self.observer.unwrap_or_else(|| Arc::new(NoopObserver)),
                config: self.config,
                state: Mutex::new(None),
                next_epoch: AtomicU64::new(0),
            }),
        }
    }
}

impl Session {
    pub fn builder(tokens: impl TokenProvider + 'static) -> SessionBuilder {
        SessionBuilder {
            config: ClientConfig::default(),
            tokens: Arc::new(tokens),
            transport: None,
            peers: None,
            devices: None,
            observer: None,
        }
    }

    /// Joins `room` as the broadcaster. Capture starts before this returns
    /// and is previewed on `preview` if one is given.
    pub async fn join_as_host(
        &self,
        room: impl Into<RoomId>,
        preview: Option<Arc<dyn RenderTarget>>,
    ) -> Result<(), SessionError> {
        self.inner.join(room.into(), Role::Host, preview).await
    }

    /// Joins `room` as a viewer. Remote streams are also shown on `player`,
    /// if one is given.
    pub async fn join_as_participant(
        &self,
        room: impl Into<RoomId>,
        player: Option<Arc<dyn RenderTarget>>,
    ) -> Result<(), SessionError> {
        self.inner.join(room.into(), Role::Participant, player).await
    }

    /// Tells the room the stream is over (host only) and cleans up.
    ///
    /// A failed announcement is returned after cleanup has run.
    pub async fn end_stream(&self) -> Result<(), SessionError> {
        let announced = {
            let state = self.inner.state();
            match state.as_ref() {
                None => return Ok(()),
                Some(active) if active.local.role.is_host() => {
                    info!("Host {} ending stream in room {}", active.local.id, active.room);
                    active.channel.send(&OutboundSignal::StreamEnded)
                }
                Some(_) => Ok(()),
            }
        };

        self.inner.teardown(None, "stream ended locally");

        if let Err(e) = &announced {
            error!("Failed to announce end of stream: {}", e);
        }
        announced.map_err(SessionError::from)
    }

    /// Releases everything the active session holds. Safe to call at any time.
    pub fn cleanup(&self) {
        self.inner.teardown(None, "cleanup requested");
    }

    /// Asks the server for the room's member list; the reply reaches
    /// `SessionObserver::on_user_list`.
    pub fn request_user_list(&self) -> Result<(), SessionError> {
        let state = self.inner.state();
        let active = state.as_ref().ok_or(ConnectionError::ChannelClosed)?;
        active.channel.send(&OutboundSignal::GetUsers)?;
        Ok(())
    }

    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.inner.state().as_ref().map(ActiveSession::snapshot)
    }

    pub fn is_active(&self) -> bool {
        self.inner.state().is_some()
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &Arc<SessionInner> {
        &self.inner
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.inner.teardown(None, "session dropped");
    }
}

pub(crate) struct SessionInner {
    config: ClientConfig,
    tokens: Arc<dyn TokenProvider>,
    transport: Arc<dyn SignalingTransport>,
    peers: Arc<dyn PeerConnectionFactory>,
    devices: Arc<dyn MediaDevices>,
    observer: Arc<dyn SessionObserver>,
    state: Mutex<Option<ActiveSession>>,
    next_epoch: AtomicU64,
}

impl SessionInner {
    /// Never held across an await.
    pub(crate) fn state(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn join(
        self: &Arc<Self>,
        room: RoomId,
        role: Role,
        render_target: Option<Arc<dyn RenderTarget>>,
    ) -> Result<(), SessionError> {
        // A stale session is replaced silently.
        if self.teardown(None, "new join started").is_some() {
            info!("Replaced previous session before joining {}", room);
        }

        let epoch = self.next_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let local = LocalParticipant::new(role);
        info!(
            "Joining room {} as {} ({}, epoch {})",
            room,
            local.role.display_name(),
            local.id,
            epoch
        );

        let (mut channel, inbound) = SignalingChannel::open(
            &self.config,
            &room,
            &local,
            self.tokens.as_ref(),
            self.transport.as_ref(),
        )
        .await
        .inspect_err(|e| error!("Failed to connect to signaling for room {}: {}", room, e))?;

        let mut media = MediaLifecycle::new(self.devices.clone(), self.config.media_constraints());
        if role.is_host() {
            if let Err(e) = media.start_local_capture(render_target.as_deref()).await {
                error!("Failed to start local capture: {}", e);
                channel.close();
                return Err(e.into());
            }
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let registry = Arc::new(PeerRegistry::new(self.peers.clone(), events_tx));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let active = ActiveSession {
            epoch,
            room: room.clone(),
            local,
            channel,
            media,
            registry,
            observer: Some(self.observer.clone()),
            render_target: if role.is_host() { None } else { render_target },
            shutdown: Some(shutdown_tx),
        };

        let replaced = self.state().replace(active);
        if let Some(stale) = replaced {
            warn!("Concurrent join replaced session epoch {}", stale.epoch);
            stale.teardown();
        }

        tokio::spawn(Dispatcher::new(self.clone(), epoch, inbound, events_rx, shutdown_rx).run());
        info!("Joined room {}", room);
        Ok(())
    }

    /// Tears the active session down if it matches `epoch` (any when `None`).
    pub(crate) fn teardown(
        &self,
        epoch: Option<u64>,
        reason: &str,
    ) -> Option<Arc<dyn SessionObserver>> {
        let active = {
            let mut state = self.state();
            match state.as_ref() {
                Some(active) if epoch.is_none_or(|e| e == active.epoch) => state.take(),
                _ => None,
            }
        }?;

        info!("Cleaning up session in room {}: {}", active.room, reason);
        active.teardown()
    }

    pub(crate) fn is_current(&self, epoch: u64) -> bool {
        self.state().as_ref().is_some_and(|a| a.epoch == epoch)
    }

    pub(crate) fn peer_context(&self, epoch: u64) -> Option<PeerContext> {
        self.state()
            .as_ref()
            .filter(|a| a.epoch == epoch)
            .map(ActiveSession::peer_context)
    }

    pub(crate) fn observer(&self, epoch: u64) -> Option<Arc<dyn SessionObserver>> {
        self.state()
            .as_ref()
            .filter(|a| a.epoch == epoch)
            .and_then(|a| a.observer.clone())
    }

    pub(crate) fn send(&self, epoch: u64, signal: &OutboundSignal) -> Result<(), ConnectionError> {
        let state = self.state();
        match state.as_ref() {
            Some(active) if active.epoch == epoch => active.channel.send(signal),
            _ => Err(ConnectionError::ChannelClosed),
        }
    }
}
