use crate::error::NegotiationError;
use crate::media::{LocalTrack, RemoteStream, RemoteTrack};
use crate::peer::{
    LinkHandle, PeerConnectionFactory, PeerEvent, PeerEventSink, PeerLink, PeerLinkSnapshot,
    SignalingEvent, SignalingState,
};
use dashmap::DashMap;
use stagelink_core::ParticipantId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Peer links of one active session, keyed by remote participant.
///
/// Closures passed to `with_link`/`with_current` run under the map's shard
/// lock and must not call back into the registry.
pub struct PeerRegistry {
    links: DashMap<ParticipantId, PeerLink>,
    streams: DashMap<ParticipantId, RemoteStream>,
    factory: Arc<dyn PeerConnectionFactory>,
    events: mpsc::UnboundedSender<PeerEvent>,
    next_generation: AtomicU64,
    sealed: AtomicBool,
}

impl PeerRegistry {
    pub fn new(
        factory: Arc<dyn PeerConnectionFactory>,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Self {
        Self {
            links: DashMap::new(),
            streams: DashMap::new(),
            factory,
            events,
            next_generation: AtomicU64::new(0),
            sealed: AtomicBool::new(false),
        }
    }

    /// Discards any link to `remote` and installs a fresh one carrying `tracks`.
    pub async fn create_or_replace(
        &self,
        remote: &ParticipantId,
        tracks: &[LocalTrack],
    ) -> Result<LinkHandle, NegotiationError> {
        if self.remove(remote) {
            info!("Closing existing peer link to {}", remote);
        }
        if self.is_sealed() {
            return Err(NegotiationError::SessionClosed);
        }

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let sink = PeerEventSink::new(remote.clone(), generation, self.events.clone());
        let connection = self.factory.create(sink).await?;

        for track in tracks {
            if let Err(e) = connection.add_track(track).await {
                connection.close();
                return Err(e);
            }
        }

        let mut link = PeerLink::new(remote.clone(), generation, connection);
        if self.is_sealed() {
            link.close();
            return Err(NegotiationError::SessionClosed);
        }

        let handle = link.handle();
        if let Some(mut raced) = self.links.insert(remote.clone(), link) {
            debug!(
                "Peer link to {} (gen {}) replaced while creating gen {}",
                remote,
                raced.generation(),
                generation
            );
            raced.close();
        }
        self.streams.remove(remote);

        // teardown may have drained the map between the check and the insert
        if self.is_sealed() {
            self.remove(remote);
            return Err(NegotiationError::SessionClosed);
        }

        info!(
            "Created peer link to {} (gen {}, {} local tracks)",
            remote,
            generation,
            tracks.len()
        );
        Ok(handle)
    }

    pub fn get(&self, remote: &ParticipantId) -> Option<LinkHandle> {
        self.links.get(remote).map(|link| link.handle())
    }

    pub fn contains(&self, remote: &ParticipantId) -> bool {
        self.links.contains_key(remote)
    }

    pub fn is_current(&self, remote: &ParticipantId, generation: u64) -> bool {
        self.links
            .get(remote)
            .is_some_and(|link| link.generation() == generation)
    }

    pub fn with_link<R>(
        &self,
        remote: &ParticipantId,
        f: impl FnOnce(&mut PeerLink) -> R,
    ) -> Option<R> {
        let mut link = self.links.get_mut(remote)?;
        Some(f(link.value_mut()))
    }

    /// Runs `f` only if `handle` still names the current link.
    pub fn with_current<R>(
        &self,
        handle: &LinkHandle,
        f: impl FnOnce(&mut PeerLink) -> R,
    ) -> Option<R> {
        let mut link = self.links.get_mut(&handle.remote)?;
        if link.generation() != handle.generation {
            return None;
        }
        Some(f(link.value_mut()))
    }

    /// Claims a transition on the current link.
    pub fn apply(
        &self,
        handle: &LinkHandle,
        event: SignalingEvent,
    ) -> Result<SignalingState, NegotiationError> {
        self.with_current(handle, |link| link.apply(event))
            .unwrap_or_else(|| Err(NegotiationError::Superseded(handle.remote.clone())))
    }

    pub fn ensure_current(&self, handle: &LinkHandle) -> Result<(), NegotiationError> {
        if self.is_current(&handle.remote, handle.generation) {
            Ok(())
        } else {
            Err(NegotiationError::Superseded(handle.remote.clone()))
        }
    }

    /// Closes and forgets the link to `remote`; false if there was none.
    pub fn remove(&self, remote: &ParticipantId) -> bool {
        self.streams.remove(remote);
        match self.links.remove(remote) {
            Some((_, mut link)) => {
                link.close();
                true
            }
            None => false,
        }
    }

    /// Like [`remove`](Self::remove), but leaves a newer link alone.
    pub fn remove_if_current(&self, remote: &ParticipantId, generation: u64) -> bool {
        match self
            .links
            .remove_if(remote, |_, link| link.generation() == generation)
        {
            Some((_, mut link)) => {
                self.streams.remove(remote);
                link.close();
                true
            }
            None => false,
        }
    }

    /// Closes every link and refuses new ones from now on.
    pub fn remove_all(&self) {
        self.sealed.store(true, Ordering::SeqCst);

        let remotes: Vec<ParticipantId> = self.links.iter().map(|e| e.key().clone()).collect();
        for remote in &remotes {
            self.remove(remote);
        }
        self.streams.clear();

        if !remotes.is_empty() {
            info!("Closed {} peer links", remotes.len());
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    /// Files a received track under its link; `None` if the link is stale.
    pub fn record_track(
        &self,
        remote: &ParticipantId,
        generation: u64,
        track: RemoteTrack,
    ) -> Option<RemoteStream> {
        if !self.is_current(remote, generation) {
            return None;
        }

        let mut stream = self
            .streams
            .entry(remote.clone())
            .or_insert_with(|| RemoteStream {
                id: track.stream_id.clone(),
                participant: remote.clone(),
                tracks: Vec::new(),
            });
        stream.add_track(track);
        Some(stream.clone())
    }

    pub fn remote_stream(&self, remote: &ParticipantId) -> Option<RemoteStream> {
        self.streams.get(remote).map(|s| s.clone())
    }

    pub fn snapshot(&self, remote: &ParticipantId) -> Option<PeerLinkSnapshot> {
        self.links.get(remote).map(|link| link.snapshot())
    }

    /// All links, ordered by remote id.
    pub fn snapshots(&self) -> Vec<PeerLinkSnapshot> {
        let mut links: Vec<PeerLinkSnapshot> = self.links.iter().map(|l| l.snapshot()).collect();
        links.sort_by(|a, b| a.remote.cmp(&b.remote));
        links
    }

    pub fn remote_stream_owners(&self) -> Vec<ParticipantId> {
        let mut owners: Vec<ParticipantId> = self.streams.iter().map(|s| s.key().clone()).collect();
        owners.sort();
        owners
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
