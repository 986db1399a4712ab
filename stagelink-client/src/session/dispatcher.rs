use crate::peer::PeerEvent;
use crate::session::session::SessionInner;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Event loop of one active session.
///
/// Inbound frames are handled one at a time in delivery order, interleaved
/// with events from the session's peer connections.
pub(crate) struct Dispatcher {
    session: Arc<SessionInner>,
    epoch: u64,
    inbound: mpsc::UnboundedReceiver<String>,
    peer_events: mpsc::UnboundedReceiver<PeerEvent>,
    shutdown: oneshot::Receiver<()>,
}

impl Dispatcher {
    pub(crate) fn new(
        session: Arc<SessionInner>,
        epoch: u64,
        inbound: mpsc::UnboundedReceiver<String>,
        peer_events: mpsc::UnboundedReceiver<PeerEvent>,
        shutdown: oneshot::Receiver<()>,
    ) -> Self {
        Self {
            session,
            epoch,
            inbound,
            peer_events,
            shutdown,
        }
    }

    /// Runs until the session is torn down or the signaling channel closes.
    pub(crate) async fn run(mut self) {
        info!("Session event loop started (epoch {})", self.epoch);

        loop {
            tokio::select! {
                _ = &mut self.shutdown => {
                    debug!("Session epoch {} torn down", self.epoch);
                    break;
                }

                frame = self.inbound.recv() => {
                    match frame {
                        Some(text) => self.session.handle_frame(self.epoch, &text).await,
                        None => {
                            warn!("Signaling channel closed (epoch {})", self.epoch);
                            if let Some(observer) =
                                self.session.teardown(Some(self.epoch), "signaling channel closed")
                            {
                                observer.on_stream_ended().await;
                            }
                            break;
                        }
                    }
                }

                Some(event) = self.peer_events.recv() => {
                    self.session.handle_peer_event(self.epoch, event).await;
                }
            }

            if !self.session.is_current(self.epoch) {
                break;
            }
        }

        info!("Session event loop finished (epoch {})", self.epoch);
    }
}
