use crate::config::ClientConfig;
use crate::error::ConnectionError;
use crate::session::LocalParticipant;
use crate::signaling::{SignalingConnection, SignalingTransport, TokenProvider};
use stagelink_core::{OutboundSignal, RoomId};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, error, info};

/// Outbound half of the room's signaling connection.
///
/// Inbound frames are handed out separately by [`SignalingChannel::open`] so
/// the session dispatcher can own them.
pub struct SignalingChannel {
    room: RoomId,
    sender: Option<mpsc::UnboundedSender<String>>,
    reader: Option<AbortHandle>,
}

impl SignalingChannel {
    pub async fn open(
        config: &ClientConfig,
        room: &RoomId,
        local: &LocalParticipant,
        tokens: &dyn TokenProvider,
        transport: &dyn SignalingTransport,
    ) -> Result<(Self, mpsc::UnboundedReceiver<String>), ConnectionError> {
        let token = tokens.fetch_token().await.map_err(ConnectionError::Token)?;
        if token.trim().is_empty() {
            error!("No authentication token for room {}", room);
            return Err(ConnectionError::EmptyToken);
        }

        let url = config.signaling_url(room, &token);
        debug!("Connecting {} ({}) to signaling for room {}", local.id, local.role.display_name(), room);

        let SignalingConnection {
            sender,
            receiver,
            reader,
        } = transport
            .connect(&url)
            .await
            .map_err(|source| ConnectionError::Transport {
                room: room.clone(),
                source,
            })?;

        info!("Signaling connected for room {} as {}", room, local.id);
        Ok((
            Self {
                room: room.clone(),
                sender: Some(sender),
                reader,
            },
            receiver,
        ))
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn is_open(&self) -> bool {
        self.sender.as_ref().is_some_and(|s| !s.is_closed())
    }

    pub fn send(&self, signal: &OutboundSignal) -> Result<(), ConnectionError> {
        let sender = self.sender.as_ref().ok_or(ConnectionError::ChannelClosed)?;
        let text = signal.encode()?;
        sender
            .send(text)
            .map_err(|_| ConnectionError::ChannelClosed)
    }

    /// Stops reading and lets the writer flush what is queued, then close.
    pub fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if self.sender.take().is_some() {
            info!("Signaling channel for room {} closed", self.room);
        }
    }
}

impl Drop for SignalingChannel {
    fn drop(&mut self) {
        self.close();
    }
}
