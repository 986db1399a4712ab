use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// An open text-frame connection to the signaling server.
///
/// Dropping `sender` asks the transport to flush and close; `receiver` ends
/// when the server or the network closes the connection.
pub struct SignalingConnection {
    pub sender: mpsc::UnboundedSender<String>,
    pub receiver: mpsc::UnboundedReceiver<String>,
    pub reader: Option<AbortHandle>,
}

#[async_trait]
pub trait SignalingTransport: Send + Sync {
    async fn connect(&self, url: &str) -> anyhow::Result<SignalingConnection>;
}
