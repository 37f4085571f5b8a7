//! Live-update channel subscriber.

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::ClientError;
use crate::objects::LiveMessage;

/// An open connection to the relay's `/ws` channel.
///
/// Signals carry no rows. On every [`LiveMessage::DataChanged`] the viewer
/// is expected to re-pull the snapshot with
/// [`RelayClient::get_data`](super::RelayClient::get_data).
pub struct LiveSubscription {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl LiveSubscription {
    /// Connect to a live-update URL (`ws://` or `wss://`).
    pub async fn connect(url: &Url) -> Result<Self, ClientError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        Ok(Self { stream })
    }

    /// Wait for the next signal.
    ///
    /// Returns `None` once the server closes the connection.
    pub async fn next(&mut self) -> Option<Result<LiveMessage, ClientError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => {
                    return Some(serde_json::from_str(&text).map_err(ClientError::Json));
                }
                Ok(Message::Close(_)) => return None,
                // Ping/pong are answered by tungstenite; binary frames are not
                // part of the protocol.
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    /// Close the connection.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.close(None).await?;
        Ok(())
    }
}
