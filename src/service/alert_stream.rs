//! Client side of the real-time alert channel.
//!
//! The backend pushes `{"type": "DEEPFAKE" | "PHISHING" | "TRANSACTION"}` text
//! frames; each one is forwarded straight to the alert presenter.

use crate::common::Result;
use crate::core::alerts::AlertPresenter;
use crate::service::protocol::{AlertCategory, AlertEvent};
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub struct AlertStream {
    url: String,
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl AlertStream {
    pub async fn connect(url: &str) -> Result<Self> {
        let (socket, _response) = connect_async(url).await?;
        tracing::info!("Connected to alert channel {}", url);
        Ok(Self {
            url: url.to_string(),
            socket,
        })
    }

    /// Forwards alerts until the server closes the channel.
    ///
    /// Returns how many alerts were shown.
    pub async fn run(mut self, presenter: &AlertPresenter) -> Result<usize> {
        let mut forwarded = 0;

        while let Some(frame) = self.socket.next().await {
            match frame? {
                Message::Text(text) => {
                    if let Some(category) = parse_alert_event(&text) {
                        tracing::debug!("Alert event received: {}", category);
                        presenter.show(category);
                        forwarded += 1;
                    }
                }
                Message::Close(_) => break,
                // Pings are answered by tungstenite itself
                _ => {}
            }
        }

        tracing::info!("Alert channel {} closed after {} alert(s)", self.url, forwarded);
        Ok(forwarded)
    }
}

pub fn parse_alert_event(text: &str) -> Option<AlertCategory> {
    match serde_json::from_str::<AlertEvent>(text) {
        Ok(event) => Some(event.category),
        Err(e) => {
            tracing::warn!("Ignoring malformed alert event {:?}: {}", text, e);
            None
        }
    }
}
