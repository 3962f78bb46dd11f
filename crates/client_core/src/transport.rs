//! Event channel adapter: one websocket per session, inbound frames decoded
//! into [`ServerEvent`]s, outbound commands serialized and sent best-effort.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use shared::{
    error::ProtocolError,
    protocol::{ClientCommand, ServerEvent},
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

pub type EventStream = UnboundedReceiverStream<ServerEvent>;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel is not ready")]
    NotReady,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("invalid server url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Outbound half of the channel. Sends never queue or retry: when the
/// connection is not ready the command is refused.
pub trait CommandSink: Send {
    fn send(&self, command: &ClientCommand) -> Result<(), ChannelError>;
}

pub fn decode_frame(raw: &str) -> Result<ServerEvent, ProtocolError> {
    serde_json::from_str(raw).map_err(|err| ProtocolError::malformed(err.to_string()))
}

pub fn encode_command(command: &ClientCommand) -> Result<String, ProtocolError> {
    serde_json::to_string(command).map_err(|source| ProtocolError::Encode {
        command: command.name(),
        source,
    })
}

/// `http(s)://host[/base]` maps to `ws(s)://host[/base]/ws`; websocket URLs
/// are used as given.
pub fn websocket_url(server_url: &str) -> Result<Url, ChannelError> {
    let invalid = |reason: &str| ChannelError::InvalidUrl {
        url: server_url.to_string(),
        reason: reason.to_string(),
    };
    let mut url = Url::parse(server_url.trim()).map_err(|err| invalid(&err.to_string()))?;
    let ws_scheme = match url.scheme() {
        "ws" | "wss" => return Ok(url),
        "http" => "ws",
        "https" => "wss",
        _ => return Err(invalid("scheme must be http, https, ws or wss")),
    };
    url.set_scheme(ws_scheme)
        .map_err(|_| invalid("scheme could not be converted"))?;
    let path = format!("{}/ws", url.path().trim_end_matches('/'));
    url.set_path(&path);
    Ok(url)
}

#[derive(Clone, Default)]
pub struct ChannelHandle {
    outbound: Option<mpsc::UnboundedSender<String>>,
}

impl ChannelHandle {
    /// A handle with no connection behind it; every send is refused.
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.outbound
            .as_ref()
            .is_some_and(|outbound| !outbound.is_closed())
    }
}

impl CommandSink for ChannelHandle {
    fn send(&self, command: &ClientCommand) -> Result<(), ChannelError> {
        let outbound = self.outbound.as_ref().ok_or(ChannelError::NotReady)?;
        let text = encode_command(command)?;
        outbound.send(text).map_err(|_| ChannelError::NotReady)
    }
}

/// Records commands instead of sending them.
#[derive(Clone)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<ClientCommand>>>,
    ready: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            ready: true,
        }
    }

    pub fn unready() -> Self {
        Self {
            ready: false,
            ..Self::new()
        }
    }

    pub fn sent(&self) -> Vec<ClientCommand> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSink for RecordingSink {
    fn send(&self, command: &ClientCommand) -> Result<(), ChannelError> {
        if !self.ready {
            return Err(ChannelError::NotReady);
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(command.clone());
        }
        Ok(())
    }
}

/// Opens the session's websocket. No replay is requested: the caller starts
/// from an empty store. The returned stream yields decoded events in arrival
/// order and ends when the connection closes.
pub async fn connect(server_url: &str) -> Result<(ChannelHandle, EventStream)> {
    let ws_url = websocket_url(server_url)?;
    let (ws_stream, _) = connect_async(ws_url.as_str())
        .await
        .with_context(|| format!("failed to connect websocket: {ws_url}"))?;
    info!(%ws_url, "connected to demo server");
    let (mut ws_writer, mut ws_reader) = ws_stream.split();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if let Err(err) = ws_writer.send(Message::Text(text)).await {
                warn!(%err, "websocket send failed; closing outbound channel");
                break;
            }
        }
    });

    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(msg) = ws_reader.next().await {
            match msg {
                Ok(Message::Text(text)) => match decode_frame(&text) {
                    Ok(event) => {
                        debug!(kind = event.kind(), "received server event");
                        if inbound_tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!(%err, "dropping malformed frame"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(err) => {
                    warn!(%err, "websocket receive failed");
                    break;
                }
            }
        }
        info!("demo server connection closed");
    });

    Ok((
        ChannelHandle {
            outbound: Some(outbound_tx),
        },
        UnboundedReceiverStream::new(inbound_rx),
    ))
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
