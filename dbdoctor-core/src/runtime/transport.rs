//! WebSocket transport over `tokio-tungstenite`.
//!
//! Every connection runs in its own task that owns the socket. The task
//! forwards text frames to the input queue and writes frames it receives on
//! a per-connection outbound queue. Dropping the outbound sender (via
//! [`Transport::close`]) makes the task send a close frame and exit.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use url::Url;

use crate::channel::Transport;
use crate::events::{ChannelInput, ChannelInputSender, CloseReason, ConnectionId};

/// Frames queued per connection before `send` starts dropping them.
const OUTBOUND_BUFFER: usize = 64;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// [`Transport`] that dials real WebSocket endpoints.
pub struct WsTransport {
    inputs: ChannelInputSender,
    connect_timeout: Duration,
    connections: HashMap<ConnectionId, mpsc::Sender<Message>>,
}

impl WsTransport {
    pub fn new(inputs: ChannelInputSender, connect_timeout: Duration) -> Self {
        Self {
            inputs,
            connect_timeout,
            connections: HashMap::new(),
        }
    }
}

impl Transport for WsTransport {
    fn open(&mut self, id: ConnectionId, url: &Url) {
        // Tasks that already ended dropped their receivers.
        self.connections.retain(|_, outbound| !outbound.is_closed());

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        self.connections.insert(id, outbound_tx);
        tokio::spawn(run_connection(
            id,
            url.clone(),
            self.connect_timeout,
            self.inputs.clone(),
            outbound_rx,
        ));
    }

    fn send(&mut self, id: ConnectionId, text: &str) {
        let Some(outbound) = self.connections.get(&id) else {
            debug!(connection = %id, "Send on unknown connection ignored");
            return;
        };
        if let Err(e) = outbound.try_send(Message::Text(text.into())) {
            warn!(connection = %id, error = %e, "Dropping outbound frame");
        }
    }

    fn close(&mut self, id: ConnectionId) {
        if self.connections.remove(&id).is_none() {
            debug!(connection = %id, "Close of unknown connection ignored");
        }
    }
}

/// Drive one connection from dial to close and report its lifecycle.
async fn run_connection(
    id: ConnectionId,
    url: Url,
    connect_timeout: Duration,
    inputs: ChannelInputSender,
    mut outbound: mpsc::Receiver<Message>,
) {
    let reason = match tokio::time::timeout(connect_timeout, connect_async(url.as_str())).await {
        Err(_elapsed) => CloseReason::ConnectTimedOut,
        Ok(Err(e)) => CloseReason::ConnectFailed(e.to_string()),
        Ok(Ok((socket, _response))) => {
            if inputs.send(ChannelInput::Opened(id)).await.is_err() {
                return;
            }
            pump(id, socket, &inputs, &mut outbound).await
        }
    };

    match &reason {
        CloseReason::ConnectFailed(_) | CloseReason::ConnectTimedOut => {
            warn!(connection = %id, %url, %reason, "Failed to connect alert channel");
        }
        _ => debug!(connection = %id, %reason, "Connection task finished"),
    }

    let _ = inputs.send(ChannelInput::Closed(id, reason)).await;
}

/// Shuttle frames between the socket and the queues until either side ends.
async fn pump(
    id: ConnectionId,
    socket: Socket,
    inputs: &ChannelInputSender,
    outbound: &mut mpsc::Receiver<Message>,
) -> CloseReason {
    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if inputs.send(ChannelInput::Frame(id, text.to_string())).await.is_err() {
                        let _ = write.send(Message::Close(None)).await;
                        return CloseReason::Local;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    return CloseReason::Remote(frame.map(|f| u16::from(f.code)));
                }
                // Binary and control frames carry no alerts.
                Some(Ok(_)) => {}
                Some(Err(e)) => return CloseReason::Transport(e.to_string()),
                None => return CloseReason::Remote(None),
            },

            message = outbound.recv() => match message {
                Some(message) => {
                    if let Err(e) = write.send(message).await {
                        return CloseReason::Transport(e.to_string());
                    }
                }
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    return CloseReason::Local;
                }
            },
        }
    }
}
