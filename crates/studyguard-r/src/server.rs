use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use studyguard_common::protocol::{ClientMessage, ServerMessage};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to bind bridge server: {0}")]
    Bind(#[from] std::io::Error),
}

/// What the server hands to the monitor from its connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Message(ClientMessage),
    /// A companion extension disconnected.
    Closed,
}

/// Local WebSocket endpoint for the companion browser extension.
#[derive(Clone)]
pub struct BridgeServer {
    port: u16,
    // One sender, one receiver per connection (usually exactly one).
    outbound_tx: broadcast::Sender<ServerMessage>,
}

pub struct ServerHandle {
    pub local_addr: SocketAddr,
    pub outbound_tx: broadcast::Sender<ServerMessage>,
    pub inbound_rx: mpsc::Receiver<Inbound>,
}

impl BridgeServer {
    pub fn new(port: u16) -> Self {
        let (outbound_tx, _) = broadcast::channel(100);
        Self { port, outbound_tx }
    }

    pub async fn start(&self) -> Result<ServerHandle, BridgeError> {
        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        let listener = TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Bridge server listening on: {}", local_addr);

        let (inbound_tx, inbound_rx) = mpsc::channel(100);
        let outbound_tx = self.outbound_tx.clone();
        let server_outbound_tx = outbound_tx.clone();

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        info!("Accepted TCP connection from: {}", peer);
                        let out_rx = server_outbound_tx.subscribe();
                        tokio::spawn(accept_connection(stream, out_rx, inbound_tx.clone()));
                    }
                    Err(e) => {
                        error!("Bridge accept failed: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(ServerHandle {
            local_addr,
            outbound_tx,
            inbound_rx,
        })
    }
}

async fn accept_connection(
    stream: TcpStream,
    mut out_rx: broadcast::Receiver<ServerMessage>,
    in_tx: mpsc::Sender<Inbound>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("Error during the websocket handshake occurred: {}", e);
            return;
        }
    };

    info!("Companion extension connected");
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    loop {
        tokio::select! {
            outbound = out_rx.recv() => match outbound {
                Ok(message) => {
                    let json = match serde_json::to_string(&message) {
                        Ok(json) => json,
                        Err(e) => {
                            error!("Failed to encode message for extension: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = ws_sender.send(Message::Text(json)).await {
                        error!("Failed to send message to WS: {}", e);
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Extension connection lagging, skipped {} messages", skipped);
                }
                Err(RecvError::Closed) => break,
            },

            incoming = ws_receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(message) => {
                            if in_tx.send(Inbound::Message(message)).await.is_err() {
                                debug!("Monitor no longer listening");
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Failed to parse message from extension: {} | Text: {}", e, text);
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("WebSocket closed");
                    break;
                }
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = in_tx.send(Inbound::Closed).await;
}
