//! Frame transport over a WebSocket connection.
//!
//! The engine talks to the wire through the [`Connector`] / [`FrameSink`] /
//! [`FrameSource`] traits so tests can swap the real WebSocket for an
//! in-memory duplex.  [`WsConnector`] is the production implementation.

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use futures_util::stream::{SplitSink, SplitStream};
use oneme_proto::Frame;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::USER_AGENT;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::errors::Error;

// ─── Traits ───────────────────────────────────────────────────────────────────

/// Write half of a frame connection.
pub trait FrameSink: Send {
    fn send(&mut self, frame: Frame) -> BoxFuture<'_, Result<(), Error>>;
    fn close(&mut self) -> BoxFuture<'_, Result<(), Error>>;
}

/// Read half of a frame connection.  `Ok(None)` means the peer closed cleanly.
pub trait FrameSource: Send {
    fn next(&mut self) -> BoxFuture<'_, Result<Option<Frame>, Error>>;
}

/// Opens a new frame connection to the given endpoint.
pub trait Connector: Send + Sync {
    fn connect(
        &self,
        endpoint: &str,
    ) -> BoxFuture<'_, Result<(Box<dyn FrameSink>, Box<dyn FrameSource>), Error>>;
}

// ─── WsConnector ──────────────────────────────────────────────────────────────

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// The production connector: TLS WebSocket via tokio-tungstenite.
pub struct WsConnector {
    user_agent: String,
}

impl WsConnector {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self { user_agent: user_agent.into() }
    }
}

impl Connector for WsConnector {
    fn connect(
        &self,
        endpoint: &str,
    ) -> BoxFuture<'_, Result<(Box<dyn FrameSink>, Box<dyn FrameSource>), Error>> {
        let endpoint = endpoint.to_string();
        Box::pin(async move {
            let mut request = endpoint
                .as_str()
                .into_client_request()
                .map_err(|e| Error::InvalidInput(format!("bad endpoint: {e}")))?;
            if let Ok(ua) = HeaderValue::from_str(&self.user_agent) {
                request.headers_mut().insert(USER_AGENT, ua);
            }

            let (stream, _response) = connect_async(request)
                .await
                .map_err(|e| Error::Network(e.to_string()))?;
            let (sink, source) = stream.split();
            Ok((
                Box::new(WsFrameSink { sink }) as Box<dyn FrameSink>,
                Box::new(WsFrameSource { source }) as Box<dyn FrameSource>,
            ))
        })
    }
}

struct WsFrameSink {
    sink: SplitSink<WsStream, Message>,
}

impl FrameSink for WsFrameSink {
    fn send(&mut self, frame: Frame) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(async move {
            let text = frame.to_json().map_err(|e| Error::Decode(e.to_string()))?;
            self.sink
                .send(Message::Text(text.into()))
                .await
                .map_err(|e| Error::Network(e.to_string()))
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(async move {
            self.sink.close().await.map_err(|e| Error::Network(e.to_string()))
        })
    }
}

struct WsFrameSource {
    source: SplitStream<WsStream>,
}

impl FrameSource for WsFrameSource {
    fn next(&mut self) -> BoxFuture<'_, Result<Option<Frame>, Error>> {
        Box::pin(async move {
            loop {
                match self.source.next().await {
                    None => return Ok(None),
                    Some(Err(e)) => return Err(Error::Network(e.to_string())),
                    Some(Ok(Message::Text(text))) => match Frame::from_json(&text) {
                        Ok(frame) => return Ok(Some(frame)),
                        Err(e) => {
                            log::warn!("[oneme] Dropping undecodable frame: {e}");
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(_))) => return Ok(None),
                    // Ping/pong are answered by tungstenite itself; binary
                    // frames are not part of this protocol.
                    Some(Ok(_)) => continue,
                }
            }
        })
    }
}
