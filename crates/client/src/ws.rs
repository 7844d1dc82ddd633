//! WebSocket transport for the admin hub.
//!
//! Thin wrapper around `tokio-tungstenite` that hands out separate reader and writer
//! halves, so the hub driver can wait on both in one `tokio::select!` loop.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Message read from the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    /// Text frame; every hub frame arrives as one.
    Text(String),
    /// Binary frame, not used by the hub.
    Binary(Vec<u8>),
    /// Ping that must be answered.
    Ping(Vec<u8>),
    /// Close frame.
    Close {
        /// Close code (1005 when none was sent).
        code: u16,
        /// Close reason.
        reason: String,
    },
}

/// Write half.
#[derive(Debug)]
pub struct WsWriter {
    sink: futures_util::stream::SplitSink<WsStream, tungstenite::Message>,
}

impl WsWriter {
    /// Send one text frame.
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Text(text.to_string()))
            .await
            .context("WebSocket send failed")
    }

    /// Answer a ping.
    pub async fn send_pong(&mut self, data: Vec<u8>) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Pong(data))
            .await
            .context("WebSocket pong failed")
    }

    /// Send a close frame and flush.
    pub async fn close(&mut self) -> Result<()> {
        self.sink.close().await.context("WebSocket close failed")
    }
}

/// Read half.
#[derive(Debug)]
pub struct WsReader {
    stream: futures_util::stream::SplitStream<WsStream>,
}

impl WsReader {
    /// Next message, `None` once the stream has ended. Pongs and raw frames are skipped.
    pub async fn recv(&mut self) -> Option<Result<WsMessage>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(err) => return Some(Err(anyhow::anyhow!("WebSocket read error: {err}"))),
            };
            let message = match message {
                tungstenite::Message::Text(text) => WsMessage::Text(text.to_string()),
                tungstenite::Message::Binary(data) => WsMessage::Binary(data.to_vec()),
                tungstenite::Message::Ping(data) => WsMessage::Ping(data.to_vec()),
                tungstenite::Message::Close(frame) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    WsMessage::Close { code, reason }
                }
                tungstenite::Message::Pong(_) | tungstenite::Message::Frame(_) => continue,
            };
            return Some(Ok(message));
        }
    }
}

/// Open `url`, adding each `(name, value)` header to the handshake request.
pub async fn connect(url: &str, headers: &[(&str, &str)]) -> Result<(WsWriter, WsReader)> {
    let mut request = url
        .into_client_request()
        .with_context(|| format!("invalid WebSocket URL: {url}"))?;
    for &(name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("invalid header name: {name}"))?;
        let header_value = HeaderValue::from_str(value)
            .with_context(|| format!("invalid header value for {name}"))?;
        request.headers_mut().insert(header_name, header_value);
    }

    let (stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .with_context(|| format!("WebSocket connect to {url} failed"))?;
    let (sink, stream) = stream.split();
    Ok((WsWriter { sink }, WsReader { stream }))
}

/// Cookie header value carrying the session key.
pub fn session_cookie(key: &str) -> String {
    format!("key={key}")
}

/// Map `http://` to `ws://` and `https://` to `wss://`; other URLs pass through.
pub fn http_to_ws_scheme(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_mapping() {
        assert_eq!(http_to_ws_scheme("http://127.0.0.1:8080"), "ws://127.0.0.1:8080");
        assert_eq!(http_to_ws_scheme("https://mc.example.org/a"), "wss://mc.example.org/a");
        assert_eq!(http_to_ws_scheme("ws://host/hub"), "ws://host/hub");
        assert_eq!(http_to_ws_scheme("wss://host/hub"), "wss://host/hub");
    }

    #[test]
    fn cookie_value() {
        assert_eq!(session_cookie("abc123"), "key=abc123");
    }

    #[tokio::test]
    async fn invalid_url_is_an_error() {
        assert!(connect("not a url", &[]).await.is_err());
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        assert!(connect("ws://127.0.0.1:1/hub", &[]).await.is_err());
    }
}
