/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/

//! In-process WebSocket server scripted from the test thread.
//!
//! The server accepts a single connection. Every text frame the client sends is decoded
//! and queued for [`MockServer::recv`]; frames are pushed to the client with
//! [`MockServer::send`] and friends. The server runs on its own thread and tokio runtime,
//! so tests themselves stay plain blocking `#[test]` functions.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener as StdTcpListener;
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::{HeaderMap, HeaderValue, StatusCode};
use yamcs_rs::client::{ClientConfig, YamcsClient};

/// How long a test waits for the client to do something before failing.
pub const WAIT: Duration = Duration::from_secs(5);

enum Command {
    Text(String),
    Close,
    Drop,
}

/// A scripted single-connection WebSocket server.
pub struct MockServer {
    port: u16,
    incoming: std_mpsc::Receiver<Value>,
    outgoing: mpsc::UnboundedSender<Command>,
    headers: Arc<Mutex<Option<HeaderMap>>>,
}

impl MockServer {
    /// Starts a server that accepts the handshake.
    pub fn start() -> Self {
        Self::start_with(None)
    }

    /// Starts a server that answers the handshake with `status`.
    pub fn rejecting(status: u16) -> Self {
        Self::start_with(Some(status))
    }

    fn start_with(reject: Option<u16>) -> Self {
        let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind mock server");
        listener.set_nonblocking(true).expect("non-blocking listener");
        let port = listener.local_addr().expect("local address").port();

        let (incoming_tx, incoming) = std_mpsc::channel();
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let headers = Arc::new(Mutex::new(None));
        let seen_headers = Arc::clone(&headers);

        thread::Builder::new()
            .name("mock-yamcs".to_string())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("mock server runtime");
                runtime.block_on(serve(listener, reject, incoming_tx, outgoing_rx, seen_headers));
            })
            .expect("spawn mock server");

        Self {
            port,
            incoming,
            outgoing,
            headers,
        }
    }

    /// Address of the server as `host:port`.
    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Client configuration pointing at this server.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.address()).reply_timeout(WAIT)
    }

    /// Client pointing at this server.
    pub fn client(&self) -> YamcsClient {
        YamcsClient::new(self.config()).expect("client")
    }

    /// Next frame sent by the client.
    pub fn recv(&self) -> Value {
        self.incoming
            .recv_timeout(WAIT)
            .expect("client did not send a frame in time")
    }

    /// Next frame sent by the client, if one arrives within `timeout`.
    pub fn try_recv(&self, timeout: Duration) -> Option<Value> {
        self.incoming.recv_timeout(timeout).ok()
    }

    /// Sends a raw text frame.
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.outgoing.send(Command::Text(text.into()));
    }

    /// Sends a JSON frame.
    pub fn send(&self, message: Value) {
        self.send_text(message.to_string());
    }

    /// Confirms request `reply_to`, assigning `call`.
    pub fn reply_ok(&self, reply_to: u64, call: i64) {
        self.send(json!({"type": "reply", "call": call, "data": {"replyTo": reply_to}}));
    }

    /// Rejects request `reply_to`.
    pub fn reply_error(&self, reply_to: u64, code: i32, msg: &str) {
        self.send(json!({
            "type": "reply",
            "data": {"replyTo": reply_to, "exception": {"code": code, "type": "BadRequestException", "msg": msg}}
        }));
    }

    /// Sends a data message for `topic`.
    pub fn data(&self, topic: &str, call: i64, seq: u64, data: Value) {
        self.send(json!({"type": topic, "call": call, "seq": seq, "data": data}));
    }

    /// Closes the connection with a close frame.
    pub fn close(&self) {
        let _ = self.outgoing.send(Command::Close);
    }

    /// Drops the TCP connection without a closing handshake.
    pub fn drop_connection(&self) {
        let _ = self.outgoing.send(Command::Drop);
    }

    /// Headers of the client's handshake request, once it arrived.
    pub fn handshake_headers(&self) -> Option<HeaderMap> {
        self.headers.lock().expect("headers lock").clone()
    }
}

/// Answers a single HTTP request with `body` as JSON and returns the server address.
pub fn http_responder(body: Value) -> String {
    let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind http responder");
    let address = listener.local_addr().expect("local address").to_string();
    thread::Builder::new()
        .name("mock-yamcs-http".to_string())
        .spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut line = String::new();
            while reader.read_line(&mut line).map(|n| n > 0).unwrap_or(false) {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }
            let body = body.to_string();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        })
        .expect("spawn http responder");
    address
}

async fn serve(
    listener: StdTcpListener,
    reject: Option<u16>,
    incoming: std_mpsc::Sender<Value>,
    mut outgoing: mpsc::UnboundedReceiver<Command>,
    headers: Arc<Mutex<Option<HeaderMap>>>,
) {
    let listener = TcpListener::from_std(listener).expect("tokio listener");
    let Ok((stream, _)) = listener.accept().await else {
        return;
    };

    let callback = move |request: &Request, mut response: Response| {
        *headers.lock().expect("headers lock") = Some(request.headers().clone());
        if let Some(status) = reject {
            let mut error = ErrorResponse::new(Some("rejected".to_string()));
            *error.status_mut() = StatusCode::from_u16(status).expect("status code");
            return Err(error);
        }
        if request.headers().contains_key(SEC_WEBSOCKET_PROTOCOL) {
            response
                .headers_mut()
                .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static("json"));
        }
        Ok(response)
    };
    let Ok(ws) = accept_hdr_async(stream, callback).await else {
        return;
    };

    let (mut write, mut read) = ws.split();
    loop {
        tokio::select! {
            command = outgoing.recv() => match command {
                Some(Command::Text(text)) => {
                    if write.send(Message::text(text)).await.is_err() {
                        return;
                    }
                }
                Some(Command::Close) => {
                    let _ = write.send(Message::Close(None)).await;
                    // Drain until the client acknowledges the close.
                    while let Some(Ok(frame)) = read.next().await {
                        if frame.is_close() {
                            break;
                        }
                    }
                    return;
                }
                Some(Command::Drop) | None => return,
            },
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(value) = serde_json::from_str::<Value>(text.as_str()) {
                        let _ = incoming.send(value);
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => {}
            },
        }
    }
}
