/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/

//! Error types shared by the request path and the subscription machinery.
//!
//! Recoverable conditions (transport failures, rejected credentials, missing resources,
//! server-reported exceptions, timeouts) are values of [`YamcsError`]. Misuse of the API
//! that can only be a bug in the caller, such as completing a [`SubscriptionFuture`]
//! twice, panics instead and never shows up here.
//!
//! [`SubscriptionFuture`]: crate::subscription::SubscriptionFuture

use std::io;

use thiserror::Error;
use tokio_tungstenite::tungstenite;
use tracing::{error, warn};

/// Errors that can occur while talking to a Yamcs server.
///
/// The type is `Clone` because a single terminal outcome of a subscription is handed to
/// every registered close and done callback.
#[derive(Debug, Clone, Error)]
pub enum YamcsError {
    /// The transport could not be established or died unexpectedly.
    #[error("Connection failure: {0}")]
    ConnectionFailure(String),

    /// The server rejected the supplied credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other error reported by the server, over HTTP or in a WebSocket reply.
    #[error("{message}")]
    Server {
        /// HTTP status, when the error came from the request path.
        status: Option<u16>,
        /// Message reported by the server.
        message: String,
        /// Structured detail attached to the exception, if any.
        detail: Option<serde_json::Value>,
    },

    /// A caller-specified wait expired. The underlying operation keeps running.
    #[error("Timed out waiting for the server")]
    Timeout,

    /// The subscription was cancelled by the application.
    #[error("Subscription was cancelled")]
    Cancelled,

    /// A frame or response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A user callback panicked while a message was being dispatched.
    #[error("Callback failed: {0}")]
    Callback(String),

    /// The client was configured with invalid values.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl YamcsError {
    /// Builds a server error without an HTTP status, as carried by a WebSocket reply.
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            status: None,
            message: message.into(),
            detail: None,
        }
    }

    /// Returns `true` for failures of the underlying transport.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::ConnectionFailure(_))
    }
}

impl From<serde_json::Error> for YamcsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<url::ParseError> for YamcsError {
    fn from(err: url::ParseError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<reqwest::Error> for YamcsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::ConnectionFailure(format!("Request timed out: {err}"))
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_connect() {
            Self::ConnectionFailure(format!("Connection refused: {err}"))
        } else {
            Self::ConnectionFailure(err.to_string())
        }
    }
}

impl From<tungstenite::Error> for YamcsError {
    fn from(err: tungstenite::Error) -> Self {
        classify_transport_error(err)
    }
}

/// Maps a WebSocket transport error onto the uniform failure type delivered to close
/// callbacks.
///
/// A rejected handshake with status 401 is the only transport condition that surfaces as
/// [`YamcsError::Unauthorized`]; everything else is a [`YamcsError::ConnectionFailure`].
pub(crate) fn classify_transport_error(err: tungstenite::Error) -> YamcsError {
    match err {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            YamcsError::ConnectionFailure("Connection closed".to_string())
        }
        tungstenite::Error::Io(io_err) => classify_io_error(&io_err),
        tungstenite::Error::Http(response) => {
            let status = response.status();
            if status.as_u16() == 401 {
                YamcsError::Unauthorized("WebSocket handshake was not authorized".to_string())
            } else {
                warn!("WebSocket handshake rejected with status {}", status);
                YamcsError::ConnectionFailure(format!("Handshake rejected with status {status}"))
            }
        }
        other => {
            error!("Unexpected WebSocket error: {}", other);
            YamcsError::ConnectionFailure(other.to_string())
        }
    }
}

fn classify_io_error(err: &io::Error) -> YamcsError {
    if err.kind() == io::ErrorKind::ConnectionRefused {
        return YamcsError::ConnectionFailure("Connection refused".to_string());
    }
    let text = err.to_string();
    if text.contains("lookup address")
        || text.contains("Name or service not known")
        || text.contains("nodename nor servname")
        || text.contains("No such host")
    {
        return YamcsError::ConnectionFailure(format!("Failed to resolve host: {text}"));
    }
    error!("WebSocket I/O error: {}", text);
    YamcsError::ConnectionFailure(text)
}
