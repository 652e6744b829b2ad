/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/

//! Builder API for configuring a [`YamcsClient`](crate::client::YamcsClient).

use std::sync::Arc;
use std::time::Duration;

use crate::client::Credentials;

/// Default time high-level wrappers wait for the server to accept a subscription.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout applied to plain HTTP requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a Yamcs client.
///
/// This struct provides a simple way to configure a connection with sensible defaults.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address as `host:port` (e.g., "localhost:8090")
    pub address: String,
    /// Whether to use `https`/`wss`
    pub tls: bool,
    /// Optional context path the server is mounted under (e.g., "yamcs")
    pub context_path: Option<String>,
    /// Value of the `User-Agent` header
    pub user_agent: String,
    /// Credentials attached to every request and handshake
    pub credentials: Option<Arc<dyn Credentials>>,
    /// How long subscription factories wait for the server's initial reply
    pub reply_timeout: Duration,
    /// Timeout for plain HTTP requests
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Creates a new configuration for the given `host:port` address.
    ///
    /// # Arguments
    ///
    /// * `address` - The server address, without scheme
    ///
    /// # Returns
    ///
    /// A new `ClientConfig` with default values
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            tls: false,
            context_path: None,
            user_agent: format!("yamcs-rs/{}", env!("CARGO_PKG_VERSION")),
            credentials: None,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Enables or disables TLS.
    #[must_use]
    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Sets the context path. Leading and trailing slashes are ignored.
    #[must_use]
    pub fn context_path(mut self, context_path: impl Into<String>) -> Self {
        let path = context_path.into().trim_matches('/').to_string();
        self.context_path = if path.is_empty() { None } else { Some(path) };
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the credentials.
    #[must_use]
    pub fn credentials(mut self, credentials: Arc<dyn Credentials>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the timeout for the initial subscription reply.
    #[must_use]
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
