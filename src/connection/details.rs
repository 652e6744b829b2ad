/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/
use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::client::{ClientConfig, Credentials};
use crate::utils::YamcsError;

/// Subprotocol token identifying the payload encoding on the WebSocket.
pub const SUBPROTOCOL: &str = "json";

/// Resolved endpoints and credentials for one server.
///
/// Built once from a [`ClientConfig`] and shared by the request context and every
/// subscription manager.
#[derive(Clone)]
pub struct ConnectionDetails {
    api_root: Url,
    websocket_url: Url,
    token_url: Url,
    user_agent: String,
    credentials: Option<Arc<dyn Credentials>>,
}

impl ConnectionDetails {
    /// Derives the REST, WebSocket and token endpoints from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`YamcsError::Configuration`] if the address does not form a valid URL.
    pub fn from_config(config: &ClientConfig) -> Result<Self, YamcsError> {
        if config.address.is_empty() || config.address.contains("://") {
            return Err(YamcsError::Configuration(format!(
                "Address must be given as host:port, got '{}'",
                config.address
            )));
        }
        let (http, ws) = if config.tls {
            ("https", "wss")
        } else {
            ("http", "ws")
        };
        let prefix = match &config.context_path {
            Some(path) => format!("/{path}"),
            None => String::new(),
        };

        let api_root = Url::parse(&format!("{http}://{}{prefix}/api", config.address))?;
        let websocket_url = Url::parse(&format!("{ws}://{}{prefix}/api/websocket", config.address))?;
        let token_url = Url::parse(&format!("{http}://{}{prefix}/auth/token", config.address))?;
        if api_root.host_str().is_none() {
            return Err(YamcsError::Configuration(format!(
                "Address has no host: '{}'",
                config.address
            )));
        }

        Ok(Self {
            api_root,
            websocket_url,
            token_url,
            user_agent: config.user_agent.clone(),
            credentials: config.credentials.clone(),
        })
    }

    /// Root of the REST API, without trailing slash.
    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// Endpoint for WebSocket subscriptions.
    pub fn websocket_url(&self) -> &Url {
        &self.websocket_url
    }

    /// Endpoint for obtaining and refreshing tokens.
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// Value of the `User-Agent` header.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Credentials to attach, if any.
    pub fn credentials(&self) -> Option<&Arc<dyn Credentials>> {
        self.credentials.as_ref()
    }
}

impl fmt::Debug for ConnectionDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDetails")
            .field("api_root", &self.api_root.as_str())
            .field("websocket_url", &self.websocket_url.as_str())
            .field("authenticated", &self.credentials.is_some())
            .finish()
    }
}
