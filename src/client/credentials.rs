/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/

//! Credential holders attached to outgoing requests and WebSocket handshakes.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::request::error_from_status;
use crate::utils::{YamcsError, lock};

/// Tokens are refreshed this long before the server-declared expiry.
const EXPIRY_MARGIN_SECS: i64 = 30;

/// A single header to attach to an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeader {
    /// Header name, e.g. `Authorization`.
    pub name: &'static str,
    /// Header value, e.g. `Bearer <token>`.
    pub value: String,
}

/// Authentication state that can be attached to requests and refreshed when it expires.
///
/// Implementations are shared between the plain request path and every subscription
/// manager, so all methods take `&self` and synchronize internally.
pub trait Credentials: Send + Sync + fmt::Debug {
    /// Header carrying the current credentials, if any.
    fn auth_header(&self) -> Option<AuthHeader>;

    /// Whether the held credentials must be refreshed before the next request.
    fn is_expired(&self) -> bool {
        false
    }

    /// Obtains fresh credentials from the token endpoint.
    fn refresh(&self, _session: &Client, _token_url: &str) -> Result<(), YamcsError> {
        Ok(())
    }

    /// Refreshes the credentials if they expired and returns the header to attach.
    ///
    /// This may perform a blocking network round-trip.
    fn before_request(
        &self,
        session: &Client,
        token_url: &str,
    ) -> Result<Option<AuthHeader>, YamcsError> {
        if self.is_expired() {
            debug!("Credentials expired, refreshing");
            self.refresh(session, token_url)?;
        }
        Ok(self.auth_header())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Clone)]
struct TokenState {
    access_token: String,
    refresh_token: Option<String>,
    expiry: Option<DateTime<Utc>>,
}

/// Bearer-token credentials issued by the server's token endpoint.
pub struct TokenCredentials {
    state: Mutex<TokenState>,
}

impl fmt::Debug for TokenCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("TokenCredentials")
            .field("access_token", &"***")
            .field("refreshable", &state.refresh_token.is_some())
            .field("expiry", &state.expiry)
            .finish()
    }
}

impl TokenCredentials {
    /// Wraps an already issued access token.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expiry: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            state: Mutex::new(TokenState {
                access_token: access_token.into(),
                refresh_token,
                expiry,
            }),
        }
    }

    /// Logs in with a username and password and returns the issued credentials.
    ///
    /// # Errors
    ///
    /// Returns [`YamcsError::Unauthorized`] if the server rejects the login.
    pub fn login(
        session: &Client,
        token_url: &str,
        username: &str,
        password: &str,
    ) -> Result<Self, YamcsError> {
        let token = request_token(
            session,
            token_url,
            &[
                ("grant_type", "password"),
                ("username", username),
                ("password", password),
            ],
        )?;
        info!("Logged in as {}", username);
        let credentials = Self::new(String::new(), None, None);
        credentials.apply(token);
        Ok(credentials)
    }

    /// Expiry of the current access token, if the server declared one.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        lock(&self.state).expiry
    }

    fn apply(&self, token: TokenResponse) {
        let mut state = lock(&self.state);
        state.access_token = token.access_token;
        if token.refresh_token.is_some() {
            state.refresh_token = token.refresh_token;
        }
        state.expiry = token
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
    }
}

impl Credentials for TokenCredentials {
    fn auth_header(&self) -> Option<AuthHeader> {
        let state = lock(&self.state);
        if state.access_token.is_empty() {
            return None;
        }
        Some(AuthHeader {
            name: "Authorization",
            value: format!("Bearer {}", state.access_token),
        })
    }

    fn is_expired(&self) -> bool {
        let state = lock(&self.state);
        state
            .expiry
            .is_some_and(|expiry| Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) >= expiry)
    }

    fn refresh(&self, session: &Client, token_url: &str) -> Result<(), YamcsError> {
        let refresh_token = lock(&self.state).refresh_token.clone().ok_or_else(|| {
            YamcsError::Unauthorized("Access token expired and cannot be refreshed".to_string())
        })?;
        let token = request_token(
            session,
            token_url,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ],
        )?;
        self.apply(token);
        debug!("Access token refreshed");
        Ok(())
    }
}

/// Static API key sent in the `x-api-key` header. Never expires.
#[derive(Clone)]
pub struct ApiKeyCredentials {
    api_key: String,
}

impl ApiKeyCredentials {
    /// Creates credentials for the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for ApiKeyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyCredentials")
            .field("api_key", &"***")
            .finish()
    }
}

impl Credentials for ApiKeyCredentials {
    fn auth_header(&self) -> Option<AuthHeader> {
        Some(AuthHeader {
            name: "x-api-key",
            value: self.api_key.clone(),
        })
    }
}

fn request_token(
    session: &Client,
    token_url: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, YamcsError> {
    let body = serde_urlencoded::to_string(form)
        .map_err(|e| YamcsError::Configuration(e.to_string()))?;
    let response = session
        .post(token_url)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body)
        .send()?;

    let status = response.status();
    if !status.is_success() {
        let reason = status.canonical_reason().unwrap_or("Token request failed");
        let bytes = response.bytes()?;
        return Err(error_from_status(status.as_u16(), reason, &bytes));
    }
    Ok(response.json::<TokenResponse>()?)
}
