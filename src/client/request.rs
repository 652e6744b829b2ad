/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/
use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::connection::ConnectionDetails;
use crate::utils::YamcsError;

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    detail: Option<Value>,
}

/// Maps a non-2xx status and its body onto the error taxonomy.
///
/// The body's `msg` field is used as message when it decodes; otherwise `reason`.
pub(crate) fn error_from_status(status: u16, reason: &str, body: &[u8]) -> YamcsError {
    let parsed = serde_json::from_slice::<ErrorBody>(body).ok();
    let detail = parsed.as_ref().and_then(|b| b.detail.clone());
    let message = parsed
        .and_then(|b| b.msg)
        .unwrap_or_else(|| reason.to_string());

    match status {
        401 => YamcsError::Unauthorized(message),
        404 => YamcsError::NotFound(message),
        _ => YamcsError::Server {
            status: Some(status),
            message,
            detail,
        },
    }
}

/// Issues typed requests against the REST API of one server.
///
/// Holds a persistent HTTP session so connections are reused across calls, and attaches
/// (refreshing first if needed) the configured credentials to every request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    details: ConnectionDetails,
    session: Client,
}

impl RequestContext {
    /// Creates a request context for the given endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP session cannot be built.
    pub fn new(details: ConnectionDetails, timeout: Duration) -> Result<Self, YamcsError> {
        let session = Client::builder().timeout(timeout).build()?;
        Ok(Self { details, session })
    }

    /// Endpoints and credentials this context talks to.
    pub fn details(&self) -> &ConnectionDetails {
        &self.details
    }

    /// The persistent HTTP session.
    pub fn session(&self) -> &Client {
        &self.session
    }

    /// Sends a `GET` and decodes the JSON response.
    pub fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&[(&str, &str)]>,
    ) -> Result<T, YamcsError> {
        self.request(Method::GET, path, query, None::<&()>)
    }

    /// Sends a `POST` with an optional JSON body and decodes the JSON response.
    pub fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, YamcsError> {
        self.request(Method::POST, path, None, body)
    }

    /// Sends a `PUT` with an optional JSON body and decodes the JSON response.
    pub fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, YamcsError> {
        self.request(Method::PUT, path, None, body)
    }

    /// Sends a `PATCH` with an optional JSON body and decodes the JSON response.
    pub fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, YamcsError> {
        self.request(Method::PATCH, path, None, body)
    }

    /// Sends a `DELETE` and decodes the JSON response.
    pub fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, YamcsError> {
        self.request(Method::DELETE, path, None, None::<&()>)
    }

    /// Header to attach to an outgoing request or handshake, refreshing expired
    /// credentials first.
    pub fn auth_header(&self) -> Result<Option<crate::client::AuthHeader>, YamcsError> {
        match self.details.credentials() {
            Some(credentials) => credentials.before_request(&self.session, self.details.token_url().as_str()),
            None => Ok(None),
        }
    }

    fn url_for(&self, path: &str, query: Option<&[(&str, &str)]>) -> Result<String, YamcsError> {
        let root = self.details.api_root().as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let mut url = if path.is_empty() {
            root.to_string()
        } else {
            format!("{root}/{path}")
        };
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            let encoded = serde_urlencoded::to_string(query)
                .map_err(|e| YamcsError::Configuration(e.to_string()))?;
            url.push('?');
            url.push_str(&encoded);
        }
        Ok(url)
    }

    fn request<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<&B>,
    ) -> Result<T, YamcsError> {
        let url = self.url_for(path, query)?;
        debug!("{} {}", method, url);

        let mut builder: RequestBuilder = self
            .session
            .request(method, &url)
            .header(USER_AGENT, self.details.user_agent())
            .header(ACCEPT, "application/json");
        if let Some(header) = self.auth_header()? {
            builder = builder.header(header.name, header.value);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send()?;
        let status = response.status();
        let bytes = response.bytes()?;
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Request failed");
            let err = error_from_status(status.as_u16(), reason, &bytes);
            warn!("{} returned {}: {}", url, status, err);
            return Err(err);
        }

        // Empty bodies decode as JSON null so callers may ask for `()` or `Value`.
        if bytes.is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}
