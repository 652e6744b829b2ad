/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/

mod builder;
mod credentials;
mod implementation;
mod processor;
mod request;

/// Response types of the REST API.
pub mod model;

pub use builder::{ClientConfig, DEFAULT_REPLY_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
pub use credentials::{ApiKeyCredentials, AuthHeader, Credentials, TokenCredentials};
pub use implementation::YamcsClient;
pub use processor::ProcessorClient;
pub use request::RequestContext;
