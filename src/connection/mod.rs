/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/

//! Endpoints, wire envelopes and the WebSocket subscription manager.

mod details;
mod envelope;
mod management;

pub use self::details::{ConnectionDetails, SUBPROTOCOL};
pub use self::envelope::{ClientMessage, ExceptionMessage, REPLY_TYPE, Reply, ServerMessage};
pub use self::management::{
    CloseCallback, DataCallback, ResponseCallback, WebSocketSubscriptionManager,
};
