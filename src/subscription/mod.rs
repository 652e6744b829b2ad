/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/
mod future;
mod listener;
mod topic;

/// Domain objects decoded from subscription payloads.
pub mod model;

pub(crate) mod alarms;
pub(crate) mod commands;
pub(crate) mod cop1;
pub(crate) mod links;
pub(crate) mod parameters;
pub(crate) mod streams;
pub(crate) mod time;
pub(crate) mod transfers;

pub use alarms::{AlarmCache, AlarmSubscription};
pub use commands::{CommandHistoryCache, CommandHistorySubscription};
pub use cop1::{Cop1Cache, Cop1Subscription};
pub use future::{DoneCallback, SubscriptionFuture};
pub use links::{LinkCache, LinkSubscription};
pub use listener::{
    ChannelSubscriptionListener, SubscriptionListener, TopicCache, TypedSubscription,
    channel_callback,
};
pub use parameters::{ParameterCache, ParameterSubscription, ParameterSubscriptionOptions};
pub use streams::{StreamCache, StreamSubscription};
pub use time::{TimeCache, TimeSubscription};
pub use topic::{DataPayload, Topic};
pub use transfers::{TransferCache, TransferSubscription};
