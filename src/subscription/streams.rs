/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/
use serde_json::{Value, json};

use crate::subscription::listener::{TopicCache, TypedSubscription};
use crate::subscription::model::StreamTuple;
use crate::subscription::{DataPayload, Topic};

pub(crate) fn options(instance: &str, stream: &str) -> Value {
    json!({"instance": instance, "stream": stream})
}

#[derive(Debug, Default)]
pub struct StreamCache {
    latest: Option<StreamTuple>,
}

impl TopicCache for StreamCache {
    type Event = StreamTuple;
    const TOPIC: Topic = Topic::Stream;

    fn apply(&mut self, payload: DataPayload) -> Option<StreamTuple> {
        let DataPayload::Stream(tuple) = payload else {
            return None;
        };
        self.latest = Some(tuple.clone());
        Some(tuple)
    }
}

/// Subscription to the tuples of one stream.
pub type StreamSubscription = TypedSubscription<StreamCache>;

impl StreamSubscription {
    /// Most recent tuple received.
    pub fn latest(&self) -> Option<StreamTuple> {
        self.cache().latest.clone()
    }
}
