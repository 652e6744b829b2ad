/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/
use serde_json::{Value, json};

use crate::subscription::listener::{TopicCache, TypedSubscription};
use crate::subscription::model::Cop1Status;
use crate::subscription::{DataPayload, Topic};

pub(crate) fn options(instance: &str, link: &str) -> Value {
    json!({"instance": instance, "link": link})
}

#[derive(Debug, Default)]
pub struct Cop1Cache {
    status: Option<Cop1Status>,
}

impl TopicCache for Cop1Cache {
    type Event = Cop1Status;
    const TOPIC: Topic = Topic::Cop1;

    fn apply(&mut self, payload: DataPayload) -> Option<Cop1Status> {
        let DataPayload::Cop1(status) = payload else {
            return None;
        };
        self.status = Some(status.clone());
        Some(status)
    }
}

/// Subscription to the COP-1 status of one uplink.
pub type Cop1Subscription = TypedSubscription<Cop1Cache>;

impl Cop1Subscription {
    /// Latest COP-1 status received.
    pub fn status(&self) -> Option<Cop1Status> {
        self.cache().status.clone()
    }
}
