/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::subscription::listener::{TopicCache, TypedSubscription};
use crate::subscription::{DataPayload, Topic};

pub(crate) fn options(instance: &str, processor: Option<&str>) -> Value {
    match processor {
        Some(processor) => json!({"instance": instance, "processor": processor}),
        None => json!({"instance": instance}),
    }
}

#[derive(Debug, Default)]
pub struct TimeCache {
    time: Option<DateTime<Utc>>,
}

impl TopicCache for TimeCache {
    type Event = DateTime<Utc>;
    const TOPIC: Topic = Topic::Time;

    fn apply(&mut self, payload: DataPayload) -> Option<DateTime<Utc>> {
        let DataPayload::Time(time) = payload else {
            return None;
        };
        self.time = Some(time);
        Some(time)
    }
}

/// Subscription to the mission time of an instance or processor.
pub type TimeSubscription = TypedSubscription<TimeCache>;

impl TimeSubscription {
    /// Latest mission time received.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.cache().time
    }
}
