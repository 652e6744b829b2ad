/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/
use std::collections::HashMap;

use serde_json::{Value, json};

use crate::subscription::listener::{TopicCache, TypedSubscription};
use crate::subscription::model::Alarm;
use crate::subscription::{DataPayload, Topic};

pub(crate) fn options(instance: &str, processor: &str) -> Value {
    json!({"instance": instance, "processor": processor})
}

/// Active alarms by name. Cleared and reset alarms are dropped.
#[derive(Debug, Default)]
pub struct AlarmCache {
    alarms: HashMap<String, Alarm>,
}

impl TopicCache for AlarmCache {
    type Event = Alarm;
    const TOPIC: Topic = Topic::Alarms;

    fn apply(&mut self, payload: DataPayload) -> Option<Alarm> {
        let DataPayload::Alarm(alarm) = payload else {
            return None;
        };
        if alarm.is_cleared() {
            self.alarms.remove(&alarm.name);
        } else {
            self.alarms.insert(alarm.name.clone(), alarm.clone());
        }
        Some(alarm)
    }
}

/// Subscription to alarm notifications of one processor.
pub type AlarmSubscription = TypedSubscription<AlarmCache>;

impl AlarmSubscription {
    /// Latest state of the active alarm on `name`.
    pub fn get_alarm(&self, name: &str) -> Option<Alarm> {
        self.cache().alarms.get(name).cloned()
    }

    /// All active alarms, sorted by name.
    pub fn list_alarms(&self) -> Vec<Alarm> {
        let mut alarms: Vec<Alarm> = self.cache().alarms.values().cloned().collect();
        alarms.sort_by(|a, b| a.name.cmp(&b.name));
        alarms
    }
}
