/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/
use std::collections::HashMap;

use serde_json::{Value, json};

use crate::subscription::listener::{TopicCache, TypedSubscription};
use crate::subscription::model::{LinkEvent, LinkInfo};
use crate::subscription::{DataPayload, Topic};

pub(crate) fn options(instance: &str) -> Value {
    json!({"instance": instance})
}

/// Latest state per link name.
#[derive(Debug, Default)]
pub struct LinkCache {
    links: HashMap<String, LinkInfo>,
}

impl TopicCache for LinkCache {
    type Event = LinkEvent;
    const TOPIC: Topic = Topic::Links;

    fn apply(&mut self, payload: DataPayload) -> Option<LinkEvent> {
        let DataPayload::Link(event) = payload else {
            return None;
        };
        let name = event.link_info.name.clone();
        if event.is_unregistered() {
            self.links.remove(&name);
        } else {
            self.links.insert(name, event.link_info.clone());
        }
        Some(event)
    }
}

/// Subscription to link events of one instance.
pub type LinkSubscription = TypedSubscription<LinkCache>;

impl LinkSubscription {
    /// Latest state of the link `name`.
    pub fn get_link(&self, name: &str) -> Option<LinkInfo> {
        self.cache().links.get(name).cloned()
    }

    /// All registered links, sorted by name.
    pub fn list_links(&self) -> Vec<LinkInfo> {
        let mut links: Vec<LinkInfo> = self.cache().links.values().cloned().collect();
        links.sort_by(|a, b| a.name.cmp(&b.name));
        links
    }
}
