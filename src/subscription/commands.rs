/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/
use std::collections::HashMap;

use serde_json::{Value, json};

use crate::subscription::listener::{TopicCache, TypedSubscription};
use crate::subscription::model::CommandHistory;
use crate::subscription::{DataPayload, Topic};

pub(crate) fn options(instance: &str, processor: &str, ignore_past_commands: bool) -> Value {
    json!({
        "instance": instance,
        "processor": processor,
        "ignorePastCommands": ignore_past_commands,
    })
}

/// Merged history per command id.
#[derive(Debug, Default)]
pub struct CommandHistoryCache {
    commands: HashMap<String, CommandHistory>,
}

impl TopicCache for CommandHistoryCache {
    type Event = CommandHistory;
    const TOPIC: Topic = Topic::Commands;

    fn apply(&mut self, payload: DataPayload) -> Option<CommandHistory> {
        let DataPayload::Command(entry) = payload else {
            return None;
        };
        let history = self.commands.entry(entry.id.clone()).or_default();
        history.merge(&entry);
        Some(history.clone())
    }
}

/// Subscription to command history updates of one processor.
pub type CommandHistorySubscription = TypedSubscription<CommandHistoryCache>;

impl CommandHistorySubscription {
    /// Everything known so far about the command with `id`.
    pub fn get_command_history(&self, id: &str) -> Option<CommandHistory> {
        self.cache().commands.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::model::{CommandHistoryEntry, ParamValue};

    fn entry(id: &str, attr: &str, value: &str) -> DataPayload {
        DataPayload::Command(CommandHistoryEntry {
            id: id.to_string(),
            name: None,
            origin: None,
            sequence_number: None,
            generation_time: None,
            attributes: vec![(attr.to_string(), ParamValue::String(value.to_string()))],
        })
    }

    #[test]
    fn test_updates_merge_per_command() {
        let mut cache = CommandHistoryCache::default();
        cache.apply(entry("c1", "Acknowledge_Queued_Status", "OK"));
        cache.apply(entry("c2", "Acknowledge_Queued_Status", "NOK"));
        let merged = cache.apply(entry("c1", "CommandComplete_Status", "OK")).unwrap();

        assert_eq!(merged.attributes.len(), 2);
        assert!(merged.is_success());
        assert_eq!(cache.commands["c2"].attributes.len(), 1);
        assert!(!cache.commands.contains_key("c3"));
    }
}
