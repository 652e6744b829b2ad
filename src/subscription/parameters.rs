/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/

//! Parameter subscriptions.
//!
//! The server sends each parameter's full name only once, in a `mapping` from numeric id
//! to identifier, and then refers to it by numeric id. The cache keeps that mapping for
//! the lifetime of the connection and resolves every value to its name before it is
//! stored or delivered.

use std::collections::HashMap;

use serde_json::{Value, json};
use tracing::warn;

use crate::subscription::listener::{TopicCache, TypedSubscription};
use crate::subscription::model::{NamedObjectId, ParameterData, ParameterValue};
use crate::subscription::{DataPayload, Topic};
use crate::utils::{YamcsError, write};

/// Subscribe flags for parameter subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSubscriptionOptions {
    /// Reject the whole subscription if any identifier is unknown.
    pub abort_on_invalid: bool,
    /// Also notify when a value expires.
    pub update_on_expiration: bool,
    /// Send the last known value of each parameter right away.
    pub send_from_cache: bool,
}

impl Default for ParameterSubscriptionOptions {
    fn default() -> Self {
        Self {
            abort_on_invalid: true,
            update_on_expiration: false,
            send_from_cache: true,
        }
    }
}

impl ParameterSubscriptionOptions {
    /// Sets whether an unknown identifier rejects the subscription.
    #[must_use]
    pub fn abort_on_invalid(mut self, abort: bool) -> Self {
        self.abort_on_invalid = abort;
        self
    }

    /// Sets whether expirations are notified.
    #[must_use]
    pub fn update_on_expiration(mut self, update: bool) -> Self {
        self.update_on_expiration = update;
        self
    }

    /// Sets whether cached values are sent on subscribe.
    #[must_use]
    pub fn send_from_cache(mut self, send: bool) -> Self {
        self.send_from_cache = send;
        self
    }

    pub(crate) fn to_options(&self, instance: &str, processor: &str, names: &[&str]) -> Value {
        json!({
            "instance": instance,
            "processor": processor,
            "id": ids(names),
            "abortOnInvalid": self.abort_on_invalid,
            "updateOnExpiration": self.update_on_expiration,
            "sendFromCache": self.send_from_cache,
            "action": "REPLACE",
        })
    }
}

fn ids(names: &[&str]) -> Vec<NamedObjectId> {
    names.iter().map(|name| NamedObjectId::qualified(*name)).collect()
}

/// Latest value per parameter, plus the numeric id mapping.
#[derive(Debug, Default)]
pub struct ParameterCache {
    names: HashMap<u32, String>,
    values: HashMap<String, ParameterValue>,
}

impl TopicCache for ParameterCache {
    type Event = ParameterData;
    const TOPIC: Topic = Topic::Parameters;

    fn apply(&mut self, payload: DataPayload) -> Option<ParameterData> {
        let DataPayload::Parameters(batch) = payload else {
            return None;
        };
        for (numeric_id, id) in batch.mapping {
            self.names.insert(numeric_id, id.key());
        }
        if !batch.invalid.is_empty() {
            let invalid: Vec<String> = batch.invalid.iter().map(NamedObjectId::key).collect();
            warn!("Server rejected parameter identifiers: {}", invalid.join(", "));
        }

        let mut parameters = Vec::with_capacity(batch.values.len());
        for (numeric_id, mut value) in batch.values {
            if let Some(name) = numeric_id.and_then(|id| self.names.get(&id)) {
                value.name = name.clone();
            }
            if value.name.is_empty() {
                match numeric_id {
                    Some(id) => warn!("Value for unmapped numeric id {}", id),
                    None => warn!("Value without an identifier"),
                }
                continue;
            }
            self.values.insert(value.name.clone(), value.clone());
            parameters.push(value);
        }

        if parameters.is_empty() {
            None
        } else {
            Some(ParameterData { parameters })
        }
    }
}

/// Subscription to parameter updates of one processor.
pub type ParameterSubscription = TypedSubscription<ParameterCache>;

impl ParameterSubscription {
    /// Latest value of `name`, or `None` if no value for it arrived yet.
    pub fn get_value(&self, name: &str) -> Option<ParameterValue> {
        self.cache().values.get(name).cloned()
    }

    /// Latest value of every parameter seen so far, by name.
    pub fn values(&self) -> HashMap<String, ParameterValue> {
        self.cache().values.clone()
    }

    /// Adds parameters to this subscription.
    ///
    /// # Errors
    ///
    /// Returns [`YamcsError::ConnectionFailure`] if the subscription is closed.
    /// A rejection by the server is logged and does not end the subscription.
    pub fn add(&self, names: &[&str]) -> Result<(), YamcsError> {
        if names.is_empty() {
            return Ok(());
        }
        let options = self.options_with(json!({"id": ids(names), "action": "ADD"}));
        self.manager().send(Some(options))
    }

    /// Removes parameters from this subscription and forgets their cached values.
    ///
    /// # Errors
    ///
    /// Returns [`YamcsError::ConnectionFailure`] if the subscription is closed.
    pub fn remove(&self, names: &[&str]) -> Result<(), YamcsError> {
        if names.is_empty() {
            return Ok(());
        }
        let options = self.options_with(json!({"id": ids(names), "action": "REMOVE"}));
        self.manager().send(Some(options))?;
        let mut cache = write(self.cache_lock());
        for name in names {
            cache.values.remove(*name);
        }
        Ok(())
    }
}
