/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/
use std::collections::HashMap;

use serde_json::{Value, json};

use crate::subscription::listener::{TopicCache, TypedSubscription};
use crate::subscription::model::Transfer;
use crate::subscription::{DataPayload, Topic};

pub(crate) fn options(instance: &str, service: &str) -> Value {
    json!({"instance": instance, "serviceName": service})
}

/// Latest progress per transfer id.
#[derive(Debug, Default)]
pub struct TransferCache {
    transfers: HashMap<i64, Transfer>,
}

impl TopicCache for TransferCache {
    type Event = Transfer;
    const TOPIC: Topic = Topic::FileTransfers;

    fn apply(&mut self, payload: DataPayload) -> Option<Transfer> {
        let DataPayload::Transfer(transfer) = payload else {
            return None;
        };
        self.transfers.insert(transfer.id, transfer.clone());
        Some(transfer)
    }
}

/// Subscription to the file transfers of one file transfer service.
pub type TransferSubscription = TypedSubscription<TransferCache>;

impl TransferSubscription {
    /// Latest progress of transfer `id`.
    pub fn get_transfer(&self, id: i64) -> Option<Transfer> {
        self.cache().transfers.get(&id).cloned()
    }

    /// Every transfer seen so far, by ascending id.
    pub fn list_transfers(&self) -> Vec<Transfer> {
        let mut transfers: Vec<Transfer> = self.cache().transfers.values().cloned().collect();
        transfers.sort_by_key(|t| t.id);
        transfers
    }
}
