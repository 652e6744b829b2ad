/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::subscription::model::{
    Alarm, CommandHistoryEntry, Cop1Status, LinkEvent, ParameterBatch, StreamTuple, Transfer,
};
use crate::utils::{YamcsError, parse_timestamp};

/// Topics a subscription manager can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Parameter value updates of one processor.
    Parameters,
    /// Alarm notifications of one processor.
    Alarms,
    /// Command history updates of one processor.
    Commands,
    /// Link registration and state changes of one instance.
    Links,
    /// Mission time of one processor.
    Time,
    /// COP-1 status of one uplink.
    Cop1,
    /// Progress of file transfers.
    FileTransfers,
    /// Tuples emitted on a stream.
    Stream,
}

impl Topic {
    /// Name used in the `type` field of envelopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Parameters => "parameters",
            Topic::Alarms => "alarms",
            Topic::Commands => "commands",
            Topic::Links => "links",
            Topic::Time => "time",
            Topic::Cop1 => "cop1",
            Topic::FileTransfers => "file-transfers",
            Topic::Stream => "stream",
        }
    }

    /// Decodes the payload of a data message received on this topic.
    ///
    /// # Errors
    ///
    /// Returns [`YamcsError::Decode`] if the payload does not have this topic's shape.
    pub fn decode(&self, data: Value) -> Result<DataPayload, YamcsError> {
        Ok(match self {
            Topic::Parameters => DataPayload::Parameters(ParameterBatch::from_wire(data)?),
            Topic::Alarms => DataPayload::Alarm(Alarm::from_wire(data)?),
            Topic::Commands => DataPayload::Command(CommandHistoryEntry::from_wire(data)?),
            Topic::Links => DataPayload::Link(serde_json::from_value(data)?),
            Topic::Time => DataPayload::Time(decode_time(&data)?),
            Topic::Cop1 => DataPayload::Cop1(serde_json::from_value(data)?),
            Topic::FileTransfers => DataPayload::Transfer(serde_json::from_value(data)?),
            Topic::Stream => DataPayload::Stream(StreamTuple::from_wire(data)?),
        })
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = YamcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parameters" => Ok(Topic::Parameters),
            "alarms" => Ok(Topic::Alarms),
            "commands" => Ok(Topic::Commands),
            "links" => Ok(Topic::Links),
            "time" => Ok(Topic::Time),
            "cop1" => Ok(Topic::Cop1),
            "file-transfers" => Ok(Topic::FileTransfers),
            "stream" => Ok(Topic::Stream),
            other => Err(YamcsError::Configuration(format!("Unknown topic '{other}'"))),
        }
    }
}

/// The payload of one data message, resolved from the subscribed topic.
#[derive(Debug, Clone, PartialEq)]
pub enum DataPayload {
    /// Parameter values with numeric ids still unresolved.
    Parameters(ParameterBatch),
    /// One alarm notification.
    Alarm(Alarm),
    /// One command history update.
    Command(CommandHistoryEntry),
    /// One link event.
    Link(LinkEvent),
    /// Current mission time.
    Time(DateTime<Utc>),
    /// COP-1 status.
    Cop1(Cop1Status),
    /// File transfer progress.
    Transfer(Transfer),
    /// One stream tuple.
    Stream(StreamTuple),
}

impl DataPayload {
    /// Topic this payload belongs to.
    pub fn topic(&self) -> Topic {
        match self {
            DataPayload::Parameters(_) => Topic::Parameters,
            DataPayload::Alarm(_) => Topic::Alarms,
            DataPayload::Command(_) => Topic::Commands,
            DataPayload::Link(_) => Topic::Links,
            DataPayload::Time(_) => Topic::Time,
            DataPayload::Cop1(_) => Topic::Cop1,
            DataPayload::Transfer(_) => Topic::FileTransfers,
            DataPayload::Stream(_) => Topic::Stream,
        }
    }
}

// Time arrives either as a bare timestamp or wrapped as `{"value": ...}`.
fn decode_time(data: &Value) -> Result<DateTime<Utc>, YamcsError> {
    let text = data
        .as_str()
        .or_else(|| data.get("value").and_then(Value::as_str))
        .ok_or_else(|| YamcsError::Decode(format!("time payload without value: {data}")))?;
    parse_timestamp(text).ok_or_else(|| YamcsError::Decode(format!("invalid timestamp: {text}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_topic_names() {
        for topic in [
            Topic::Parameters,
            Topic::Alarms,
            Topic::Commands,
            Topic::Links,
            Topic::Time,
            Topic::Cop1,
            Topic::FileTransfers,
            Topic::Stream,
        ] {
            assert_eq!(topic.as_str().parse::<Topic>().unwrap(), topic);
        }
        assert!("events".parse::<Topic>().is_err());
        assert_eq!(Topic::FileTransfers.to_string(), "file-transfers");
    }

    #[test]
    fn test_decode_time_forms() {
        let bare = Topic::Time.decode(json!("2026-10-14T09:00:00Z")).unwrap();
        let wrapped = Topic::Time
            .decode(json!({"value": "2026-10-14T09:00:00Z"}))
            .unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(bare.topic(), Topic::Time);
    }

    #[test]
    fn test_decode_shape_mismatch() {
        let err = Topic::Links.decode(json!({"unexpected": true})).unwrap_err();
        assert!(matches!(err, YamcsError::Decode(_)));
        let err = Topic::Time.decode(json!(42)).unwrap_err();
        assert!(matches!(err, YamcsError::Decode(_)));
    }

    #[test]
    fn test_decode_cop1() {
        let payload = Topic::Cop1
            .decode(json!({"link": "UDP_FRAME_OUT", "cop1Active": true, "state": "ACTIVE", "vS": 3}))
            .unwrap();
        match payload {
            DataPayload::Cop1(status) => {
                assert_eq!(status.link, "UDP_FRAME_OUT");
                assert!(status.cop1_active);
                assert_eq!(status.v_s, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
