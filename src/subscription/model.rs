/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/

//! Domain objects decoded from subscription payloads.
//!
//! Wire messages use camelCase JSON with 64-bit integers encoded as strings. Each type
//! here is decoded once, at the dispatch site, and optional wire fields stay `Option`
//! instead of being probed for presence by callers.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

use crate::utils::{YamcsError, parse_timestamp, to_isostring};

/// Accepts both JSON numbers and the string encoding used for 64-bit integers.
pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| serde::de::Error::custom(format!("not an integer: {n}"))),
        Value::String(s) => s.parse().map_err(serde::de::Error::custom),
        Value::Null => Ok(0),
        other => Err(serde::de::Error::custom(format!("not an integer: {other}"))),
    }
}

pub(crate) fn lenient_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(text) => parse_timestamp(&text)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {text}"))),
        None => Ok(None),
    }
}

/// Qualified identifier of a parameter, alarm or other named object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedObjectId {
    /// Name, usually fully qualified (`/YSS/SIMULATOR/BatteryVoltage1`).
    pub name: String,
    /// Namespace for aliases; `None` for qualified names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl NamedObjectId {
    /// Identifier for a fully qualified name.
    pub fn qualified(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    /// Key used in caches: the name alone for qualified names, `namespace/name` otherwise.
    pub fn key(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}/{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// A decoded engineering or raw value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// `FLOAT` and `DOUBLE`.
    Float(f64),
    /// `SINT32` and `SINT64`.
    Integer(i64),
    /// `UINT32` and `UINT64`.
    Unsigned(u64),
    /// `BOOLEAN`.
    Boolean(bool),
    /// `STRING`.
    String(String),
    /// `ENUMERATED`, by label.
    Enumerated(String),
    /// `BINARY`, base64 as sent by the server.
    Binary(String),
    /// `TIMESTAMP`.
    Timestamp(DateTime<Utc>),
    /// `AGGREGATE`, member name to value.
    Aggregate(BTreeMap<String, ParamValue>),
    /// `ARRAY`.
    Array(Vec<ParamValue>),
    /// `NONE`.
    None,
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::String(v) | Self::Enumerated(v) | Self::Binary(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Aggregate(members) => {
                write!(f, "{{")?;
                for (i, (k, v)) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Self::None => write!(f, "None"),
        }
    }
}

impl ParamValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            Self::Unsigned(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Decodes the typed JSON form `{"type": "SINT32", "sint32Value": 42}`.
    ///
    /// # Errors
    ///
    /// Returns [`YamcsError::Decode`] for unknown types or missing value fields.
    pub fn from_wire(value: &Value) -> Result<Self, YamcsError> {
        let value_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| YamcsError::Decode(format!("value without type: {value}")))?;
        let field = |name: &str| {
            value
                .get(name)
                .ok_or_else(|| YamcsError::Decode(format!("{value_type} value without {name}")))
        };

        Ok(match value_type {
            "FLOAT" => Self::Float(as_float(field("floatValue")?)?),
            "DOUBLE" => Self::Float(as_float(field("doubleValue")?)?),
            "SINT32" => Self::Integer(as_int(field("sint32Value")?)?),
            "SINT64" => Self::Integer(as_int(field("sint64Value")?)?),
            "UINT32" => Self::Unsigned(as_uint(field("uint32Value")?)?),
            "UINT64" => Self::Unsigned(as_uint(field("uint64Value")?)?),
            "BOOLEAN" => Self::Boolean(field("booleanValue")?.as_bool().unwrap_or(false)),
            "STRING" => Self::String(as_string(field("stringValue")?)?),
            "ENUMERATED" => Self::Enumerated(as_string(field("stringValue")?)?),
            "BINARY" => Self::Binary(as_string(field("binaryValue")?)?),
            "TIMESTAMP" => {
                let text = value
                    .get("stringValue")
                    .or_else(|| value.get("timestampValue"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| YamcsError::Decode("TIMESTAMP value without time".to_string()))?;
                Self::Timestamp(
                    parse_timestamp(text)
                        .ok_or_else(|| YamcsError::Decode(format!("invalid timestamp: {text}")))?,
                )
            }
            "AGGREGATE" => {
                let aggregate = field("aggregateValue")?;
                let names = aggregate.get("name").and_then(Value::as_array);
                let values = aggregate.get("value").and_then(Value::as_array);
                let mut members = BTreeMap::new();
                if let (Some(names), Some(values)) = (names, values) {
                    for (name, member) in names.iter().zip(values) {
                        members.insert(as_string(name)?, Self::from_wire(member)?);
                    }
                }
                Self::Aggregate(members)
            }
            "ARRAY" => {
                let items = value
                    .get("arrayValue")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().map(Self::from_wire).collect::<Result<Vec<_>, _>>())
                    .transpose()?
                    .unwrap_or_default();
                Self::Array(items)
            }
            "NONE" => Self::None,
            other => return Err(YamcsError::Decode(format!("unsupported value type {other}"))),
        })
    }
}

impl ParamValue {
    /// Encodes the value in the typed JSON form the server accepts.
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Float(v) => json!({"type": "DOUBLE", "doubleValue": v}),
            Self::Integer(v) => json!({"type": "SINT64", "sint64Value": v.to_string()}),
            Self::Unsigned(v) => json!({"type": "UINT64", "uint64Value": v.to_string()}),
            Self::Boolean(v) => json!({"type": "BOOLEAN", "booleanValue": v}),
            Self::String(v) => json!({"type": "STRING", "stringValue": v}),
            Self::Enumerated(v) => json!({"type": "ENUMERATED", "stringValue": v}),
            Self::Binary(v) => json!({"type": "BINARY", "binaryValue": v}),
            Self::Timestamp(v) => json!({"type": "TIMESTAMP", "stringValue": to_isostring(v)}),
            Self::Aggregate(members) => {
                let names: Vec<&String> = members.keys().collect();
                let values: Vec<Value> = members.values().map(Self::to_wire).collect();
                json!({"type": "AGGREGATE", "aggregateValue": {"name": names, "value": values}})
            }
            Self::Array(items) => {
                let items: Vec<Value> = items.iter().map(Self::to_wire).collect();
                json!({"type": "ARRAY", "arrayValue": items})
            }
            Self::None => json!({"type": "NONE"}),
        }
    }
}

fn as_float(v: &Value) -> Result<f64, YamcsError> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => s.parse().ok(),
        },
        _ => None,
    }
    .ok_or_else(|| YamcsError::Decode(format!("not a float: {v}")))
}

fn as_int(v: &Value) -> Result<i64, YamcsError> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| YamcsError::Decode(format!("not an integer: {v}")))
}

fn as_uint(v: &Value) -> Result<u64, YamcsError> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| YamcsError::Decode(format!("not an unsigned integer: {v}")))
}

fn as_string(v: &Value) -> Result<String, YamcsError> {
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| YamcsError::Decode(format!("not a string: {v}")))
}

fn optional_value(v: Option<&Value>) -> Result<Option<ParamValue>, YamcsError> {
    v.filter(|v| !v.is_null()).map(ParamValue::from_wire).transpose()
}

/// Latest known value of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterValue {
    /// Qualified name, resolved from the subscription's numeric id mapping.
    pub name: String,
    /// Engineering value.
    pub eng_value: Option<ParamValue>,
    /// Raw value, if the parameter has a calibration.
    pub raw_value: Option<ParamValue>,
    /// Time the value was generated on board.
    pub generation_time: Option<DateTime<Utc>>,
    /// Time the value was received.
    pub acquisition_time: Option<DateTime<Utc>>,
    /// `ACQUIRED`, `NOT_RECEIVED`, `INVALID` or `EXPIRED`.
    pub acquisition_status: Option<String>,
    /// Outcome of limit checking, e.g. `IN_LIMITS`, `WARNING`, `CRITICAL`.
    pub monitoring_result: Option<String>,
}

impl ParameterValue {
    pub(crate) fn from_wire(value: &Value) -> Result<(Option<u32>, Self), YamcsError> {
        let text = |field: &str| value.get(field).and_then(Value::as_str).map(str::to_string);
        let time = |field: &str| value.get(field).and_then(Value::as_str).and_then(parse_timestamp);

        let numeric_id = value
            .get("numericId")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok());
        let name = value
            .get("id")
            .and_then(|id| serde_json::from_value::<NamedObjectId>(id.clone()).ok())
            .map(|id| id.key())
            .unwrap_or_default();

        Ok((
            numeric_id,
            Self {
                name,
                eng_value: optional_value(value.get("engValue"))?,
                raw_value: optional_value(value.get("rawValue"))?,
                generation_time: time("generationTime"),
                acquisition_time: time("acquisitionTime"),
                acquisition_status: text("acquisitionStatus"),
                monitoring_result: text("monitoringResult"),
            },
        ))
    }
}

/// One `parameters` data message, before numeric ids are resolved to names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterBatch {
    /// Numeric ids newly assigned by the server, to be remembered for later messages.
    pub mapping: HashMap<u32, NamedObjectId>,
    /// Identifiers the server could not resolve.
    pub invalid: Vec<NamedObjectId>,
    /// Values keyed by numeric id (`None` when the server sent a named id instead).
    pub values: Vec<(Option<u32>, ParameterValue)>,
}

impl ParameterBatch {
    pub(crate) fn from_wire(data: Value) -> Result<Self, YamcsError> {
        let mapping = match data.get("mapping") {
            Some(m) if !m.is_null() => serde_json::from_value(m.clone())?,
            _ => HashMap::new(),
        };
        let invalid = match data.get("invalid") {
            Some(i) if !i.is_null() => serde_json::from_value(i.clone())?,
            _ => Vec::new(),
        };
        let values = data
            .get("values")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(ParameterValue::from_wire).collect::<Result<Vec<_>, _>>())
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            mapping,
            invalid,
            values,
        })
    }
}

/// Parameter values delivered to callbacks, with names resolved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterData {
    /// Updated values, in the order the server sent them.
    pub parameters: Vec<ParameterValue>,
}

impl ParameterData {
    /// Value for `name` within this delivery.
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAcknowledgeInfo {
    #[serde(default)]
    acknowledged_by: Option<String>,
    #[serde(default)]
    acknowledge_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAlarm {
    #[serde(default, rename = "type")]
    alarm_type: Option<String>,
    id: NamedObjectId,
    #[serde(default)]
    seq_num: u32,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default, deserialize_with = "lenient_time")]
    trigger_time: Option<DateTime<Utc>>,
    #[serde(default)]
    notification_type: Option<String>,
    #[serde(default)]
    violations: u32,
    #[serde(default)]
    count: u32,
    #[serde(default)]
    acknowledged: bool,
    #[serde(default)]
    acknowledge_info: Option<WireAcknowledgeInfo>,
    #[serde(default)]
    shelve_info: Option<Value>,
    #[serde(default, rename = "processOK")]
    process_ok: bool,
    #[serde(default)]
    triggered: bool,
    #[serde(default)]
    latching: bool,
}

/// State of an alarm as last notified by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Alarm {
    /// Name of the alarmed parameter or event source.
    pub name: String,
    /// `PARAMETER` or `EVENT`.
    pub alarm_type: Option<String>,
    /// Distinguishes successive alarms on the same name.
    pub sequence_number: u32,
    /// Highest severity reached.
    pub severity: Option<String>,
    /// When the alarm was first triggered.
    pub trigger_time: Option<DateTime<Utc>>,
    /// What caused this notification, e.g. `TRIGGERED`, `ACKNOWLEDGED`, `CLEARED`.
    pub notification_type: Option<String>,
    /// Number of violating samples.
    pub violation_count: u32,
    /// Total number of samples.
    pub count: u32,
    /// Whether an operator acknowledged the alarm.
    pub acknowledged: bool,
    /// Who acknowledged the alarm.
    pub acknowledged_by: Option<String>,
    /// Message left on acknowledgment.
    pub acknowledge_message: Option<String>,
    /// Whether the alarm is shelved.
    pub shelved: bool,
    /// Whether the underlying process returned to normal.
    pub process_ok: bool,
    /// Whether the alarm is still triggered.
    pub triggered: bool,
    /// Whether the alarm latches until reset.
    pub latching: bool,
}

impl Alarm {
    /// Returns `true` once the server reports that the alarm is gone.
    pub fn is_cleared(&self) -> bool {
        matches!(self.notification_type.as_deref(), Some("CLEARED") | Some("RESET"))
    }
}

impl From<WireAlarm> for Alarm {
    fn from(w: WireAlarm) -> Self {
        let ack = w.acknowledge_info.unwrap_or_default();
        Self {
            name: w.id.key(),
            alarm_type: w.alarm_type,
            sequence_number: w.seq_num,
            severity: w.severity,
            trigger_time: w.trigger_time,
            notification_type: w.notification_type,
            violation_count: w.violations,
            count: w.count,
            acknowledged: w.acknowledged,
            acknowledged_by: ack.acknowledged_by,
            acknowledge_message: ack.acknowledge_message,
            shelved: w.shelve_info.is_some_and(|s| !s.is_null()),
            process_ok: w.process_ok,
            triggered: w.triggered,
            latching: w.latching,
        }
    }
}

impl Alarm {
    pub(crate) fn from_wire(data: Value) -> Result<Self, YamcsError> {
        Ok(serde_json::from_value::<WireAlarm>(data)?.into())
    }
}

/// One command history update: a new command or new attributes of a known one.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandHistoryEntry {
    /// Unique command id.
    pub id: String,
    /// Qualified command name, when the update carries it.
    pub name: Option<String>,
    /// Origin of the command (e.g. the issuing host).
    pub origin: Option<String>,
    /// Sequence number at the origin.
    pub sequence_number: Option<i64>,
    /// Time the command was issued.
    pub generation_time: Option<DateTime<Utc>>,
    /// Attributes carried by this update.
    pub attributes: Vec<(String, ParamValue)>,
}

impl CommandHistoryEntry {
    pub(crate) fn from_wire(data: Value) -> Result<Self, YamcsError> {
        let text = |field: &str| data.get(field).and_then(Value::as_str).map(str::to_string);
        let id = text("id").ok_or_else(|| YamcsError::Decode("command without id".to_string()))?;
        let mut attributes = Vec::new();
        if let Some(attrs) = data.get("attr").and_then(Value::as_array) {
            for attr in attrs {
                let name = attr
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| YamcsError::Decode("attribute without name".to_string()))?;
                if let Some(value) = optional_value(attr.get("value"))? {
                    attributes.push((name.to_string(), value));
                }
            }
        }
        Ok(Self {
            name: text("commandName"),
            origin: text("origin"),
            sequence_number: data.get("sequenceNumber").and_then(|v| as_int(v).ok()),
            generation_time: text("generationTime").as_deref().and_then(parse_timestamp),
            attributes,
            id,
        })
    }
}

/// Accumulated history of a single command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandHistory {
    /// Unique command id.
    pub id: String,
    /// Qualified command name.
    pub name: Option<String>,
    /// Origin of the command.
    pub origin: Option<String>,
    /// Sequence number at the origin.
    pub sequence_number: Option<i64>,
    /// Time the command was issued.
    pub generation_time: Option<DateTime<Utc>>,
    /// Latest value of every attribute seen so far.
    pub attributes: BTreeMap<String, ParamValue>,
}

impl CommandHistory {
    /// Merges an update into this history. Later attribute values win.
    pub fn merge(&mut self, entry: &CommandHistoryEntry) {
        if self.id.is_empty() {
            self.id = entry.id.clone();
        }
        if entry.name.is_some() {
            self.name = entry.name.clone();
        }
        if entry.origin.is_some() {
            self.origin = entry.origin.clone();
        }
        if entry.sequence_number.is_some() {
            self.sequence_number = entry.sequence_number;
        }
        if entry.generation_time.is_some() {
            self.generation_time = entry.generation_time;
        }
        for (name, value) in &entry.attributes {
            self.attributes.insert(name.clone(), value.clone());
        }
    }

    /// Status of a named acknowledgment, e.g. `Acknowledge_Queued` → `OK`.
    pub fn acknowledgment(&self, name: &str) -> Option<&ParamValue> {
        self.attributes.get(&format!("{name}_Status"))
    }

    /// Whether the command reached a final completion status.
    pub fn is_complete(&self) -> bool {
        self.acknowledgment("CommandComplete").is_some()
    }

    /// Whether the command completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(
            self.acknowledgment("CommandComplete"),
            Some(ParamValue::String(s)) | Some(ParamValue::Enumerated(s)) if s == "OK"
        )
    }
}

/// State of a data link.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkInfo {
    /// Instance the link belongs to.
    #[serde(default)]
    pub instance: String,
    /// Link name.
    pub name: String,
    /// Implementation class.
    #[serde(default, rename = "type")]
    pub link_type: Option<String>,
    /// Whether the link was disabled by an operator.
    #[serde(default)]
    pub disabled: bool,
    /// `OK`, `UNAVAIL`, `DISABLED` or `FAILED`.
    #[serde(default)]
    pub status: Option<String>,
    /// Frames or packets received.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub data_in_count: i64,
    /// Frames or packets sent.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub data_out_count: i64,
    /// Free-form status detail.
    #[serde(default)]
    pub detailed_status: Option<String>,
    /// Parent link for sub-links.
    #[serde(default)]
    pub parent_name: Option<String>,
}

/// A change in the set or state of links.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEvent {
    /// `REGISTERED`, `UNREGISTERED` or `UPDATED`.
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    /// State of the link after the event.
    pub link_info: LinkInfo,
}

impl LinkEvent {
    /// Whether the link no longer exists after this event.
    pub fn is_unregistered(&self) -> bool {
        self.event_type.as_deref() == Some("UNREGISTERED")
    }
}

/// COP-1 state of an uplink.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cop1Status {
    /// Name of the link.
    #[serde(default)]
    pub link: String,
    /// Whether COP-1 is active (as opposed to bypass).
    #[serde(default)]
    pub cop1_active: bool,
    /// Whether BD frames are forced.
    #[serde(default)]
    pub set_bypass_all: bool,
    /// FOP state, e.g. `ACTIVE`, `RETRANSMIT_WITHOUT_WAIT`, `INITIAL`.
    #[serde(default)]
    pub state: Option<String>,
    /// Transmitter frame sequence number V(S).
    #[serde(default, rename = "vS")]
    pub v_s: u32,
    /// Expected acknowledgment frame sequence number NN(R).
    #[serde(default, rename = "nnR")]
    pub nn_r: u32,
    /// Commands waiting for transmission.
    #[serde(default, rename = "waitQueueNumTC")]
    pub wait_queue_count: u32,
    /// Frames sent and not yet acknowledged.
    #[serde(default, rename = "sentQueueNumFrames")]
    pub sent_queue_count: u32,
    /// Frames queued for the lower layer.
    #[serde(default, rename = "outQueueNumFrames")]
    pub out_queue_count: u32,
    /// Number of transmissions of the oldest unacknowledged frame.
    #[serde(default)]
    pub tx_count: u32,
}

/// Progress of a file transfer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    /// Transfer id.
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    /// `QUEUED`, `RUNNING`, `PAUSED`, `CANCELLING`, `COMPLETED` or `FAILED`.
    #[serde(default)]
    pub state: Option<String>,
    /// `UPLOAD` or `DOWNLOAD`.
    #[serde(default)]
    pub direction: Option<String>,
    /// Local bucket.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Local object name.
    #[serde(default)]
    pub object_name: Option<String>,
    /// Path on the remote entity.
    #[serde(default)]
    pub remote_path: Option<String>,
    /// Total size in bytes.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_size: i64,
    /// Bytes transferred so far.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub size_transferred: i64,
    /// Whether the transfer uses acknowledged mode.
    #[serde(default)]
    pub reliable: bool,
    /// Reason of failure, if failed.
    #[serde(default)]
    pub failure_reason: Option<String>,
    /// When the transfer started.
    #[serde(default, deserialize_with = "lenient_time")]
    pub start_time: Option<DateTime<Utc>>,
}

impl Transfer {
    /// Whether the transfer reached a final state.
    pub fn is_complete(&self) -> bool {
        matches!(self.state.as_deref(), Some("COMPLETED") | Some("FAILED"))
    }

    /// Whether the transfer completed successfully.
    pub fn is_success(&self) -> bool {
        self.state.as_deref() == Some("COMPLETED")
    }
}

/// One tuple emitted on a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamTuple {
    /// Name of the stream.
    pub stream: String,
    /// Column values, in stream order.
    pub columns: Vec<(String, ParamValue)>,
}

impl StreamTuple {
    /// Value of a column by name.
    pub fn get(&self, column: &str) -> Option<&ParamValue> {
        self.columns.iter().find(|(n, _)| n == column).map(|(_, v)| v)
    }

    pub(crate) fn from_wire(data: Value) -> Result<Self, YamcsError> {
        let stream = data
            .get("stream")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mut columns = Vec::new();
        if let Some(cols) = data.get("column").and_then(Value::as_array) {
            for col in cols {
                let name = col
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| YamcsError::Decode("column without name".to_string()))?;
                let value = optional_value(col.get("value"))?.unwrap_or(ParamValue::None);
                columns.push((name.to_string(), value));
            }
        }
        Ok(Self { stream, columns })
    }
}
