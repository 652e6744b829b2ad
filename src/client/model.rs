/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::subscription::model::{LinkInfo, lenient_time};

/// General information about the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    /// Server version, e.g. `5.10.2`.
    pub yamcs_version: String,
    /// Source revision the server was built from.
    #[serde(default)]
    pub revision: Option<String>,
    /// Identifier of the server.
    #[serde(default)]
    pub server_id: Option<String>,
    /// Instance clients should use when none is specified.
    #[serde(default)]
    pub default_yamcs_instance: Option<String>,
}

/// A processor running in an instance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorInfo {
    /// Instance the processor belongs to.
    #[serde(default)]
    pub instance: String,
    /// Processor name, e.g. `realtime`.
    pub name: String,
    /// Processor type, e.g. `realtime` or `Archive`.
    #[serde(default, rename = "type")]
    pub processor_type: Option<String>,
    /// Service state, e.g. `RUNNING`.
    #[serde(default)]
    pub state: Option<String>,
    /// Whether the processor replays archived data.
    #[serde(default)]
    pub replay: bool,
    /// Whether the processor persists across client sessions.
    #[serde(default)]
    pub persistent: bool,
}

/// An instance hosted by the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceInfo {
    /// Instance name.
    pub name: String,
    /// Service state, e.g. `RUNNING` or `OFFLINE`.
    #[serde(default)]
    pub state: Option<String>,
    /// Current mission time, when the instance is running.
    #[serde(default, deserialize_with = "lenient_time")]
    pub mission_time: Option<DateTime<Utc>>,
    /// Processors of the instance.
    #[serde(default)]
    pub processors: Vec<ProcessorInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListInstancesResponse {
    #[serde(default)]
    pub instances: Vec<InstanceInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListProcessorsResponse {
    #[serde(default)]
    pub processors: Vec<ProcessorInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListLinksResponse {
    #[serde(default)]
    pub links: Vec<LinkInfo>,
}
