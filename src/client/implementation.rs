/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;

use crate::client::model::{
    InstanceInfo, ListInstancesResponse, ListLinksResponse, ListProcessorsResponse, ProcessorInfo,
    ServerInfo,
};
use crate::client::{ClientConfig, ProcessorClient, RequestContext};
use crate::connection::ConnectionDetails;
use crate::subscription::model::{Cop1Status, LinkEvent, LinkInfo, StreamTuple, Transfer};
use crate::subscription::{
    Cop1Subscription, LinkSubscription, StreamSubscription, SubscriptionListener,
    TimeSubscription, TransferSubscription, TypedSubscription, cop1, links, streams, time,
    transfers,
};
use crate::utils::{YamcsError, encode_name};

/// Entry point for talking to a Yamcs server.
///
/// Holds the resolved endpoints and a persistent HTTP session. Cheap to clone; clones share
/// the session and credentials.
#[derive(Debug, Clone)]
pub struct YamcsClient {
    config: ClientConfig,
    context: RequestContext,
}

impl YamcsClient {
    /// Creates a client for the configured server. No request is made yet.
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration
    ///
    /// # Returns
    ///
    /// A new `YamcsClient` instance or an error
    ///
    /// # Errors
    ///
    /// Returns [`YamcsError::Configuration`] if the address is invalid.
    pub fn new(config: ClientConfig) -> Result<Self, YamcsError> {
        let details = ConnectionDetails::from_config(&config)?;
        let context = RequestContext::new(details, config.request_timeout)?;
        info!("Created client for {}", context.details().api_root());
        Ok(Self { config, context })
    }

    /// Creates a client for `host:port` with default settings.
    pub fn from_address(address: impl Into<String>) -> Result<Self, YamcsError> {
        Self::new(ClientConfig::new(address))
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The request context shared by everything created from this client.
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Returns general information about the server.
    pub fn get_server_info(&self) -> Result<ServerInfo, YamcsError> {
        self.context.get("", None)
    }

    /// Lists the instances hosted by the server.
    pub fn list_instances(&self) -> Result<Vec<InstanceInfo>, YamcsError> {
        let response: ListInstancesResponse = self.context.get("/instances", None)?;
        Ok(response.instances)
    }

    /// Returns one instance.
    ///
    /// # Errors
    ///
    /// Returns [`YamcsError::NotFound`] for an unknown instance.
    pub fn get_instance(&self, instance: &str) -> Result<InstanceInfo, YamcsError> {
        self.context
            .get(&format!("/instances/{}", encode_name(instance)), None)
    }

    /// Current mission time of an instance, `None` if the instance is not running.
    pub fn get_time(&self, instance: &str) -> Result<Option<DateTime<Utc>>, YamcsError> {
        Ok(self.get_instance(instance)?.mission_time)
    }

    /// Lists the processors of an instance.
    pub fn list_processors(&self, instance: &str) -> Result<Vec<ProcessorInfo>, YamcsError> {
        let response: ListProcessorsResponse = self
            .context
            .get(&format!("/processors/{}", encode_name(instance)), None)?;
        Ok(response.processors)
    }

    /// Lists the data links of an instance.
    pub fn list_links(&self, instance: &str) -> Result<Vec<LinkInfo>, YamcsError> {
        let response: ListLinksResponse = self
            .context
            .get(&format!("/links/{}", encode_name(instance)), None)?;
        Ok(response.links)
    }

    /// Returns one link.
    pub fn get_link(&self, instance: &str, link: &str) -> Result<LinkInfo, YamcsError> {
        self.context.get(&link_path(instance, link), None)
    }

    /// Enables a link and returns its new state.
    pub fn enable_link(&self, instance: &str, link: &str) -> Result<LinkInfo, YamcsError> {
        info!("Enabling link {} of {}", link, instance);
        self.context
            .post(&format!("{}:enable", link_path(instance, link)), None::<&Value>)
    }

    /// Disables a link and returns its new state.
    pub fn disable_link(&self, instance: &str, link: &str) -> Result<LinkInfo, YamcsError> {
        info!("Disabling link {} of {}", link, instance);
        self.context
            .post(&format!("{}:disable", link_path(instance, link)), None::<&Value>)
    }

    /// Client scoped to one processor of an instance.
    pub fn get_processor(&self, instance: &str, processor: &str) -> ProcessorClient {
        ProcessorClient::new(self.context.clone(), instance, processor, self.config.reply_timeout)
    }

    /// Subscribes to the mission time of an instance.
    ///
    /// # Arguments
    ///
    /// * `instance` - Instance name
    /// * `listener` - Optional listener receiving every time update
    ///
    /// # Returns
    ///
    /// The subscription, once the server accepted it
    ///
    /// # Errors
    ///
    /// Returns the server's rejection, a connection failure, or [`YamcsError::Timeout`]
    /// if the server did not reply within the configured reply timeout.
    pub fn create_time_subscription(
        &self,
        instance: &str,
        listener: Option<Box<dyn SubscriptionListener<DateTime<Utc>>>>,
    ) -> Result<TimeSubscription, YamcsError> {
        self.subscribe(time::options(instance, None), listener)
    }

    /// Subscribes to link events of an instance.
    pub fn create_link_subscription(
        &self,
        instance: &str,
        listener: Option<Box<dyn SubscriptionListener<LinkEvent>>>,
    ) -> Result<LinkSubscription, YamcsError> {
        self.subscribe(links::options(instance), listener)
    }

    /// Subscribes to the COP-1 status of an uplink.
    pub fn create_cop1_subscription(
        &self,
        instance: &str,
        link: &str,
        listener: Option<Box<dyn SubscriptionListener<Cop1Status>>>,
    ) -> Result<Cop1Subscription, YamcsError> {
        self.subscribe(cop1::options(instance, link), listener)
    }

    /// Subscribes to transfer progress of a file transfer service.
    pub fn create_file_transfer_subscription(
        &self,
        instance: &str,
        service: &str,
        listener: Option<Box<dyn SubscriptionListener<Transfer>>>,
    ) -> Result<TransferSubscription, YamcsError> {
        self.subscribe(transfers::options(instance, service), listener)
    }

    /// Subscribes to the tuples of a stream.
    pub fn create_stream_subscription(
        &self,
        instance: &str,
        stream: &str,
        listener: Option<Box<dyn SubscriptionListener<StreamTuple>>>,
    ) -> Result<StreamSubscription, YamcsError> {
        self.subscribe(streams::options(instance, stream), listener)
    }

    fn subscribe<C: crate::subscription::TopicCache>(
        &self,
        options: Value,
        listener: Option<Box<dyn SubscriptionListener<C::Event>>>,
    ) -> Result<TypedSubscription<C>, YamcsError> {
        TypedSubscription::open(&self.context, options, listener, Some(self.config.reply_timeout))
    }
}

fn link_path(instance: &str, link: &str) -> String {
    format!("/links/{}/{}", encode_name(instance), encode_name(link))
}
