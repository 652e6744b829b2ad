/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/
use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;

use crate::client::RequestContext;
use crate::subscription::model::{Alarm, CommandHistory, ParamValue, ParameterData, ParameterValue};
use crate::subscription::{
    AlarmSubscription, CommandHistorySubscription, ParameterSubscription,
    ParameterSubscriptionOptions, SubscriptionListener, TypedSubscription, alarms, commands,
};
use crate::utils::{YamcsError, encode_name};

/// Client scoped to one processor of an instance.
///
/// Obtained from [`YamcsClient::get_processor`](crate::client::YamcsClient::get_processor).
#[derive(Debug, Clone)]
pub struct ProcessorClient {
    context: RequestContext,
    instance: String,
    processor: String,
    reply_timeout: Duration,
}

impl ProcessorClient {
    pub(crate) fn new(
        context: RequestContext,
        instance: &str,
        processor: &str,
        reply_timeout: Duration,
    ) -> Self {
        Self {
            context,
            instance: instance.to_string(),
            processor: processor.to_string(),
            reply_timeout,
        }
    }

    /// Instance name.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Processor name.
    pub fn processor(&self) -> &str {
        &self.processor
    }

    fn parameter_path(&self, name: &str) -> String {
        format!(
            "/processors/{}/{}/parameters/{}",
            encode_name(&self.instance),
            encode_name(&self.processor),
            encode_name(name.trim_start_matches('/'))
        )
    }

    /// Retrieves the current value of a parameter.
    ///
    /// # Arguments
    ///
    /// * `name` - Fully qualified parameter name, e.g. `/YSS/SIMULATOR/BatteryVoltage1`
    ///
    /// # Errors
    ///
    /// Returns [`YamcsError::NotFound`] for an unknown parameter.
    pub fn get_parameter_value(&self, name: &str) -> Result<ParameterValue, YamcsError> {
        let body: Value = self.context.get(&self.parameter_path(name), None)?;
        let (_, mut value) = ParameterValue::from_wire(&body)?;
        if value.name.is_empty() {
            value.name = name.to_string();
        }
        Ok(value)
    }

    /// Sets the value of a software parameter.
    ///
    /// # Errors
    ///
    /// Returns the server's error if the parameter is unknown or not writable.
    pub fn set_parameter_value(&self, name: &str, value: &ParamValue) -> Result<(), YamcsError> {
        debug!("Setting {} to {}", name, value);
        let body = json!({"value": value.to_wire()});
        let _: Value = self.context.put(&self.parameter_path(name), Some(&body))?;
        Ok(())
    }

    /// Subscribes to parameter updates.
    ///
    /// # Arguments
    ///
    /// * `names` - Fully qualified parameter names
    /// * `listener` - Optional listener receiving every batch of updated values
    /// * `options` - Subscribe flags
    ///
    /// # Errors
    ///
    /// Returns the server's rejection (e.g. an unknown name), a connection failure, or
    /// [`YamcsError::Timeout`].
    pub fn create_parameter_subscription(
        &self,
        names: &[&str],
        listener: Option<Box<dyn SubscriptionListener<ParameterData>>>,
        options: ParameterSubscriptionOptions,
    ) -> Result<ParameterSubscription, YamcsError> {
        let options = options.to_options(&self.instance, &self.processor, names);
        TypedSubscription::open(&self.context, options, listener, Some(self.reply_timeout))
    }

    /// Subscribes to alarm notifications.
    pub fn create_alarm_subscription(
        &self,
        listener: Option<Box<dyn SubscriptionListener<Alarm>>>,
    ) -> Result<AlarmSubscription, YamcsError> {
        let options = alarms::options(&self.instance, &self.processor);
        TypedSubscription::open(&self.context, options, listener, Some(self.reply_timeout))
    }

    /// Subscribes to command history updates. Listeners receive the merged history of
    /// the command each update belongs to.
    pub fn create_command_history_subscription(
        &self,
        listener: Option<Box<dyn SubscriptionListener<CommandHistory>>>,
        ignore_past_commands: bool,
    ) -> Result<CommandHistorySubscription, YamcsError> {
        let options = commands::options(&self.instance, &self.processor, ignore_past_commands);
        TypedSubscription::open(&self.context, options, listener, Some(self.reply_timeout))
    }
}
