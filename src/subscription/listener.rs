/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, RwLock, RwLockReadGuard};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::client::RequestContext;
use crate::connection::WebSocketSubscriptionManager;
use crate::subscription::{DataPayload, SubscriptionFuture, Topic};
use crate::utils::{YamcsError, read, write};

/// Receives the events of a typed subscription.
///
/// Events are delivered on the subscription's consumer thread, in arrival order, after
/// the subscription's cache has been updated. Any `FnMut(&E) + Send` closure is a listener.
pub trait SubscriptionListener<E>: Send {
    /// Called for every event.
    fn on_update(&mut self, event: &E);
}

impl<E, F> SubscriptionListener<E> for F
where
    F: FnMut(&E) + Send,
{
    fn on_update(&mut self, event: &E) {
        self(event)
    }
}

/// A subscription listener that forwards events to a tokio mpsc channel.
///
/// Lets another thread or task drain events at its own pace.
///
/// # Examples
///
/// ```ignore
/// use yamcs_rs::subscription::ChannelSubscriptionListener;
///
/// let (listener, mut rx) = ChannelSubscriptionListener::create_channel();
/// let subscription = client.create_time_subscription("simulator", Some(Box::new(listener)))?;
///
/// while let Some(time) = rx.blocking_recv() {
///     println!("Mission time: {time}");
/// }
/// ```
pub struct ChannelSubscriptionListener<E> {
    sender: mpsc::UnboundedSender<E>,
}

impl<E> ChannelSubscriptionListener<E> {
    /// Creates a listener forwarding to `sender`.
    pub fn new(sender: mpsc::UnboundedSender<E>) -> Self {
        Self { sender }
    }

    /// Creates a channel and returns the listener with the receiving end.
    pub fn create_channel() -> (Self, mpsc::UnboundedReceiver<E>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl<E: Clone + Send> SubscriptionListener<E> for ChannelSubscriptionListener<E> {
    fn on_update(&mut self, event: &E) {
        // A dropped receiver only means nobody is interested anymore.
        if self.sender.send(event.clone()).is_err() {
            debug!("Channel listener receiver dropped");
        }
    }
}

/// Shorthand for [`ChannelSubscriptionListener::create_channel`], boxed for the
/// subscription factories.
pub fn channel_callback<E: Clone + Send + 'static>()
-> (Box<dyn SubscriptionListener<E>>, mpsc::UnboundedReceiver<E>) {
    let (listener, rx) = ChannelSubscriptionListener::create_channel();
    (Box::new(listener), rx)
}

/// Local state a typed subscription keeps from the data it receives.
pub trait TopicCache: Default + Send + Sync + 'static {
    /// Event handed to listeners.
    type Event: Send + 'static;

    /// Topic this cache consumes.
    const TOPIC: Topic;

    /// Folds one payload into the cache and returns the event to deliver, if any.
    fn apply(&mut self, payload: DataPayload) -> Option<Self::Event>;
}

/// A subscription that keeps a cache of the most recent data of its topic.
///
/// Dereferences to its [`SubscriptionFuture`], so it can be awaited, inspected and
/// cancelled directly. Cache reads never block on the network and return `None` for keys
/// no update has mentioned.
///
/// Dropping the subscription cancels it and closes its connection. Clones of the
/// [`future`](Self::future) observe that as a cancellation.
pub struct TypedSubscription<C: TopicCache> {
    future: SubscriptionFuture,
    cache: Arc<RwLock<C>>,
    options: Value,
}

impl<C: TopicCache> TypedSubscription<C> {
    /// Opens a subscription and waits up to `reply_timeout` for the server to accept it.
    ///
    /// # Errors
    ///
    /// Returns the server's rejection, a connection failure, or [`YamcsError::Timeout`].
    /// In every case the subscription is torn down before returning.
    pub(crate) fn open(
        context: &RequestContext,
        options: Value,
        listener: Option<Box<dyn SubscriptionListener<C::Event>>>,
        reply_timeout: Option<Duration>,
    ) -> Result<Self, YamcsError> {
        let manager = WebSocketSubscriptionManager::new(context.clone(), C::TOPIC, Some(options.clone()));
        let future = SubscriptionFuture::new(manager.clone());
        let cache = Arc::new(RwLock::new(C::default()));

        let writer = Arc::clone(&cache);
        let mut listener = listener;
        manager.open(Box::new(move |payload| {
            let event = write(&writer).apply(payload);
            if let (Some(event), Some(listener)) = (event, listener.as_mut()) {
                listener.on_update(&event);
            }
        }));

        let subscription = Self {
            future,
            cache,
            options,
        };
        if let Err(err) = subscription.future.reply(reply_timeout) {
            warn!("{} subscription failed: {}", C::TOPIC, err);
            subscription.future.cancel();
            return Err(err);
        }
        Ok(subscription)
    }

    /// The future tracking this subscription.
    pub fn future(&self) -> &SubscriptionFuture {
        &self.future
    }

    pub(crate) fn cache(&self) -> RwLockReadGuard<'_, C> {
        read(&self.cache)
    }

    pub(crate) fn cache_lock(&self) -> &RwLock<C> {
        &self.cache
    }

    /// Options the subscription was opened with, extended with `extra`.
    pub(crate) fn options_with(&self, extra: Value) -> Value {
        let mut merged = match &self.options {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        if let Value::Object(extra) = extra {
            merged.extend(extra);
        }
        Value::Object(merged)
    }
}

impl<C: TopicCache> Deref for TypedSubscription<C> {
    type Target = SubscriptionFuture;

    fn deref(&self) -> &Self::Target {
        &self.future
    }
}

impl<C: TopicCache> Drop for TypedSubscription<C> {
    fn drop(&mut self) {
        if self.future.cancel() {
            debug!("{} subscription dropped while running", C::TOPIC);
        }
    }
}

impl<C: TopicCache + fmt::Debug> fmt::Debug for TypedSubscription<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedSubscription")
            .field("future", &self.future)
            .field("cache", &*self.cache())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_listener() {
        let mut seen = Vec::new();
        {
            let mut listener: Box<dyn SubscriptionListener<u32> + '_> =
                Box::new(|event: &u32| seen.push(*event));
            listener.on_update(&1);
            listener.on_update(&2);
        }
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn test_channel_listener_forwards() {
        let (mut listener, mut rx) = ChannelSubscriptionListener::<String>::create_channel();
        listener.on_update(&"a".to_string());
        listener.on_update(&"b".to_string());
        assert_eq!(rx.try_recv().unwrap(), "a");
        assert_eq!(rx.try_recv().unwrap(), "b");
    }

    #[test]
    fn test_channel_listener_survives_dropped_receiver() {
        let (mut listener, rx) = channel_callback::<u8>();
        drop(rx);
        listener.on_update(&7);
    }
}
