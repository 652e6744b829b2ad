/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/

//! Subscription manager owning one WebSocket connection and one subscription topic.
//!
//! The manager correlates the requests it sends with the replies the server returns and
//! hands every data message to a single callback. Each manager owns a dedicated consumer
//! thread that drives the socket on a current-thread tokio runtime; every other thread
//! talks to it through an unbounded channel, so frames leave in the order `send` was
//! called. Callbacks run on the consumer thread but outside the runtime, so they may
//! call the blocking REST API.
//!
//! Teardown goes through [`WebSocketSubscriptionManager::close`], which is idempotent.
//! Failures noticed on the consumer thread (transport errors, undecodable frames, a
//! panicking callback, a rejected subscribe) close the manager from a detached thread,
//! because closing inline would join the very thread that is closing.

use std::any::Any;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, OnceLock, TryLockError};
use std::thread::{self, JoinHandle, ThreadId};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::{SEC_WEBSOCKET_PROTOCOL, USER_AGENT};
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tracing::{debug, error, info, warn};

use crate::client::RequestContext;
use crate::connection::details::SUBPROTOCOL;
use crate::connection::envelope::{ClientMessage, Reply, ServerMessage};
use crate::subscription::{DataPayload, Topic};
use crate::utils::error::classify_transport_error;
use crate::utils::{YamcsError, lock};

/// Receives every decoded data message, on the consumer thread, in arrival order.
pub type DataCallback = Box<dyn FnMut(DataPayload) + Send>;

/// Receives every `reply` envelope: the decoded reply, or the error the server reported.
pub type ResponseCallback = Arc<dyn Fn(&Result<Reply, YamcsError>) + Send + Sync>;

/// Receives the close reason exactly once: `None` for a graceful close.
pub type CloseCallback = Box<dyn FnOnce(Option<YamcsError>) + Send>;

#[derive(Default)]
struct RequestState {
    request_counter: u64,
    call: Option<i64>,
    opened: bool,
    closed: bool,
    outgoing: Option<mpsc::UnboundedSender<String>>,
    shutdown: Option<oneshot::Sender<()>>,
}

#[derive(Default)]
struct CloseState {
    callbacks: Vec<CloseCallback>,
    /// Set once the close callbacks fired; later registrations run immediately with it.
    reason: Option<Option<YamcsError>>,
}

struct ManagerInner {
    topic: Topic,
    options: Option<Value>,
    context: RequestContext,
    state: Mutex<RequestState>,
    call_assigned: Condvar,
    close_lock: Mutex<()>,
    response_callbacks: Mutex<Vec<ResponseCallback>>,
    close_state: Mutex<CloseState>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    consumer_id: OnceLock<ThreadId>,
}

/// How the consumer loop ended.
enum LoopEnd {
    /// Shutdown requested by [`WebSocketSubscriptionManager::close`].
    Local,
    /// The server went away or the connection failed; the manager must be closed.
    Remote(Option<YamcsError>),
}

/// Owns one streaming connection subscribed to one topic.
///
/// Cloning yields another handle to the same manager. The consumer thread keeps the
/// connection alive until [`close`](Self::close) is called or the connection ends;
/// dropping every handle does not close it.
#[derive(Clone)]
pub struct WebSocketSubscriptionManager {
    inner: Arc<ManagerInner>,
}

impl fmt::Debug for WebSocketSubscriptionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("WebSocketSubscriptionManager")
            .field("topic", &self.inner.topic)
            .field("call", &state.call)
            .field("request_counter", &state.request_counter)
            .field("closed", &state.closed)
            .finish()
    }
}

impl WebSocketSubscriptionManager {
    /// Creates a manager for `topic`. Nothing is sent until [`open`](Self::open).
    pub fn new(context: RequestContext, topic: Topic, options: Option<Value>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                topic,
                options,
                context,
                state: Mutex::new(RequestState::default()),
                call_assigned: Condvar::new(),
                close_lock: Mutex::new(()),
                response_callbacks: Mutex::new(Vec::new()),
                close_state: Mutex::new(CloseState::default()),
                consumer: Mutex::new(None),
                consumer_id: OnceLock::new(),
            }),
        }
    }

    /// The subscribed topic.
    pub fn topic(&self) -> Topic {
        self.inner.topic
    }

    /// The call handle, once the server confirmed the subscription.
    pub fn call(&self) -> Option<i64> {
        lock(&self.inner.state).call
    }

    /// Number of envelopes sent so far; also the id of the last one.
    pub fn request_counter(&self) -> u64 {
        lock(&self.inner.state).request_counter
    }

    /// Whether the manager has been closed.
    pub fn is_closed(&self) -> bool {
        lock(&self.inner.state).closed
    }

    /// Connects and subscribes, delivering data messages to `data_callback`.
    ///
    /// Returns without waiting for the connection. Credentials are refreshed on the
    /// calling thread first; a failure there, like any transport failure, is reported to
    /// the close callbacks rather than returned.
    ///
    /// # Panics
    ///
    /// Panics if the manager was already opened or closed.
    pub fn open(&self, data_callback: DataCallback) {
        let inner = &self.inner;
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        {
            let mut state = lock(&inner.state);
            assert!(!state.closed, "open() called on a closed subscription manager");
            assert!(!state.opened, "open() called twice on a subscription manager");
            state.opened = true;
            state.outgoing = Some(tx);
            state.shutdown = Some(shutdown_tx);
        }

        let request = match inner.handshake_request() {
            Ok(request) => request,
            Err(err) => {
                warn!("Cannot open {} subscription: {}", inner.topic, err);
                inner.close(Some(err));
                return;
            }
        };

        // The subscribe request is queued now and flushed as soon as the socket is up.
        if let Err(err) = inner.send(inner.options.clone()) {
            inner.close(Some(err));
            return;
        }

        let consumer = Arc::clone(inner);
        let spawned = thread::Builder::new()
            .name(format!("yamcs-{}", inner.topic))
            .spawn(move || consumer.run_consumer(request, rx, shutdown_rx, data_callback));
        match spawned {
            Ok(handle) => *lock(&inner.consumer) = Some(handle),
            Err(err) => {
                error!("Failed to spawn consumer thread: {}", err);
                inner.close(Some(YamcsError::ConnectionFailure(err.to_string())));
            }
        }
    }

    /// Sends another envelope on this connection, e.g. to change subscription membership.
    ///
    /// Blocks until the server has assigned the call handle if any envelope was sent
    /// before. There is no timeout on that wait; closing the manager releases it.
    ///
    /// # Errors
    ///
    /// Returns [`YamcsError::ConnectionFailure`] if the manager is closed, or closes
    /// while waiting.
    pub fn send(&self, options: Option<Value>) -> Result<(), YamcsError> {
        self.inner.send(options)
    }

    /// Registers a callback for every reply envelope.
    pub fn add_response_callback(&self, callback: ResponseCallback) {
        lock(&self.inner.response_callbacks).push(callback);
    }

    /// Registers a callback fired exactly once on teardown. If the manager is already
    /// closed it runs immediately with the original reason.
    pub fn add_close_callback(&self, callback: CloseCallback) {
        let mut close_state = lock(&self.inner.close_state);
        match &close_state.reason {
            Some(reason) => {
                let reason = reason.clone();
                drop(close_state);
                callback(reason);
            }
            None => close_state.callbacks.push(callback),
        }
    }

    /// Tears the connection down and fires the close callbacks with `reason`.
    ///
    /// Idempotent. Joins the consumer thread unless called from it.
    pub fn close(&self, reason: Option<YamcsError>) {
        self.inner.close(reason);
    }
}

impl ManagerInner {
    fn handshake_request(&self) -> Result<Request, YamcsError> {
        let details = self.context.details();
        let mut request = details
            .websocket_url()
            .as_str()
            .into_client_request()
            .map_err(classify_transport_error)?;

        let headers = request.headers_mut();
        headers.insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));
        headers.insert(USER_AGENT, header_value(details.user_agent())?);
        if let Some(auth) = self.context.auth_header()? {
            let name = HeaderName::from_bytes(auth.name.as_bytes())
                .map_err(|e| YamcsError::Configuration(e.to_string()))?;
            headers.insert(name, header_value(&auth.value)?);
        }
        Ok(request)
    }

    fn send(&self, options: Option<Value>) -> Result<(), YamcsError> {
        let mut state = lock(&self.state);
        while state.request_counter > 0 && state.call.is_none() && !state.closed {
            state = self
                .call_assigned
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        if state.closed {
            return Err(YamcsError::ConnectionFailure(
                "Subscription manager is closed".to_string(),
            ));
        }

        state.request_counter += 1;
        let message = ClientMessage {
            message_type: self.topic.to_string(),
            id: state.request_counter,
            call: state.call,
            options,
        };
        let text = serde_json::to_string(&message)?;
        debug!("Sending {}", text);

        // Enqueued under the lock so frames leave in the order ids were assigned.
        let outgoing = state
            .outgoing
            .as_ref()
            .ok_or_else(|| YamcsError::ConnectionFailure("Subscription is not open".to_string()))?;
        outgoing
            .send(text)
            .map_err(|_| YamcsError::ConnectionFailure("Connection closed".to_string()))
    }

    fn on_consumer_thread(&self) -> bool {
        self.consumer_id.get() == Some(&thread::current().id())
    }

    fn close(&self, reason: Option<YamcsError>) {
        let on_consumer = self.on_consumer_thread();
        // A closer already holding the lock may be joining this very thread.
        let guard = if on_consumer {
            match self.close_lock.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => return,
            }
        } else {
            lock(&self.close_lock)
        };

        {
            let mut state = lock(&self.state);
            if state.closed {
                return;
            }
            state.closed = true;
            state.outgoing = None;
            if let Some(shutdown) = state.shutdown.take() {
                let _ = shutdown.send(());
            }
        }
        self.call_assigned.notify_all();

        if !on_consumer {
            let handle = lock(&self.consumer).take();
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    error!("Consumer thread of {} subscription panicked", self.topic);
                }
            }
        }

        // Callbacks may close again (e.g. cancel from a done callback); `closed` is
        // already set, so that returns at once instead of waiting on this lock.
        drop(guard);

        match &reason {
            Some(err) => warn!("Closed {} subscription: {}", self.topic, err),
            None => info!("Closed {} subscription", self.topic),
        }

        let callbacks = {
            let mut close_state = lock(&self.close_state);
            close_state.reason = Some(reason.clone());
            mem::take(&mut close_state.callbacks)
        };
        for callback in callbacks {
            let reason = reason.clone();
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(reason))) {
                error!("Close callback panicked: {}", panic_message(payload.as_ref()));
            }
        }
    }

    /// Closes from a detached thread, so the consumer never joins itself.
    fn close_async(self: &Arc<Self>, reason: Option<YamcsError>) {
        let inner = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("yamcs-{}-close", self.topic))
            .spawn(move || inner.close(reason));
        if let Err(err) = spawned {
            error!("Failed to spawn closer thread: {}", err);
        }
    }

    /// Drives the socket one step at a time. Dispatch happens between `block_on`
    /// calls, outside the runtime context, so callbacks may use blocking clients.
    fn run_consumer(
        self: Arc<Self>,
        request: Request,
        mut outgoing: mpsc::UnboundedReceiver<String>,
        mut shutdown: oneshot::Receiver<()>,
        mut data_callback: DataCallback,
    ) {
        let _ = self.consumer_id.set(thread::current().id());
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                error!("Failed to build consumer runtime: {}", err);
                self.close_async(Some(YamcsError::ConnectionFailure(err.to_string())));
                return;
            }
        };

        let end = match runtime.block_on(self.connect(request, &mut shutdown)) {
            Ok(socket) => {
                let (mut write, mut read) = socket.split();
                loop {
                    let step = runtime.block_on(next_step(
                        &mut write,
                        &mut read,
                        &mut outgoing,
                        &mut shutdown,
                    ));
                    let fatal = match step {
                        Step::Frame(text) => match self.dispatch(&text, &mut data_callback) {
                            Ok(()) => continue,
                            Err(err) => err,
                        },
                        Step::Invalid(err) => err,
                        Step::End(end) => break end,
                    };
                    error!("Fatal error on {} subscription: {}", self.topic, fatal);
                    runtime.block_on(async {
                        let _ = write.send(Message::Close(None)).await;
                    });
                    break LoopEnd::Remote(Some(fatal));
                }
            }
            Err(end) => end,
        };

        if let LoopEnd::Remote(reason) = end {
            self.close_async(reason);
        }
        debug!("Consumer of {} subscription stopped", self.topic);
    }

    async fn connect(
        &self,
        request: Request,
        shutdown: &mut oneshot::Receiver<()>,
    ) -> Result<Socket, LoopEnd> {
        let url = request.uri().to_string();
        tokio::select! {
            _ = shutdown => Err(LoopEnd::Local),
            connected = connect_async(request) => match connected {
                Ok((socket, _)) => {
                    info!("Connected to {} for {} subscription", url, self.topic);
                    Ok(socket)
                }
                Err(err) => Err(LoopEnd::Remote(Some(classify_transport_error(err)))),
            },
        }
    }

    /// Handles one incoming frame. An error is fatal to the connection.
    fn dispatch(&self, text: &str, data_callback: &mut DataCallback) -> Result<(), YamcsError> {
        let message: ServerMessage = serde_json::from_str(text)?;
        if !message.is_reply() {
            let payload = self.topic.decode(message.data)?;
            return panic::catch_unwind(AssertUnwindSafe(|| data_callback(payload)))
                .map_err(|payload| YamcsError::Callback(panic_message(payload.as_ref())));
        }

        debug!("Received reply {}", text);
        let reply: Reply = serde_json::from_value(message.data)?;
        if let Some(exception) = reply.exception {
            let err = YamcsError::from(exception);
            self.fire_response(&Err(err.clone()))?;
            // A rejected subscribe leaves nothing to keep the connection open for.
            if lock(&self.state).call.is_none() {
                return Err(err);
            }
            warn!("Request on {} subscription rejected: {}", self.topic, err);
            return Ok(());
        }

        {
            let mut state = lock(&self.state);
            if state.call.is_none() {
                let call = message
                    .call
                    .ok_or_else(|| YamcsError::Decode("Reply without a call handle".to_string()))?;
                state.call = Some(call);
                debug!("{} subscription assigned call {}", self.topic, call);
                self.call_assigned.notify_all();
            }
        }
        self.fire_response(&Ok(reply))
    }

    fn fire_response(&self, response: &Result<Reply, YamcsError>) -> Result<(), YamcsError> {
        let callbacks = lock(&self.response_callbacks).clone();
        for callback in callbacks {
            panic::catch_unwind(AssertUnwindSafe(|| callback(response)))
                .map_err(|payload| YamcsError::Callback(panic_message(payload.as_ref())))?;
        }
        Ok(())
    }
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Outcome of one turn of the socket loop.
enum Step {
    /// A text frame to dispatch.
    Frame(String),
    /// A frame that cannot be dispatched; fatal.
    Invalid(YamcsError),
    /// The loop is over.
    End(LoopEnd),
}

/// Flushes queued frames until an incoming frame arrives or the connection ends.
async fn next_step(
    write: &mut SplitSink<Socket, Message>,
    read: &mut SplitStream<Socket>,
    outgoing: &mut mpsc::UnboundedReceiver<String>,
    shutdown: &mut oneshot::Receiver<()>,
) -> Step {
    loop {
        tokio::select! {
            _ = &mut *shutdown => {
                let _ = write.send(Message::Close(None)).await;
                return Step::End(LoopEnd::Local);
            }
            Some(text) = outgoing.recv() => {
                if let Err(err) = write.send(Message::text(text)).await {
                    return Step::End(LoopEnd::Remote(Some(classify_transport_error(err))));
                }
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => return Step::Frame(text.as_str().to_string()),
                Some(Ok(Message::Binary(bytes))) => {
                    return match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => Step::Frame(text),
                        Err(err) => Step::Invalid(YamcsError::Decode(err.to_string())),
                    };
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("Server closed the connection: {:?}", frame);
                    return Step::End(LoopEnd::Remote(None));
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    return Step::End(LoopEnd::Remote(Some(classify_transport_error(err))));
                }
                None => return Step::End(LoopEnd::Remote(None)),
            },
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue, YamcsError> {
    HeaderValue::from_str(value).map_err(|e| YamcsError::Configuration(e.to_string()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "callback panicked".to_string()
    }
}
