/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/

//! Manager and future behaviour against a live WebSocket server.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use common::{MockServer, WAIT, http_responder};
use serde_json::{Value, json};
use yamcs_rs::client::{ApiKeyCredentials, YamcsClient};
use yamcs_rs::connection::WebSocketSubscriptionManager;
use yamcs_rs::subscription::{DataPayload, SubscriptionFuture, Topic};
use yamcs_rs::utils::YamcsError;

fn open(
    server: &MockServer,
    topic: Topic,
    options: Option<Value>,
) -> (WebSocketSubscriptionManager, SubscriptionFuture, mpsc::Receiver<DataPayload>) {
    let client = server.client();
    let manager = WebSocketSubscriptionManager::new(client.context().clone(), topic, options);
    let future = SubscriptionFuture::new(manager.clone());
    let (tx, rx) = mpsc::channel();
    manager.open(Box::new(move |payload| {
        let _ = tx.send(payload);
    }));
    (manager, future, rx)
}

#[test]
fn test_subscribe_envelope_and_handshake() {
    let server = MockServer::start();
    let (manager, future, _rx) = open(&server, Topic::Links, Some(json!({"instance": "simulator"})));

    let first = server.recv();
    assert_eq!(first, json!({"type": "links", "id": 1, "options": {"instance": "simulator"}}));

    let headers = server.handshake_headers().unwrap();
    assert_eq!(headers.get("sec-websocket-protocol").unwrap(), "json");
    assert!(headers.get("user-agent").unwrap().to_str().unwrap().starts_with("yamcs-rs/"));

    server.reply_ok(1, 3);
    assert_eq!(future.reply(Some(WAIT)).unwrap().reply_to, 1);
    assert_eq!(manager.call(), Some(3));
    future.cancel();
}

#[test]
fn test_credentials_attached_to_handshake() {
    let server = MockServer::start();
    let client = YamcsClient::new(
        server
            .config()
            .credentials(Arc::new(ApiKeyCredentials::new("secret"))),
    )
    .unwrap();
    let manager = WebSocketSubscriptionManager::new(client.context().clone(), Topic::Time, None);
    let future = SubscriptionFuture::new(manager.clone());
    manager.open(Box::new(|_| {}));

    server.recv();
    let headers = server.handshake_headers().unwrap();
    assert_eq!(headers.get("x-api-key").unwrap(), "secret");
    future.cancel();
}

#[test]
fn test_call_handle_set_by_first_success_only() {
    let server = MockServer::start();
    let (manager, future, _rx) = open(&server, Topic::Parameters, Some(json!({"id": []})));
    server.recv();
    server.reply_ok(1, 5);
    future.reply(Some(WAIT)).unwrap();

    manager.send(Some(json!({"action": "ADD"}))).unwrap();
    let second = server.recv();
    assert_eq!(second["id"], 2);
    assert_eq!(second["call"], 5);

    server.reply_ok(2, 8);
    manager.send(Some(json!({"action": "REMOVE"}))).unwrap();
    let third = server.recv();
    assert_eq!(third["call"], 5);
    assert_eq!(manager.call(), Some(5));
    future.cancel();
}

#[test]
fn test_concurrent_sends_wait_for_call_handle() {
    let server = MockServer::start();
    let (manager, future, _rx) = open(&server, Topic::Parameters, Some(json!({"id": []})));
    assert_eq!(server.recv()["id"], 1);

    let senders: Vec<_> = (0..3)
        .map(|i| {
            let manager = manager.clone();
            thread::spawn(move || manager.send(Some(json!({"n": i}))))
        })
        .collect();

    // Nothing leaves before the server assigned the call handle.
    assert!(server.try_recv(Duration::from_millis(200)).is_none());
    assert_eq!(manager.request_counter(), 1);

    server.reply_ok(1, 11);
    let mut ids = Vec::new();
    for _ in 0..3 {
        let message = server.recv();
        assert_eq!(message["call"], 11);
        ids.push(message["id"].as_u64().unwrap());
    }
    assert_eq!(ids, vec![2, 3, 4]);
    for sender in senders {
        sender.join().unwrap().unwrap();
    }
    future.cancel();
}

#[test]
fn test_blocked_sender_released_by_failure() {
    let server = MockServer::start();
    let (manager, future, _rx) = open(&server, Topic::Time, None);
    server.recv();

    let sender = {
        let manager = manager.clone();
        thread::spawn(move || manager.send(None))
    };
    thread::sleep(Duration::from_millis(100));
    server.drop_connection();

    let result = sender.join().unwrap();
    assert!(result.unwrap_err().is_connection_failure());
    assert!(future.exception(Some(WAIT)).unwrap().unwrap().is_connection_failure());
}

#[test]
fn test_rejected_subscription() {
    let server = MockServer::start();
    let (manager, future, _rx) = open(
        &server,
        Topic::Parameters,
        Some(json!({"id": [{"name": "/X/Y"}]})),
    );
    server.recv();
    server.reply_error(1, 400, "No parameter by name /X/Y");

    match future.reply(Some(WAIT)).unwrap_err() {
        YamcsError::Server { status, message, .. } => {
            assert_eq!(status, Some(400));
            assert_eq!(message, "No parameter by name /X/Y");
        }
        other => panic!("unexpected {other:?}"),
    }
    let err = future.result(Some(WAIT)).unwrap_err();
    assert_eq!(err.to_string(), "No parameter by name /X/Y");
    assert!(manager.is_closed());
    assert!(!future.cancelled());
}

#[test]
fn test_graceful_server_close_is_success() {
    let server = MockServer::start();
    let (manager, future, _rx) = open(&server, Topic::Time, None);
    let (reason_tx, reason_rx) = mpsc::channel();
    manager.add_close_callback(Box::new(move |reason| {
        let _ = reason_tx.send(reason);
    }));

    server.recv();
    server.reply_ok(1, 1);
    future.reply(Some(WAIT)).unwrap();
    server.close();

    assert!(future.result(Some(WAIT)).is_ok());
    assert!(reason_rx.recv_timeout(WAIT).unwrap().is_none());
    assert!(!future.cancelled());
}

#[test]
fn test_cancel_stops_delivery() {
    let server = MockServer::start();
    let (manager, future, rx) = open(&server, Topic::Time, None);
    server.recv();
    server.reply_ok(1, 2);
    future.reply(Some(WAIT)).unwrap();

    server.data("time", 2, 1, json!({"value": "2026-10-14T09:00:00Z"}));
    assert!(matches!(rx.recv_timeout(WAIT).unwrap(), DataPayload::Time(_)));

    assert!(future.cancel());
    assert!(manager.is_closed());
    assert!(future.cancelled());
    assert!(matches!(future.result(None), Err(YamcsError::Cancelled)));

    server.data("time", 2, 2, json!({"value": "2026-10-14T09:00:01Z"}));
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn test_close_callbacks_fire_once() {
    let server = MockServer::start();
    let (manager, future, _rx) = open(&server, Topic::Time, None);
    server.recv();
    server.reply_ok(1, 2);
    future.reply(Some(WAIT)).unwrap();

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    manager.add_close_callback(Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let closers: Vec<_> = (0..4)
        .map(|_| {
            let manager = manager.clone();
            thread::spawn(move || manager.close(None))
        })
        .collect();
    for closer in closers {
        closer.join().unwrap();
    }
    manager.close(None);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(future.done());
}

#[test]
fn test_timeout_does_not_cancel_subscription() {
    let server = MockServer::start();
    let (_manager, future, _rx) = open(&server, Topic::Time, None);
    server.recv();
    server.reply_ok(1, 2);

    assert!(matches!(
        future.result(Some(Duration::from_millis(10))),
        Err(YamcsError::Timeout)
    ));
    assert!(future.running());

    server.close();
    assert!(future.result(None).is_ok());
}

#[test]
fn test_malformed_frame_is_fatal() {
    let server = MockServer::start();
    let (_manager, future, _rx) = open(&server, Topic::Time, None);
    server.recv();
    server.reply_ok(1, 2);
    server.send_text("{not json");

    let err = future.exception(Some(WAIT)).unwrap().unwrap();
    assert!(matches!(err, YamcsError::Decode(_)));
}

#[test]
fn test_panicking_callback_is_fatal() {
    let server = MockServer::start();
    let client = server.client();
    let manager = WebSocketSubscriptionManager::new(client.context().clone(), Topic::Time, None);
    let future = SubscriptionFuture::new(manager.clone());
    manager.open(Box::new(|_| panic!("listener bug")));

    server.recv();
    server.reply_ok(1, 2);
    server.data("time", 2, 1, json!({"value": "2026-10-14T09:00:00Z"}));

    match future.exception(Some(WAIT)).unwrap() {
        Some(YamcsError::Callback(msg)) => assert_eq!(msg, "listener bug"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_unauthorized_handshake() {
    let server = MockServer::rejecting(401);
    let (_manager, future, _rx) = open(&server, Topic::Time, None);
    let err = future.exception(Some(WAIT)).unwrap().unwrap();
    assert!(matches!(err, YamcsError::Unauthorized(_)));
    assert!(matches!(future.reply(None), Err(YamcsError::Unauthorized(_))));
}

#[test]
fn test_refused_connection() {
    let address = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().to_string()
    };
    let client = YamcsClient::from_address(address).unwrap();
    let manager = WebSocketSubscriptionManager::new(client.context().clone(), Topic::Time, None);
    let future = SubscriptionFuture::new(manager.clone());
    manager.open(Box::new(|_| {}));

    let err = future.exception(Some(WAIT)).unwrap().unwrap();
    assert!(err.is_connection_failure());
}

#[test]
fn test_cancel_from_done_callback_during_close() {
    let server = MockServer::start();
    let (manager, future, _rx) = open(&server, Topic::Time, None);
    server.recv();
    server.reply_ok(1, 2);
    future.reply(Some(WAIT)).unwrap();

    let inner = future.clone();
    future.add_done_callback(Box::new(move |_| {
        inner.cancel();
    }));

    let (closed_tx, closed_rx) = mpsc::channel();
    let closer = manager.clone();
    thread::spawn(move || {
        closer.close(None);
        let _ = closed_tx.send(());
    });

    closed_rx.recv_timeout(WAIT).expect("close returned");
    assert!(future.done());
    assert!(!future.cancelled());
}

#[test]
fn test_data_callback_can_use_rest_api() {
    let server = MockServer::start();
    let rest = YamcsClient::from_address(http_responder(json!({"yamcsVersion": "5.10.2"}))).unwrap();
    let client = server.client();
    let manager = WebSocketSubscriptionManager::new(client.context().clone(), Topic::Time, None);
    let future = SubscriptionFuture::new(manager.clone());
    let (tx, rx) = mpsc::channel();
    manager.open(Box::new(move |_| {
        let _ = tx.send(rest.get_server_info().map(|info| info.yamcs_version));
    }));

    server.recv();
    server.reply_ok(1, 2);
    server.data("time", 2, 1, json!({"value": "2026-10-14T09:00:00Z"}));

    let version = rx.recv_timeout(WAIT).unwrap().unwrap();
    assert_eq!(version, "5.10.2");
    assert!(future.running());
    future.cancel();
}
