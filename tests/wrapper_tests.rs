/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/

//! Typed subscriptions created through the client, against a live WebSocket server.

mod common;

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use common::{MockServer, WAIT};
use serde_json::json;
use yamcs_rs::client::YamcsClient;
use yamcs_rs::subscription::model::{LinkEvent, ParamValue, ParameterData};
use yamcs_rs::subscription::{ParameterSubscriptionOptions, SubscriptionListener};
use yamcs_rs::utils::YamcsError;

#[test]
fn test_parameter_subscription_resolves_numeric_ids() {
    let server = MockServer::start();
    let processor = server.client().get_processor("simulator", "realtime");
    let (tx, rx) = mpsc::channel();

    let opening = thread::spawn(move || {
        let listener: Box<dyn SubscriptionListener<ParameterData>> =
            Box::new(move |data: &ParameterData| {
                let _ = tx.send(data.clone());
            });
        processor.create_parameter_subscription(
            &["/A/B"],
            Some(listener),
            ParameterSubscriptionOptions::default(),
        )
    });

    let subscribe = server.recv();
    assert_eq!(subscribe["type"], "parameters");
    assert_eq!(subscribe["id"], 1);
    assert!(subscribe.get("call").is_none());
    assert_eq!(subscribe["options"]["id"], json!([{"name": "/A/B"}]));
    assert_eq!(subscribe["options"]["abortOnInvalid"], true);

    server.reply_ok(1, 7);
    let subscription = opening.join().unwrap().unwrap();
    assert_eq!(subscription.manager().call(), Some(7));

    server.data(
        "parameters",
        7,
        1,
        json!({
            "mapping": {"1": {"name": "/A/B"}},
            "values": [{"numericId": 1, "engValue": {"type": "SINT32", "sint32Value": 42}}]
        }),
    );

    let delivered = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(delivered.parameters.len(), 1);
    assert_eq!(delivered.parameters[0].name, "/A/B");
    assert_eq!(
        subscription.get_value("/A/B").unwrap().eng_value,
        Some(ParamValue::Integer(42))
    );
    assert!(subscription.get_value("/A/C").is_none());

    assert!(subscription.cancel());
}

#[test]
fn test_parameter_membership_changes() {
    let server = MockServer::start();
    let processor = server.client().get_processor("simulator", "realtime");
    let opening = thread::spawn(move || {
        processor.create_parameter_subscription(
            &["/A/B"],
            None,
            ParameterSubscriptionOptions::default().send_from_cache(false),
        )
    });
    server.recv();
    server.reply_ok(1, 7);
    let subscription = opening.join().unwrap().unwrap();

    server.data(
        "parameters",
        7,
        1,
        json!({
            "mapping": {"1": {"name": "/A/B"}},
            "values": [{"numericId": 1, "engValue": {"type": "SINT32", "sint32Value": 42}}]
        }),
    );
    let deadline = Instant::now() + WAIT;
    while subscription.get_value("/A/B").is_none() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert!(subscription.get_value("/A/B").is_some());

    subscription.add(&["/A/C", "/A/D"]).unwrap();
    let add = server.recv();
    assert_eq!(add["type"], "parameters");
    assert_eq!(add["id"], 2);
    assert_eq!(add["call"], 7);
    assert_eq!(add["options"]["action"], "ADD");
    assert_eq!(add["options"]["id"], json!([{"name": "/A/C"}, {"name": "/A/D"}]));
    assert_eq!(add["options"]["instance"], "simulator");
    assert_eq!(add["options"]["processor"], "realtime");
    assert_eq!(add["options"]["sendFromCache"], false);

    subscription.remove(&["/A/B"]).unwrap();
    let remove = server.recv();
    assert_eq!(remove["id"], 3);
    assert_eq!(remove["call"], 7);
    assert_eq!(remove["options"]["action"], "REMOVE");
    assert_eq!(remove["options"]["id"], json!([{"name": "/A/B"}]));
    assert!(subscription.get_value("/A/B").is_none());
    assert!(subscription.values().is_empty());

    // Empty lists send nothing.
    subscription.add(&[]).unwrap();
    subscription.remove(&[]).unwrap();
    assert!(server.try_recv(Duration::from_millis(200)).is_none());
    assert_eq!(subscription.manager().request_counter(), 3);
}

#[test]
fn test_dropping_subscription_cancels_it() {
    let server = MockServer::start();
    let client = server.client();
    let opening = thread::spawn(move || client.create_time_subscription("simulator", None));
    server.recv();
    server.reply_ok(1, 9);
    let subscription = opening.join().unwrap().unwrap();

    let manager = subscription.manager().clone();
    let future = subscription.future().clone();
    drop(subscription);

    assert!(manager.is_closed());
    assert!(future.cancelled());
    assert!(matches!(future.result(None), Err(YamcsError::Cancelled)));
}

#[test]
fn test_rejected_parameter_subscription_is_an_error() {
    let server = MockServer::start();
    let processor = server.client().get_processor("simulator", "realtime");

    let opening = thread::spawn(move || {
        processor.create_parameter_subscription(
            &["/X/Y"],
            None,
            ParameterSubscriptionOptions::default(),
        )
    });
    server.recv();
    server.reply_error(1, 404, "No parameter named /X/Y");

    match opening.join().unwrap() {
        Err(YamcsError::Server { message, .. }) => assert_eq!(message, "No parameter named /X/Y"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_subscription_times_out_without_reply() {
    let server = MockServer::start();
    let client = YamcsClient::new(
        server.config().reply_timeout(Duration::from_millis(200)),
    )
    .unwrap();

    let opening = thread::spawn(move || client.create_time_subscription("simulator", None));
    server.recv();
    assert!(matches!(opening.join().unwrap(), Err(YamcsError::Timeout)));
}

#[test]
fn test_link_subscription_tracks_registry() {
    let server = MockServer::start();
    let client = server.client();
    let (tx, rx) = mpsc::channel();

    let opening = thread::spawn(move || {
        let listener: Box<dyn SubscriptionListener<LinkEvent>> = Box::new(move |event: &LinkEvent| {
            let _ = tx.send(event.clone());
        });
        client.create_link_subscription("simulator", Some(listener))
    });
    let subscribe = server.recv();
    assert_eq!(subscribe["type"], "links");
    assert_eq!(subscribe["options"]["instance"], "simulator");
    server.reply_ok(1, 4);
    let subscription = opening.join().unwrap().unwrap();

    server.data(
        "links",
        4,
        1,
        json!({"type": "REGISTERED", "linkInfo": {"instance": "simulator", "name": "udp-in", "status": "OK", "dataInCount": "12"}}),
    );
    let event = rx.recv_timeout(WAIT).unwrap();
    assert!(!event.is_unregistered());
    let link = subscription.get_link("udp-in").unwrap();
    assert_eq!(link.status.as_deref(), Some("OK"));
    assert_eq!(link.data_in_count, 12);

    server.data(
        "links",
        4,
        2,
        json!({"type": "UNREGISTERED", "linkInfo": {"instance": "simulator", "name": "udp-in"}}),
    );
    assert!(rx.recv_timeout(WAIT).unwrap().is_unregistered());
    assert!(subscription.get_link("udp-in").is_none());
    assert!(subscription.list_links().is_empty());

    subscription.cancel();
}

#[test]
fn test_time_subscription_and_graceful_close() {
    let server = MockServer::start();
    let client = server.client();

    let opening = thread::spawn(move || client.create_time_subscription("simulator", None));
    server.recv();
    server.reply_ok(1, 9);
    let subscription = opening.join().unwrap().unwrap();
    assert!(subscription.time().is_none());

    server.data("time", 9, 1, json!({"value": "2026-10-14T09:00:00Z"}));
    server.close();

    assert!(subscription.result(Some(WAIT)).is_ok());
    let time = subscription.time().unwrap();
    assert_eq!(time.to_rfc3339(), "2026-10-14T09:00:00+00:00");
}
