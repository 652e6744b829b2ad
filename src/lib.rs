//! # Yamcs Rust Client
//!
//! A client library for [Yamcs](https://yamcs.org), the open source mission control
//! framework. It wraps the server's REST API and its multiplexed WebSocket subscription
//! protocol behind typed, blocking interfaces.
//!
//! ## Features
//!
//! - **Request/reply calls**: server and instance information, links, processors,
//!   parameter values, with status codes mapped onto [`utils::YamcsError`].
//! - **Subscriptions**: parameters, alarms, command history, links, mission time, COP-1
//!   status, file transfers and streams. Each subscription owns one WebSocket connection,
//!   keeps a local cache of the most recent data, and pushes updates to an optional
//!   listener.
//! - **Futures**: every subscription is a [`subscription::SubscriptionFuture`] that can
//!   be awaited with a timeout, inspected, or cancelled.
//! - **Credentials**: bearer tokens with automatic refresh, or a static API key.
//!
//! ## Subscription lifecycle
//!
//! A subscription is opened, confirmed by the server's first reply, then delivers data
//! until it is closed. There is no automatic reconnection: when the future completes the
//! caller creates a new subscription if it wants to retry.
//!
//! ```text
//! Opening ──reply──▶ Confirmed ──data*──▶ Closed
//!    │                   │
//!    └──rejected──▶ Failed ◀──error──┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use yamcs_rs::client::{ClientConfig, YamcsClient};
//! use yamcs_rs::subscription::ParameterSubscriptionOptions;
//! use yamcs_rs::subscription::model::ParameterData;
//! use yamcs_rs::utils::setup_logger;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     setup_logger();
//!
//!     let client = YamcsClient::new(ClientConfig::new("localhost:8090"))?;
//!     let processor = client.get_processor("simulator", "realtime");
//!
//!     let subscription = processor.create_parameter_subscription(
//!         &["/YSS/SIMULATOR/BatteryVoltage1"],
//!         Some(Box::new(|data: &ParameterData| {
//!             for value in &data.parameters {
//!                 println!("{} = {:?}", value.name, value.eng_value);
//!             }
//!         })),
//!         ParameterSubscriptionOptions::default(),
//!     )?;
//!
//!     std::thread::sleep(std::time::Duration::from_secs(10));
//!     println!("Last: {:?}", subscription.get_value("/YSS/SIMULATOR/BatteryVoltage1"));
//!     subscription.cancel();
//!     Ok(())
//! }
//! ```
//!

/// Module containing subscription-related functionality.
///
/// This module provides the subscription future, the topic enum with its tagged payload
/// union, the decoded domain model, and the typed per-topic subscriptions with their
/// caches.
pub mod subscription;

/// Module containing utility functions and error types.
///
/// This module provides the error taxonomy, logger setup and time helpers used
/// throughout the library.
pub mod utils;

/// Module containing client-related functionality.
///
/// This module provides the main `YamcsClient` type, its configuration and credentials,
/// and the request context used for plain REST calls.
pub mod client;

/// Module containing connection-related functionality.
///
/// This module provides the endpoint resolution, the wire envelopes and the WebSocket
/// subscription manager.
pub mod connection;
