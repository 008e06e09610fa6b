//! # pulse-client
//!
//! Resilient client for a server-push notification channel.
//!
//! One background task per [`PulseClient`] owns the connection:
//!
//! - **Connection manager** ([`connection`]): state machine, linear-backoff
//!   reconnect, terminal failure after the retry budget
//! - **Liveness** ([`liveness`]): `ping` keep-alive and idle watchdog
//! - **Dispatch** ([`dispatcher`]): inbound frames to notifications and updates
//! - **Fan-out** ([`fanout`]): synchronous, panic-isolated update delivery
//! - **Reachability** ([`reachability`]): host visibility/network signals
//!
//! Platform capabilities sit behind traits: [`transport::Connector`] for the
//! network and [`notify::NotificationSink`] for user-facing notifications.
//! [`testing`] provides in-memory doubles for both.
//!
//! ```no_run
//! # async fn demo() -> Result<(), pulse_client::ClientError> {
//! use std::sync::Arc;
//! use pulse_client::{ClientConfig, PulseClient, TracingSink, TungsteniteConnector};
//!
//! let config = ClientConfig::default();
//! let connector = Arc::new(TungsteniteConnector::new(config.endpoint.connect_timeout));
//! let client = PulseClient::spawn(config, connector, Arc::new(TracingSink));
//! let updates = client.on_data_update(|update| println!("refresh: {}", update.kind));
//! client.connect("token")?;
//! # let _ = updates.unsubscribe();
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod endpoint;
pub mod errors;
pub mod events;
pub mod fanout;
pub mod liveness;
pub mod notify;
pub mod reachability;
pub mod testing;
pub mod transport;

pub use client::PulseClient;
pub use config::{ClientConfig, EndpointConfig, LivenessConfig, ReconnectConfig};
pub use connection::ConnectionState;
pub use errors::{ClientError, Result};
pub use events::ChannelEvent;
pub use fanout::{PublishReport, Subscription, UpdateRegistry};
pub use notify::{NotificationLevel, NotificationSink, Permission, TracingSink, UserNotification};
pub use reachability::ReachabilitySignal;
pub use transport::{Connector, TungsteniteConnector};

pub use pulse_core::{UpdateDescriptor, UpdateKind};
