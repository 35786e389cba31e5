//! Core library for service-mocker.
//!
//! Routes intercepted page requests to mock handlers. Requests reach the
//! [`router::Router`] either through an interception worker
//! ([`transport::ModernTransport`]) or through a same-origin controller frame
//! ([`transport::LegacyTransport`]); [`client::create_client`] picks one.

pub mod client;
pub mod config;
pub mod http;
pub mod matching;
pub mod router;
pub mod transport;
pub mod types;

pub use client::{create_client, Environment, MockerClient};
pub use http::{NativeRequest, NativeResponse, ReadBody};
pub use router::{MockRequest, MockResponse, Router};
pub use transport::{FailurePolicy, Mode, Network, Transport, TransportError};

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
