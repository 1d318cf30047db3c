//! Peer transport capability: resolve a service name, send a request with a timeout,
//! and accept inbound requests through a [`MessageHandler`].
//!
//! [`http`] talks JSON over HTTP through the rendezvous service; [`memory`] wires nodes
//! together in-process for tests and simulations.

pub mod http;
pub mod memory;

use crate::error::PeerError;
use crate::protocol::{Message, Reply};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

pub use http::HttpTransport;
pub use memory::MemoryNetwork;

/// Reachable address of a node, as returned by [`PeerTransport::resolve`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Endpoint(pub String);

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outbound side of the transport.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Look up the endpoint currently announced under `service`.
    async fn resolve(&self, service: &str) -> Result<Endpoint, PeerError>;

    /// Send one request and wait at most `timeout` for the reply.
    async fn request(
        &self,
        endpoint: &Endpoint,
        message: &Message,
        timeout: Duration,
    ) -> Result<Reply, PeerError>;

    /// Resolve `service` and send `message` to it; the whole call shares one `timeout`.
    async fn send(&self, service: &str, message: &Message, timeout: Duration) -> Result<Reply, PeerError> {
        let call = async {
            let endpoint = self.resolve(service).await?;
            self.request(&endpoint, message, timeout).await
        };
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(PeerError::Timeout {
                endpoint: service.to_string(),
                after: timeout,
            }),
        }
    }
}

/// Inbound side: whatever a node does with a request it receives.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: Message) -> Reply;
}

/// Decode a raw JSON payload and hand it to `handler`. Payloads that do not decode get
/// the generic completion reply rather than an error.
pub async fn dispatch(handler: &dyn MessageHandler, payload: serde_json::Value) -> Reply {
    match Message::decode(payload) {
        Ok(message) => handler.handle(message).await,
        Err(e) => {
            log::warn!("{}", e);
            Reply::generic()
        }
    }
}
