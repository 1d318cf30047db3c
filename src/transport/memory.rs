//! In-process transport. Every bound service gets a `mem://<service>` endpoint whose
//! requests call the service's handler directly. Endpoints can be made unreachable, in
//! which case requests hang until the caller's timeout fires.

use super::{Endpoint, MessageHandler, PeerTransport};
use crate::error::PeerError;
use crate::protocol::{Message, Reply};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct State {
    names: HashMap<String, Endpoint>,
    handlers: HashMap<Endpoint, Arc<dyn MessageHandler>>,
    unreachable: HashSet<Endpoint>,
    sent: Vec<(Endpoint, Message)>,
}

/// Shared in-memory network; clone the `Arc` into every node.
#[derive(Default)]
pub struct MemoryNetwork {
    state: Mutex<State>,
}

impl MemoryNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Announce `service` and route its requests to `handler`.
    pub fn bind(&self, service: &str, handler: Arc<dyn MessageHandler>) -> Endpoint {
        let endpoint = Endpoint(format!("mem://{}", service));
        let mut state = self.lock();
        state.names.insert(service.to_string(), endpoint.clone());
        state.handlers.insert(endpoint.clone(), handler);
        endpoint
    }

    /// Drop `service` entirely: resolve fails and requests are refused.
    pub fn unbind(&self, service: &str) {
        let mut state = self.lock();
        if let Some(endpoint) = state.names.remove(service) {
            state.handlers.remove(&endpoint);
        }
    }

    /// Make requests to `service` hang (`true`) or complete again (`false`).
    pub fn set_unreachable(&self, service: &str, unreachable: bool) {
        let endpoint = Endpoint(format!("mem://{}", service));
        let mut state = self.lock();
        if unreachable {
            state.unreachable.insert(endpoint);
        } else {
            state.unreachable.remove(&endpoint);
        }
    }

    /// Every request issued so far, in issue order.
    pub fn sent(&self) -> Vec<(Endpoint, Message)> {
        self.lock().sent.clone()
    }

    /// Requests issued to `service` so far.
    pub fn sent_to(&self, service: &str) -> Vec<Message> {
        let endpoint = Endpoint(format!("mem://{}", service));
        self.lock()
            .sent
            .iter()
            .filter(|(e, _)| *e == endpoint)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn clear_sent(&self) {
        self.lock().sent.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // poisoning ignored
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PeerTransport for MemoryNetwork {
    async fn resolve(&self, service: &str) -> Result<Endpoint, PeerError> {
        self.lock()
            .names
            .get(service)
            .cloned()
            .ok_or_else(|| PeerError::Unresolved(service.to_string()))
    }

    async fn request(
        &self,
        endpoint: &Endpoint,
        message: &Message,
        timeout: Duration,
    ) -> Result<Reply, PeerError> {
        let (handler, unreachable) = {
            let mut state = self.lock();
            state.sent.push((endpoint.clone(), message.clone()));
            (
                state.handlers.get(endpoint).cloned(),
                state.unreachable.contains(endpoint),
            )
        };
        let handler = handler.ok_or_else(|| PeerError::Transport {
            endpoint: endpoint.to_string(),
            reason: "connection refused".into(),
        })?;
        let call = async {
            if unreachable {
                std::future::pending::<()>().await;
            }
            handler.handle(message.clone()).await
        };
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| PeerError::Timeout {
                endpoint: endpoint.to_string(),
                after: timeout,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl MessageHandler for Echo {
        async fn handle(&self, message: Message) -> Reply {
            Reply::new(message.action())
        }
    }

    #[tokio::test]
    async fn request_reaches_bound_handler() {
        let net = MemoryNetwork::new();
        let endpoint = net.bind("echo", Arc::new(Echo));
        assert_eq!(net.resolve("echo").await.unwrap(), endpoint);
        let reply = net
            .request(&endpoint, &Message::Ping { client_id: None }, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(reply.msg, "ping");
        assert_eq!(net.sent_to("echo").len(), 1);
    }

    #[tokio::test]
    async fn unreachable_endpoint_times_out() {
        let net = MemoryNetwork::new();
        let endpoint = net.bind("echo", Arc::new(Echo));
        net.set_unreachable("echo", true);
        let err = net
            .request(&endpoint, &Message::Ping { client_id: None }, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn unbound_service_does_not_resolve() {
        let net = MemoryNetwork::new();
        net.bind("echo", Arc::new(Echo));
        net.unbind("echo");
        let err = net
            .send("echo", &Message::Ping { client_id: None }, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err, PeerError::Unresolved("echo".into()));
    }
}
