//! Server-side message router.
//!
//! Single entry point for inbound peer messages. Registrations and pings are answered
//! locally; orders and trade notifications are relayed to every registered peer except
//! their originator. The router keeps no book or trade state.

use crate::protocol::{Message, Reply};
use crate::registry::PeerRegistry;
use crate::transport::{MessageHandler, PeerTransport};
use crate::types::ClientId;
use async_trait::async_trait;
use futures_util::future::join_all;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Outcome of forwarding one message to one recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardOutcome {
    pub recipient: ClientId,
    pub delivered: bool,
}

/// Forwards dispatched for one message. Dropping it leaves the forwards running.
#[derive(Debug)]
pub struct FanOut {
    /// Peers a forward was spawned for, in registry order.
    pub recipients: Vec<ClientId>,
    handles: Vec<JoinHandle<ForwardOutcome>>,
}

impl FanOut {
    /// Wait for every forward to finish. One outcome per recipient, in order; a forward
    /// task that panicked counts as not delivered.
    pub async fn join(self) -> Vec<ForwardOutcome> {
        let joined = join_all(self.handles).await;
        self.recipients
            .into_iter()
            .zip(joined)
            .map(|(recipient, result)| match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("forward task failed recipient={}: {}", recipient, e);
                    ForwardOutcome {
                        recipient,
                        delivered: false,
                    }
                }
            })
            .collect()
    }
}

/// Fan-out relay over the peer registry.
pub struct MessageRouter {
    registry: Arc<PeerRegistry>,
    transport: Arc<dyn PeerTransport>,
    forward_timeout: Duration,
}

impl MessageRouter {
    pub fn new(registry: Arc<PeerRegistry>, transport: Arc<dyn PeerTransport>, forward_timeout: Duration) -> Self {
        Self {
            registry,
            transport,
            forward_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<PeerRegistry> {
        &self.registry
    }

    /// Classify and act on one message. Orders and trades are dispatched (spawned) to all
    /// other peers before the reply is returned; their completion is not awaited.
    pub fn route(&self, message: Message) -> (Reply, Option<FanOut>) {
        match message {
            Message::Register { ref service_name, port } => {
                if self.registry.register(service_name.clone()) {
                    info!("Client registered client={} port={}", service_name, port);
                }
                (Reply::new("Client registered"), None)
            }
            Message::Ping { .. } => (Reply::pong(), None),
            Message::TradeExecuted { ref client_id, .. } => {
                let origin = client_id.clone();
                let fan_out = self.fan_out(message, &origin);
                (Reply::new("Trade notification forwarded to clients"), Some(fan_out))
            }
            Message::Order(ref order) => {
                let origin = order.client_id.clone();
                let fan_out = self.fan_out(message, &origin);
                (Reply::new("Order forwarded to clients"), Some(fan_out))
            }
        }
    }

    /// Send `message` verbatim to every registered peer except `origin`, one concurrent
    /// request per peer with its own timeout. Failures are logged only.
    pub fn fan_out(&self, message: Message, origin: &ClientId) -> FanOut {
        let recipients: Vec<ClientId> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|peer| peer != origin)
            .collect();
        let message = Arc::new(message);
        let handles = recipients
            .iter()
            .cloned()
            .map(|recipient| {
                let transport = Arc::clone(&self.transport);
                let message = Arc::clone(&message);
                let timeout = self.forward_timeout;
                let origin = origin.clone();
                tokio::spawn(async move {
                    info!("Forwarding {} from {} to {}", message.action(), origin, recipient);
                    let delivered = match transport.send(recipient.as_str(), &message, timeout).await {
                        Ok(reply) => {
                            info!("forward ok recipient={} reply={}", recipient, reply.msg);
                            true
                        }
                        Err(e) => {
                            warn!("Failed to send {} to client {}: {}", message.action(), recipient, e);
                            false
                        }
                    };
                    ForwardOutcome { recipient, delivered }
                })
            })
            .collect();
        FanOut { recipients, handles }
    }
}

#[async_trait]
impl MessageHandler for MessageRouter {
    async fn handle(&self, message: Message) -> Reply {
        let (reply, _dispatched) = self.route(message);
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryNetwork;
    use crate::types::{Order, OrderId, Side};
    use rust_decimal::Decimal;

    struct Recorder;

    #[async_trait]
    impl MessageHandler for Recorder {
        async fn handle(&self, _message: Message) -> Reply {
            Reply::new("ok")
        }
    }

    fn order_from(client: &str) -> Message {
        Message::Order(Order {
            order_id: OrderId(format!("{}-1", client)),
            side: Side::Buy,
            price: Decimal::from(100),
            amount: Decimal::from(1),
            client_id: ClientId::from(client),
            submitted_at: 0,
        })
    }

    fn router_with(net: &Arc<MemoryNetwork>, peers: &[&str]) -> MessageRouter {
        let registry = Arc::new(PeerRegistry::new());
        for peer in peers {
            net.bind(peer, Arc::new(Recorder));
            registry.register(ClientId::from(*peer));
        }
        MessageRouter::new(registry, net.clone(), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn register_and_ping_reply_locally() {
        let net = MemoryNetwork::new();
        let router = router_with(&net, &[]);
        let reply = router
            .handle(Message::Register {
                service_name: ClientId::from("a"),
                port: 1,
            })
            .await;
        assert_eq!(reply.msg, "Client registered");
        router
            .handle(Message::Register {
                service_name: ClientId::from("a"),
                port: 1,
            })
            .await;
        assert_eq!(router.registry().len(), 1, "re-registration is a no-op");
        assert!(router.handle(Message::Ping { client_id: None }).await.is_pong());
        assert!(net.sent().is_empty());
    }

    #[tokio::test]
    async fn order_is_forwarded_to_everyone_but_its_originator() {
        let net = MemoryNetwork::new();
        let router = router_with(&net, &["a", "b", "c"]);
        let (reply, fan_out) = router.route(order_from("a"));
        assert_eq!(reply.msg, "Order forwarded to clients");
        let fan_out = fan_out.expect("fan out");
        assert_eq!(fan_out.recipients, vec![ClientId::from("b"), ClientId::from("c")]);
        let outcomes = fan_out.join().await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.delivered));
        assert!(net.sent_to("a").is_empty());
        assert_eq!(net.sent_to("b"), vec![order_from("a")]);
        assert_eq!(net.sent_to("c"), vec![order_from("a")]);
    }

    #[tokio::test]
    async fn failed_forward_does_not_block_the_others() {
        let net = MemoryNetwork::new();
        let router = router_with(&net, &["a", "b", "c"]);
        net.set_unreachable("b", true);
        let (_, fan_out) = router.route(order_from("a"));
        let outcomes = fan_out.expect("fan out").join().await;
        let delivered: Vec<_> = outcomes
            .iter()
            .filter(|o| o.delivered)
            .map(|o| o.recipient.as_str())
            .collect();
        assert_eq!(delivered, ["c"]);
        // forwarding failures never touch the registry; only probes prune
        assert!(router.registry().contains(&ClientId::from("b")));
    }

    #[tokio::test]
    async fn reply_is_returned_before_forwards_complete() {
        let net = MemoryNetwork::new();
        let router = router_with(&net, &["a", "b"]);
        net.set_unreachable("b", true);
        let started = std::time::Instant::now();
        let reply = router.handle(order_from("a")).await;
        assert_eq!(reply.msg, "Order forwarded to clients");
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    struct Crash;

    #[async_trait]
    impl MessageHandler for Crash {
        async fn handle(&self, _message: Message) -> Reply {
            panic!("handler crashed");
        }
    }

    #[tokio::test]
    async fn panicked_forward_is_reported_as_undelivered() {
        let net = MemoryNetwork::new();
        let router = router_with(&net, &["a", "b", "c"]);
        net.bind("b", Arc::new(Crash));
        let (_, fan_out) = router.route(order_from("a"));
        let outcomes = fan_out.expect("fan out").join().await;
        assert_eq!(
            outcomes,
            vec![
                ForwardOutcome {
                    recipient: ClientId::from("b"),
                    delivered: false
                },
                ForwardOutcome {
                    recipient: ClientId::from("c"),
                    delivered: true
                },
            ]
        );
    }
}
