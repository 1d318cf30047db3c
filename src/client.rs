//! Client node: one local order book plus the submit and receive paths.
//!
//! Orders the node submits go straight into its own book and out to the router.
//! Orders forwarded from other nodes are matched locally; a resulting trade is kept in
//! the node's history and broadcast through the router. Trades broadcast by other
//! nodes are reconciled into the local book.

use crate::error::{BookError, PeerError};
use crate::execution::Trade;
use crate::order_book::OrderBook;
use crate::protocol::{Message, Reply};
use crate::transport::{MessageHandler, PeerTransport};
use crate::types::{ClientId, Order, OrderId, Side};
use async_trait::async_trait;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct NodeState {
    book: OrderBook,
    trades: Vec<Trade>,
}

/// What a node did with one inbound order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderReceipt {
    /// The order is this node's own; nothing changed.
    OwnOrder,
    /// No cross; the order now rests in the local book.
    Rested,
    /// Matched locally; the trade was recorded and broadcast.
    Matched(Trade),
    /// The order failed validation.
    Rejected(BookError),
}

/// One trading node.
pub struct ClientNode {
    id: ClientId,
    server_service: String,
    transport: Arc<dyn PeerTransport>,
    request_timeout: Duration,
    next_seq: AtomicU64,
    state: Mutex<NodeState>,
}

impl ClientNode {
    pub fn new(
        id: ClientId,
        server_service: impl Into<String>,
        transport: Arc<dyn PeerTransport>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            id,
            server_service: server_service.into(),
            transport,
            request_timeout,
            next_seq: AtomicU64::new(1),
            state: Mutex::new(NodeState::default()),
        }
    }

    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// Register with the router under this node's id, announcing `port`.
    pub async fn register(&self, port: u16) -> Result<Reply, PeerError> {
        let message = Message::Register {
            service_name: self.id.clone(),
            port,
        };
        self.send_to_server(&message).await
    }

    /// Heartbeat to the router.
    pub async fn ping_server(&self) -> Result<Reply, PeerError> {
        let message = Message::Ping {
            client_id: Some(self.id.clone()),
        };
        self.send_to_server(&message).await
    }

    /// Ping the router every `interval`, logging failures, forever.
    pub async fn run_heartbeat(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.ping_server().await {
                warn!("Error sending heartbeat ping: {}", e);
            }
        }
    }

    /// Create an order, add it to the local book without matching, and send it to the router.
    pub async fn submit(&self, side: Side, amount: Decimal, price: Decimal) -> Result<Order, BookError> {
        let order = self.place(side, amount, price)?;
        if let Err(e) = self.send_to_server(&Message::Order(order.clone())).await {
            warn!("Error sending order order_id={}: {}", order.order_id, e);
        }
        Ok(order)
    }

    /// Local half of [`ClientNode::submit`].
    fn place(&self, side: Side, amount: Decimal, price: Decimal) -> Result<Order, BookError> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let order = Order::new(OrderId::new(&self.id, seq), side, price, amount, self.id.clone())?;
        self.lock().book.add_order(order.clone())?;
        info!(
            "order submitted order_id={} side={:?} amount={} price={}",
            order.order_id, order.side, order.amount, order.price
        );
        Ok(order)
    }

    /// Handle an order forwarded by the router.
    ///
    /// Own orders are skipped. Otherwise the order is matched against the local book; on a
    /// trade the remainder is queued locally and a `tradeExecuted` notification is spawned
    /// towards the router. The returned handle, if any, resolves when that send finishes.
    pub fn receive_order(&self, order: Order) -> (OrderReceipt, Option<JoinHandle<()>>) {
        if order.client_id == self.id {
            return (OrderReceipt::OwnOrder, None);
        }
        let trade = {
            let mut state = self.lock();
            let trade = match state.book.match_order(order) {
                Ok(Some(trade)) => trade,
                Ok(None) => return (OrderReceipt::Rested, None),
                Err(e) => {
                    warn!("rejected forwarded order: {}", e);
                    return (OrderReceipt::Rejected(e), None);
                }
            };
            if let Some(remainder) = trade.remainder.clone() {
                let order_id = remainder.order_id.clone();
                if let Err(e) = state.book.add_order(remainder) {
                    warn!("Error re-queuing remainder order_id={}: {}", order_id, e);
                }
            }
            state.trades.push(trade.clone());
            trade
        };
        info!(
            "trade buy_order={} sell_order={} amount={} client={}",
            trade.buy_order.order_id, trade.sell_order.order_id, trade.traded_amount, self.id
        );
        let handle = self.broadcast_trade(trade.clone());
        (OrderReceipt::Matched(trade), Some(handle))
    }

    /// Reconcile a trade broadcast by another node. Returns resident orders touched.
    pub fn receive_trade(&self, trade: &Trade, from: &ClientId) -> usize {
        if from == &self.id {
            return 0;
        }
        let touched = self.lock().book.apply_trade(trade);
        if trade.involves(&self.id) {
            info!(
                "own order traded remotely buy_order={} sell_order={} amount={} by={}",
                trade.buy_order.order_id, trade.sell_order.order_id, trade.traded_amount, from
            );
        }
        touched
    }

    fn broadcast_trade(&self, trade: Trade) -> JoinHandle<()> {
        let message = Message::TradeExecuted {
            trade,
            client_id: self.id.clone(),
        };
        let transport = Arc::clone(&self.transport);
        let service = self.server_service.clone();
        let timeout = self.request_timeout;
        tokio::spawn(async move {
            if let Err(e) = transport.send(&service, &message, timeout).await {
                warn!("Error notifying trade to other clients: {}", e);
            }
        })
    }

    async fn send_to_server(&self, message: &Message) -> Result<Reply, PeerError> {
        let reply = self
            .transport
            .send(&self.server_service, message, self.request_timeout)
            .await?;
        debug!("server replied action={} msg={}", message.action(), reply.msg);
        Ok(reply)
    }

    /// Copy of the local book.
    pub fn book(&self) -> OrderBook {
        self.lock().book.clone()
    }

    /// Trades this node executed itself, oldest first.
    pub fn trades(&self) -> Vec<Trade> {
        self.lock().trades.clone()
    }

    fn lock(&self) -> MutexGuard<'_, NodeState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl MessageHandler for ClientNode {
    async fn handle(&self, message: Message) -> Reply {
        match message {
            Message::Ping { .. } => Reply::pong(),
            Message::TradeExecuted { trade, client_id } => {
                self.receive_trade(&trade, &client_id);
                Reply::new("Trade applied to order book")
            }
            Message::Order(order) => match self.receive_order(order).0 {
                OrderReceipt::OwnOrder => Reply::new("Order added to my order book"),
                OrderReceipt::Rejected(e) => Reply::new(format!("Order rejected: {}", e)),
                OrderReceipt::Rested | OrderReceipt::Matched(_) => Reply::new("Order processing completed"),
            },
            Message::Register { .. } => Reply::generic(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryNetwork;

    struct Sink;

    #[async_trait]
    impl MessageHandler for Sink {
        async fn handle(&self, _message: Message) -> Reply {
            Reply::new("ok")
        }
    }

    fn node(net: &Arc<MemoryNetwork>, id: &str) -> ClientNode {
        ClientNode::new(ClientId::from(id), "server", net.clone(), Duration::from_millis(100))
    }

    fn remote(id: &str, side: Side, amount: i64, price: i64) -> Order {
        let client = id.split('-').next().unwrap_or(id);
        Order {
            order_id: OrderId(id.into()),
            side,
            price: Decimal::from(price),
            amount: Decimal::from(amount),
            client_id: ClientId::from(client),
            submitted_at: 0,
        }
    }

    #[tokio::test]
    async fn submit_adds_to_own_book_and_sends_to_server() {
        let net = MemoryNetwork::new();
        net.bind("server", Arc::new(Sink));
        let a = node(&net, "a");
        let order = a.submit(Side::Buy, Decimal::from(5), Decimal::from(100)).await.unwrap();
        assert_eq!(order.order_id.0, "a-1");
        assert_eq!(a.book().buy_orders(), &[order.clone()]);
        assert_eq!(net.sent_to("server"), vec![Message::Order(order)]);
    }

    #[tokio::test]
    async fn submit_still_books_locally_when_server_is_down() {
        let net = MemoryNetwork::new();
        let a = node(&net, "a");
        a.submit(Side::Sell, Decimal::from(1), Decimal::from(10)).await.unwrap();
        assert_eq!(a.book().len(), 1);
    }

    #[tokio::test]
    async fn own_forwarded_order_is_not_matched() {
        let net = MemoryNetwork::new();
        net.bind("server", Arc::new(Sink));
        let a = node(&net, "a");
        let own = a.submit(Side::Buy, Decimal::from(5), Decimal::from(100)).await.unwrap();
        net.clear_sent();
        let (receipt, handle) = a.receive_order(own);
        assert_eq!(receipt, OrderReceipt::OwnOrder);
        assert!(handle.is_none());
        assert_eq!(a.book().len(), 1, "not added a second time");
        assert!(net.sent().is_empty());
    }

    #[tokio::test]
    async fn match_records_trade_requeues_remainder_and_broadcasts() {
        let net = MemoryNetwork::new();
        net.bind("server", Arc::new(Sink));
        let b = node(&net, "b");
        b.submit(Side::Buy, Decimal::from(5), Decimal::from(100)).await.unwrap();
        net.clear_sent();

        let (receipt, handle) = b.receive_order(remote("a-1", Side::Sell, 8, 100));
        let trade = match receipt {
            OrderReceipt::Matched(trade) => trade,
            other => panic!("expected a match, got {:?}", other),
        };
        handle.expect("broadcast").await.unwrap();

        assert_eq!(trade.traded_amount, Decimal::from(5));
        assert_eq!(b.trades(), vec![trade.clone()]);
        let book = b.book();
        assert!(book.buy_orders().is_empty());
        assert_eq!(book.sell_orders()[0].amount, Decimal::from(3));
        assert_eq!(
            net.sent_to("server"),
            vec![Message::TradeExecuted {
                trade,
                client_id: ClientId::from("b")
            }]
        );
    }

    #[tokio::test]
    async fn own_trade_notification_is_ignored() {
        let net = MemoryNetwork::new();
        let b = node(&net, "b");
        b.receive_order(remote("a-1", Side::Sell, 5, 100));
        let trade = Trade {
            buy_order: remote("b-9", Side::Buy, 5, 100),
            sell_order: remote("a-1", Side::Sell, 5, 100),
            traded_amount: Decimal::from(5),
            remainder: None,
        };
        assert_eq!(b.receive_trade(&trade, &ClientId::from("b")), 0);
        assert_eq!(b.book().len(), 1);
        assert_eq!(b.receive_trade(&trade, &ClientId::from("c")), 1);
        assert!(b.book().is_empty());
    }

    #[tokio::test]
    async fn handler_replies_per_message_kind() {
        let net = MemoryNetwork::new();
        let b = node(&net, "b");
        assert!(b.handle(Message::Ping { client_id: None }).await.is_pong());
        let reply = b.handle(Message::Order(remote("a-1", Side::Buy, 1, 100))).await;
        assert_eq!(reply.msg, "Order processing completed");
        let reply = b
            .handle(Message::Register {
                service_name: ClientId::from("x"),
                port: 1,
            })
            .await;
        assert_eq!(reply, Reply::generic());
        let reply = b.handle(Message::Order(remote("a-2", Side::Buy, 0, 100))).await;
        assert!(reply.msg.starts_with("Order rejected"));
    }
}
