//! # Peer Exchange
//!
//! Peer-to-peer trading simulation. Every client node keeps its own order book and
//! matches orders forwarded by a central router; the router keeps a liveness-probed
//! registry of clients and relays orders and trade notifications to everyone except the
//! originator. Books converge through trade reconciliation.
//!
//! ## Entry points
//!
//! - [`ClientNode`]: submit orders, handle forwarded orders and trades.
//! - [`MessageRouter`] + [`PeerRegistry`] + [`Prober`]: the server side.
//! - [`transport`]: HTTP (reqwest/axum via a rendezvous directory) or in-memory.
//!
//! ## Example
//!
//! ```rust
//! use peer_exchange::{ClientId, Order, OrderBook, OrderId, Side};
//! use rust_decimal::Decimal;
//!
//! let alice = ClientId::from("alice");
//! let bob = ClientId::from("bob");
//! let mut book = OrderBook::new();
//! let buy = Order::new(OrderId::new(&alice, 1), Side::Buy, Decimal::from(100), Decimal::from(5), alice).unwrap();
//! book.add_order(buy).unwrap();
//!
//! let sell = Order::new(OrderId::new(&bob, 1), Side::Sell, Decimal::from(100), Decimal::from(8), bob).unwrap();
//! let trade = book.match_order(sell).unwrap().expect("crosses");
//! assert_eq!(trade.traded_amount, Decimal::from(5));
//! assert_eq!(trade.remainder.unwrap().amount, Decimal::from(3));
//! assert!(book.is_empty());
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod execution;
pub mod matching;
pub mod order_book;
pub mod order_gen;
pub mod protocol;
pub mod registry;
pub mod rendezvous;
pub mod router;
pub mod transport;
pub mod types;

pub use client::{ClientNode, OrderReceipt};
pub use config::{ClientConfig, RendezvousConfig, ServerConfig};
pub use error::{BookError, CommandError, ConfigError, PeerError};
pub use execution::Trade;
pub use matching::match_order;
pub use order_book::OrderBook;
pub use order_gen::{replay_into_book, Generator, GeneratorConfig};
pub use protocol::{Message, Reply};
pub use registry::{PeerEntry, PeerRegistry, ProbeReport, Prober};
pub use router::{FanOut, ForwardOutcome, MessageRouter};
pub use transport::{Endpoint, HttpTransport, MemoryNetwork, MessageHandler, PeerTransport};
pub use types::{ClientId, Order, OrderId, Side};
