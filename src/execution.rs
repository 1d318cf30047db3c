//! Executed trades.
//!
//! A [`Trade`] is emitted for each match between a buy and a sell. It owns snapshots
//! of both orders taken at match time, so later book mutations never change it.

use crate::types::{ClientId, Order};
use rust_decimal::Decimal;

/// Immutable record of one executed match.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    /// Buy order as it was just before the match.
    pub buy_order: Order,
    /// Sell order as it was just before the match.
    pub sell_order: Order,
    pub traded_amount: Decimal,
    /// Leftover of the incoming order, if it was not fully filled. Not re-queued by matching.
    pub remainder: Option<Order>,
}

impl Trade {
    /// Amount left on the buy order after this trade.
    pub fn buy_remaining(&self) -> Decimal {
        self.buy_order.amount - self.traded_amount
    }

    /// Amount left on the sell order after this trade.
    pub fn sell_remaining(&self) -> Decimal {
        self.sell_order.amount - self.traded_amount
    }

    /// True if either side of the trade belongs to `client`.
    pub fn involves(&self, client: &ClientId) -> bool {
        &self.buy_order.client_id == client || &self.sell_order.client_id == client
    }
}
