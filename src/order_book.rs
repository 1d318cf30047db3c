//! Per-node order book: resident buys and sells in arrival order.
//!
//! Supports add, first-fit taking (used by [`crate::matching`]) and reconciliation of
//! trades executed on other nodes. Every resident order has a positive amount; an
//! order that reaches zero is removed.

use crate::error::BookError;
use crate::execution::Trade;
use crate::matching;
use crate::types::{Order, OrderId, Side};
use log::debug;
use rust_decimal::Decimal;

/// Order book owned by exactly one node.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBook {
    buy_orders: Vec<Order>,
    sell_orders: Vec<Order>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an order to its side. Does not run matching; callers use [`OrderBook::match_order`] for that.
    pub fn add_order(&mut self, order: Order) -> Result<(), BookError> {
        order.validate()?;
        self.side_mut(order.side).push(order);
        Ok(())
    }

    /// Match `incoming` against the opposite side, first fit. See [`matching::match_order`].
    pub fn match_order(&mut self, incoming: Order) -> Result<Option<Trade>, BookError> {
        matching::match_order(self, incoming)
    }

    /// Reconcile a trade executed elsewhere: set each side's resident copy to its
    /// post-trade amount and drop copies that reach zero.
    ///
    /// Amounts only move down, so applying the same trade twice (or a stale duplicate)
    /// leaves the book as applying it once. Returns the number of resident orders touched;
    /// zero means none of the traded orders is resident here.
    pub fn apply_trade(&mut self, trade: &Trade) -> usize {
        let touched = Self::reconcile(&mut self.buy_orders, &trade.buy_order.order_id, trade.buy_remaining())
            + Self::reconcile(&mut self.sell_orders, &trade.sell_order.order_id, trade.sell_remaining());
        if touched == 0 {
            debug!(
                "reconciliation miss buy_order={} sell_order={}",
                trade.buy_order.order_id, trade.sell_order.order_id
            );
        }
        touched
    }

    fn reconcile(orders: &mut Vec<Order>, order_id: &OrderId, remaining: Decimal) -> usize {
        let mut touched = 0;
        for order in orders.iter_mut().filter(|o| &o.order_id == order_id) {
            order.amount = order.amount.min(remaining);
            touched += 1;
        }
        orders.retain(|o| o.amount > Decimal::ZERO);
        touched
    }

    /// Index and amount of the earliest-arrived order on `side` that crosses `incoming`.
    pub(crate) fn first_crossing(&self, side: Side, incoming: &Order) -> Option<(usize, Decimal)> {
        self.side(side)
            .iter()
            .enumerate()
            .find(|(_, resident)| incoming.crosses(resident))
            .map(|(i, resident)| (i, resident.amount))
    }

    /// Take `amount` from the resident order at `index` on `side`. Returns the
    /// resident's pre-trade snapshot; removes it if depleted.
    pub(crate) fn take_at(&mut self, side: Side, index: usize, amount: Decimal) -> Order {
        let orders = self.side_mut(side);
        let snapshot = orders[index].clone();
        orders[index].amount -= amount;
        if orders[index].amount <= Decimal::ZERO {
            orders.remove(index);
        }
        snapshot
    }

    fn side(&self, side: Side) -> &Vec<Order> {
        match side {
            Side::Buy => &self.buy_orders,
            Side::Sell => &self.sell_orders,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut Vec<Order> {
        match side {
            Side::Buy => &mut self.buy_orders,
            Side::Sell => &mut self.sell_orders,
        }
    }

    /// Resident buys in arrival order.
    pub fn buy_orders(&self) -> &[Order] {
        &self.buy_orders
    }

    /// Resident sells in arrival order.
    pub fn sell_orders(&self) -> &[Order] {
        &self.sell_orders
    }

    pub fn find(&self, order_id: &OrderId) -> Option<&Order> {
        self.buy_orders
            .iter()
            .chain(self.sell_orders.iter())
            .find(|o| &o.order_id == order_id)
    }

    pub fn len(&self) -> usize {
        self.buy_orders.len() + self.sell_orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
