//! Core types and IDs shared by every node.
//!
//! Identifiers are newtype wrappers. [`Order`] is the unit every node keeps in its
//! local book and the payload carried by `order` messages.

use crate::error::BookError;
use rust_decimal::Decimal;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identity of a client node (also its service name on the rendezvous).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Order identifier, unique per originating client: `<client_id>-<seq>`.
///
/// Remote and local copies of one order share this id; reconciliation matches on it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(client_id: &ClientId, seq: u64) -> Self {
        Self(format!("{}-{}", client_id.0, seq))
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Order side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// A buy or sell intention for the single traded pair.
///
/// `amount` is strictly positive while the order is resident in a book.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub side: Side,
    pub price: Decimal,
    pub amount: Decimal,
    pub client_id: ClientId,
    /// Unix timestamp in milliseconds at submission.
    pub submitted_at: u64,
}

impl Order {
    /// Builds a validated order stamped with the current wall-clock time.
    pub fn new(
        order_id: OrderId,
        side: Side,
        price: Decimal,
        amount: Decimal,
        client_id: ClientId,
    ) -> Result<Self, BookError> {
        let order = Self {
            order_id,
            side,
            price,
            amount,
            client_id,
            submitted_at: now_millis(),
        };
        order.validate()?;
        Ok(order)
    }

    /// Amount must be positive and price must be positive.
    pub fn validate(&self) -> Result<(), BookError> {
        if self.amount <= Decimal::ZERO {
            return Err(BookError::NonPositiveAmount(self.amount));
        }
        if self.price <= Decimal::ZERO {
            return Err(BookError::NonPositivePrice(self.price));
        }
        Ok(())
    }

    /// True if `self` (on one side) and `other` (on the opposite side) cross:
    /// the buy price is at or above the sell price.
    pub fn crosses(&self, other: &Order) -> bool {
        match (self.side, other.side) {
            (Side::Buy, Side::Sell) => self.price >= other.price,
            (Side::Sell, Side::Buy) => self.price <= other.price,
            _ => false,
        }
    }
}

/// Milliseconds since the unix epoch (0 if the clock is before the epoch).
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(side: Side, price: i64, amount: i64) -> Order {
        Order {
            order_id: OrderId("c-1".into()),
            side,
            price: Decimal::from(price),
            amount: Decimal::from(amount),
            client_id: ClientId::from("c"),
            submitted_at: 1,
        }
    }

    #[test]
    fn buy_crosses_sell_at_or_below_its_price() {
        let buy = order(Side::Buy, 100, 1);
        assert!(buy.crosses(&order(Side::Sell, 100, 1)));
        assert!(buy.crosses(&order(Side::Sell, 99, 1)));
        assert!(!buy.crosses(&order(Side::Sell, 101, 1)));
    }

    #[test]
    fn sell_crosses_buy_at_or_above_its_price() {
        let sell = order(Side::Sell, 100, 1);
        assert!(sell.crosses(&order(Side::Buy, 100, 1)));
        assert!(sell.crosses(&order(Side::Buy, 101, 1)));
        assert!(!sell.crosses(&order(Side::Buy, 99, 1)));
    }

    #[test]
    fn same_side_never_crosses() {
        assert!(!order(Side::Buy, 100, 1).crosses(&order(Side::Buy, 100, 1)));
    }

    #[test]
    fn new_rejects_zero_amount_and_price() {
        let id = OrderId::new(&ClientId::from("c"), 1);
        let err = Order::new(id.clone(), Side::Buy, Decimal::from(1), Decimal::ZERO, "c".into()).unwrap_err();
        assert!(matches!(err, BookError::NonPositiveAmount(_)));
        let err = Order::new(id, Side::Buy, Decimal::ZERO, Decimal::from(1), "c".into()).unwrap_err();
        assert!(matches!(err, BookError::NonPositivePrice(_)));
    }

    #[test]
    fn order_serializes_with_camel_case_fields() {
        let json = serde_json::to_value(order(Side::Sell, 100, 3)).unwrap();
        assert_eq!(json["orderId"], "c-1");
        assert_eq!(json["side"], "sell");
        assert_eq!(json["clientId"], "c");
        assert_eq!(json["amount"], "3");
        assert_eq!(json["submittedAt"], 1);
    }
}
