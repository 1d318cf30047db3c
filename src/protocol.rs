//! Wire messages exchanged between clients and the router.
//!
//! JSON objects tagged by `action`, with camelCase fields. Decimals travel as strings.

use crate::error::PeerError;
use crate::execution::Trade;
use crate::types::{ClientId, Order};

/// Reply text sent for a request the receiver cannot classify.
pub const GENERIC_REPLY: &str = "Request processed";

/// Every message kind a node can receive.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Message {
    /// Client announces itself to the router under `service_name`.
    #[serde(rename_all = "camelCase")]
    Register { service_name: ClientId, port: u16 },
    /// Liveness probe; clients send it with their id, the prober sends it bare.
    #[serde(rename_all = "camelCase")]
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<ClientId>,
    },
    /// New order; `order.client_id` is the originator.
    Order(Order),
    /// Trade executed by `client_id`.
    #[serde(rename_all = "camelCase")]
    TradeExecuted { trade: Trade, client_id: ClientId },
}

impl Message {
    /// Decode an inbound JSON payload. Unknown actions and bad fields are [`PeerError::Malformed`].
    pub fn decode(value: serde_json::Value) -> Result<Self, PeerError> {
        serde_json::from_value(value).map_err(|e| PeerError::Malformed(e.to_string()))
    }

    /// Identity that produced this message, if it names one.
    pub fn origin(&self) -> Option<&ClientId> {
        match self {
            Message::Register { service_name, .. } => Some(service_name),
            Message::Ping { client_id } => client_id.as_ref(),
            Message::Order(order) => Some(&order.client_id),
            Message::TradeExecuted { client_id, .. } => Some(client_id),
        }
    }

    /// Short name for logs, matching the wire `action`.
    pub fn action(&self) -> &'static str {
        match self {
            Message::Register { .. } => "register",
            Message::Ping { .. } => "ping",
            Message::Order(_) => "order",
            Message::TradeExecuted { .. } => "tradeExecuted",
        }
    }
}

/// Response to any request.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Reply {
    pub msg: String,
}

impl Reply {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }

    pub fn pong() -> Self {
        Self::new("pong")
    }

    pub fn generic() -> Self {
        Self::new(GENERIC_REPLY)
    }

    pub fn is_pong(&self) -> bool {
        self.msg == "pong"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderId, Side};
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn decodes_register() {
        let msg = Message::decode(json!({
            "action": "register",
            "serviceName": "client_1",
            "port": 1500
        }))
        .unwrap();
        assert_eq!(
            msg,
            Message::Register {
                service_name: ClientId::from("client_1"),
                port: 1500
            }
        );
    }

    #[test]
    fn decodes_ping_with_and_without_client_id() {
        assert_eq!(
            Message::decode(json!({ "action": "ping" })).unwrap(),
            Message::Ping { client_id: None }
        );
        let msg = Message::decode(json!({ "action": "ping", "clientId": "c" })).unwrap();
        assert_eq!(msg.origin(), Some(&ClientId::from("c")));
    }

    #[test]
    fn order_is_flat_on_the_wire() {
        let msg = Message::Order(Order {
            order_id: OrderId("c-1".into()),
            side: Side::Buy,
            price: Decimal::from(100),
            amount: "2.5".parse().unwrap(),
            client_id: ClientId::from("c"),
            submitted_at: 7,
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "action": "order",
                "orderId": "c-1",
                "side": "buy",
                "price": "100",
                "amount": "2.5",
                "clientId": "c",
                "submittedAt": 7
            })
        );
        assert_eq!(Message::decode(value).unwrap(), msg);
    }

    #[test]
    fn unknown_action_is_malformed() {
        let err = Message::decode(json!({ "action": "cancel", "clientId": "c" })).unwrap_err();
        assert!(matches!(err, PeerError::Malformed(_)));
        let err = Message::decode(json!({ "clientId": "c" })).unwrap_err();
        assert!(matches!(err, PeerError::Malformed(_)));
    }

    #[test]
    fn reply_pong() {
        assert!(Reply::pong().is_pong());
        assert!(!Reply::generic().is_pong());
        assert_eq!(serde_json::to_value(Reply::pong()).unwrap(), json!({ "msg": "pong" }));
    }
}
