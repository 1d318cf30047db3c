//! Interactive command parsing for the client binary.

use crate::error::{BookError, CommandError};
use crate::execution::Trade;
use crate::order_book::OrderBook;
use crate::types::Side;
use rust_decimal::Decimal;
use std::fmt::Write;

pub const HELP: &str = "\
Available Commands:
- buy <amount> <price>: Place a buy order with the specified amount and price.
- sell <amount> <price>: Place a sell order with the specified amount and price.
- display: Show the current state of the order book and trade history.
- help: Display the list of available commands.
- exit: Close the client.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Order { side: Side, amount: Decimal, price: Decimal },
    Display,
    Help,
    Exit,
    /// Blank line.
    Nothing,
}

impl Command {
    /// Parse one input line. Amount comes before price: `buy <amount> <price>`.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut args = line.split_whitespace();
        let Some(command) = args.next() else {
            return Ok(Command::Nothing);
        };
        match command {
            "buy" | "sell" => {
                let side = if command == "buy" { Side::Buy } else { Side::Sell };
                let (Some(amount), Some(price)) = (args.next(), args.next()) else {
                    return Err(CommandError::MissingArguments);
                };
                let amount = parse_decimal(amount)?;
                let price = parse_decimal(price)?;
                if amount <= Decimal::ZERO {
                    return Err(BookError::NonPositiveAmount(amount).into());
                }
                if price <= Decimal::ZERO {
                    return Err(BookError::NonPositivePrice(price).into());
                }
                Ok(Command::Order { side, amount, price })
            }
            "display" => Ok(Command::Display),
            "help" => Ok(Command::Help),
            "exit" => Ok(Command::Exit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_decimal(s: &str) -> Result<Decimal, CommandError> {
    s.parse::<Decimal>()
        .map_err(|_| CommandError::InvalidNumber(s.to_string()))
}

/// Text shown by `display`.
pub fn render(book: &OrderBook, trades: &[Trade]) -> String {
    let mut out = String::from("Order Book:\n  Buy orders:\n");
    for o in book.buy_orders() {
        let _ = writeln!(out, "    {} {} @ {} ({})", o.order_id, o.amount, o.price, o.client_id);
    }
    out.push_str("  Sell orders:\n");
    for o in book.sell_orders() {
        let _ = writeln!(out, "    {} {} @ {} ({})", o.order_id, o.amount, o.price, o.client_id);
    }
    out.push_str("Trade History:\n");
    for t in trades {
        let _ = writeln!(
            out,
            "    {} buy={}@{} sell={}@{}",
            t.traded_amount, t.buy_order.order_id, t.buy_order.price, t.sell_order.order_id, t.sell_order.price
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClientId, Order, OrderId};

    #[test]
    fn parses_buy_and_sell_amount_then_price() {
        assert_eq!(
            Command::parse("buy 5 100.5").unwrap(),
            Command::Order {
                side: Side::Buy,
                amount: Decimal::from(5),
                price: "100.5".parse().unwrap()
            }
        );
        assert!(matches!(
            Command::parse("  sell 1 2 ").unwrap(),
            Command::Order { side: Side::Sell, .. }
        ));
    }

    #[test]
    fn missing_or_bad_arguments_are_errors() {
        assert_eq!(Command::parse("buy 5").unwrap_err(), CommandError::MissingArguments);
        assert_eq!(
            Command::parse("sell x 1").unwrap_err(),
            CommandError::InvalidNumber("x".into())
        );
        assert!(matches!(Command::parse("buy 0 1").unwrap_err(), CommandError::Order(_)));
    }

    #[test]
    fn parses_other_commands() {
        assert_eq!(Command::parse("display").unwrap(), Command::Display);
        assert_eq!(Command::parse("help").unwrap(), Command::Help);
        assert_eq!(Command::parse("exit").unwrap(), Command::Exit);
        assert_eq!(Command::parse("   ").unwrap(), Command::Nothing);
        assert_eq!(
            Command::parse("cancel 1").unwrap_err(),
            CommandError::Unknown("cancel".into())
        );
    }

    #[test]
    fn render_lists_both_sides() {
        let mut book = OrderBook::new();
        book.add_order(Order {
            order_id: OrderId("a-1".into()),
            side: Side::Buy,
            price: Decimal::from(100),
            amount: Decimal::from(2),
            client_id: ClientId::from("a"),
            submitted_at: 0,
        })
        .unwrap();
        let text = render(&book, &[]);
        assert!(text.contains("a-1 2 @ 100 (a)"));
        assert!(text.contains("Sell orders:"));
    }
}
