//! First-fit matching.
//!
//! [`match_order`] runs one incoming order against the opposite side of the book. The
//! opposite side is scanned in arrival order and the first crossing order wins, even if
//! a later resident offers a better price. At most one trade is produced per call.

use crate::error::BookError;
use crate::execution::Trade;
use crate::order_book::OrderBook;
use crate::types::{Order, Side};
use rust_decimal::Decimal;

/// Match `incoming` against `book`.
///
/// On a cross, both amounts drop by `min(incoming, resident)`; a depleted resident is
/// removed, and any leftover of `incoming` is returned as the trade's `remainder`
/// without being queued. With no cross, `incoming` is added to the book and `None`
/// is returned.
pub fn match_order(book: &mut OrderBook, mut incoming: Order) -> Result<Option<Trade>, BookError> {
    incoming.validate()?;
    let opposite = incoming.side.opposite();
    let Some((index, resident_amount)) = book.first_crossing(opposite, &incoming) else {
        book.add_order(incoming)?;
        return Ok(None);
    };

    let traded_amount = incoming.amount.min(resident_amount);
    let incoming_snapshot = incoming.clone();
    let resident_snapshot = book.take_at(opposite, index, traded_amount);
    incoming.amount -= traded_amount;

    let remainder = (incoming.amount > Decimal::ZERO).then_some(incoming);
    let (buy_order, sell_order) = match incoming_snapshot.side {
        Side::Buy => (incoming_snapshot, resident_snapshot),
        Side::Sell => (resident_snapshot, incoming_snapshot),
    };
    Ok(Some(Trade {
        buy_order,
        sell_order,
        traded_amount,
        remainder,
    }))
}
