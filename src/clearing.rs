use log::{debug, trace};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;

use crate::book::OrderBook;
use crate::order::Order;
use crate::types::{ParticipantId, ResourceId};

// --- Data Structures ---

/// A bid fragment and an ask fragment of equal units, settled at `price`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    bid: Order,
    ask: Order,
    price: Decimal,
}

impl Match {
    pub fn bid(&self) -> &Order {
        &self.bid
    }

    pub fn ask(&self) -> &Order {
        &self.ask
    }

    /// The clearing price of the round this match belongs to.
    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn units(&self) -> Decimal {
        self.bid.units()
    }

    pub fn resource(&self) -> &ResourceId {
        self.bid.resource()
    }

    pub fn buyer(&self) -> ParticipantId {
        self.bid.carrier()
    }

    pub fn seller(&self) -> ParticipantId {
        self.ask.carrier()
    }

    /// Cash that changes hands: `units * price`.
    pub fn value(&self) -> Decimal {
        self.units() * self.price
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} @ {} ({} -> {})",
            self.units(),
            self.resource(),
            self.price,
            self.seller(),
            self.buyer()
        )
    }
}

/// Result of clearing a single resource for one round.
#[derive(Debug, Clone)]
pub struct ResourceClearing {
    pub resource: ResourceId,
    pub clearing_price: Decimal,
    pub matched_volume: Decimal,
    pub total_ask_units: Decimal,
    pub total_bid_units: Decimal,
    pub matches: Vec<Match>,
}

// Outcome of the cross-matching walk, before a price is fixed.
#[derive(Debug)]
struct Crossing {
    pairs: Vec<(Order, Order)>,
    last_ask_price: Decimal,
    last_bid_price: Decimal,
    ask_residual: bool,
    bid_residual: bool,
}

// --- Clearing Logic ---

/// Clear one resource's book. The book must already be arranged (see
/// [`OrderBook::arrange`]): asks ascending, bids descending.
///
/// Returns `None` when the book holds no orders at all.
pub fn clear_book(book: &OrderBook) -> Option<ResourceClearing> {
    let asks = book.asks();
    let bids = book.bids();

    let (clearing_price, pairs) = match (asks.first(), bids.first()) {
        (None, None) => return None,
        // One-sided books never trade; the best quote stands as the price.
        (Some(lowest_ask), None) => (lowest_ask.price(), Vec::new()),
        (None, Some(highest_bid)) => (highest_bid.price(), Vec::new()),
        (Some(_), Some(_)) => {
            let crossing = cross(asks, bids);
            (clearing_price(&crossing), crossing.pairs)
        }
    };

    let matches: Vec<Match> = pairs
        .into_iter()
        .map(|(bid, ask)| Match {
            bid,
            ask,
            price: clearing_price,
        })
        .collect();
    let matched_volume = matches.iter().map(Match::units).sum::<Decimal>();

    debug!(
        "cleared {}: price={} volume={} matches={} (asks={} bids={})",
        book.resource(),
        clearing_price,
        matched_volume,
        matches.len(),
        book.total_ask_units(),
        book.total_bid_units()
    );

    Some(ResourceClearing {
        resource: book.resource().clone(),
        clearing_price,
        matched_volume,
        total_ask_units: book.total_ask_units(),
        total_bid_units: book.total_bid_units(),
        matches,
    })
}

// Walk the ask curve up and the bid curve down while bid >= ask, splitting
// partial fills into fragments of equal size.
fn cross(asks: &[Order], bids: &[Order]) -> Crossing {
    let mut pairs = Vec::new();

    // Without a match these stay at the best quotes and give the indicative mid.
    let mut last_ask_price = asks.first().map_or(Decimal::ZERO, Order::price);
    let mut last_bid_price = bids.first().map_or(Decimal::ZERO, Order::price);

    let mut ask_idx = 0;
    let mut bid_idx = 0;
    let mut ask_left = asks.first().map_or(Decimal::ZERO, Order::units);
    let mut bid_left = bids.first().map_or(Decimal::ZERO, Order::units);
    // Number of orders on each side reached by at least one fill.
    let mut asks_touched = 0;
    let mut bids_touched = 0;

    while let (Some(ask), Some(bid)) = (asks.get(ask_idx), bids.get(bid_idx)) {
        // Exhausted orders (and zero-unit ones) advance their cursor; when both
        // exhaust on the same fill both cursors move before the next comparison.
        if ask_left.is_zero() {
            ask_idx += 1;
            ask_left = asks.get(ask_idx).map_or(Decimal::ZERO, Order::units);
            continue;
        }
        if bid_left.is_zero() {
            bid_idx += 1;
            bid_left = bids.get(bid_idx).map_or(Decimal::ZERO, Order::units);
            continue;
        }
        if bid.price() < ask.price() {
            break;
        }

        let units = ask_left.min(bid_left);
        trace!("fill {} {}: {} against {}", units, ask.resource(), bid, ask);
        pairs.push((bid.fragment(units), ask.fragment(units)));

        last_ask_price = ask.price();
        last_bid_price = bid.price();
        asks_touched = ask_idx + 1;
        bids_touched = bid_idx + 1;
        ask_left -= units;
        bid_left -= units;
    }

    Crossing {
        pairs,
        last_ask_price,
        last_bid_price,
        ask_residual: has_untouched_units(&asks[asks_touched..]),
        bid_residual: has_untouched_units(&bids[bids_touched..]),
    }
}

fn has_untouched_units(orders: &[Order]) -> bool {
    orders.iter().any(|o| o.units() > Decimal::ZERO)
}

fn clearing_price(crossing: &Crossing) -> Decimal {
    let mid = (crossing.last_ask_price + crossing.last_bid_price) / dec!(2);
    if crossing.pairs.is_empty() {
        return mid;
    }
    match (crossing.ask_residual, crossing.bid_residual) {
        (false, true) => crossing.last_bid_price,
        (true, false) => crossing.last_ask_price,
        _ => mid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: ParticipantId = ParticipantId(1);
    const BOB: ParticipantId = ParticipantId(2);
    const CAROL: ParticipantId = ParticipantId(3);
    const DAVID: ParticipantId = ParticipantId(4);

    // Builds a book already in price order; tests here pin the walk, not the shuffle.
    fn book(asks: Vec<(ParticipantId, Decimal, Decimal)>, bids: Vec<(ParticipantId, Decimal, Decimal)>) -> OrderBook {
        let mut book = OrderBook::new("wheat".into());
        for (p, units, price) in asks {
            book.add(Order::ask(p, "wheat".into(), units, price).unwrap()).unwrap();
        }
        for (p, units, price) in bids {
            book.add(Order::bid(p, "wheat".into(), units, price).unwrap()).unwrap();
        }
        book
    }

    #[test]
    fn test_exact_fit_clears_at_mid() {
        let book = book(vec![(ALICE, dec!(10), dec!(2.0))], vec![(BOB, dec!(10), dec!(3.0))]);
        let clearing = clear_book(&book).unwrap();

        assert_eq!(clearing.clearing_price, dec!(2.5));
        assert_eq!(clearing.matches.len(), 1);
        let m = &clearing.matches[0];
        assert_eq!(m.units(), dec!(10));
        assert_eq!(m.buyer(), BOB);
        assert_eq!(m.seller(), ALICE);
        assert_eq!(m.value(), dec!(25.0));
        assert_eq!(clearing.matched_volume, dec!(10));
    }

    #[test]
    fn test_partial_fill_on_ask_side() {
        let book = book(vec![(ALICE, dec!(10), dec!(2.0))], vec![(BOB, dec!(6), dec!(3.0))]);
        let clearing = clear_book(&book).unwrap();

        assert_eq!(clearing.matches.len(), 1);
        assert_eq!(clearing.matches[0].bid().units(), dec!(6));
        assert_eq!(clearing.matches[0].ask().units(), dec!(6));
        assert_eq!(clearing.clearing_price, dec!(2.5));
        // source order untouched
        assert_eq!(book.asks()[0].units(), dec!(10));
    }

    #[test]
    fn test_no_cross_gives_indicative_mid() {
        let book = book(vec![(ALICE, dec!(5), dec!(4.0))], vec![(BOB, dec!(5), dec!(3.0))]);
        let clearing = clear_book(&book).unwrap();

        assert!(clearing.matches.is_empty());
        assert_eq!(clearing.clearing_price, dec!(3.5));
        assert_eq!(clearing.matched_volume, dec!(0));
    }

    #[test]
    fn test_one_sided_books() {
        let asks_only = book(vec![(ALICE, dec!(3), dec!(5.0)), (CAROL, dec!(3), dec!(6.0))], vec![]);
        let clearing = clear_book(&asks_only).unwrap();
        assert!(clearing.matches.is_empty());
        assert_eq!(clearing.clearing_price, dec!(5.0));

        let bids_only = book(vec![], vec![(BOB, dec!(3), dec!(4.0)), (DAVID, dec!(1), dec!(1.0))]);
        let clearing = clear_book(&bids_only).unwrap();
        assert!(clearing.matches.is_empty());
        assert_eq!(clearing.clearing_price, dec!(4.0));

        assert!(clear_book(&OrderBook::new("wheat".into())).is_none());
    }

    #[test]
    fn test_walk_splits_across_several_orders() {
        // asks: 4 @ 1, 4 @ 2, 4 @ 5; bids: 6 @ 4, 5 @ 3
        let book = book(
            vec![(ALICE, dec!(4), dec!(1)), (CAROL, dec!(4), dec!(2)), (ALICE, dec!(4), dec!(5))],
            vec![(BOB, dec!(6), dec!(4)), (DAVID, dec!(5), dec!(3))],
        );
        let clearing = clear_book(&book).unwrap();

        let sizes: Vec<_> = clearing.matches.iter().map(Match::units).collect();
        assert_eq!(sizes, vec![dec!(4), dec!(2), dec!(2)]);
        for m in &clearing.matches {
            assert_eq!(m.bid().units(), m.ask().units());
        }
        // walk stops at ask 5 > bid 3; the 5-ask was never touched while the last
        // bid was partly filled, so only the ask side has residual orders
        assert_eq!(clearing.matched_volume, dec!(8));
        assert_eq!(clearing.clearing_price, dec!(2));
    }

    #[test]
    fn test_residual_bids_price_at_last_bid() {
        // one ask fully consumed; a second bid is never reached
        let book = book(
            vec![(ALICE, dec!(5), dec!(1.0))],
            vec![(BOB, dec!(5), dec!(3.0)), (DAVID, dec!(2), dec!(2.0))],
        );
        let clearing = clear_book(&book).unwrap();
        assert_eq!(clearing.matches.len(), 1);
        assert_eq!(clearing.clearing_price, dec!(3.0));
    }

    #[test]
    fn test_residual_asks_price_at_last_ask() {
        let book = book(
            vec![(ALICE, dec!(5), dec!(1.0)), (CAROL, dec!(5), dec!(1.5))],
            vec![(BOB, dec!(5), dec!(3.0))],
        );
        let clearing = clear_book(&book).unwrap();
        assert_eq!(clearing.matches.len(), 1);
        assert_eq!(clearing.clearing_price, dec!(1.0));
    }

    #[test]
    fn test_simultaneous_exhaustion_uses_last_pair() {
        // 3 @ 1 vs 3 @ 4 exhausts both; next pair 2 @ 2 vs 2 @ 3 also crosses
        let book = book(
            vec![(ALICE, dec!(3), dec!(1)), (CAROL, dec!(2), dec!(2))],
            vec![(BOB, dec!(3), dec!(4)), (DAVID, dec!(2), dec!(3))],
        );
        let clearing = clear_book(&book).unwrap();
        assert_eq!(clearing.matches.len(), 2);
        assert_eq!(clearing.clearing_price, dec!(2.5));
        for m in &clearing.matches {
            assert!(m.ask().price() <= m.price() && m.price() <= m.bid().price());
        }
    }

    #[test]
    fn test_zero_unit_orders_are_skipped() {
        let book = book(
            vec![(ALICE, dec!(0), dec!(1.0)), (CAROL, dec!(2), dec!(2.0))],
            vec![(BOB, dec!(0), dec!(9.0)), (DAVID, dec!(2), dec!(3.0))],
        );
        let clearing = clear_book(&book).unwrap();
        assert_eq!(clearing.matches.len(), 1);
        assert_eq!(clearing.matches[0].seller(), CAROL);
        assert_eq!(clearing.matches[0].buyer(), DAVID);
        assert_eq!(clearing.clearing_price, dec!(2.5));
    }
}
