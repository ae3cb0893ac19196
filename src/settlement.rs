use log::{trace, warn};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Weak;

use crate::clearing::Match;
use crate::trader::Participant;
use crate::types::ParticipantId;

pub(crate) type Registry = BTreeMap<ParticipantId, Weak<RefCell<dyn Participant>>>;

/// One half of a settled match, addressed to a single carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementEvent<'a> {
    Buy(&'a Match),
    Deliver(&'a Match),
}

impl<'a> SettlementEvent<'a> {
    /// The buy/deliver pair for a match, in the order they must be applied.
    pub fn pair(m: &'a Match) -> [SettlementEvent<'a>; 2] {
        [SettlementEvent::Buy(m), SettlementEvent::Deliver(m)]
    }

    pub fn recipient(&self) -> ParticipantId {
        match self {
            SettlementEvent::Buy(m) => m.buyer(),
            SettlementEvent::Deliver(m) => m.seller(),
        }
    }
}

/// Apply every match in order: `buy` on the bidder, then `deliver` on the asker.
///
/// Each participant is borrowed only for its own callback, so a participant
/// that trades with itself settles both halves without a double borrow.
pub(crate) fn settle(matches: &[Match], registry: &Registry) {
    for m in matches {
        for event in SettlementEvent::pair(m) {
            dispatch(event, registry);
        }
    }
}

fn dispatch(event: SettlementEvent<'_>, registry: &Registry) {
    let id = event.recipient();
    // Orders are only collected from registered, live carriers, and nothing
    // can unregister or drop one mid-round.
    let Some(carrier) = registry.get(&id).and_then(Weak::upgrade) else {
        warn!("settlement for unknown carrier {} dropped: {:?}", id, event);
        return;
    };
    let mut carrier = carrier.borrow_mut();
    match event {
        SettlementEvent::Buy(m) => {
            trace!("buy {} -> {}", m, id);
            carrier.buy(m);
        }
        SettlementEvent::Deliver(m) => {
            trace!("deliver {} -> {}", m, id);
            carrier.deliver(m);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Order;
    use crate::standard::StandardTrader;
    use rust_decimal_macros::dec;
    use std::rc::Rc;

    fn single_match(buyer: u32, seller: u32) -> Match {
        let mut book = crate::book::OrderBook::new("wheat".into());
        book.add(Order::ask(ParticipantId(seller), "wheat".into(), dec!(2), dec!(1)).unwrap())
            .unwrap();
        book.add(Order::bid(ParticipantId(buyer), "wheat".into(), dec!(2), dec!(3)).unwrap())
            .unwrap();
        crate::clearing::clear_book(&book).unwrap().matches.remove(0)
    }

    #[test]
    fn test_pair_routes_buy_then_deliver() {
        let m = single_match(2, 1);
        let [first, second] = SettlementEvent::pair(&m);
        assert_eq!(first, SettlementEvent::Buy(&m));
        assert_eq!(first.recipient(), ParticipantId(2));
        assert_eq!(second.recipient(), ParticipantId(1));
    }

    #[test]
    fn test_self_match_settles_both_halves() {
        let trader = Rc::new(RefCell::new(
            StandardTrader::new(ParticipantId(7), dec!(10)).with_inventory("wheat", dec!(2)),
        ));
        let mut registry = Registry::new();
        let weak: Weak<RefCell<StandardTrader>> = Rc::downgrade(&trader);
        let weak: Weak<RefCell<dyn Participant>> = weak;
        registry.insert(ParticipantId(7), weak);

        settle(&[single_match(7, 7)], &registry);
        let trader = trader.borrow();
        assert_eq!(trader.cash(), dec!(10));
        assert_eq!(trader.holding(&"wheat".into()), dec!(2));
    }

    #[test]
    fn test_missing_carrier_is_skipped() {
        let seller = Rc::new(RefCell::new(StandardTrader::new(ParticipantId(1), dec!(0))));
        let mut registry = Registry::new();
        let weak: Weak<RefCell<StandardTrader>> = Rc::downgrade(&seller);
        let weak: Weak<RefCell<dyn Participant>> = weak;
        registry.insert(ParticipantId(1), weak);

        settle(&[single_match(2, 1)], &registry);
        assert_eq!(seller.borrow().cash(), dec!(4));
    }
}
