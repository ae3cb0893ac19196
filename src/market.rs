use log::{debug, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::book::OrderBooks;
use crate::clearing::{Match, ResourceClearing, clear_book};
use crate::settlement::{Registry, settle};
use crate::trader::Participant;
use crate::types::{Inventory, ParticipantId, ResourceId};

/// Everything one call to [`Market::trade`] produced, one entry per active resource.
#[derive(Debug, Clone, Default)]
pub struct RoundReport {
    pub round: usize,
    pub clearings: Vec<ResourceClearing>,
}

impl RoundReport {
    pub fn clearing(&self, resource: &ResourceId) -> Option<&ResourceClearing> {
        self.clearings.iter().find(|c| &c.resource == resource)
    }

    pub fn matches(&self) -> impl Iterator<Item = &Match> {
        self.clearings.iter().flat_map(|c| c.matches.iter())
    }

    pub fn match_count(&self) -> usize {
        self.clearings.iter().map(|c| c.matches.len()).sum()
    }
}

/// A discrete-round double-auction market.
///
/// The market holds participants weakly: callers own them as
/// `Rc<RefCell<_>>` and keep them alive for as long as they should trade.
///
/// Registrations live in a map ordered by id, so `add` and `remove` are
/// O(log n) rather than O(1). In exchange every round polls participants in
/// the same order, and a fixed seed replays identical matches.
pub struct Market {
    participants: Registry,
    last_prices: HashMap<ResourceId, Decimal>,
    rng: StdRng,
    round: usize,
}

impl Market {
    /// An empty market whose tie-breaking is seeded from the OS.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// An empty market with reproducible tie-breaking.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            participants: Registry::new(),
            last_prices: HashMap::new(),
            rng,
            round: 0,
        }
    }

    /// Register a participant under its carrier id, replacing any previous
    /// registration with that id.
    pub fn add<P: Participant + 'static>(&mut self, participant: &Rc<RefCell<P>>) {
        let id = participant.borrow().id();
        let weak: Weak<RefCell<P>> = Rc::downgrade(participant);
        let weak: Weak<RefCell<dyn Participant>> = weak;
        if self.participants.insert(id, weak).is_some() {
            debug!("participant {} re-registered", id);
        }
    }

    /// Unregister a participant. Returns whether it was registered.
    pub fn remove(&mut self, id: ParticipantId) -> bool {
        self.participants.remove(&id).is_some()
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participants.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Last clearing price of `resource`, if any round has produced one.
    pub fn price(&self, resource: &ResourceId) -> Option<Decimal> {
        self.last_prices.get(resource).copied()
    }

    pub fn prices(&self) -> &HashMap<ResourceId, Decimal> {
        &self.last_prices
    }

    /// Number of completed rounds.
    pub fn round(&self) -> usize {
        self.round
    }

    /// Score a bag of resources at last known prices. Unpriced resources count
    /// one per unit. Saturates at the edge of `Decimal` range.
    pub fn value(&self, inventory: &Inventory) -> Decimal {
        inventory
            .iter()
            .map(|(resource, units)| match self.price(resource) {
                Some(price) => units.saturating_mul(price),
                None => *units,
            })
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Advance the market by one round: poll, match, settle, record prices.
    pub fn trade(&mut self) -> RoundReport {
        let books = self.collect();
        self.round += 1;

        let mut report = RoundReport {
            round: self.round,
            clearings: Vec::with_capacity(books.len()),
        };

        for mut book in books {
            book.arrange(&mut self.rng);
            let Some(clearing) = clear_book(&book) else {
                continue;
            };
            settle(&clearing.matches, &self.participants);
            self.last_prices
                .insert(clearing.resource.clone(), clearing.clearing_price);
            report.clearings.push(clearing);
        }

        debug!(
            "round {}: {} resources, {} matches",
            report.round,
            report.clearings.len(),
            report.match_count()
        );
        report
    }

    // Poll every live participant once, in id order, and group the orders by resource.
    fn collect(&mut self) -> OrderBooks {
        self.participants.retain(|id, participant| {
            let alive = participant.strong_count() > 0;
            if !alive {
                debug!("participant {} dropped, unregistering", id);
            }
            alive
        });

        let mut books = OrderBooks::new();
        for participant in self.participants.values() {
            let Some(participant) = participant.upgrade() else {
                continue;
            };
            let participant = participant.borrow();
            for order in participant.asks().into_iter().chain(participant.bids()) {
                if !self.participants.contains_key(&order.carrier()) {
                    warn!("order with unregistered carrier ignored: {}", order);
                    continue;
                }
                if let Err(err) = books.add(order) {
                    warn!("order rejected: {}", err);
                }
            }
        }
        books
    }
}

impl Default for Market {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standard::StandardTrader;
    use crate::trader::{Carrier, Trader};
    use rust_decimal_macros::dec;

    fn trader(id: u32, cash: Decimal) -> Rc<RefCell<StandardTrader>> {
        Rc::new(RefCell::new(StandardTrader::new(ParticipantId(id), cash)))
    }

    #[test]
    fn test_add_and_remove() {
        let mut market = Market::with_seed(1);
        let a = trader(1, dec!(0));
        let b = trader(2, dec!(0));
        market.add(&a);
        market.add(&b);
        market.add(&a);
        assert_eq!(market.len(), 2);

        assert!(market.remove(ParticipantId(1)));
        assert!(!market.remove(ParticipantId(1)));
        assert!(!market.contains(ParticipantId(1)));
        assert!(market.contains(ParticipantId(2)));
    }

    #[test]
    fn test_price_absent_until_cleared() {
        let mut market = Market::with_seed(1);
        let wheat = ResourceId::new("wheat");
        assert_eq!(market.price(&wheat), None);

        let a = trader(1, dec!(0));
        a.borrow_mut().ask(dec!(3), "wheat", dec!(5.0)).unwrap();
        market.add(&a);
        market.trade();

        assert_eq!(market.price(&wheat), Some(dec!(5.0)));
        assert_eq!(market.round(), 1);
    }

    #[test]
    fn test_value_falls_back_to_units() {
        let mut market = Market::with_seed(1);
        let a = trader(1, dec!(0));
        a.borrow_mut().ask(dec!(1), "wheat", dec!(4.0)).unwrap();
        market.add(&a);
        market.trade();

        let mut inventory = Inventory::new();
        inventory.insert("wheat".into(), dec!(3));
        inventory.insert("stone".into(), dec!(2));
        // 3 wheat @ 4 + 2 unpriced stone
        assert_eq!(market.value(&inventory), dec!(14));
        assert_eq!(market.value(&Inventory::new()), dec!(0));
    }

    #[test]
    fn test_dropped_participant_is_pruned() {
        let mut market = Market::with_seed(1);
        let a = trader(1, dec!(0));
        {
            let b = trader(2, dec!(10));
            b.borrow_mut().bid(dec!(1), "wheat", dec!(1.0)).unwrap();
            market.add(&b);
        }
        market.add(&a);
        let report = market.trade();

        assert!(report.clearings.is_empty());
        assert_eq!(market.len(), 1);
        assert!(market.price(&"wheat".into()).is_none());
    }

    #[test]
    fn test_order_for_unregistered_carrier_is_ignored() {
        struct Proxy {
            id: ParticipantId,
            routed_to: ParticipantId,
        }
        impl Trader for Proxy {
            fn asks(&self) -> Vec<crate::order::Order> {
                vec![crate::order::Order::ask(self.routed_to, "wheat".into(), dec!(1), dec!(1)).unwrap()]
            }
            fn bids(&self) -> Vec<crate::order::Order> {
                Vec::new()
            }
        }
        impl Carrier for Proxy {
            fn id(&self) -> ParticipantId {
                self.id
            }
            fn buy(&mut self, _m: &Match) {}
            fn deliver(&mut self, _m: &Match) {}
        }

        let mut market = Market::with_seed(1);
        let proxy = Rc::new(RefCell::new(Proxy {
            id: ParticipantId(1),
            routed_to: ParticipantId(9),
        }));
        market.add(&proxy);
        let report = market.trade();
        assert!(report.clearings.is_empty());
    }

    #[test]
    fn test_report_lookup() {
        let mut market = Market::with_seed(3);
        let a = trader(1, dec!(0));
        let b = trader(2, dec!(100));
        a.borrow_mut().ask(dec!(2), "wheat", dec!(1.0)).unwrap();
        b.borrow_mut().bid(dec!(2), "wheat", dec!(2.0)).unwrap();
        market.add(&a);
        market.add(&b);

        let report = market.trade();
        assert_eq!(report.round, 1);
        assert_eq!(report.match_count(), 1);
        let wheat = report.clearing(&"wheat".into()).unwrap();
        assert_eq!(wheat.clearing_price, dec!(1.5));
        assert_eq!(report.matches().count(), 1);
        assert_eq!(b.borrow().cash(), dec!(97));
    }

    #[test]
    fn test_orders_at_limit_trade_without_overflow() {
        use crate::order::ORDER_LIMIT;

        let mut market = Market::with_seed(4);
        let a = trader(1, dec!(0));
        let b = trader(2, dec!(0));
        a.borrow_mut().ask(ORDER_LIMIT, "gold", ORDER_LIMIT).unwrap();
        b.borrow_mut().bid(ORDER_LIMIT, "gold", ORDER_LIMIT).unwrap();
        assert!(b.borrow_mut().bid(dec!(1), "gold", Decimal::MAX).is_err());
        market.add(&a);
        market.add(&b);

        let report = market.trade();
        let gold = ResourceId::new("gold");
        assert_eq!(report.match_count(), 1);
        assert_eq!(market.price(&gold), Some(ORDER_LIMIT));
        assert_eq!(a.borrow().cash(), ORDER_LIMIT * ORDER_LIMIT);
        assert_eq!(b.borrow().cash(), -(ORDER_LIMIT * ORDER_LIMIT));

        let mut hoard = Inventory::new();
        hoard.insert(gold, Decimal::MAX);
        assert_eq!(market.value(&hoard), Decimal::MAX);
    }
}
