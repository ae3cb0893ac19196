use rand::Rng;
use rand::seq::SliceRandom;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::order::{Order, OrderError};
use crate::types::{ResourceId, Side};

/// One round's asks and bids for a single resource.
#[derive(Debug, Clone)]
pub struct OrderBook {
    resource: ResourceId,
    asks: Vec<Order>,
    bids: Vec<Order>,
    total_ask_units: Decimal,
    total_bid_units: Decimal,
}

impl OrderBook {
    pub fn new(resource: ResourceId) -> Self {
        Self {
            resource,
            asks: Vec::new(),
            bids: Vec::new(),
            total_ask_units: Decimal::ZERO,
            total_bid_units: Decimal::ZERO,
        }
    }

    /// Insert an order on the side it was issued for.
    pub fn add(&mut self, order: Order) -> Result<(), OrderError> {
        if order.resource() != &self.resource {
            return Err(OrderError::ResourceMismatch {
                book: self.resource.clone(),
                order: order.resource().clone(),
            });
        }
        match order.side() {
            Side::Ask => {
                self.total_ask_units += order.units();
                self.asks.push(order);
            }
            Side::Bid => {
                self.total_bid_units += order.units();
                self.bids.push(order);
            }
        }
        Ok(())
    }

    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    pub fn asks(&self) -> &[Order] {
        &self.asks
    }

    pub fn bids(&self) -> &[Order] {
        &self.bids
    }

    pub fn total_ask_units(&self) -> Decimal {
        self.total_ask_units
    }

    pub fn total_bid_units(&self) -> Decimal {
        self.total_bid_units
    }

    /// True once any order, on either side, has been added.
    pub fn is_active(&self) -> bool {
        !self.asks.is_empty() || !self.bids.is_empty()
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.iter().map(Order::price).min()
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.iter().map(Order::price).max()
    }

    /// Shuffle both sides, then stable-sort asks ascending and bids descending by price.
    ///
    /// The shuffle makes the order within an equal-price run uniform, so insertion
    /// order never buys priority.
    pub fn arrange<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.asks.shuffle(rng);
        self.bids.shuffle(rng);
        self.asks.sort_by(|a, b| a.price().cmp(&b.price()));
        self.bids.sort_by(|a, b| b.price().cmp(&a.price()));
    }
}

/// Orders of one round grouped by resource, in the order resources were first seen.
#[derive(Debug, Default)]
pub struct OrderBooks {
    books: Vec<OrderBook>,
    index: HashMap<ResourceId, usize>,
}

impl OrderBooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, order: Order) -> Result<(), OrderError> {
        let slot = match self.index.get(order.resource()) {
            Some(&slot) => slot,
            None => {
                let slot = self.books.len();
                self.index.insert(order.resource().clone(), slot);
                self.books.push(OrderBook::new(order.resource().clone()));
                slot
            }
        };
        self.books[slot].add(order)
    }

    pub fn get(&self, resource: &ResourceId) -> Option<&OrderBook> {
        self.index.get(resource).map(|&slot| &self.books[slot])
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrderBook> {
        self.books.iter()
    }
}

impl IntoIterator for OrderBooks {
    type Item = OrderBook;
    type IntoIter = std::vec::IntoIter<OrderBook>;

    fn into_iter(self) -> Self::IntoIter {
        self.books.into_iter()
    }
}
