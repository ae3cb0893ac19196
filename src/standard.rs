use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::clearing::Match;
use crate::market::Market;
use crate::order::{Order, OrderError};
use crate::trader::{Carrier, Trader};
use crate::types::{Inventory, ParticipantId, ResourceId, Side};

/// Accumulates the asks and bids a participant will show on the next poll.
#[derive(Debug, Clone, Default)]
pub struct OrderSheet {
    asks: Vec<Order>,
    bids: Vec<Order>,
}

impl OrderSheet {
    pub fn push(&mut self, order: Order) {
        match order.side() {
            Side::Ask => self.asks.push(order),
            Side::Bid => self.bids.push(order),
        }
    }

    pub fn asks(&self) -> &[Order] {
        &self.asks
    }

    pub fn bids(&self) -> &[Order] {
        &self.bids
    }

    pub fn clear(&mut self) {
        self.asks.clear();
        self.bids.clear();
    }
}

/// Cash and holdings of a single participant.
#[derive(Debug, Clone, Default)]
pub struct Account {
    pub cash: Decimal,
    pub inventory: Inventory,
}

impl Account {
    pub fn new(cash: Decimal) -> Self {
        Self {
            cash,
            inventory: HashMap::new(),
        }
    }

    pub fn holding(&self, resource: &ResourceId) -> Decimal {
        self.inventory.get(resource).copied().unwrap_or(Decimal::ZERO)
    }

    /// Settle the buying half of a match.
    ///
    /// Balances saturate at the edge of `Decimal` range instead of overflowing.
    pub fn debit_cash_credit_goods(&mut self, m: &Match) {
        self.cash = self.cash.saturating_sub(m.value());
        let held = self
            .inventory
            .entry(m.resource().clone())
            .or_insert(Decimal::ZERO);
        *held = held.saturating_add(m.units());
    }

    /// Settle the selling half of a match.
    pub fn credit_cash_debit_goods(&mut self, m: &Match) {
        self.cash = self.cash.saturating_add(m.value());
        let held = self
            .inventory
            .entry(m.resource().clone())
            .or_insert(Decimal::ZERO);
        *held = held.saturating_sub(m.units());
    }
}

/// Reference participant: shows whatever orders external logic gave it and
/// keeps its own books when matches settle.
#[derive(Debug, Clone)]
pub struct StandardTrader {
    id: ParticipantId,
    sheet: OrderSheet,
    account: Account,
}

impl StandardTrader {
    pub fn new(id: ParticipantId, cash: Decimal) -> Self {
        Self {
            id,
            sheet: OrderSheet::default(),
            account: Account::new(cash),
        }
    }

    pub fn with_inventory(mut self, resource: impl Into<ResourceId>, units: Decimal) -> Self {
        self.account.inventory.insert(resource.into(), units);
        self
    }

    /// Offer `units` of `resource` at no less than `price` each.
    pub fn ask(
        &mut self,
        units: Decimal,
        resource: impl Into<ResourceId>,
        price: Decimal,
    ) -> Result<(), OrderError> {
        let order = Order::ask(self.id, resource.into(), units, price)?;
        self.sheet.push(order);
        Ok(())
    }

    /// Ask for `units` of `resource` at no more than `price` each.
    pub fn bid(
        &mut self,
        units: Decimal,
        resource: impl Into<ResourceId>,
        price: Decimal,
    ) -> Result<(), OrderError> {
        let order = Order::bid(self.id, resource.into(), units, price)?;
        self.sheet.push(order);
        Ok(())
    }

    pub fn clear_orders(&mut self) {
        self.sheet.clear();
    }

    pub fn cash(&self) -> Decimal {
        self.account.cash
    }

    pub fn holding(&self, resource: &ResourceId) -> Decimal {
        self.account.holding(resource)
    }

    pub fn inventory(&self) -> &Inventory {
        &self.account.inventory
    }

    /// Cash plus holdings valued at the market's last prices.
    pub fn value_at(&self, market: &Market) -> Decimal {
        self.account.cash + market.value(&self.account.inventory)
    }
}

impl Trader for StandardTrader {
    fn asks(&self) -> Vec<Order> {
        self.sheet.asks().to_vec()
    }

    fn bids(&self) -> Vec<Order> {
        self.sheet.bids().to_vec()
    }
}

impl Carrier for StandardTrader {
    fn id(&self) -> ParticipantId {
        self.id
    }

    fn buy(&mut self, m: &Match) {
        self.account.debit_cash_credit_goods(m);
    }

    fn deliver(&mut self, m: &Match) {
        self.account.credit_cash_debit_goods(m);
    }
}
