//! Scenario runner on top of the market.
//!
//! Each participant of a [`Scenario`] becomes a [`StandardTrader`] that re-posts
//! its standing orders every round. Orders are capped by what the participant
//! can honor (asks by holdings, bids by cash), then the market trades and the
//! round is journaled.

use log::info;
use rust_decimal::{Decimal, RoundingStrategy};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::events::{EventLogger, EventType, MARKET, TradeSide};
use crate::market::{Market, RoundReport};
use crate::scenario::{ParticipantConfig, Scenario, ScenarioError};
use crate::standard::StandardTrader;
use crate::types::{ParticipantId, ResourceId, Side};

const UNIT_DECIMALS: u32 = 8;

/// Market-wide sums of cash and of each resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Totals {
    pub cash: Decimal,
    pub units: BTreeMap<ResourceId, Decimal>,
}

pub struct Simulation {
    scenario: Scenario,
    market: Market,
    traders: Vec<(ParticipantConfig, Rc<RefCell<StandardTrader>>)>,
    names: HashMap<ParticipantId, String>,
    logger: EventLogger,
}

impl Simulation {
    pub fn new(scenario: Scenario) -> Result<Self, ScenarioError> {
        scenario.validate()?;

        let mut market = match scenario.random_seed {
            Some(seed) => Market::with_seed(seed),
            None => Market::new(),
        };

        let mut traders = Vec::with_capacity(scenario.participants.len());
        let mut names = HashMap::new();
        for config in &scenario.participants {
            let id = ParticipantId(config.id);
            let mut trader = StandardTrader::new(id, config.initial_cash);
            for (resource, units) in &config.initial_inventory {
                trader = trader.with_inventory(resource.clone(), *units);
            }
            let trader = Rc::new(RefCell::new(trader));
            market.add(&trader);
            names.insert(id, config.name.clone());
            traders.push((config.clone(), trader));
        }

        Ok(Self {
            scenario,
            market,
            traders,
            names,
            logger: EventLogger::new(),
        })
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn events(&self) -> &EventLogger {
        &self.logger
    }

    pub fn trader(&self, name: &str) -> Option<Rc<RefCell<StandardTrader>>> {
        self.traders
            .iter()
            .find(|(config, _)| config.name == name)
            .map(|(_, trader)| Rc::clone(trader))
    }

    /// Run every round the scenario asks for.
    pub fn run(&mut self) -> Vec<RoundReport> {
        (0..self.scenario.parameters.rounds)
            .map(|_| self.step())
            .collect()
    }

    /// Post orders, trade one round and journal the outcome.
    pub fn step(&mut self) -> RoundReport {
        let round = self.market.round() + 1;
        for (config, trader) in &self.traders {
            let mut trader = trader.borrow_mut();
            post_standing_orders(config, &mut trader, round, &mut self.logger);
        }

        let report = self.market.trade();
        self.journal(&report);

        info!(
            "round {}: {} matches across {} resources",
            report.round,
            report.match_count(),
            report.clearings.len()
        );
        report
    }

    pub fn totals(&self) -> Totals {
        let mut totals = Totals::default();
        for (_, trader) in &self.traders {
            let trader = trader.borrow();
            totals.cash += trader.cash();
            for (resource, units) in trader.inventory() {
                *totals.units.entry(resource.clone()).or_insert(Decimal::ZERO) += *units;
            }
        }
        totals
    }

    fn name(&self, id: ParticipantId) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    fn journal(&mut self, report: &RoundReport) {
        for clearing in &report.clearings {
            for m in &clearing.matches {
                let buyer = self.name(m.buyer());
                let seller = self.name(m.seller());
                self.logger.log(
                    report.round,
                    buyer.clone(),
                    EventType::TradeExecuted {
                        resource: m.resource().clone(),
                        side: TradeSide::Buy,
                        units: m.units(),
                        price: m.price(),
                        counterparty: seller.clone(),
                    },
                );
                self.logger.log(
                    report.round,
                    seller,
                    EventType::TradeExecuted {
                        resource: m.resource().clone(),
                        side: TradeSide::Sell,
                        units: m.units(),
                        price: m.price(),
                        counterparty: buyer,
                    },
                );
            }
            self.logger.log(
                report.round,
                MARKET.to_string(),
                EventType::PriceRecorded {
                    resource: clearing.resource.clone(),
                    price: clearing.clearing_price,
                    volume: clearing.matched_volume,
                    matches: clearing.matches.len(),
                },
            );
        }

        for (config, trader) in &self.traders {
            let trader = trader.borrow();
            self.logger.log(
                report.round,
                config.name.clone(),
                EventType::ParticipantSnapshot {
                    cash: trader.cash(),
                    inventory: trader
                        .inventory()
                        .iter()
                        .map(|(r, u)| (r.clone(), *u))
                        .collect(),
                    value: trader.value_at(&self.market),
                },
            );
        }
    }
}

// Replace last round's orders with the standing ones, trimmed so the trader
// never offers goods it lacks or bids more cash than it holds.
fn post_standing_orders(
    config: &ParticipantConfig,
    trader: &mut StandardTrader,
    round: usize,
    logger: &mut EventLogger,
) {
    trader.clear_orders();
    let mut budget = trader.cash();
    let mut available: HashMap<&ResourceId, Decimal> = HashMap::new();

    for order in &config.standing_orders {
        let units = match order.side {
            Side::Ask => {
                let left = available
                    .entry(&order.resource)
                    .or_insert_with(|| trader.holding(&order.resource));
                let units = order.units.min(*left);
                *left -= units;
                units
            }
            Side::Bid => {
                // A quotient past `Decimal` range means the budget covers any order.
                let units = match budget.checked_div(order.price) {
                    Some(affordable) if !order.price.is_zero() => {
                        let affordable =
                            affordable.round_dp_with_strategy(UNIT_DECIMALS, RoundingStrategy::ToZero);
                        order.units.min(affordable.max(Decimal::ZERO))
                    }
                    _ => order.units,
                };
                budget -= units * order.price;
                units
            }
        };
        if units.is_zero() {
            continue;
        }

        let placed = match order.side {
            Side::Ask => trader.ask(units, order.resource.clone(), order.price),
            Side::Bid => trader.bid(units, order.resource.clone(), order.price),
        };
        // Scenario validation already rejected negative terms.
        if placed.is_ok() {
            logger.log(
                round,
                config.name.clone(),
                EventType::OrderPlaced {
                    resource: order.resource.clone(),
                    side: order.side,
                    units,
                    price: order.price,
                },
            );
        }
    }
}
