use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::events::{Event, EventType, TradeSide};
use crate::types::ResourceId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceMetrics {
    pub resource: ResourceId,
    pub trades: usize,
    pub volume: Decimal,
    pub turnover: Decimal,
    /// Volume-weighted average price over executed trades.
    pub vwap: Option<Decimal>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub last_price: Option<Decimal>,
    pub rounds_priced: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantMetrics {
    pub participant: String,
    pub trades: usize,
    pub units_bought: BTreeMap<ResourceId, Decimal>,
    pub units_sold: BTreeMap<ResourceId, Decimal>,
    pub cash_spent: Decimal,
    pub cash_received: Decimal,
    pub net_cash_flow: Decimal,
    pub final_value: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketMetrics {
    pub rounds: usize,
    pub resources: BTreeMap<ResourceId, ResourceMetrics>,
    pub participants: BTreeMap<String, ParticipantMetrics>,
    pub total_turnover: Decimal,
}

pub struct MetricsCalculator;

impl MetricsCalculator {
    pub fn calculate_resource_metrics(resource: &ResourceId, events: &[Event]) -> ResourceMetrics {
        let mut metrics = ResourceMetrics {
            resource: resource.clone(),
            trades: 0,
            volume: Decimal::ZERO,
            turnover: Decimal::ZERO,
            vwap: None,
            min_price: None,
            max_price: None,
            last_price: None,
            rounds_priced: 0,
        };

        for event in events {
            match &event.event_type {
                // Each trade is journaled once per side; count the buying half.
                EventType::TradeExecuted {
                    resource: r,
                    side: TradeSide::Buy,
                    units,
                    price,
                    ..
                } if r == resource => {
                    metrics.trades += 1;
                    metrics.volume += *units;
                    metrics.turnover += *units * *price;
                    metrics.min_price = Some(metrics.min_price.map_or(*price, |p| p.min(*price)));
                    metrics.max_price = Some(metrics.max_price.map_or(*price, |p| p.max(*price)));
                }
                EventType::PriceRecorded {
                    resource: r, price, ..
                } if r == resource => {
                    metrics.rounds_priced += 1;
                    metrics.last_price = Some(*price);
                }
                _ => {}
            }
        }

        if metrics.volume > Decimal::ZERO {
            metrics.vwap = Some(metrics.turnover / metrics.volume);
        }
        metrics
    }

    pub fn calculate_participant_metrics(participant: &str, events: &[Event]) -> ParticipantMetrics {
        let mut metrics = ParticipantMetrics {
            participant: participant.to_string(),
            trades: 0,
            units_bought: BTreeMap::new(),
            units_sold: BTreeMap::new(),
            cash_spent: Decimal::ZERO,
            cash_received: Decimal::ZERO,
            net_cash_flow: Decimal::ZERO,
            final_value: None,
        };

        for event in events.iter().filter(|e| e.participant == participant) {
            match &event.event_type {
                EventType::TradeExecuted {
                    resource,
                    side,
                    units,
                    price,
                    ..
                } => {
                    metrics.trades += 1;
                    let value = *units * *price;
                    match side {
                        TradeSide::Buy => {
                            *metrics.units_bought.entry(resource.clone()).or_insert(Decimal::ZERO) += *units;
                            metrics.cash_spent += value;
                        }
                        TradeSide::Sell => {
                            *metrics.units_sold.entry(resource.clone()).or_insert(Decimal::ZERO) += *units;
                            metrics.cash_received += value;
                        }
                    }
                }
                EventType::ParticipantSnapshot { value, .. } => {
                    metrics.final_value = Some(*value);
                }
                _ => {}
            }
        }

        metrics.net_cash_flow = metrics.cash_received - metrics.cash_spent;
        metrics
    }

    pub fn calculate_market_metrics(events: &[Event]) -> MarketMetrics {
        let mut resources = BTreeMap::new();
        let mut participants = BTreeMap::new();
        let mut rounds = 0;

        for event in events {
            rounds = rounds.max(event.round);
            match &event.event_type {
                EventType::PriceRecorded { resource, .. } | EventType::TradeExecuted { resource, .. } => {
                    if !resources.contains_key(resource) {
                        resources.insert(
                            resource.clone(),
                            Self::calculate_resource_metrics(resource, events),
                        );
                    }
                }
                _ => {}
            }
            if event.participant != crate::events::MARKET
                && !participants.contains_key(&event.participant)
            {
                participants.insert(
                    event.participant.clone(),
                    Self::calculate_participant_metrics(&event.participant, events),
                );
            }
        }

        let total_turnover = resources.values().map(|r: &ResourceMetrics| r.turnover).sum();

        MarketMetrics {
            rounds,
            resources,
            participants,
            total_turnover,
        }
    }
}
