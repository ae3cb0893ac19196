use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::types::{ResourceId, Side};

/// Journal entries are attributed to this name when no participant owns them.
pub const MARKET: &str = "market";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub round: usize,
    pub participant: String,
    pub event_type: EventType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventType {
    OrderPlaced {
        resource: ResourceId,
        side: Side,
        units: Decimal,
        price: Decimal,
    },
    TradeExecuted {
        resource: ResourceId,
        side: TradeSide,
        units: Decimal,
        price: Decimal,
        counterparty: String,
    },
    PriceRecorded {
        resource: ResourceId,
        price: Decimal,
        volume: Decimal,
        matches: usize,
    },
    ParticipantSnapshot {
        cash: Decimal,
        inventory: BTreeMap<ResourceId, Decimal>,
        value: Decimal,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: ", self.round, self.participant)?;

        match &self.event_type {
            EventType::OrderPlaced {
                resource,
                side,
                units,
                price,
            } => {
                write!(f, "Placed {} for {} {} at {}", side, units, resource, price)
            }
            EventType::TradeExecuted {
                resource,
                side,
                units,
                price,
                counterparty,
            } => {
                write!(
                    f,
                    "{:?} {} {} at {} with {}",
                    side, units, resource, price, counterparty
                )
            }
            EventType::PriceRecorded {
                resource,
                price,
                volume,
                matches,
            } => {
                write!(
                    f,
                    "{} cleared at {} ({} units in {} matches)",
                    resource, price, volume, matches
                )
            }
            EventType::ParticipantSnapshot {
                cash,
                inventory,
                value,
            } => {
                write!(f, "State - Cash:{}", cash)?;
                for (resource, units) in inventory {
                    write!(f, " {}:{}", resource, units)?;
                }
                write!(f, " Value:{}", value)
            }
        }
    }
}

#[derive(Default)]
pub struct EventLogger {
    events: Vec<Event>,
}

impl EventLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, round: usize, participant: String, event_type: EventType) {
        self.events.push(Event {
            timestamp: Utc::now(),
            round,
            participant,
            event_type,
        });
    }

    pub fn get_events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn save_to_file(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&self.events)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let events: Vec<Event> = serde_json::from_str(&json)?;
        Ok(Self { events })
    }
}
