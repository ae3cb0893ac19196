use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::error::Error;
use std::fmt;
use std::path::Path;

use crate::events::MARKET;
use crate::order::ORDER_LIMIT;
use crate::types::{ResourceId, Side};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub parameters: MarketParameters,
    pub participants: Vec<ParticipantConfig>,
    pub random_seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketParameters {
    pub rounds: usize,
}

impl Default for MarketParameters {
    fn default() -> Self {
        Self { rounds: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantConfig {
    pub id: u32,
    pub name: String,
    pub initial_cash: Decimal,
    #[serde(default)]
    pub initial_inventory: BTreeMap<ResourceId, Decimal>,
    /// Re-posted every round, capped by what the participant can honor.
    #[serde(default)]
    pub standing_orders: Vec<StandingOrder>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingOrder {
    pub side: Side,
    pub resource: ResourceId,
    pub units: Decimal,
    pub price: Decimal,
}

#[derive(Debug)]
pub enum ScenarioError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
    Invalid(String),
    UnknownScenario(String),
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioError::Io(e) => write!(f, "I/O error: {}", e),
            ScenarioError::Json(e) => write!(f, "Failed to parse JSON: {}", e),
            ScenarioError::Yaml(e) => write!(f, "Failed to parse YAML: {}", e),
            ScenarioError::Invalid(msg) => write!(f, "Invalid scenario: {}", msg),
            ScenarioError::UnknownScenario(name) => write!(f, "Unknown scenario: {}", name),
        }
    }
}

impl Error for ScenarioError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ScenarioError::Io(e) => Some(e),
            ScenarioError::Json(e) => Some(e),
            ScenarioError::Yaml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ScenarioError {
    fn from(e: std::io::Error) -> Self {
        ScenarioError::Io(e)
    }
}

impl From<serde_json::Error> for ScenarioError {
    fn from(e: serde_json::Error) -> Self {
        ScenarioError::Json(e)
    }
}

impl From<serde_yaml::Error> for ScenarioError {
    fn from(e: serde_yaml::Error) -> Self {
        ScenarioError::Yaml(e)
    }
}

impl ParticipantConfig {
    pub fn new(id: u32, name: impl Into<String>, initial_cash: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            initial_cash,
            initial_inventory: BTreeMap::new(),
            standing_orders: Vec::new(),
        }
    }

    pub fn holding(mut self, resource: &str, units: Decimal) -> Self {
        self.initial_inventory.insert(resource.into(), units);
        self
    }

    pub fn ask(mut self, units: Decimal, resource: &str, price: Decimal) -> Self {
        self.standing_orders.push(StandingOrder {
            side: Side::Ask,
            resource: resource.into(),
            units,
            price,
        });
        self
    }

    pub fn bid(mut self, units: Decimal, resource: &str, price: Decimal) -> Self {
        self.standing_orders.push(StandingOrder {
            side: Side::Bid,
            resource: resource.into(),
            units,
            price,
        });
        self
    }
}

impl Scenario {
    pub fn new(name: String) -> Self {
        Self {
            name,
            description: String::new(),
            parameters: MarketParameters::default(),
            participants: Vec::new(),
            random_seed: None,
        }
    }

    pub fn add_participant(&mut self, config: ParticipantConfig) {
        self.participants.push(config);
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ScenarioError> {
        let text = if is_yaml(path) {
            serde_yaml::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Load a scenario; `.yaml`/`.yml` files are read as YAML, anything else as JSON.
    pub fn load_from_file(path: &Path) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path)?;
        let scenario: Self = if is_yaml(path) {
            serde_yaml::from_str(&text)?
        } else {
            serde_json::from_str(&text)?
        };
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.participants.is_empty() {
            return Err(ScenarioError::Invalid(
                "Scenario must have at least one participant".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut names = HashSet::new();
        for participant in &self.participants {
            if !seen.insert(participant.id) {
                return Err(ScenarioError::Invalid(format!(
                    "Participant id {} is used more than once",
                    participant.id
                )));
            }
            if participant.name == MARKET {
                return Err(ScenarioError::Invalid(format!(
                    "Participant name '{}' is reserved",
                    MARKET
                )));
            }
            if !names.insert(participant.name.as_str()) {
                return Err(ScenarioError::Invalid(format!(
                    "Participant name {} is used more than once",
                    participant.name
                )));
            }
            if participant.initial_cash < Decimal::ZERO {
                return Err(ScenarioError::Invalid(format!(
                    "Participant {} starts with negative cash",
                    participant.name
                )));
            }
            if let Some((resource, _)) = participant
                .initial_inventory
                .iter()
                .find(|(_, units)| **units < Decimal::ZERO)
            {
                return Err(ScenarioError::Invalid(format!(
                    "Participant {} starts with negative {}",
                    participant.name, resource
                )));
            }
            for order in &participant.standing_orders {
                if order.units < Decimal::ZERO || order.price < Decimal::ZERO {
                    return Err(ScenarioError::Invalid(format!(
                        "Participant {} has a standing {} for {} with negative units or price",
                        participant.name, order.side, order.resource
                    )));
                }
                if order.units > ORDER_LIMIT || order.price > ORDER_LIMIT {
                    return Err(ScenarioError::Invalid(format!(
                        "Participant {} has a standing {} for {} above {}",
                        participant.name, order.side, order.resource, ORDER_LIMIT
                    )));
                }
            }
        }

        Ok(())
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scenario: {}", self.name)?;
        writeln!(f, "Description: {}", self.description)?;
        writeln!(f, "\nParameters:")?;
        writeln!(f, "  Rounds: {}", self.parameters.rounds)?;
        match self.random_seed {
            Some(seed) => writeln!(f, "  Seed: {}", seed)?,
            None => writeln!(f, "  Seed: random")?,
        }

        writeln!(f, "\nParticipants:")?;
        for participant in &self.participants {
            writeln!(f, "\n  {} (id {})", participant.name, participant.id)?;
            writeln!(f, "    Cash: {}", participant.initial_cash)?;
            for (resource, units) in &participant.initial_inventory {
                writeln!(f, "    Holds: {} {}", units, resource)?;
            }
            for order in &participant.standing_orders {
                writeln!(
                    f,
                    "    Standing {}: {} {} @ {}",
                    order.side, order.units, order.resource, order.price
                )?;
            }
        }

        Ok(())
    }
}

pub fn create_standard_scenarios() -> HashMap<String, Scenario> {
    let mut scenarios = HashMap::new();

    let mut single = Scenario::new("single_cross".to_string());
    single.description = "One seller and one buyer whose quotes cross exactly".to_string();
    single.add_participant(ParticipantConfig::new(1, "alice", dec!(0)).holding("wheat", dec!(10)).ask(dec!(10), "wheat", dec!(2.0)));
    single.add_participant(ParticipantConfig::new(2, "bob", dec!(30)).bid(dec!(10), "wheat", dec!(3.0)));
    scenarios.insert("single".to_string(), single);

    let mut partial = Scenario::new("partial_fill".to_string());
    partial.description = "Seller offers more than the buyer wants".to_string();
    partial.add_participant(ParticipantConfig::new(1, "alice", dec!(0)).holding("wheat", dec!(10)).ask(dec!(10), "wheat", dec!(2.0)));
    partial.add_participant(ParticipantConfig::new(2, "bob", dec!(30)).bid(dec!(6), "wheat", dec!(3.0)));
    scenarios.insert("partial".to_string(), partial);

    let mut no_cross = Scenario::new("no_cross".to_string());
    no_cross.description = "Best bid below best ask; only an indicative price".to_string();
    no_cross.add_participant(ParticipantConfig::new(1, "alice", dec!(0)).holding("wheat", dec!(5)).ask(dec!(5), "wheat", dec!(4.0)));
    no_cross.add_participant(ParticipantConfig::new(2, "bob", dec!(30)).bid(dec!(5), "wheat", dec!(3.0)));
    scenarios.insert("no-cross".to_string(), no_cross);

    let mut one_sided = Scenario::new("one_sided".to_string());
    one_sided.description = "Asks without any bids".to_string();
    one_sided.add_participant(ParticipantConfig::new(1, "alice", dec!(0)).holding("wheat", dec!(3)).ask(dec!(3), "wheat", dec!(5.0)));
    scenarios.insert("one-sided".to_string(), one_sided);

    let mut ties = Scenario::new("tie_break".to_string());
    ties.description = "Two identical asks compete for a single-unit bid every round".to_string();
    ties.parameters.rounds = 1000;
    ties.add_participant(ParticipantConfig::new(1, "alice", dec!(0)).holding("wheat", dec!(1000)).ask(dec!(1), "wheat", dec!(2.0)));
    ties.add_participant(ParticipantConfig::new(2, "bob", dec!(2000)).bid(dec!(1), "wheat", dec!(2.0)));
    ties.add_participant(ParticipantConfig::new(3, "carol", dec!(0)).holding("wheat", dec!(1000)).ask(dec!(1), "wheat", dec!(2.0)));
    scenarios.insert("ties".to_string(), ties);

    let mut barter = Scenario::new("barter".to_string());
    barter.description = "Two participants swap bread and grain in the same round".to_string();
    barter.add_participant(
        ParticipantConfig::new(1, "baker", dec!(10))
            .holding("bread", dec!(1))
            .ask(dec!(1), "bread", dec!(1.0))
            .bid(dec!(1), "grain", dec!(2.0)),
    );
    barter.add_participant(
        ParticipantConfig::new(2, "farmer", dec!(10))
            .holding("grain", dec!(1))
            .ask(dec!(1), "grain", dec!(1.0))
            .bid(dec!(1), "bread", dec!(2.0)),
    );
    scenarios.insert("barter".to_string(), barter);

    // Several sellers and buyers at staggered quotes, run long enough for
    // holdings and cash to bind.
    let mut exchange = Scenario::new("grain_exchange".to_string());
    exchange.description = "Farmers sell grain to millers and bakers at staggered prices".to_string();
    exchange.parameters.rounds = 20;
    exchange.random_seed = Some(42);
    exchange.add_participant(ParticipantConfig::new(1, "farmer_a", dec!(20)).holding("grain", dec!(60)).ask(dec!(5), "grain", dec!(1.0)));
    exchange.add_participant(ParticipantConfig::new(2, "farmer_b", dec!(20)).holding("grain", dec!(40)).ask(dec!(4), "grain", dec!(1.2)));
    exchange.add_participant(ParticipantConfig::new(3, "farmer_c", dec!(20)).holding("grain", dec!(30)).ask(dec!(6), "grain", dec!(1.6)));
    exchange.add_participant(
        ParticipantConfig::new(4, "miller", dec!(60))
            .holding("flour", dec!(30))
            .bid(dec!(6), "grain", dec!(1.5))
            .ask(dec!(3), "flour", dec!(2.5)),
    );
    exchange.add_participant(
        ParticipantConfig::new(5, "baker", dec!(80))
            .bid(dec!(4), "grain", dec!(1.3))
            .bid(dec!(3), "flour", dec!(3.0)),
    );
    scenarios.insert("exchange".to_string(), exchange);

    scenarios
}
