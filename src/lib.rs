pub mod book;
pub mod clearing;
pub mod cli;
pub mod events;
pub mod market;
pub mod metrics;
pub mod order;
pub mod scenario;
mod settlement;
pub mod simulation;
pub mod standard;
pub mod trader;
pub mod types;

pub use clearing::{Match, ResourceClearing};
pub use market::{Market, RoundReport};
pub use order::{Order, OrderError};
pub use standard::StandardTrader;
pub use trader::{Carrier, Participant, Trader};
pub use types::{Inventory, ParticipantId, ResourceId, Side};

#[cfg(test)]
mod events_test;
