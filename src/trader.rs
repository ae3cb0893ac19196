//! Contracts between the market and its participants.
//!
//! The market only ever sees these two roles:
//!
//! - **Trader**: polled once per round for its current asks and bids
//! - **Carrier**: settles executed matches against its own cash and inventory
//!
//! Orders name their carrier, so settlement is routed by order identity. In
//! practice one participant plays both roles; see [`Participant`].

use crate::clearing::Match;
use crate::order::Order;
use crate::types::ParticipantId;

/// Query side of a participant.
pub trait Trader {
    /// Current sell offers. Called at most once per round and must not
    /// touch the market.
    fn asks(&self) -> Vec<Order>;

    /// Current buy intents, under the same rules as [`Trader::asks`].
    fn bids(&self) -> Vec<Order>;
}

/// Settlement side of a participant.
///
/// For every match the market calls `buy` on the bidder's carrier and then
/// `deliver` on the asker's carrier, both with the same [`Match`]. Neither may
/// fail: a carrier that emitted an order is bound to honor it.
pub trait Carrier {
    /// Id orders use to route settlement to this carrier.
    fn id(&self) -> ParticipantId;

    /// Pay `m.units() * m.price()` and take `m.units()` of `m.resource()`.
    fn buy(&mut self, m: &Match);

    /// Receive `m.units() * m.price()` and hand over `m.units()` of `m.resource()`.
    fn deliver(&mut self, m: &Match);
}

/// Anything the market can register: a trader that is also its own carrier.
pub trait Participant: Trader + Carrier {}

impl<T: Trader + Carrier> Participant for T {}
