use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::error::Error;
use std::fmt;

use crate::types::{ParticipantId, ResourceId, Side};

/// An immutable intent to buy or sell up to `units` of `resource` at `price` per unit.
///
/// `carrier` names the participant that settles the order. Orders live for a
/// single round; the matcher derives smaller fragments instead of mutating them.
/// Largest units or price an order may carry. Keeps `units * price`, sums of
/// quotes and round totals well inside `Decimal` range.
pub const ORDER_LIMIT: Decimal = dec!(1000000000000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    carrier: ParticipantId,
    resource: ResourceId,
    units: Decimal,
    price: Decimal,
    side: Side,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    NegativeUnits(Decimal),
    NegativePrice(Decimal),
    UnitsOverLimit(Decimal),
    PriceOverLimit(Decimal),
    ResourceMismatch {
        book: ResourceId,
        order: ResourceId,
    },
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderError::NegativeUnits(units) => write!(f, "order units must be >= 0, got {}", units),
            OrderError::NegativePrice(price) => write!(f, "order price must be >= 0, got {}", price),
            OrderError::UnitsOverLimit(units) => {
                write!(f, "order units must be <= {}, got {}", ORDER_LIMIT, units)
            }
            OrderError::PriceOverLimit(price) => {
                write!(f, "order price must be <= {}, got {}", ORDER_LIMIT, price)
            }
            OrderError::ResourceMismatch { book, order } => {
                write!(f, "order for {} does not belong in the {} book", order, book)
            }
        }
    }
}

impl Error for OrderError {}

impl Order {
    pub fn new(
        carrier: ParticipantId,
        resource: ResourceId,
        units: Decimal,
        price: Decimal,
        side: Side,
    ) -> Result<Self, OrderError> {
        if units < Decimal::ZERO {
            return Err(OrderError::NegativeUnits(units));
        }
        if price < Decimal::ZERO {
            return Err(OrderError::NegativePrice(price));
        }
        if units > ORDER_LIMIT {
            return Err(OrderError::UnitsOverLimit(units));
        }
        if price > ORDER_LIMIT {
            return Err(OrderError::PriceOverLimit(price));
        }
        Ok(Self {
            carrier,
            resource,
            units,
            price,
            side,
        })
    }

    pub fn ask(
        carrier: ParticipantId,
        resource: ResourceId,
        units: Decimal,
        price: Decimal,
    ) -> Result<Self, OrderError> {
        Self::new(carrier, resource, units, price, Side::Ask)
    }

    pub fn bid(
        carrier: ParticipantId,
        resource: ResourceId,
        units: Decimal,
        price: Decimal,
    ) -> Result<Self, OrderError> {
        Self::new(carrier, resource, units, price, Side::Bid)
    }

    /// A new order for `units` that keeps this order's carrier, resource, price and side.
    pub(crate) fn fragment(&self, units: Decimal) -> Self {
        Self {
            carrier: self.carrier,
            resource: self.resource.clone(),
            units,
            price: self.price,
            side: self.side,
        }
    }

    pub fn carrier(&self) -> ParticipantId {
        self.carrier
    }

    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    pub fn units(&self) -> Decimal {
        self.units
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn side(&self) -> Side {
        self.side
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} @ {} by {}",
            self.side, self.units, self.resource, self.price, self.carrier
        )
    }
}
