//! Domain events emitted by the stock aggregate.
//!
//! One tagged variant per transition kind; the publishing boundary matches
//! exhaustively, so a new transition cannot silently go unpublished.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_events::Event;

use crate::ids::{ProductId, StockId};
use crate::quantity::Quantity;

/// Event: stock locked against a customer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReserved {
    pub stock_id: StockId,
    pub product_id: ProductId,
    pub amount: Quantity,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a reservation was cancelled before picking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReleased {
    pub stock_id: StockId,
    pub product_id: ProductId,
    pub amount: Quantity,
    pub occurred_at: DateTime<Utc>,
}

/// Event: picked stock physically left the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShipped {
    pub stock_id: StockId,
    pub product_id: ProductId,
    pub amount: Quantity,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a supplier delivery arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReceived {
    pub stock_id: StockId,
    pub product_id: ProductId,
    pub amount: Quantity,
    pub occurred_at: DateTime<Utc>,
}

/// Event: availability dropped to or under the low-stock threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevelLow {
    pub stock_id: StockId,
    pub product_id: ProductId,
    pub current_level: Quantity,
    pub occurred_at: DateTime<Utc>,
}

macro_rules! impl_now_ctor {
    ($t:ty, $amount_field:ident) => {
        impl $t {
            pub fn now(stock_id: StockId, product_id: ProductId, $amount_field: Quantity) -> Self {
                Self {
                    stock_id,
                    product_id,
                    $amount_field,
                    occurred_at: Utc::now(),
                }
            }
        }
    };
}

impl_now_ctor!(StockReserved, amount);
impl_now_ctor!(StockReleased, amount);
impl_now_ctor!(StockShipped, amount);
impl_now_ctor!(StockReceived, amount);
impl_now_ctor!(StockLevelLow, current_level);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEvent {
    Reserved(StockReserved),
    Released(StockReleased),
    Shipped(StockShipped),
    Received(StockReceived),
    LevelLow(StockLevelLow),
}

impl StockEvent {
    pub fn stock_id(&self) -> StockId {
        match self {
            StockEvent::Reserved(e) => e.stock_id,
            StockEvent::Released(e) => e.stock_id,
            StockEvent::Shipped(e) => e.stock_id,
            StockEvent::Received(e) => e.stock_id,
            StockEvent::LevelLow(e) => e.stock_id,
        }
    }

    /// Product the event belongs to; used as the publication partition key.
    pub fn product_id(&self) -> &ProductId {
        match self {
            StockEvent::Reserved(e) => &e.product_id,
            StockEvent::Released(e) => &e.product_id,
            StockEvent::Shipped(e) => &e.product_id,
            StockEvent::Received(e) => &e.product_id,
            StockEvent::LevelLow(e) => &e.product_id,
        }
    }
}

impl Event for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::Reserved(_) => "stock.reserved",
            StockEvent::Released(_) => "stock.released",
            StockEvent::Shipped(_) => "stock.shipped",
            StockEvent::Received(_) => "stock.received",
            StockEvent::LevelLow(_) => "stock.level_low",
        }
    }

    fn schema_version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::Reserved(e) => e.occurred_at,
            StockEvent::Released(e) => e.occurred_at,
            StockEvent::Shipped(e) => e.occurred_at,
            StockEvent::Received(e) => e.occurred_at,
            StockEvent::LevelLow(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::UnitOfMeasure;

    #[test]
    fn event_types_are_stable_identifiers() {
        let stock_id = StockId::new();
        let product_id = ProductId::new("prod-123").unwrap();
        let amount = Quantity::of(5, UnitOfMeasure::Each);

        let ev = StockEvent::Reserved(StockReserved::now(stock_id, product_id.clone(), amount));
        assert_eq!(ev.event_type(), "stock.reserved");
        assert_eq!(ev.product_id(), &product_id);
        assert_eq!(ev.stock_id(), stock_id);
        assert_eq!(ev.schema_version(), 1);
    }
}
