//! `stockroom-stock` — the stock aggregate and its value objects.
//!
//! This crate is the domain core: the quantity bookkeeping rules, the bucket
//! state machine, the invariants that hold across every transition, and the
//! domain events describing what happened. No IO, no locking — concurrency
//! control is the persistence boundary's job.

pub mod error;
pub mod events;
pub mod ids;
pub mod policy;
pub mod quantity;
pub mod stock;

pub use error::{StockError, StockResult};
pub use events::{
    StockEvent, StockLevelLow, StockReceived, StockReleased, StockReserved, StockShipped,
};
pub use ids::{OwnerId, ProductId, StockId, WarehouseId};
pub use policy::{LifecycleStatus, RotationPolicy, VelocityCode};
pub use quantity::{Quantity, QuantityError, UnitOfMeasure};
pub use stock::{Stock, StockState};
