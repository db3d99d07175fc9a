//! Persistence boundary for stock records.
//!
//! Stores persist [`StockState`] snapshots — the aggregate's lossless
//! mapping type — and own the concurrency discipline: an optimistic
//! version check on `save`, and an exclusive per-record lock for
//! `update_exclusive`. The aggregate itself stays a plain value.

use std::sync::Arc;

use thiserror::Error;

use stockroom_stock::{ProductId, StockError, StockEvent, StockId, StockState, WarehouseId};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStockStore;
pub use postgres::PostgresStockStore;

/// Stock store operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record for the given identifier or business key.
    #[error("stock record not found")]
    NotFound,

    /// Optimistic version check failed or a unique key already exists.
    #[error("concurrent modification: {0}")]
    Conflict(String),

    /// A domain rejection surfaced from inside an exclusive unit of work.
    #[error(transparent)]
    Domain(#[from] StockError),

    /// The backing storage failed (connectivity, constraint, mapping).
    #[error("storage failure: {0}")]
    Backend(String),
}

/// Persistence contract for stock records.
///
/// - `save` is the **optimistic** write: it is rejected with
///   [`StoreError::Conflict`] unless the stored version still equals the
///   record's version at read time, and bumps the version on success.
///   Callers re-read and retry (bounded) on conflict.
/// - `update_exclusive` is the **pessimistic** unit of work: one exclusive
///   per-record lock held across read → behavior → write. No retries are
///   needed; contention serializes on the lock. The pending-event buffer is
///   drained after the write and returned alongside the refreshed snapshot.
///
/// Implementations must make the read-behavior-write sequence atomic per
/// record; blocking and locking live here, never in the aggregate.
pub trait StockStore: Send + Sync {
    /// Persist a brand-new record. Fails with [`StoreError::Conflict`] if
    /// the `(product, warehouse)` business key is already present.
    fn insert(&self, stock: &stockroom_stock::Stock) -> Result<StockState, StoreError>;

    /// Fetch by technical id.
    fn get(&self, id: StockId) -> Result<Option<StockState>, StoreError>;

    /// Fetch by business key — "the 5G radio at the Dallas hub".
    fn find_by_product_and_warehouse(
        &self,
        product_id: &ProductId,
        warehouse_id: &WarehouseId,
    ) -> Result<Option<StockState>, StoreError>;

    /// Optimistic write (see trait docs).
    fn save(&self, stock: &stockroom_stock::Stock) -> Result<StockState, StoreError>;

    /// Pessimistic unit of work (see trait docs).
    fn update_exclusive(
        &self,
        id: StockId,
        op: &mut dyn FnMut(&mut stockroom_stock::Stock) -> Result<(), StockError>,
    ) -> Result<(StockState, Vec<StockEvent>), StoreError>;
}

impl<S> StockStore for Arc<S>
where
    S: StockStore + ?Sized,
{
    fn insert(&self, stock: &stockroom_stock::Stock) -> Result<StockState, StoreError> {
        (**self).insert(stock)
    }

    fn get(&self, id: StockId) -> Result<Option<StockState>, StoreError> {
        (**self).get(id)
    }

    fn find_by_product_and_warehouse(
        &self,
        product_id: &ProductId,
        warehouse_id: &WarehouseId,
    ) -> Result<Option<StockState>, StoreError> {
        (**self).find_by_product_and_warehouse(product_id, warehouse_id)
    }

    fn save(&self, stock: &stockroom_stock::Stock) -> Result<StockState, StoreError> {
        (**self).save(stock)
    }

    fn update_exclusive(
        &self,
        id: StockId,
        op: &mut dyn FnMut(&mut stockroom_stock::Stock) -> Result<(), StockError>,
    ) -> Result<(StockState, Vec<StockEvent>), StoreError> {
        (**self).update_exclusive(id, op)
    }
}
