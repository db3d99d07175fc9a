//! Application-level orchestration of the stock aggregate.
//!
//! One unit of work per call: load the record by business key, invoke
//! exactly one behavior, persist, then drain the pending events and hand
//! them to the event sink. The persist and the behavior are atomic per
//! record; publication happens strictly after the write commits
//! (at-least-once — consumers must be idempotent).
//!
//! Two concurrency disciplines are supported, chosen at construction:
//!
//! - [`ConcurrencyMode::Optimistic`]: read, behave, `save` with a version
//!   check; a lost race re-reads and re-applies up to a bounded retry
//!   count, then surfaces [`ServiceError::Conflict`]. Domain rejections are
//!   never retried.
//! - [`ConcurrencyMode::Pessimistic`]: a single `update_exclusive` unit of
//!   work under the store's row lock; contention serializes, no retries.

use thiserror::Error;
use uuid::Uuid;

use stockroom_events::{EventBus, EventEnvelope};
use stockroom_stock::{
    OwnerId, ProductId, Quantity, RotationPolicy, Stock, StockError, StockEvent, StockId,
    StockState, UnitOfMeasure, WarehouseId,
};

use crate::store::{StockStore, StoreError};

/// Aggregate type tag carried on published envelopes.
pub const AGGREGATE_TYPE: &str = "inventory.stock";

const DEFAULT_MAX_RETRIES: u32 = 3;

/// Concurrency-control discipline for write units of work.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConcurrencyMode {
    /// Version-checked writes with bounded re-read-and-retry.
    Optimistic { max_retries: u32 },
    /// Exclusive row lock held for the whole unit of work.
    Pessimistic,
}

impl Default for ConcurrencyMode {
    fn default() -> Self {
        ConcurrencyMode::Optimistic {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Failure surfaced by the orchestration boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No stock record for the requested key — a caller error, not a fault.
    #[error("stock record not found")]
    NotFound,

    /// Concurrent modification: retries exhausted or a duplicate insert.
    #[error("concurrent modification: {0}")]
    Conflict(String),

    /// Domain rejection from the aggregate, surfaced as-is.
    #[error(transparent)]
    Stock(#[from] StockError),

    /// The persistence backend failed.
    #[error("storage failure: {0}")]
    Store(String),

    /// State committed but event publication failed (retryable downstream).
    #[error("event publication failed after commit: {0}")]
    Publish(String),
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::Domain(e) => ServiceError::Stock(e),
            StoreError::Backend(msg) => ServiceError::Store(msg),
        }
    }
}

/// Orchestrates stock units of work over an injected store and event sink.
#[derive(Debug)]
pub struct StockService<S, B> {
    store: S,
    bus: B,
    mode: ConcurrencyMode,
}

impl<S, B> StockService<S, B> {
    pub fn new(store: S, bus: B, mode: ConcurrencyMode) -> Self {
        Self { store, bus, mode }
    }

    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }
}

impl<S, B> StockService<S, B>
where
    S: StockStore,
    B: EventBus<EventEnvelope<StockEvent>>,
{
    /// Provision a new record with default policy.
    pub fn provision(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        owner_id: OwnerId,
        unit_of_measure: UnitOfMeasure,
    ) -> Result<StockState, ServiceError> {
        self.insert_new(Stock::provision(
            product_id,
            warehouse_id,
            owner_id,
            unit_of_measure,
        )?)
    }

    /// Provision a new record with explicit rotation policy and thresholds.
    pub fn provision_with_policy(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        owner_id: OwnerId,
        rotation_policy: RotationPolicy,
        low_stock_threshold: Quantity,
        max_stock_threshold: Quantity,
        unit_of_measure: UnitOfMeasure,
    ) -> Result<StockState, ServiceError> {
        self.insert_new(Stock::create(
            product_id,
            warehouse_id,
            owner_id,
            rotation_policy,
            low_stock_threshold,
            max_stock_threshold,
            unit_of_measure,
        )?)
    }

    pub fn get(&self, id: StockId) -> Result<StockState, ServiceError> {
        self.store.get(id)?.ok_or(ServiceError::NotFound)
    }

    pub fn lookup(
        &self,
        product_id: &ProductId,
        warehouse_id: &WarehouseId,
    ) -> Result<StockState, ServiceError> {
        self.store
            .find_by_product_and_warehouse(product_id, warehouse_id)?
            .ok_or(ServiceError::NotFound)
    }

    pub fn reserve(
        &self,
        product_id: &ProductId,
        warehouse_id: &WarehouseId,
        amount: Quantity,
    ) -> Result<StockState, ServiceError> {
        self.execute(product_id, warehouse_id, |stock| stock.reserve(amount))
    }

    pub fn allocate(
        &self,
        product_id: &ProductId,
        warehouse_id: &WarehouseId,
        amount: Quantity,
    ) -> Result<StockState, ServiceError> {
        self.execute(product_id, warehouse_id, |stock| stock.allocate(amount))
    }

    pub fn confirm_shipment(
        &self,
        product_id: &ProductId,
        warehouse_id: &WarehouseId,
        amount: Quantity,
    ) -> Result<StockState, ServiceError> {
        self.execute(product_id, warehouse_id, |stock| {
            stock.confirm_shipment(amount)
        })
    }

    pub fn release(
        &self,
        product_id: &ProductId,
        warehouse_id: &WarehouseId,
        amount: Quantity,
    ) -> Result<StockState, ServiceError> {
        self.execute(product_id, warehouse_id, |stock| stock.release(amount))
    }

    pub fn restore(
        &self,
        product_id: &ProductId,
        warehouse_id: &WarehouseId,
        amount: Quantity,
    ) -> Result<StockState, ServiceError> {
        self.execute(product_id, warehouse_id, |stock| stock.restore(amount))
    }

    pub fn receive(
        &self,
        product_id: &ProductId,
        warehouse_id: &WarehouseId,
        amount: Quantity,
    ) -> Result<StockState, ServiceError> {
        self.execute(product_id, warehouse_id, |stock| stock.receive(amount))
    }

    fn insert_new(&self, stock: Stock) -> Result<StockState, ServiceError> {
        let state = self.store.insert(&stock)?;
        tracing::info!(
            stock_id = %state.id,
            product_id = %state.product_id,
            warehouse_id = %state.warehouse_id,
            "provisioned stock record"
        );
        Ok(state)
    }

    /// Run one behavior as one unit of work under the configured
    /// concurrency discipline.
    fn execute(
        &self,
        product_id: &ProductId,
        warehouse_id: &WarehouseId,
        op: impl Fn(&mut Stock) -> Result<(), StockError>,
    ) -> Result<StockState, ServiceError> {
        match self.mode {
            ConcurrencyMode::Pessimistic => {
                let current = self.lookup(product_id, warehouse_id)?;
                let (state, events) = self.store.update_exclusive(current.id, &mut |stock| {
                    op(stock)
                })?;
                self.publish(&state, events)?;
                Ok(state)
            }
            ConcurrencyMode::Optimistic { max_retries } => {
                let mut attempts = 0u32;
                loop {
                    let current = self.lookup(product_id, warehouse_id)?;
                    let mut stock = Stock::rehydrate(current);

                    // Domain rejections surface immediately — they are
                    // deterministic against the state just read, only
                    // lost races are worth retrying.
                    op(&mut stock)?;

                    match self.store.save(&stock) {
                        Ok(state) => {
                            let events = stock.take_events();
                            self.publish(&state, events)?;
                            return Ok(state);
                        }
                        Err(StoreError::Conflict(msg)) => {
                            attempts += 1;
                            if attempts > max_retries {
                                return Err(ServiceError::Conflict(format!(
                                    "retries exhausted after {attempts} attempts: {msg}"
                                )));
                            }
                            tracing::warn!(
                                attempts,
                                product_id = %product_id,
                                "optimistic save lost a race; re-reading and retrying"
                            );
                        }
                        Err(other) => return Err(other.into()),
                    }
                }
            }
        }
    }

    /// Hand committed events to the sink, keyed by product id so
    /// partitioned transports preserve per-product ordering.
    fn publish(&self, state: &StockState, events: Vec<StockEvent>) -> Result<(), ServiceError> {
        for event in events {
            let partition_key = event.product_id().to_string();
            let envelope = EventEnvelope::new(
                Uuid::now_v7(),
                partition_key,
                AGGREGATE_TYPE,
                state.version,
                event,
            );
            self.bus
                .publish(envelope)
                .map_err(|e| ServiceError::Publish(format!("{e:?}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stockroom_events::{Event, InMemoryEventBus, Subscription};

    use super::*;
    use crate::store::InMemoryStockStore;

    const UNIT: UnitOfMeasure = UnitOfMeasure::Each;

    type TestService =
        StockService<Arc<InMemoryStockStore>, Arc<InMemoryEventBus<EventEnvelope<StockEvent>>>>;

    fn qty(amount: u64) -> Quantity {
        Quantity::of(amount, UNIT)
    }

    fn test_product_id() -> ProductId {
        ProductId::new("prod-123").unwrap()
    }

    fn test_warehouse_id() -> WarehouseId {
        WarehouseId::new("wh-texas").unwrap()
    }

    fn service_with(mode: ConcurrencyMode) -> (TestService, Subscription<EventEnvelope<StockEvent>>) {
        let store = Arc::new(InMemoryStockStore::new());
        let bus: Arc<InMemoryEventBus<EventEnvelope<StockEvent>>> =
            Arc::new(InMemoryEventBus::new());
        let sub = bus.subscribe();
        (StockService::new(store, bus, mode), sub)
    }

    fn provisioned(mode: ConcurrencyMode) -> (TestService, Subscription<EventEnvelope<StockEvent>>) {
        let (service, sub) = service_with(mode);
        service
            .provision(
                test_product_id(),
                test_warehouse_id(),
                OwnerId::new("owner-1").unwrap(),
                UNIT,
            )
            .unwrap();
        service
            .restore(&test_product_id(), &test_warehouse_id(), qty(100))
            .unwrap();
        (service, sub)
    }

    #[test]
    fn reserve_commits_state_and_publishes_keyed_envelope() {
        let (service, sub) = provisioned(ConcurrencyMode::default());

        let state = service
            .reserve(&test_product_id(), &test_warehouse_id(), qty(30))
            .unwrap();

        assert_eq!(state.reserved, qty(30));
        assert_eq!(state.version, 2); // provision=0, restore=1, reserve=2

        let envelope = sub.try_recv().expect("reserve event published");
        assert_eq!(envelope.partition_key(), "prod-123");
        assert_eq!(envelope.source(), AGGREGATE_TYPE);
        assert_eq!(envelope.record_version(), state.version);
        assert_eq!(envelope.payload().event_type(), "stock.reserved");
    }

    #[test]
    fn behaviors_on_a_missing_record_are_not_found() {
        let (service, _sub) = service_with(ConcurrencyMode::default());

        let err = service
            .reserve(&test_product_id(), &test_warehouse_id(), qty(1))
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
    }

    #[test]
    fn duplicate_provision_conflicts() {
        let (service, _sub) = provisioned(ConcurrencyMode::default());

        let err = service
            .provision(
                test_product_id(),
                test_warehouse_id(),
                OwnerId::new("owner-2").unwrap(),
                UNIT,
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn insufficient_stock_surfaces_amounts_and_publishes_nothing() {
        let (service, sub) = provisioned(ConcurrencyMode::default());
        while sub.try_recv().is_ok() {} // drop provisioning noise

        let err = service
            .reserve(&test_product_id(), &test_warehouse_id(), qty(150))
            .unwrap_err();

        match err {
            ServiceError::Stock(StockError::InsufficientStock {
                requested,
                available,
                ..
            }) => {
                assert_eq!(requested, qty(150));
                assert_eq!(available, qty(100));
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert!(sub.try_recv().is_err());
    }

    #[test]
    fn full_order_lifecycle_under_pessimistic_locking() {
        let (service, _sub) = provisioned(ConcurrencyMode::Pessimistic);
        let product = test_product_id();
        let warehouse = test_warehouse_id();

        service.reserve(&product, &warehouse, qty(40)).unwrap();
        service.allocate(&product, &warehouse, qty(40)).unwrap();
        let state = service
            .confirm_shipment(&product, &warehouse, qty(40))
            .unwrap();

        assert_eq!(state.on_hand, qty(60));
        assert!(state.reserved.is_zero());
        assert!(state.allocated.is_zero());
    }

    #[test]
    fn concurrent_reservations_never_oversell_optimistically() {
        let (service, _sub) = provisioned(ConcurrencyMode::Optimistic { max_retries: 5 });
        let service = Arc::new(service);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let service = service.clone();
                std::thread::spawn(move || {
                    service.reserve(&test_product_id(), &test_warehouse_id(), qty(60))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let ok = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok, 1, "exactly one of two 60-unit reservations can win");
        assert!(results.iter().any(|r| matches!(
            r,
            Err(ServiceError::Stock(StockError::InsufficientStock { .. }))
        )));

        let state = service
            .lookup(&test_product_id(), &test_warehouse_id())
            .unwrap();
        assert_eq!(state.reserved, qty(60));
    }

    #[test]
    fn contended_reservations_all_land_under_row_locking() {
        let (service, _sub) = provisioned(ConcurrencyMode::Pessimistic);
        let service = Arc::new(service);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                std::thread::spawn(move || {
                    service.reserve(&test_product_id(), &test_warehouse_id(), qty(10))
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let state = service
            .lookup(&test_product_id(), &test_warehouse_id())
            .unwrap();
        assert_eq!(state.reserved, qty(80));
    }

    #[test]
    fn reserve_then_release_round_trips_through_the_service() {
        let (service, _sub) = provisioned(ConcurrencyMode::default());
        let product = test_product_id();
        let warehouse = test_warehouse_id();

        let before = service.lookup(&product, &warehouse).unwrap();
        service.reserve(&product, &warehouse, qty(25)).unwrap();
        let after = service.release(&product, &warehouse, qty(25)).unwrap();

        assert_eq!(after.reserved, before.reserved);
        assert_eq!(after.on_hand, before.on_hand);
    }
}
