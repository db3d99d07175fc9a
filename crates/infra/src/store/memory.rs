//! In-memory stock store for tests/dev.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use stockroom_core::{AggregateRoot, ExpectedVersion};
use stockroom_stock::{ProductId, Stock, StockError, StockEvent, StockId, StockState, WarehouseId};

use super::{StockStore, StoreError};

/// In-memory stock store.
///
/// Each record lives behind its own `Mutex` — that mutex *is* the exclusive
/// row lock for `update_exclusive`, and also serializes the compare-and-bump
/// of the optimistic `save`. The outer map lock is held only long enough to
/// find the row. Intended for tests/dev; not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    rows: RwLock<HashMap<StockId, Arc<Mutex<StockState>>>>,
    by_key: RwLock<HashMap<(ProductId, WarehouseId), StockId>>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn row(&self, id: StockId) -> Result<Arc<Mutex<StockState>>, StoreError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StoreError::Backend("row map lock poisoned".to_string()))?;
        rows.get(&id).cloned().ok_or(StoreError::NotFound)
    }
}

impl StockStore for InMemoryStockStore {
    fn insert(&self, stock: &Stock) -> Result<StockState, StoreError> {
        let state = stock.state();
        let key = (state.product_id.clone(), state.warehouse_id.clone());

        let mut by_key = self
            .by_key
            .write()
            .map_err(|_| StoreError::Backend("key index lock poisoned".to_string()))?;
        if by_key.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "stock record already exists for {} at {}",
                key.0, key.1
            )));
        }

        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::Backend("row map lock poisoned".to_string()))?;
        by_key.insert(key, state.id);
        rows.insert(state.id, Arc::new(Mutex::new(state.clone())));
        Ok(state)
    }

    fn get(&self, id: StockId) -> Result<Option<StockState>, StoreError> {
        match self.row(id) {
            Ok(row) => {
                let guard = row
                    .lock()
                    .map_err(|_| StoreError::Backend("row lock poisoned".to_string()))?;
                Ok(Some(guard.clone()))
            }
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn find_by_product_and_warehouse(
        &self,
        product_id: &ProductId,
        warehouse_id: &WarehouseId,
    ) -> Result<Option<StockState>, StoreError> {
        let id = {
            let by_key = self
                .by_key
                .read()
                .map_err(|_| StoreError::Backend("key index lock poisoned".to_string()))?;
            by_key
                .get(&(product_id.clone(), warehouse_id.clone()))
                .copied()
        };
        match id {
            Some(id) => self.get(id),
            None => Ok(None),
        }
    }

    fn save(&self, stock: &Stock) -> Result<StockState, StoreError> {
        let expected = ExpectedVersion::Exact(stock.version());
        let mut state = stock.state();
        let row = self.row(state.id)?;
        let mut guard = row
            .lock()
            .map_err(|_| StoreError::Backend("row lock poisoned".to_string()))?;

        if !expected.matches(guard.version) {
            return Err(StoreError::Conflict(format!(
                "record version advanced since read (read {}, stored {})",
                stock.version(),
                guard.version
            )));
        }

        state.version = guard.version + 1;
        *guard = state.clone();
        Ok(state)
    }

    fn update_exclusive(
        &self,
        id: StockId,
        op: &mut dyn FnMut(&mut Stock) -> Result<(), StockError>,
    ) -> Result<(StockState, Vec<StockEvent>), StoreError> {
        let row = self.row(id)?;

        // Row lock held across the whole read-behavior-write unit of work.
        let mut guard = row
            .lock()
            .map_err(|_| StoreError::Backend("row lock poisoned".to_string()))?;

        let mut stock = Stock::rehydrate(guard.clone());
        op(&mut stock)?;

        let mut state = stock.state();
        state.version = guard.version + 1;
        *guard = state.clone();

        let events = stock.take_events();
        Ok((state, events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_stock::{OwnerId, Quantity, UnitOfMeasure};

    const UNIT: UnitOfMeasure = UnitOfMeasure::Each;

    fn new_stock(product: &str, warehouse: &str) -> Stock {
        Stock::provision(
            ProductId::new(product).unwrap(),
            WarehouseId::new(warehouse).unwrap(),
            OwnerId::new("owner-1").unwrap(),
            UNIT,
        )
        .unwrap()
    }

    #[test]
    fn insert_then_find_by_business_key() {
        let store = InMemoryStockStore::new();
        let stock = new_stock("prod-a", "wh-1");
        let inserted = store.insert(&stock).unwrap();

        let found = store
            .find_by_product_and_warehouse(stock.product_id(), stock.warehouse_id())
            .unwrap()
            .unwrap();
        assert_eq!(found, inserted);

        let by_id = store.get(inserted.id).unwrap().unwrap();
        assert_eq!(by_id, inserted);
    }

    #[test]
    fn duplicate_business_key_conflicts() {
        let store = InMemoryStockStore::new();
        store.insert(&new_stock("prod-a", "wh-1")).unwrap();

        let err = store.insert(&new_stock("prod-a", "wh-1")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn stale_save_is_rejected() {
        let store = InMemoryStockStore::new();
        let inserted = store.insert(&new_stock("prod-a", "wh-1")).unwrap();

        // Two readers load the same version.
        let mut first = Stock::rehydrate(inserted.clone());
        let mut second = Stock::rehydrate(inserted);
        first.restore(Quantity::of(10, UNIT)).unwrap();
        second.restore(Quantity::of(20, UNIT)).unwrap();

        let saved = store.save(&first).unwrap();
        assert_eq!(saved.version, 1);

        let err = store.save(&second).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // The winning write is what persisted.
        let current = store.get(saved.id).unwrap().unwrap();
        assert_eq!(current.on_hand, Quantity::of(10, UNIT));
    }

    #[test]
    fn update_exclusive_persists_bumps_version_and_drains_events() {
        let store = InMemoryStockStore::new();
        let inserted = store.insert(&new_stock("prod-a", "wh-1")).unwrap();

        let (state, events) = store
            .update_exclusive(inserted.id, &mut |stock| {
                stock.receive(Quantity::of(40, UNIT))
            })
            .unwrap();

        assert_eq!(state.on_hand, Quantity::of(40, UNIT));
        assert_eq!(state.version, 1);
        assert!(!events.is_empty());

        let current = store.get(inserted.id).unwrap().unwrap();
        assert_eq!(current, state);
    }

    #[test]
    fn update_exclusive_surfaces_domain_rejections_without_writing() {
        let store = InMemoryStockStore::new();
        let inserted = store.insert(&new_stock("prod-a", "wh-1")).unwrap();

        let err = store
            .update_exclusive(inserted.id, &mut |stock| {
                stock.reserve(Quantity::of(99, UNIT))
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(_)));

        let current = store.get(inserted.id).unwrap().unwrap();
        assert_eq!(current.version, 0);
        assert!(current.reserved.is_zero());
    }

    #[test]
    fn update_exclusive_on_missing_record_is_not_found() {
        let store = InMemoryStockStore::new();
        let err = store
            .update_exclusive(StockId::new(), &mut |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
