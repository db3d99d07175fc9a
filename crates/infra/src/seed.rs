//! Demo seed data: one telecom asset record, provisioned idempotently.

use stockroom_events::{EventBus, EventEnvelope};
use stockroom_stock::{
    OwnerId, ProductId, Quantity, RotationPolicy, StockEvent, UnitOfMeasure, WarehouseId,
};

use crate::service::{ServiceError, StockService};
use crate::store::StockStore;

/// Provision the demo stock record unless it already exists.
///
/// Seeds `ERICSSON-5G-RAD-001` at `TX-HUB-DALLAS` (owner `ATT-NETWORK-OPS`,
/// FIFO, thresholds 5/100 EACH), books 50 units on hand and reserves 2.
pub fn seed_demo_stock<S, B>(service: &StockService<S, B>) -> Result<(), ServiceError>
where
    S: StockStore,
    B: EventBus<EventEnvelope<StockEvent>>,
{
    let product_id = ProductId::new("ERICSSON-5G-RAD-001")?;
    let warehouse_id = WarehouseId::new("TX-HUB-DALLAS")?;

    match service.lookup(&product_id, &warehouse_id) {
        Ok(_) => {
            tracing::info!("demo stock already provisioned; skipping seed");
            return Ok(());
        }
        Err(ServiceError::NotFound) => {}
        Err(e) => return Err(e),
    }

    let unit = UnitOfMeasure::Each;
    service.provision_with_policy(
        product_id.clone(),
        warehouse_id.clone(),
        OwnerId::new("ATT-NETWORK-OPS")?,
        RotationPolicy::Fifo,
        Quantity::of(5, unit),
        Quantity::of(100, unit),
        unit,
    )?;
    service.restore(&product_id, &warehouse_id, Quantity::of(50, unit))?;
    service.reserve(&product_id, &warehouse_id, Quantity::of(2, unit))?;

    tracing::info!(
        product_id = %product_id,
        warehouse_id = %warehouse_id,
        "provisioned demo stock record"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stockroom_events::InMemoryEventBus;

    use super::*;
    use crate::service::ConcurrencyMode;
    use crate::store::InMemoryStockStore;

    #[test]
    fn seed_is_idempotent() {
        let store = Arc::new(InMemoryStockStore::new());
        let bus: Arc<InMemoryEventBus<EventEnvelope<StockEvent>>> =
            Arc::new(InMemoryEventBus::new());
        let service = StockService::new(store, bus, ConcurrencyMode::default());

        seed_demo_stock(&service).unwrap();
        seed_demo_stock(&service).unwrap();

        let state = service
            .lookup(
                &ProductId::new("ERICSSON-5G-RAD-001").unwrap(),
                &WarehouseId::new("TX-HUB-DALLAS").unwrap(),
            )
            .unwrap();
        assert_eq!(state.on_hand, Quantity::of(50, UnitOfMeasure::Each));
        assert_eq!(state.reserved, Quantity::of(2, UnitOfMeasure::Each));
        assert_eq!(state.rotation_policy, RotationPolicy::Fifo);
    }
}
