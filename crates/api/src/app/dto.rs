use serde::Deserialize;

use stockroom_stock::{ProductId, Quantity, Stock, StockState, UnitOfMeasure, WarehouseId};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ProvisionStockRequest {
    pub product_id: String,
    pub warehouse_id: String,
    pub owner_id: String,
    pub unit_of_measure: String,
}

/// Body shared by every stock command: addresses the record by business
/// key and carries the amount to move.
#[derive(Debug, Deserialize)]
pub struct StockCommandRequest {
    pub product_id: String,
    pub warehouse_id: String,
    pub quantity: i64,
    pub unit_of_measure: String,
}

/// Parse a command body into domain values, or a ready-made 400 response.
pub fn parse_command(
    req: StockCommandRequest,
) -> Result<(ProductId, WarehouseId, Quantity), axum::response::Response> {
    let product_id = ProductId::new(req.product_id).map_err(errors::bad_request)?;
    let warehouse_id = WarehouseId::new(req.warehouse_id).map_err(errors::bad_request)?;
    let unit: UnitOfMeasure = req
        .unit_of_measure
        .parse()
        .map_err(errors::bad_request)?;
    let quantity = Quantity::new(req.quantity, unit).map_err(errors::bad_request)?;
    Ok((product_id, warehouse_id, quantity))
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn stock_to_json(state: &StockState) -> serde_json::Value {
    // ATP is recomputed from the buckets on every read, never cached.
    let available = Stock::rehydrate(state.clone()).available_to_promise();

    serde_json::json!({
        "stock_id": state.id.to_string(),
        "product_id": state.product_id.as_str(),
        "warehouse_id": state.warehouse_id.as_str(),
        "owner_id": state.owner_id.as_str(),
        "unit_of_measure": state.unit_of_measure.as_str(),
        "on_hand": state.on_hand.amount(),
        "reserved": state.reserved.amount(),
        "allocated": state.allocated.amount(),
        "in_transit": state.in_transit.amount(),
        "safety_stock": state.safety_stock.amount(),
        "discrepancy_gap": state.discrepancy_gap.amount(),
        "available_to_promise": available.amount(),
        "low_stock_threshold": state.low_stock_threshold.amount(),
        "max_stock_threshold": state.max_stock_threshold.amount(),
        "rotation_policy": state.rotation_policy,
        "velocity_code": state.velocity_code,
        "lifecycle_status": state.lifecycle_status,
        "expiry_date": state.expiry_date,
        "last_updated": state.last_updated.to_rfc3339(),
        "last_audit_date": state.last_audit_date,
        "version": state.version,
    })
}
