use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use stockroom_infra::ServiceError;
use stockroom_stock::{OwnerId, ProductId, StockId, StockState, UnitOfMeasure, WarehouseId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(provision_stock))
        .route("/lookup", get(lookup_stock))
        .route("/:id", get(get_stock))
        .route("/reserve", post(reserve_stock))
        .route("/allocate", post(allocate_stock))
        .route("/ship", post(ship_stock))
        .route("/release", post(release_stock))
        .route("/restore", post(restore_stock))
        .route("/receive", post(receive_stock))
}

pub async fn provision_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::ProvisionStockRequest>,
) -> axum::response::Response {
    let product_id = match ProductId::new(body.product_id) {
        Ok(v) => v,
        Err(e) => return errors::bad_request(e),
    };
    let warehouse_id = match WarehouseId::new(body.warehouse_id) {
        Ok(v) => v,
        Err(e) => return errors::bad_request(e),
    };
    let owner_id = match OwnerId::new(body.owner_id) {
        Ok(v) => v,
        Err(e) => return errors::bad_request(e),
    };
    let unit: UnitOfMeasure = match body.unit_of_measure.parse() {
        Ok(v) => v,
        Err(e) => return errors::bad_request(e),
    };

    match services.stock().provision(product_id, warehouse_id, owner_id, unit) {
        Ok(state) => (StatusCode::CREATED, Json(dto::stock_to_json(&state))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: StockId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid stock id"),
    };

    updated(services.stock().get(id))
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub product_id: String,
    pub warehouse_id: String,
}

pub async fn lookup_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<LookupQuery>,
) -> axum::response::Response {
    let product_id = match ProductId::new(query.product_id) {
        Ok(v) => v,
        Err(e) => return errors::bad_request(e),
    };
    let warehouse_id = match WarehouseId::new(query.warehouse_id) {
        Ok(v) => v,
        Err(e) => return errors::bad_request(e),
    };

    updated(services.stock().lookup(&product_id, &warehouse_id))
}

pub async fn reserve_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::StockCommandRequest>,
) -> axum::response::Response {
    let (product_id, warehouse_id, amount) = match dto::parse_command(body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    updated(services.stock().reserve(&product_id, &warehouse_id, amount))
}

pub async fn allocate_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::StockCommandRequest>,
) -> axum::response::Response {
    let (product_id, warehouse_id, amount) = match dto::parse_command(body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    updated(services.stock().allocate(&product_id, &warehouse_id, amount))
}

pub async fn ship_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::StockCommandRequest>,
) -> axum::response::Response {
    let (product_id, warehouse_id, amount) = match dto::parse_command(body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    updated(
        services
            .stock()
            .confirm_shipment(&product_id, &warehouse_id, amount),
    )
}

pub async fn release_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::StockCommandRequest>,
) -> axum::response::Response {
    let (product_id, warehouse_id, amount) = match dto::parse_command(body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    updated(services.stock().release(&product_id, &warehouse_id, amount))
}

pub async fn restore_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::StockCommandRequest>,
) -> axum::response::Response {
    let (product_id, warehouse_id, amount) = match dto::parse_command(body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    updated(services.stock().restore(&product_id, &warehouse_id, amount))
}

pub async fn receive_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::StockCommandRequest>,
) -> axum::response::Response {
    let (product_id, warehouse_id, amount) = match dto::parse_command(body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    updated(services.stock().receive(&product_id, &warehouse_id, amount))
}

/// 200 with the refreshed snapshot, or the mapped failure.
fn updated(result: Result<StockState, ServiceError>) -> axum::response::Response {
    match result {
        Ok(state) => (StatusCode::OK, Json(dto::stock_to_json(&state))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
