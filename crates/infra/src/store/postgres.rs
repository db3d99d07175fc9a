//! Postgres-backed stock store.
//!
//! One row per stock record in `stock_records`; every field of the
//! aggregate snapshot maps to a column and round-trips losslessly:
//!
//! ```sql
//! CREATE TABLE stock_records (
//!     id                  UUID PRIMARY KEY,
//!     product_id          TEXT        NOT NULL,
//!     warehouse_id        TEXT        NOT NULL,
//!     owner_id            TEXT        NOT NULL,
//!     unit_of_measure     TEXT        NOT NULL,
//!     on_hand             BIGINT      NOT NULL,
//!     reserved            BIGINT      NOT NULL,
//!     allocated           BIGINT      NOT NULL,
//!     in_transit          BIGINT      NOT NULL,
//!     safety_stock        BIGINT      NOT NULL,
//!     discrepancy_gap     BIGINT      NOT NULL,
//!     low_stock_threshold BIGINT      NOT NULL,
//!     max_stock_threshold BIGINT      NOT NULL,
//!     rotation_policy     TEXT        NOT NULL,
//!     velocity_code       TEXT        NOT NULL,
//!     lifecycle_status    TEXT        NOT NULL,
//!     expiry_date         DATE,
//!     last_updated        TIMESTAMPTZ NOT NULL,
//!     last_audit_date     DATE        NOT NULL,
//!     version             BIGINT      NOT NULL,
//!     UNIQUE (product_id, warehouse_id)
//! );
//! ```
//!
//! Concurrency:
//! - `save` issues `UPDATE ... WHERE id = $1 AND version = $2`; zero rows
//!   affected with an existing id means the version advanced since the read
//!   and surfaces as [`StoreError::Conflict`].
//! - `update_exclusive` wraps `SELECT ... FOR UPDATE` + `UPDATE` in one
//!   transaction; the row lock is held for the whole unit of work.
//!
//! The `StockStore` trait is synchronous; this implementation bridges to
//! sqlx through the current tokio runtime handle, the same discipline the
//! in-memory store's callers already follow.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use stockroom_core::AggregateRoot;
use stockroom_stock::{
    LifecycleStatus, ProductId, Quantity, RotationPolicy, Stock, StockError, StockEvent, StockId,
    StockState, UnitOfMeasure, VelocityCode, WarehouseId,
};

use super::{StockStore, StoreError};

/// Postgres-backed stock store.
///
/// Thread-safe: all operations go through the sqlx connection pool.
#[derive(Debug, Clone)]
pub struct PostgresStockStore {
    pool: Arc<PgPool>,
}

impl PostgresStockStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(skip(self, state), fields(stock_id = %state.id), err)]
    async fn insert_row(&self, state: &StockState) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO stock_records (
                id, product_id, warehouse_id, owner_id, unit_of_measure,
                on_hand, reserved, allocated, in_transit, safety_stock, discrepancy_gap,
                low_stock_threshold, max_stock_threshold, rotation_policy, velocity_code,
                lifecycle_status, expiry_date, last_updated, last_audit_date, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(state.id.as_uuid())
        .bind(state.product_id.as_str())
        .bind(state.warehouse_id.as_str())
        .bind(state.owner_id.as_str())
        .bind(state.unit_of_measure.as_str())
        .bind(state.on_hand.amount() as i64)
        .bind(state.reserved.amount() as i64)
        .bind(state.allocated.amount() as i64)
        .bind(state.in_transit.amount() as i64)
        .bind(state.safety_stock.amount() as i64)
        .bind(state.discrepancy_gap.amount() as i64)
        .bind(state.low_stock_threshold.amount() as i64)
        .bind(state.max_stock_threshold.amount() as i64)
        .bind(rotation_to_str(state.rotation_policy))
        .bind(velocity_to_str(state.velocity_code))
        .bind(lifecycle_to_str(state.lifecycle_status))
        .bind(state.expiry_date)
        .bind(state.last_updated)
        .bind(state.last_audit_date)
        .bind(state.version as i64)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!(
                    "stock record already exists for {} at {}",
                    state.product_id, state.warehouse_id
                ))
            } else {
                map_sqlx_error("insert", e)
            }
        })?;
        Ok(())
    }

    #[instrument(skip(self, id), fields(stock_id = %id), err)]
    async fn get_row(&self, id: StockId) -> Result<Option<StockState>, StoreError> {
        let sql = select_sql("WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;

        row.map(|r| state_from_row(&r)).transpose()
    }

    #[instrument(
        skip(self, product_id, warehouse_id),
        fields(product_id = %product_id, warehouse_id = %warehouse_id),
        err
    )]
    async fn find_row(
        &self,
        product_id: &ProductId,
        warehouse_id: &WarehouseId,
    ) -> Result<Option<StockState>, StoreError> {
        let sql = select_sql("WHERE product_id = $1 AND warehouse_id = $2");
        let row = sqlx::query(&sql)
            .bind(product_id.as_str())
            .bind(warehouse_id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_product_and_warehouse", e))?;

        row.map(|r| state_from_row(&r)).transpose()
    }

    #[instrument(skip(self, state), fields(stock_id = %state.id), err)]
    async fn save_row(
        &self,
        state: &StockState,
        read_version: u64,
    ) -> Result<StockState, StoreError> {
        let mut next = state.clone();
        next.version = read_version + 1;

        let result = update_query(&next, read_version)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("save", e))?;

        if result.rows_affected() == 0 {
            // Distinguish a vanished row from a lost race.
            return match self.get_row(state.id).await? {
                None => Err(StoreError::NotFound),
                Some(current) => Err(StoreError::Conflict(format!(
                    "record version advanced since read (read {read_version}, stored {})",
                    current.version
                ))),
            };
        }

        Ok(next)
    }

    async fn update_exclusive_row(
        &self,
        id: StockId,
        op: &mut dyn FnMut(&mut Stock) -> Result<(), StockError>,
    ) -> Result<(StockState, Vec<StockEvent>), StoreError> {
        let mut tx: Transaction<'_, Postgres> = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        // Exclusive row lock, held until commit/rollback.
        let sql = select_sql("WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock", e))?;

        let Some(row) = row else {
            return Err(StoreError::NotFound);
        };
        let current = state_from_row(&row)?;

        let mut stock = Stock::rehydrate(current.clone());
        op(&mut stock)?;

        let mut next = stock.state();
        next.version = current.version + 1;

        update_query(&next, current.version)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;

        let events = stock.take_events();
        Ok((next, events))
    }

    fn runtime_handle() -> Result<tokio::runtime::Handle, StoreError> {
        tokio::runtime::Handle::try_current().map_err(|_| {
            StoreError::Backend(
                "PostgresStockStore requires a tokio runtime context".to_string(),
            )
        })
    }
}

impl StockStore for PostgresStockStore {
    fn insert(&self, stock: &Stock) -> Result<StockState, StoreError> {
        let state = stock.state();
        Self::runtime_handle()?.block_on(self.insert_row(&state))?;
        Ok(state)
    }

    fn get(&self, id: StockId) -> Result<Option<StockState>, StoreError> {
        Self::runtime_handle()?.block_on(self.get_row(id))
    }

    fn find_by_product_and_warehouse(
        &self,
        product_id: &ProductId,
        warehouse_id: &WarehouseId,
    ) -> Result<Option<StockState>, StoreError> {
        Self::runtime_handle()?.block_on(self.find_row(product_id, warehouse_id))
    }

    fn save(&self, stock: &Stock) -> Result<StockState, StoreError> {
        let state = stock.state();
        Self::runtime_handle()?.block_on(self.save_row(&state, stock.version()))
    }

    fn update_exclusive(
        &self,
        id: StockId,
        op: &mut dyn FnMut(&mut Stock) -> Result<(), StockError>,
    ) -> Result<(StockState, Vec<StockEvent>), StoreError> {
        Self::runtime_handle()?.block_on(self.update_exclusive_row(id, op))
    }
}

const COLUMNS: &str = "id, product_id, warehouse_id, owner_id, unit_of_measure, \
     on_hand, reserved, allocated, in_transit, safety_stock, discrepancy_gap, \
     low_stock_threshold, max_stock_threshold, rotation_policy, velocity_code, \
     lifecycle_status, expiry_date, last_updated, last_audit_date, version";

fn select_sql(tail: &str) -> String {
    format!("SELECT {COLUMNS} FROM stock_records {tail}")
}

/// Full-row update predicated on the version read at load time.
fn update_query(
    next: &StockState,
    read_version: u64,
) -> sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(
        r#"
        UPDATE stock_records SET
            on_hand = $3, reserved = $4, allocated = $5, in_transit = $6,
            safety_stock = $7, discrepancy_gap = $8,
            velocity_code = $9, lifecycle_status = $10, expiry_date = $11,
            last_updated = $12, last_audit_date = $13, version = $14
        WHERE id = $1 AND version = $2
        "#,
    )
    .bind(next.id.as_uuid())
    .bind(read_version as i64)
    .bind(next.on_hand.amount() as i64)
    .bind(next.reserved.amount() as i64)
    .bind(next.allocated.amount() as i64)
    .bind(next.in_transit.amount() as i64)
    .bind(next.safety_stock.amount() as i64)
    .bind(next.discrepancy_gap.amount() as i64)
    .bind(velocity_to_str(next.velocity_code))
    .bind(lifecycle_to_str(next.lifecycle_status))
    .bind(next.expiry_date)
    .bind(next.last_updated)
    .bind(next.last_audit_date)
    .bind(next.version as i64)
}

fn state_from_row(row: &sqlx::postgres::PgRow) -> Result<StockState, StoreError> {
    let id: Uuid = read(row, "id")?;
    let product_id: String = read(row, "product_id")?;
    let warehouse_id: String = read(row, "warehouse_id")?;
    let owner_id: String = read(row, "owner_id")?;
    let unit_raw: String = read(row, "unit_of_measure")?;
    let unit = UnitOfMeasure::from_str(&unit_raw)
        .map_err(|e| StoreError::Backend(format!("bad unit_of_measure column: {e}")))?;

    let qty = |column: &str| -> Result<Quantity, StoreError> {
        let amount: i64 = read(row, column)?;
        Ok(Quantity::of(amount as u64, unit))
    };

    let rotation_raw: String = read(row, "rotation_policy")?;
    let velocity_raw: String = read(row, "velocity_code")?;
    let lifecycle_raw: String = read(row, "lifecycle_status")?;
    let expiry_date: Option<NaiveDate> = read(row, "expiry_date")?;
    let last_updated: DateTime<Utc> = read(row, "last_updated")?;
    let last_audit_date: NaiveDate = read(row, "last_audit_date")?;
    let version: i64 = read(row, "version")?;

    Ok(StockState {
        id: StockId::from_uuid(id),
        product_id: ProductId::new(product_id)
            .map_err(|e| StoreError::Backend(format!("bad product_id column: {e}")))?,
        warehouse_id: WarehouseId::new(warehouse_id)
            .map_err(|e| StoreError::Backend(format!("bad warehouse_id column: {e}")))?,
        owner_id: stockroom_stock::OwnerId::new(owner_id)
            .map_err(|e| StoreError::Backend(format!("bad owner_id column: {e}")))?,
        unit_of_measure: unit,
        on_hand: qty("on_hand")?,
        reserved: qty("reserved")?,
        allocated: qty("allocated")?,
        in_transit: qty("in_transit")?,
        safety_stock: qty("safety_stock")?,
        discrepancy_gap: qty("discrepancy_gap")?,
        low_stock_threshold: qty("low_stock_threshold")?,
        max_stock_threshold: qty("max_stock_threshold")?,
        rotation_policy: rotation_from_str(&rotation_raw)?,
        velocity_code: velocity_from_str(&velocity_raw)?,
        lifecycle_status: lifecycle_from_str(&lifecycle_raw)?,
        expiry_date,
        last_updated,
        last_audit_date,
        version: version as u64,
    })
}

fn read<'r, T>(row: &'r sqlx::postgres::PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Backend(format!("failed to read column {column}: {e}")))
}

fn rotation_to_str(value: RotationPolicy) -> &'static str {
    match value {
        RotationPolicy::Fifo => "FIFO",
        RotationPolicy::Lifo => "LIFO",
        RotationPolicy::Fefo => "FEFO",
        RotationPolicy::Lefo => "LEFO",
        RotationPolicy::Hifo => "HIFO",
        RotationPolicy::Lofo => "LOFO",
        RotationPolicy::Nearest => "NEAREST",
        RotationPolicy::Batch => "BATCH",
    }
}

fn rotation_from_str(value: &str) -> Result<RotationPolicy, StoreError> {
    match value {
        "FIFO" => Ok(RotationPolicy::Fifo),
        "LIFO" => Ok(RotationPolicy::Lifo),
        "FEFO" => Ok(RotationPolicy::Fefo),
        "LEFO" => Ok(RotationPolicy::Lefo),
        "HIFO" => Ok(RotationPolicy::Hifo),
        "LOFO" => Ok(RotationPolicy::Lofo),
        "NEAREST" => Ok(RotationPolicy::Nearest),
        "BATCH" => Ok(RotationPolicy::Batch),
        other => Err(StoreError::Backend(format!(
            "bad rotation_policy column: {other}"
        ))),
    }
}

fn velocity_to_str(value: VelocityCode) -> &'static str {
    match value {
        VelocityCode::AFastMover => "A_FAST_MOVER",
        VelocityCode::BStandard => "B_STANDARD",
        VelocityCode::CSlowMover => "C_SLOW_MOVER",
    }
}

fn velocity_from_str(value: &str) -> Result<VelocityCode, StoreError> {
    match value {
        "A_FAST_MOVER" => Ok(VelocityCode::AFastMover),
        "B_STANDARD" => Ok(VelocityCode::BStandard),
        "C_SLOW_MOVER" => Ok(VelocityCode::CSlowMover),
        other => Err(StoreError::Backend(format!(
            "bad velocity_code column: {other}"
        ))),
    }
}

fn lifecycle_to_str(value: LifecycleStatus) -> &'static str {
    match value {
        LifecycleStatus::Active => "ACTIVE",
        LifecycleStatus::Discontinued => "DISCONTINUED",
        LifecycleStatus::Liquidation => "LIQUIDATION",
    }
}

fn lifecycle_from_str(value: &str) -> Result<LifecycleStatus, StoreError> {
    match value {
        "ACTIVE" => Ok(LifecycleStatus::Active),
        "DISCONTINUED" => Ok(LifecycleStatus::Discontinued),
        "LIQUIDATION" => Ok(LifecycleStatus::Liquidation),
        other => Err(StoreError::Backend(format!(
            "bad lifecycle_status column: {other}"
        ))),
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            if db_err.code().as_deref() == Some("23505") {
                StoreError::Conflict(msg)
            } else {
                StoreError::Backend(msg)
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().as_deref() == Some("23505");
    }
    false
}
