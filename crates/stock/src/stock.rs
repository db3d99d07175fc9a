//! The stock aggregate root: one bucket of inventory for a product at a
//! warehouse, and the state machine that moves quantities between buckets
//! as orders are placed, picked, shipped, cancelled, and replenished.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::AggregateRoot;

use crate::error::{StockError, StockResult};
use crate::events::{
    StockEvent, StockLevelLow, StockReceived, StockReleased, StockReserved, StockShipped,
};
use crate::ids::{OwnerId, ProductId, StockId, WarehouseId};
use crate::policy::{LifecycleStatus, RotationPolicy, VelocityCode};
use crate::quantity::{Quantity, UnitOfMeasure};

/// Default re-order point assigned by [`Stock::provision`].
pub const DEFAULT_LOW_STOCK_THRESHOLD: u64 = 10;
/// Default maximum stock level assigned by [`Stock::provision`].
pub const DEFAULT_MAX_STOCK_THRESHOLD: u64 = 1000;

/// Lossless persistence snapshot of a stock record.
///
/// This is the contract with the persistence boundary: every field of the
/// aggregate round-trips through it verbatim, `version` included. Stores
/// map it to their storage layout; the aggregate is rebuilt from it with
/// [`Stock::rehydrate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockState {
    pub id: StockId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub owner_id: OwnerId,
    pub unit_of_measure: UnitOfMeasure,

    pub on_hand: Quantity,
    pub reserved: Quantity,
    pub allocated: Quantity,
    pub in_transit: Quantity,
    pub safety_stock: Quantity,
    pub discrepancy_gap: Quantity,

    pub low_stock_threshold: Quantity,
    pub max_stock_threshold: Quantity,
    pub rotation_policy: RotationPolicy,
    pub velocity_code: VelocityCode,

    pub lifecycle_status: LifecycleStatus,
    pub expiry_date: Option<NaiveDate>,
    pub last_updated: DateTime<Utc>,
    pub last_audit_date: NaiveDate,
    pub version: u64,
}

/// Aggregate root: a stock record.
///
/// A plain in-memory value: not internally locked. Mutual exclusion across
/// concurrent writers is the persistence boundary's responsibility
/// (optimistic version check or an exclusive row lock); within one unit of
/// work the record is owned by a single caller.
#[derive(Debug, Clone)]
pub struct Stock {
    id: StockId,
    product_id: ProductId,
    warehouse_id: WarehouseId,
    owner_id: OwnerId,
    unit_of_measure: UnitOfMeasure,

    // Quantity buckets. Everything shares `unit_of_measure`.
    on_hand: Quantity,
    reserved: Quantity,
    allocated: Quantity,
    in_transit: Quantity,
    safety_stock: Quantity,
    // Variance between system and physical counts. Audit-only: reserved for
    // cycle-count reconciliation, mutated by nothing here.
    discrepancy_gap: Quantity,

    low_stock_threshold: Quantity,
    max_stock_threshold: Quantity,
    rotation_policy: RotationPolicy,
    velocity_code: VelocityCode,

    lifecycle_status: LifecycleStatus,
    expiry_date: Option<NaiveDate>,
    last_updated: DateTime<Utc>,
    last_audit_date: NaiveDate,
    version: u64,

    // Drained exactly once per unit of work, after a successful persist.
    pending_events: Vec<StockEvent>,
}

/// Candidate bucket values for one transition, validated before commit.
#[derive(Debug, Copy, Clone)]
struct Buckets {
    on_hand: Quantity,
    reserved: Quantity,
    allocated: Quantity,
    in_transit: Quantity,
}

impl Stock {
    /// Create a new record with explicit policy.
    ///
    /// Every bucket starts at zero in the record's unit. Thresholds must be
    /// expressed in that unit and satisfy `max >= low`.
    pub fn create(
        product_id: ProductId,
        warehouse_id: WarehouseId,
        owner_id: OwnerId,
        rotation_policy: RotationPolicy,
        low_stock_threshold: Quantity,
        max_stock_threshold: Quantity,
        unit_of_measure: UnitOfMeasure,
    ) -> StockResult<Self> {
        if low_stock_threshold.unit() != unit_of_measure
            || max_stock_threshold.unit() != unit_of_measure
        {
            return Err(StockError::validation(
                "thresholds must use the record's unit of measure",
            ));
        }
        if max_stock_threshold.is_less_than(low_stock_threshold)? {
            return Err(StockError::validation(
                "max stock threshold cannot be lower than the re-order point (low threshold)",
            ));
        }

        let now = Utc::now();
        Ok(Self {
            id: StockId::new(),
            product_id,
            warehouse_id,
            owner_id,
            unit_of_measure,
            on_hand: Quantity::zero(unit_of_measure),
            reserved: Quantity::zero(unit_of_measure),
            allocated: Quantity::zero(unit_of_measure),
            in_transit: Quantity::zero(unit_of_measure),
            safety_stock: Quantity::zero(unit_of_measure),
            discrepancy_gap: Quantity::zero(unit_of_measure),
            low_stock_threshold,
            max_stock_threshold,
            rotation_policy,
            velocity_code: VelocityCode::BStandard,
            lifecycle_status: LifecycleStatus::Active,
            expiry_date: None,
            last_updated: now,
            last_audit_date: now.date_naive(),
            version: 0,
            pending_events: Vec::new(),
        })
    }

    /// Create a new record with default policy (proximity picking,
    /// 10/1000 thresholds in the record's unit).
    pub fn provision(
        product_id: ProductId,
        warehouse_id: WarehouseId,
        owner_id: OwnerId,
        unit_of_measure: UnitOfMeasure,
    ) -> StockResult<Self> {
        Self::create(
            product_id,
            warehouse_id,
            owner_id,
            RotationPolicy::Nearest,
            Quantity::of(DEFAULT_LOW_STOCK_THRESHOLD, unit_of_measure),
            Quantity::of(DEFAULT_MAX_STOCK_THRESHOLD, unit_of_measure),
            unit_of_measure,
        )
    }

    /// Rebuild a record from a persisted snapshot.
    ///
    /// Restores every field verbatim, `version` included, bypassing the
    /// new-record defaulting path. The pending-event buffer starts empty —
    /// events belong to the unit of work that produced them, never to a
    /// reload.
    pub fn rehydrate(state: StockState) -> Self {
        Self {
            id: state.id,
            product_id: state.product_id,
            warehouse_id: state.warehouse_id,
            owner_id: state.owner_id,
            unit_of_measure: state.unit_of_measure,
            on_hand: state.on_hand,
            reserved: state.reserved,
            allocated: state.allocated,
            in_transit: state.in_transit,
            safety_stock: state.safety_stock,
            discrepancy_gap: state.discrepancy_gap,
            low_stock_threshold: state.low_stock_threshold,
            max_stock_threshold: state.max_stock_threshold,
            rotation_policy: state.rotation_policy,
            velocity_code: state.velocity_code,
            lifecycle_status: state.lifecycle_status,
            expiry_date: state.expiry_date,
            last_updated: state.last_updated,
            last_audit_date: state.last_audit_date,
            version: state.version,
            pending_events: Vec::new(),
        }
    }

    /// Snapshot the record for persistence (lossless, see [`StockState`]).
    pub fn state(&self) -> StockState {
        StockState {
            id: self.id,
            product_id: self.product_id.clone(),
            warehouse_id: self.warehouse_id.clone(),
            owner_id: self.owner_id.clone(),
            unit_of_measure: self.unit_of_measure,
            on_hand: self.on_hand,
            reserved: self.reserved,
            allocated: self.allocated,
            in_transit: self.in_transit,
            safety_stock: self.safety_stock,
            discrepancy_gap: self.discrepancy_gap,
            low_stock_threshold: self.low_stock_threshold,
            max_stock_threshold: self.max_stock_threshold,
            rotation_policy: self.rotation_policy,
            velocity_code: self.velocity_code,
            lifecycle_status: self.lifecycle_status,
            expiry_date: self.expiry_date,
            last_updated: self.last_updated,
            last_audit_date: self.last_audit_date,
            version: self.version,
        }
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    pub fn warehouse_id(&self) -> &WarehouseId {
        &self.warehouse_id
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    pub fn unit_of_measure(&self) -> UnitOfMeasure {
        self.unit_of_measure
    }

    pub fn on_hand(&self) -> Quantity {
        self.on_hand
    }

    pub fn reserved(&self) -> Quantity {
        self.reserved
    }

    pub fn allocated(&self) -> Quantity {
        self.allocated
    }

    pub fn in_transit(&self) -> Quantity {
        self.in_transit
    }

    pub fn safety_stock(&self) -> Quantity {
        self.safety_stock
    }

    pub fn discrepancy_gap(&self) -> Quantity {
        self.discrepancy_gap
    }

    pub fn low_stock_threshold(&self) -> Quantity {
        self.low_stock_threshold
    }

    pub fn max_stock_threshold(&self) -> Quantity {
        self.max_stock_threshold
    }

    pub fn rotation_policy(&self) -> RotationPolicy {
        self.rotation_policy
    }

    pub fn velocity_code(&self) -> VelocityCode {
        self.velocity_code
    }

    pub fn lifecycle_status(&self) -> LifecycleStatus {
        self.lifecycle_status
    }

    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.expiry_date
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn last_audit_date(&self) -> NaiveDate {
        self.last_audit_date
    }

    /// Available To Promise: the amount safely quotable to a new customer.
    ///
    /// `on_hand + in_transit - reserved - safety_stock`, recomputed on
    /// every call (never cached), clamped at zero — a safety stock larger
    /// than remaining supply means nothing is available, not an error.
    pub fn available_to_promise(&self) -> Quantity {
        let supply = self.on_hand.amount() + self.in_transit.amount();
        let withheld = self.reserved.amount() + self.safety_stock.amount();
        Quantity::of(supply.saturating_sub(withheld), self.unit_of_measure)
    }

    /// Lock `amount` against a customer order. The stock stays physically
    /// on hand but is no longer promisable.
    pub fn reserve(&mut self, amount: Quantity) -> StockResult<()> {
        let available = self.available_to_promise();
        if amount.is_greater_than(available)? {
            return Err(StockError::InsufficientStock {
                product_id: self.product_id.clone(),
                requested: amount,
                available,
            });
        }

        let next = Buckets {
            reserved: self.reserved.add(amount)?,
            ..self.buckets()
        };
        self.commit(next)?;

        self.emit(StockEvent::Reserved(StockReserved::now(
            self.id,
            self.product_id.clone(),
            amount,
        )));
        self.emit_level_low_if_needed()
    }

    /// Move `amount` from reserved to allocated when the warehouse starts
    /// picking. Allocated stock cannot be released back by a simple cancel.
    pub fn allocate(&mut self, amount: Quantity) -> StockResult<()> {
        if amount.is_greater_than(self.reserved)? {
            return Err(StockError::invalid_transition(format!(
                "cannot allocate {amount}: exceeds current reservations ({})",
                self.reserved
            )));
        }

        let next = Buckets {
            reserved: self.reserved.subtract(amount)?,
            allocated: self.allocated.add(amount)?,
            ..self.buckets()
        };
        self.commit(next)?;

        self.emit_level_low_if_needed()
    }

    /// Physically remove picked stock from the warehouse. On-hand and
    /// allocated decrease together; terminal for that unit of stock.
    pub fn confirm_shipment(&mut self, amount: Quantity) -> StockResult<()> {
        if amount.is_greater_than(self.allocated)? {
            return Err(StockError::invalid_transition(format!(
                "cannot ship {amount}: exceeds allocated stock ({})",
                self.allocated
            )));
        }

        let next = Buckets {
            allocated: self.allocated.subtract(amount)?,
            on_hand: self.on_hand.subtract(amount)?,
            ..self.buckets()
        };
        self.commit(next)?;

        self.emit(StockEvent::Shipped(StockShipped::now(
            self.id,
            self.product_id.clone(),
            amount,
        )));
        self.emit_level_low_if_needed()
    }

    /// Cancel a reservation before picking, freeing the stock back to
    /// availability.
    pub fn release(&mut self, amount: Quantity) -> StockResult<()> {
        if amount.is_greater_than(self.reserved)? {
            return Err(StockError::invalid_transition(format!(
                "cannot release {amount}: exceeds reserved stock ({})",
                self.reserved
            )));
        }

        let next = Buckets {
            reserved: self.reserved.subtract(amount)?,
            ..self.buckets()
        };
        self.commit(next)?;

        self.emit(StockEvent::Released(StockReleased::now(
            self.id,
            self.product_id.clone(),
            amount,
        )));
        self.emit_level_low_if_needed()
    }

    /// Add stock back to on-hand (customer return, failed delivery).
    pub fn restore(&mut self, amount: Quantity) -> StockResult<()> {
        let next = Buckets {
            on_hand: self.on_hand.add(amount)?,
            ..self.buckets()
        };
        self.commit(next)?;

        self.emit_level_low_if_needed()
    }

    /// Book a supplier delivery: decrement in-transit, credit on-hand.
    ///
    /// Physical receipt is trusted over the system's transit estimate: an
    /// over-delivery clamps in-transit at zero and the full amount still
    /// lands on hand.
    pub fn receive(&mut self, amount: Quantity) -> StockResult<()> {
        let in_transit = if amount.is_greater_than(self.in_transit)? {
            Quantity::zero(self.unit_of_measure)
        } else {
            self.in_transit.subtract(amount)?
        };

        let next = Buckets {
            in_transit,
            on_hand: self.on_hand.add(amount)?,
            ..self.buckets()
        };
        self.commit(next)?;

        self.emit(StockEvent::Received(StockReceived::now(
            self.id,
            self.product_id.clone(),
            amount,
        )));
        self.emit_level_low_if_needed()
    }

    /// Drain the pending-event buffer.
    ///
    /// Called exactly once per unit of work, by the orchestration boundary,
    /// after the persist commits. A second call returns nothing.
    pub fn take_events(&mut self) -> Vec<StockEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    fn buckets(&self) -> Buckets {
        Buckets {
            on_hand: self.on_hand,
            reserved: self.reserved,
            allocated: self.allocated,
            in_transit: self.in_transit,
        }
    }

    /// Validate-then-commit: the candidate buckets are checked against the
    /// aggregate invariants first; fields are only assigned once the check
    /// passes, so a failed transition leaves the record untouched.
    fn commit(&mut self, next: Buckets) -> StockResult<()> {
        Self::validate_invariants(&next)?;

        self.on_hand = next.on_hand;
        self.reserved = next.reserved;
        self.allocated = next.allocated;
        self.in_transit = next.in_transit;
        self.last_updated = Utc::now();
        Ok(())
    }

    /// You cannot have more reserved than the total that exists or is
    /// confirmed incoming. A violation here means a precondition upstream
    /// let a bad delta through.
    fn validate_invariants(next: &Buckets) -> StockResult<()> {
        let total_possible = next.on_hand.add(next.in_transit)?;
        if next.reserved.is_greater_than(total_possible)? {
            return Err(StockError::integrity(
                "reserved stock exceeds total possible inventory (on-hand + in-transit)",
            ));
        }
        Ok(())
    }

    fn emit(&mut self, event: StockEvent) {
        self.pending_events.push(event);
    }

    fn emit_level_low_if_needed(&mut self) -> StockResult<()> {
        let available = self.available_to_promise();
        if !available.is_greater_than(self.low_stock_threshold)? {
            self.emit(StockEvent::LevelLow(StockLevelLow::now(
                self.id,
                self.product_id.clone(),
                available,
            )));
        }
        Ok(())
    }
}

impl AggregateRoot for Stock {
    type Id = StockId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
