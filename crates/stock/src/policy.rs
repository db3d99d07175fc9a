//! Policy and lifecycle enums attached to a stock record.
//!
//! None of these gate behavior in this core; they are persisted intent for
//! picking/slotting systems and future policy enforcement.

use serde::{Deserialize, Serialize};

/// Picking-order intent for the record's stock.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RotationPolicy {
    /// First in, first out — oldest stock picked first.
    Fifo,
    /// Last in, first out — newest stock picked first.
    Lifo,
    /// First expired, first out — earliest expiry picked first.
    Fefo,
    /// Last expired, first out — longest shelf life picked first.
    Lefo,
    /// Highest cost in, first out.
    Hifo,
    /// Lowest cost in, first out.
    Lofo,
    /// Proximity picking — whatever is physically closest.
    Nearest,
    /// Lot/batch-specific picking (recalls, QC holds).
    Batch,
}

/// Demand classification for slotting.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VelocityCode {
    /// High demand, keep near the shipping dock.
    AFastMover,
    /// Normal demand.
    BStandard,
    /// Low demand, store deep in the warehouse.
    CSlowMover,
}

/// Commercial lifecycle of the record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    /// Normal selling.
    Active,
    /// Stop ordering more.
    Discontinued,
    /// Sell at discount to clear space.
    Liquidation,
}
