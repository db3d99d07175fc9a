//! Stock domain error model.

use thiserror::Error;

use crate::ids::ProductId;
use crate::quantity::{Quantity, QuantityError};

/// Result type used across the stock domain.
pub type StockResult<T> = Result<T, StockError>;

/// Domain-level stock failure.
///
/// `InsufficientStock` and `InvalidTransition` are expected business-rule
/// rejections, safe to surface to callers with the offending amounts.
/// `IntegrityViolation` is a should-never-happen internal-consistency
/// failure and indicates a bug upstream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    /// Value-level quantity failure (unit mismatch, negative amounts).
    #[error(transparent)]
    Quantity(#[from] QuantityError),

    /// A reservation asked for more than is available to promise.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: Quantity,
        available: Quantity,
    },

    /// A bucket transition was requested that the current state cannot cover.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// An aggregate invariant does not hold after a mutation (fatal).
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    /// A value failed validation at creation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (parse failure, blank key).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl StockError {
    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::IntegrityViolation(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
