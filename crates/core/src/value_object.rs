//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value** — two instances
/// with the same attribute values are the same value. To "modify" one,
/// construct a new one; never mutate in place.
///
/// `Quantity { amount: 50, unit: Each }` is a value object; a stock record
/// with a `StockId` is an entity.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
