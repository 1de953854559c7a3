//! Error types for fixed-point arithmetic and identifier validation
//!
//! Provides error handling for overflow and division failures in wide
//! fixed-point math, as well as validation failures for typed IDs.

use thiserror::Error;

/// Errors that can occur during typed ID validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// ID value is null/zero when non-null required
    #[error("ID cannot be null/zero")]
    NullId,
}

/// Errors that can occur during fixed-point arithmetic operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FixedPointError {
    /// Result does not fit the target width
    #[error("Overflow in {operation}")]
    Overflow { operation: &'static str },

    /// Division by zero in fixed-point arithmetic
    #[error("Division by zero in fixed-point arithmetic")]
    DivisionByZero,

    /// Decimal value cannot be represented in the integer domain
    #[error("Value {value} is not representable as {target}")]
    NotRepresentable { value: String, target: &'static str },
}
