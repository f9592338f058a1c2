//! Domain validation errors for core domain types.
//!
//! These errors are returned by constructors that validate inputs, such as
//! [`BuyZone::new`](crate::domain::watch::BuyZone::new).

use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Buy-zone bounds must not be negative.
    #[error("buy zone bound must be non-negative, got {bound}")]
    NegativeZoneBound {
        /// The invalid bound that was provided.
        bound: rust_decimal::Decimal,
    },

    /// Buy-zone bounds must be ordered low <= high.
    #[error("buy zone is inverted: low {low} > high {high}")]
    InvertedZone {
        low: rust_decimal::Decimal,
        high: rust_decimal::Decimal,
    },

    /// Tax rates are percentages and must not be negative.
    #[error("tax rate must be non-negative, got {rate}")]
    NegativeTaxRate {
        /// The invalid rate that was provided.
        rate: rust_decimal::Decimal,
    },
}
