//! Watch records: tracked tokens and their alerting thresholds.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::error::DomainError;

/// Identifier for a persisted watch (assigned by the store).
pub type WatchId = i32;

/// A configured entry band: the market-cap range considered a favorable
/// entry point for the token.
///
/// Bounds are inclusive. Construction rejects negative or inverted bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyZone {
    low: Decimal,
    high: Decimal,
}

impl BuyZone {
    /// Create a buy zone from inclusive bounds.
    ///
    /// # Errors
    /// Returns an error if either bound is negative or `low > high`.
    pub fn new(low: Decimal, high: Decimal) -> Result<Self, DomainError> {
        if low.is_sign_negative() {
            return Err(DomainError::NegativeZoneBound { bound: low });
        }
        if high.is_sign_negative() {
            return Err(DomainError::NegativeZoneBound { bound: high });
        }
        if low > high {
            return Err(DomainError::InvertedZone { low, high });
        }
        Ok(Self { low, high })
    }

    /// Lower bound (inclusive).
    #[must_use]
    pub fn low(&self) -> Decimal {
        self.low
    }

    /// Upper bound (inclusive).
    #[must_use]
    pub fn high(&self) -> Decimal {
        self.high
    }

    /// Whether a market cap falls inside the zone.
    #[must_use]
    pub fn contains(&self, market_cap: Decimal) -> bool {
        self.low <= market_cap && market_cap <= self.high
    }
}

/// Token tax percentages as advertised by the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxRates {
    pub buy: Decimal,
    pub sell: Decimal,
    pub transfer: Decimal,
}

impl TaxRates {
    /// Create a tax-rate triple.
    ///
    /// # Errors
    /// Returns an error if any rate is negative.
    pub fn new(buy: Decimal, sell: Decimal, transfer: Decimal) -> Result<Self, DomainError> {
        for rate in [buy, sell, transfer] {
            if rate.is_sign_negative() {
                return Err(DomainError::NegativeTaxRate { rate });
            }
        }
        Ok(Self {
            buy,
            sell,
            transfer,
        })
    }
}

/// Liquidity posture flags collected at intake.
///
/// The Telegram boundary validates the yes/no answers; the core only sees
/// booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityFlags {
    pub locked: bool,
    pub ownership_renounced: bool,
    pub burned: bool,
}

/// A tracked token with its alerting state.
///
/// Two independent one-shot discriminators drive the notification state
/// machine:
///
/// - `notified_at` — `None` until the "watch started" announcement fires.
/// - `initial_market_cap` — `None` until buy-zone entry anchors the watch;
///   all gain multiples are computed against this anchor.
///
/// `last_notified_multiple` starts at 1 ("no multiple beyond baseline
/// announced") and only ever increases.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenWatch {
    pub id: WatchId,
    pub name: String,
    pub contract_address: String,
    pub chain: String,
    pub liquidity: LiquidityFlags,
    pub taxes: TaxRates,
    pub buy_zone: BuyZone,
    pub initial_market_cap: Option<Decimal>,
    pub notified_at: Option<DateTime<Utc>>,
    pub last_notified_multiple: u32,
    pub created_at: DateTime<Utc>,
}

impl TokenWatch {
    /// Whether the "watch started" announcement has already fired.
    #[must_use]
    pub fn is_announced(&self) -> bool {
        self.notified_at.is_some()
    }

    /// Whether buy-zone entry has anchored this watch.
    #[must_use]
    pub fn is_anchored(&self) -> bool {
        self.initial_market_cap.is_some()
    }
}

/// Intake payload for a new watch.
///
/// Alerting state is not part of intake: a new watch starts unannounced
/// and unanchored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTokenWatch {
    pub name: String,
    pub contract_address: String,
    pub chain: String,
    pub liquidity: LiquidityFlags,
    pub taxes: TaxRates,
    pub buy_zone: BuyZone,
}

/// A typed single-field replacement for the edit flow.
///
/// The contract address is deliberately absent: it is immutable after
/// creation. Alerting bookkeeping fields are owned by the scanner and are
/// not editable either.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchField {
    Name(String),
    Chain(String),
    LiquidityLocked(bool),
    OwnershipRenounced(bool),
    LiquidityBurned(bool),
    BuyTax(Decimal),
    SellTax(Decimal),
    TransferTax(Decimal),
    ZoneLow(Decimal),
    ZoneHigh(Decimal),
}

impl WatchField {
    /// Human-readable field label for confirmation prompts.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            WatchField::Name(_) => "Name",
            WatchField::Chain(_) => "Chain",
            WatchField::LiquidityLocked(_) => "Liquidity Locked",
            WatchField::OwnershipRenounced(_) => "Ownership Renounced",
            WatchField::LiquidityBurned(_) => "Liquidity Burned",
            WatchField::BuyTax(_) => "Buy Tax",
            WatchField::SellTax(_) => "Sell Tax",
            WatchField::TransferTax(_) => "Transfer Tax",
            WatchField::ZoneLow(_) => "Buy Zone Low",
            WatchField::ZoneHigh(_) => "Buy Zone High",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn buy_zone_contains_is_inclusive() {
        let zone = BuyZone::new(dec!(900), dec!(1100)).unwrap();

        assert!(zone.contains(dec!(900)));
        assert!(zone.contains(dec!(950)));
        assert!(zone.contains(dec!(1100)));
        assert!(!zone.contains(dec!(899.99)));
        assert!(!zone.contains(dec!(1100.01)));
    }

    #[test]
    fn buy_zone_rejects_inverted_bounds() {
        let result = BuyZone::new(dec!(1100), dec!(900));
        assert!(matches!(result, Err(DomainError::InvertedZone { .. })));
    }

    #[test]
    fn buy_zone_rejects_negative_bounds() {
        let result = BuyZone::new(dec!(-1), dec!(900));
        assert!(matches!(result, Err(DomainError::NegativeZoneBound { .. })));
    }

    #[test]
    fn degenerate_zone_is_a_single_point() {
        let zone = BuyZone::new(dec!(1000), dec!(1000)).unwrap();

        assert!(zone.contains(dec!(1000)));
        assert!(!zone.contains(dec!(999)));
    }

    #[test]
    fn tax_rates_reject_negative_values() {
        let result = TaxRates::new(dec!(2.5), dec!(-0.1), dec!(0));
        assert!(matches!(result, Err(DomainError::NegativeTaxRate { .. })));
    }

    #[test]
    fn zero_tax_rates_are_valid() {
        assert!(TaxRates::new(dec!(0), dec!(0), dec!(0)).is_ok());
    }
}
