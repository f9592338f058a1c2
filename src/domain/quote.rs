//! Market-cap quote type returned by quote sources.

use rust_decimal::Decimal;

/// A point-in-time market-capitalization quote for a token.
///
/// Quote sources fold every failure mode (transport errors, malformed
/// responses, missing fields) into [`Quote::Unavailable`]; a quote never
/// carries an error. An unavailable quote is not fatal for a scan cycle;
/// the next cycle is the retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    /// Current market cap in USD.
    MarketCap(Decimal),
    /// The source had no usable market cap for this token.
    Unavailable,
}

impl Quote {
    /// The market cap, or `None` if the quote is unavailable.
    #[must_use]
    pub fn market_cap(&self) -> Option<Decimal> {
        match self {
            Quote::MarketCap(mc) => Some(*mc),
            Quote::Unavailable => None,
        }
    }

    /// Whether the source returned a usable value.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Quote::MarketCap(_))
    }
}

impl From<Option<Decimal>> for Quote {
    fn from(value: Option<Decimal>) -> Self {
        match value {
            Some(mc) => Quote::MarketCap(mc),
            None => Quote::Unavailable,
        }
    }
}
