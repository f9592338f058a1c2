//! Quote source port.

use std::future::Future;

use crate::domain::Quote;

/// A source of current market-capitalization quotes.
///
/// Infallible by contract: implementations fold every failure (transport,
/// malformed payload, missing field) into [`Quote::Unavailable`] and log
/// the reason themselves. No retries either; the scanner's next cycle is
/// the retry mechanism.
pub trait QuoteSource: Send + Sync {
    /// Fetch the current market cap for a token contract address.
    fn market_cap(&self, contract_address: &str) -> impl Future<Output = Quote> + Send;
}
