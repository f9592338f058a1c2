//! DexScreener quote source.
//!
//! Fetches token trading pairs from the DexScreener token endpoint and
//! extracts the first market-capitalization value on offer. Every failure
//! mode degrades to [`Quote::Unavailable`]; this adapter never surfaces a
//! transport error to the engine.

use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::Quote;
use crate::port::QuoteSource;

/// Default DexScreener token-pairs endpoint.
pub const DEFAULT_API_URL: &str = "https://api.dexscreener.com/latest/dex/tokens";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the DexScreener token API.
pub struct DexScreenerClient {
    client: Client,
    base_url: String,
}

/// Response payload of `GET /latest/dex/tokens/{address}`.
#[derive(Debug, Deserialize)]
struct TokenPairsResponse {
    pairs: Option<Vec<PairDto>>,
}

/// One trading pair; only the market cap is of interest here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairDto {
    market_cap: Option<Decimal>,
}

impl DexScreenerClient {
    /// Create a client for the given base URL (no trailing slash).
    #[must_use]
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_default();
        Self { client, base_url }
    }

    /// Client for the public DexScreener API.
    #[must_use]
    pub fn public() -> Self {
        Self::new(DEFAULT_API_URL.to_string(), DEFAULT_TIMEOUT)
    }

    async fn fetch(&self, contract_address: &str) -> Quote {
        let url = format!("{}/{}", self.base_url, contract_address);
        debug!(url = %url, "Fetching market cap");

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(contract = contract_address, error = %e, "Quote request failed");
                return Quote::Unavailable;
            }
        };

        if !response.status().is_success() {
            warn!(
                contract = contract_address,
                status = %response.status(),
                "Quote endpoint returned non-success"
            );
            return Quote::Unavailable;
        }

        let payload: TokenPairsResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                warn!(contract = contract_address, error = %e, "Malformed quote payload");
                return Quote::Unavailable;
            }
        };

        match extract_market_cap(&payload) {
            Some(mc) => {
                debug!(contract = contract_address, market_cap = %mc, "Fetched market cap");
                Quote::MarketCap(mc)
            }
            None => {
                warn!(contract = contract_address, "No market cap in any pair");
                Quote::Unavailable
            }
        }
    }
}

/// Pick the first pair exposing a usable market cap. Negative values are
/// treated as absent.
fn extract_market_cap(payload: &TokenPairsResponse) -> Option<Decimal> {
    payload
        .pairs
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|pair| pair.market_cap)
        .find(|mc| !mc.is_sign_negative())
}

impl QuoteSource for DexScreenerClient {
    async fn market_cap(&self, contract_address: &str) -> Quote {
        self.fetch(contract_address).await
    }
}
