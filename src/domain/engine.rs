//! Threshold engine: the notification state machine.
//!
//! [`ThresholdEngine::evaluate`] is a pure decision function over one watch
//! and one freshly fetched quote. It produces at most one [`Outcome`] per
//! evaluation; the caller persists the implied mutation and dispatches the
//! matching notification. Because every outcome's mutation advances the
//! state it was gated on, re-evaluating with the post-mutation watch is
//! idempotent: an already-announced event never fires again.

use rust_decimal::Decimal;
use tracing::warn;

use super::quote::Quote;
use super::watch::TokenWatch;

/// Fixed ascending ladder of gain multiples eligible for one-time
/// announcement, relative to the anchored market cap.
pub const DEFAULT_LADDER: [u32; 18] = [
    5, 7, 10, 15, 20, 25, 50, 100, 200, 250, 300, 400, 500, 750, 1000, 2000, 5000, 10000,
];

/// Result of evaluating one watch against one quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing newly true this cycle.
    Idle,
    /// Quote unavailable for an already-announced watch; log and move on.
    NoQuote,
    /// First time this watch has been observed. Implied mutation: set
    /// `notified_at`. Fires regardless of quote availability; the market
    /// cap is carried for display only.
    WatchStarted { market_cap: Option<Decimal> },
    /// The market cap entered the configured buy zone. Implied mutation:
    /// anchor `initial_market_cap` to this value. One-shot per watch.
    BuyZoneEntered { market_cap: Decimal },
    /// The market cap crossed a new rung of the multiple ladder. Implied
    /// mutation: advance `last_notified_multiple` to `multiple`.
    MultipleAchieved { market_cap: Decimal, multiple: u32 },
}

/// The threshold-monitoring decision function.
#[derive(Debug, Clone)]
pub struct ThresholdEngine {
    /// Ascending, deduplicated multiple ladder.
    ladder: Vec<u32>,
}

impl Default for ThresholdEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ThresholdEngine {
    /// Engine with the default multiple ladder.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ladder(DEFAULT_LADDER.to_vec())
    }

    /// Engine with a custom ladder. The ladder is sorted and deduplicated;
    /// rungs at or below the baseline multiple of 1 can never fire and are
    /// dropped.
    #[must_use]
    pub fn with_ladder(mut ladder: Vec<u32>) -> Self {
        ladder.sort_unstable();
        ladder.dedup();
        ladder.retain(|&m| m > 1);
        Self { ladder }
    }

    /// The configured ladder, ascending.
    #[must_use]
    pub fn ladder(&self) -> &[u32] {
        &self.ladder
    }

    /// Evaluate one watch against one quote.
    ///
    /// Decision order:
    /// 1. unannounced watch -> [`Outcome::WatchStarted`], quote or not;
    /// 2. no quote -> [`Outcome::NoQuote`];
    /// 3. unanchored watch -> buy-zone check;
    /// 4. anchored watch -> ladder walk, smallest newly crossed rung only.
    ///
    /// A price jump spanning several rungs is caught up one rung per
    /// evaluation; later cycles announce the rest because
    /// `last_notified_multiple` has advanced in between.
    #[must_use]
    pub fn evaluate(&self, watch: &TokenWatch, quote: Quote) -> Outcome {
        if !watch.is_announced() {
            return Outcome::WatchStarted {
                market_cap: quote.market_cap(),
            };
        }

        let Some(market_cap) = quote.market_cap() else {
            return Outcome::NoQuote;
        };

        match watch.initial_market_cap {
            None => {
                if watch.buy_zone.contains(market_cap) {
                    Outcome::BuyZoneEntered { market_cap }
                } else {
                    Outcome::Idle
                }
            }
            Some(anchor) if anchor > Decimal::ZERO => {
                self.walk_ladder(watch, anchor, market_cap)
            }
            Some(_) => {
                // Guard against division by a zero or negative anchor; a
                // watch in this state can only come from a bad manual edit.
                warn!(
                    watch = %watch.name,
                    "initial market cap is not positive, skipping multiple check"
                );
                Outcome::Idle
            }
        }
    }

    fn walk_ladder(&self, watch: &TokenWatch, anchor: Decimal, market_cap: Decimal) -> Outcome {
        // A tiny anchor against a huge quoted cap can push the ratio past
        // Decimal's range; the quote is untrusted input, so treat overflow
        // like the non-positive-anchor guard instead of panicking.
        let Some(ratio) = market_cap.checked_div(anchor) else {
            warn!(
                watch = %watch.name,
                %anchor,
                %market_cap,
                "gain ratio out of range, skipping multiple check"
            );
            return Outcome::Idle;
        };

        for &multiple in &self.ladder {
            if multiple <= watch.last_notified_multiple {
                continue;
            }
            if ratio >= Decimal::from(multiple) {
                return Outcome::MultipleAchieved {
                    market_cap,
                    multiple,
                };
            }
            // Ladder is ascending: once a rung is out of reach, all
            // higher rungs are too.
            break;
        }

        Outcome::Idle
    }
}
