//! Source-agnostic domain logic: watch records, quotes and the threshold
//! engine that turns them into notification events.

pub mod engine;
pub mod error;
mod quote;
mod watch;

pub use engine::{Outcome, ThresholdEngine, DEFAULT_LADDER};
pub use quote::Quote;
pub use watch::{
    BuyZone, LiquidityFlags, NewTokenWatch, TaxRates, TokenWatch, WatchField, WatchId,
};
