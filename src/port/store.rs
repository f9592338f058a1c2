//! Store port for watch persistence.

use std::future::Future;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{NewTokenWatch, TokenWatch, WatchField, WatchId};
use crate::error::Result;

/// Storage operations for token watches.
///
/// The scanner is the only component that calls the mutation bookkeeping
/// methods (`mark_notified`, `anchor`, `set_last_multiple`); the Telegram
/// flows only insert, read and replace configuration fields. That
/// single-writer split is what makes the unguarded read-modify-write of a
/// scan cycle safe.
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - Bookkeeping updates are expected to be guarded so they apply at most
///   once (see the method contracts) even if a cycle is replayed
pub trait WatchStore: Send + Sync {
    /// Insert a new watch and return it with its assigned id.
    ///
    /// Fails if a watch with the same contract address already exists.
    fn insert(&self, watch: &NewTokenWatch) -> impl Future<Output = Result<TokenWatch>> + Send;

    /// Get a watch by id.
    fn get(&self, id: WatchId) -> impl Future<Output = Result<Option<TokenWatch>>> + Send;

    /// List every watch, in storage order.
    fn list_all(&self) -> impl Future<Output = Result<Vec<TokenWatch>>> + Send;

    /// List watches whose "watch started" announcement has not fired yet.
    fn list_unnotified(&self) -> impl Future<Output = Result<Vec<TokenWatch>>> + Send;

    /// Record the "watch started" announcement. Applies only while
    /// `notified_at` is null; a second call is a no-op.
    fn mark_notified(
        &self,
        id: WatchId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Anchor the watch to `market_cap` (and refresh `notified_at`).
    /// Applies only while `initial_market_cap` is null; a second call is a
    /// no-op.
    fn anchor(
        &self,
        id: WatchId,
        market_cap: Decimal,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Advance the announced-multiple high-water mark. Applies only if
    /// `multiple` is greater than the stored value; never regresses.
    fn set_last_multiple(
        &self,
        id: WatchId,
        multiple: u32,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Replace a single configuration field (edit flow).
    fn update_field(
        &self,
        id: WatchId,
        field: &WatchField,
    ) -> impl Future<Output = Result<()>> + Send;
}
