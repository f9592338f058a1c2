//! Notifier port for event notifications.
//!
//! The threshold engine's outcomes map one-to-one onto [`Event`]s; each
//! event carries the full watch snapshot so renderers need no store access.

use rust_decimal::Decimal;
use tracing::info;

use crate::domain::TokenWatch;

/// Events that trigger notifications.
#[derive(Debug, Clone)]
pub enum Event {
    /// A watch was observed for the first time.
    WatchStarted(WatchStartedEvent),
    /// The market cap entered the configured buy zone.
    BuyZoneEntered(BuyZoneEvent),
    /// A new gain multiple was crossed.
    MultipleAchieved(MultipleEvent),
}

/// "Watch started" announcement payload.
///
/// `market_cap` is `None` when the quote fetch failed; the announcement
/// still fires and renders the cap as unavailable.
#[derive(Debug, Clone)]
pub struct WatchStartedEvent {
    pub watch: TokenWatch,
    pub market_cap: Option<Decimal>,
}

/// Buy-zone entry payload.
#[derive(Debug, Clone)]
pub struct BuyZoneEvent {
    pub watch: TokenWatch,
    pub market_cap: Decimal,
}

/// Multiple-achieved payload.
#[derive(Debug, Clone)]
pub struct MultipleEvent {
    pub watch: TokenWatch,
    pub market_cap: Decimal,
    pub multiple: u32,
}

/// Trait for notification handlers.
///
/// Notifications are fire-and-forget: `notify` must return quickly and
/// never block the scan cycle. Implementations doing slow I/O (e.g. HTTP)
/// should hand the event to a background task.
pub trait Notifier: Send + Sync {
    /// Handle an event.
    fn notify(&self, event: Event);
}

/// Fan-out over all registered notifiers.
#[derive(Default)]
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a notifier.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Number of registered notifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Deliver an event to every registered notifier.
    pub fn notify_all(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }
}

/// Notifier that writes events to the structured log. Always registered,
/// so every event is observable even with Telegram disabled.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        match event {
            Event::WatchStarted(e) => info!(
                watch = %e.watch.name,
                contract = %e.watch.contract_address,
                market_cap = ?e.market_cap,
                "Watch started"
            ),
            Event::BuyZoneEntered(e) => info!(
                watch = %e.watch.name,
                market_cap = %e.market_cap,
                zone_low = %e.watch.buy_zone.low(),
                zone_high = %e.watch.buy_zone.high(),
                "Buy zone entered"
            ),
            Event::MultipleAchieved(e) => info!(
                watch = %e.watch.name,
                market_cap = %e.market_cap,
                multiple = e.multiple,
                "Multiple achieved"
            ),
        }
    }
}
