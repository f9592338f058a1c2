//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the seams between the scan loop and the outside world: the
//! watch store, the quote source and the notification fan-out. Adapters
//! implement them against SQLite, DexScreener and Telegram.

pub mod notifier;
pub mod quotes;
pub mod store;

pub use notifier::{
    BuyZoneEvent, Event, LogNotifier, MultipleEvent, Notifier, NotifierRegistry, WatchStartedEvent,
};
pub use quotes::QuoteSource;
pub use store::WatchStore;
