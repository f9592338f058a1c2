//! Background scanner: periodically quotes every watch and dispatches
//! threshold notifications.
//!
//! One task owns both cadences: a fast sweep over watches still awaiting
//! their "watch started" announcement, and a slower full sweep that drives
//! buy-zone and multiple detection. Running them out of a single
//! `tokio::select!` loop means sweeps can never overlap, which keeps the
//! scanner the sole writer of the alerting bookkeeping columns.
//!
//! For every outcome the implied store mutation is persisted before the
//! notification is dispatched; a crash in between costs a message, never a
//! duplicate.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::domain::{Outcome, ThresholdEngine, TokenWatch};
use crate::error::Result;
use crate::port::{
    BuyZoneEvent, Event, MultipleEvent, NotifierRegistry, QuoteSource, WatchStartedEvent,
    WatchStore,
};

/// Scan cadences and pacing.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// How often to sweep watches awaiting their announcement.
    pub new_watch_interval: Duration,
    /// How often to sweep the whole watchlist.
    pub full_sweep_interval: Duration,
    /// Pause between tokens within a sweep, to stay polite to the quote API.
    pub pacing: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            new_watch_interval: Duration::from_secs(120),
            full_sweep_interval: Duration::from_secs(1800),
            pacing: Duration::from_secs(1),
        }
    }
}

/// The watchlist scanner.
pub struct Scanner<S, Q> {
    store: Arc<S>,
    quotes: Arc<Q>,
    notifiers: Arc<NotifierRegistry>,
    engine: ThresholdEngine,
    config: ScannerConfig,
}

impl<S, Q> Scanner<S, Q>
where
    S: WatchStore,
    Q: QuoteSource,
{
    #[must_use]
    pub fn new(
        store: Arc<S>,
        quotes: Arc<Q>,
        notifiers: Arc<NotifierRegistry>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            store,
            quotes,
            notifiers,
            engine: ThresholdEngine::new(),
            config,
        }
    }

    /// Run both sweep cadences until the process shuts down.
    pub async fn run(&self) {
        let mut new_watch_tick = tokio::time::interval(self.config.new_watch_interval);
        new_watch_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut full_sweep_tick = tokio::time::interval(self.config.full_sweep_interval);
        full_sweep_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            new_watch_interval_secs = self.config.new_watch_interval.as_secs(),
            full_sweep_interval_secs = self.config.full_sweep_interval.as_secs(),
            "Scanner started"
        );

        loop {
            tokio::select! {
                _ = full_sweep_tick.tick() => {
                    if let Err(e) = self.sweep_all().await {
                        error!(error = %e, "Full sweep failed");
                    }
                }
                _ = new_watch_tick.tick() => {
                    if let Err(e) = self.sweep_new().await {
                        error!(error = %e, "New-watch sweep failed");
                    }
                }
            }
        }
    }

    /// Sweep only watches still awaiting their announcement.
    pub async fn sweep_new(&self) -> Result<()> {
        let watches = self.store.list_unnotified().await?;
        if watches.is_empty() {
            return Ok(());
        }
        debug!(count = watches.len(), "Sweeping unannounced watches");
        self.sweep(&watches).await;
        Ok(())
    }

    /// Sweep the entire watchlist.
    pub async fn sweep_all(&self) -> Result<()> {
        let watches = self.store.list_all().await?;
        debug!(count = watches.len(), "Sweeping full watchlist");
        self.sweep(&watches).await;
        Ok(())
    }

    async fn sweep(&self, watches: &[TokenWatch]) {
        for watch in watches {
            self.process(watch).await;
            tokio::time::sleep(self.config.pacing).await;
        }
    }

    /// Quote one watch, evaluate it and act on the outcome. A failure here
    /// is logged and never aborts the sweep.
    async fn process(&self, watch: &TokenWatch) {
        let quote = self.quotes.market_cap(&watch.contract_address).await;

        match self.engine.evaluate(watch, quote) {
            Outcome::Idle => {}
            Outcome::NoQuote => {
                warn!(
                    watch = %watch.name,
                    contract = %watch.contract_address,
                    "No quote available"
                );
            }
            Outcome::WatchStarted { market_cap } => {
                let now = Utc::now();
                match self.store.mark_notified(watch.id, now).await {
                    Ok(()) => {
                        let mut snapshot = watch.clone();
                        snapshot.notified_at = Some(now);
                        self.notifiers.notify_all(Event::WatchStarted(WatchStartedEvent {
                            watch: snapshot,
                            market_cap,
                        }));
                    }
                    Err(e) => {
                        error!(watch = %watch.name, error = %e, "Failed to mark watch notified");
                    }
                }
            }
            Outcome::BuyZoneEntered { market_cap } => {
                let now = Utc::now();
                match self.store.anchor(watch.id, market_cap, now).await {
                    Ok(()) => {
                        let mut snapshot = watch.clone();
                        snapshot.initial_market_cap = Some(market_cap);
                        snapshot.notified_at = Some(now);
                        self.notifiers.notify_all(Event::BuyZoneEntered(BuyZoneEvent {
                            watch: snapshot,
                            market_cap,
                        }));
                    }
                    Err(e) => {
                        error!(watch = %watch.name, error = %e, "Failed to anchor watch");
                    }
                }
            }
            Outcome::MultipleAchieved {
                market_cap,
                multiple,
            } => match self.store.set_last_multiple(watch.id, multiple).await {
                Ok(()) => {
                    let mut snapshot = watch.clone();
                    snapshot.last_notified_multiple = multiple;
                    self.notifiers.notify_all(Event::MultipleAchieved(MultipleEvent {
                        watch: snapshot,
                        market_cap,
                        multiple,
                    }));
                }
                Err(e) => {
                    error!(
                        watch = %watch.name,
                        multiple,
                        error = %e,
                        "Failed to advance multiple high-water mark"
                    );
                }
            },
        }
    }
}
