//! Application layer - configuration, wiring and the scan loop.

mod config;
pub mod scanner;

pub use config::{
    Config, DatabaseConfig, LoggingConfig, QuotesConfig, ScannerAppConfig, TelegramAppConfig,
};
pub use scanner::{Scanner, ScannerConfig};

use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "telegram")]
use tracing::info;

use crate::adapter::dexscreener::DexScreenerClient;
use crate::adapter::sqlite::{self, SqliteWatchStore};
#[cfg(feature = "telegram")]
use crate::adapter::telegram::{self, TelegramConfig, TelegramFlow, TelegramNotifier};
use crate::error::Result;
#[cfg(feature = "telegram")]
use crate::error::ConfigError;
use crate::port::{LogNotifier, NotifierRegistry};

#[cfg(feature = "telegram")]
use teloxide::Bot;

/// Top-level application: builds every adapter from the config and runs
/// the long-lived tasks.
pub struct App;

impl App {
    /// Run until the surrounding runtime shuts the process down.
    pub async fn run(config: Config) -> Result<()> {
        let pool = sqlite::create_pool(&config.database.path)?;
        sqlite::run_migrations(&pool)?;
        let store = Arc::new(SqliteWatchStore::new(pool));

        let quotes = Arc::new(DexScreenerClient::new(
            config.quotes.api_url.clone(),
            Duration::from_secs(config.quotes.timeout_secs),
        ));

        let mut notifiers = NotifierRegistry::new();
        notifiers.register(Box::new(LogNotifier));

        #[cfg(feature = "telegram")]
        let telegram = telegram_surface(&config, store.clone(), quotes.clone(), &mut notifiers)?;

        let notifiers = Arc::new(notifiers);
        let scanner = Scanner::new(
            store,
            quotes,
            notifiers,
            ScannerConfig::from(&config.scanner),
        );

        #[cfg(feature = "telegram")]
        if let Some((bot, flow)) = telegram {
            tokio::select! {
                () = scanner.run() => {}
                () = telegram::command_listener(bot, flow) => {}
            }
            return Ok(());
        }

        scanner.run().await;
        Ok(())
    }
}

/// Build the Telegram notifier and conversation handler, if enabled.
#[cfg(feature = "telegram")]
#[allow(clippy::type_complexity)]
fn telegram_surface(
    config: &Config,
    store: Arc<SqliteWatchStore>,
    quotes: Arc<DexScreenerClient>,
    notifiers: &mut NotifierRegistry,
) -> Result<Option<(Bot, Arc<TelegramFlow<SqliteWatchStore, DexScreenerClient>>)>> {
    if !config.telegram.enabled {
        info!("Telegram surface disabled");
        return Ok(None);
    }

    let token = config
        .telegram
        .bot_token
        .clone()
        .ok_or(ConfigError::MissingField {
            field: "TELEGRAM_BOT_TOKEN",
        })?;

    let bot = Bot::new(&token);
    notifiers.register(Box::new(TelegramNotifier::new(
        bot.clone(),
        TelegramConfig {
            bot_token: token,
            chat_id: config.telegram.chat_id,
            allowed_user_id: config.telegram.allowed_user_id,
        },
    )));

    let flow = Arc::new(TelegramFlow::new(
        store,
        quotes,
        config.telegram.allowed_user_id,
    ));

    Ok(Some((bot, flow)))
}
