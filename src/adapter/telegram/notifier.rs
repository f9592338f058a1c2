//! Telegram notification delivery.
//!
//! Provides the [`TelegramNotifier`] for sending watch events to the fixed
//! group chat. Events are queued on an unbounded channel and delivered by a
//! spawned background worker, so the scan cycle never waits on Telegram.
//!
//! Requires the `telegram` feature to be enabled.

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::port::{Event, Notifier};

use super::format::format_event_message;

/// Configuration for the Telegram surface.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot API token obtained from BotFather.
    pub bot_token: String,
    /// Target chat ID for notifications.
    pub chat_id: i64,
    /// The single operator allowed to run commands.
    pub allowed_user_id: u64,
}

/// Telegram notifier that sends messages to a chat.
///
/// Implements the [`Notifier`] trait; delivery failures are logged, never
/// retried, and never reach the caller.
pub struct TelegramNotifier {
    /// Channel sender for queuing outbound notifications.
    sender: mpsc::UnboundedSender<Event>,
}

impl TelegramNotifier {
    /// Create a new Telegram notifier and spawn the background worker.
    #[must_use]
    pub fn new(bot: Bot, config: TelegramConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();

        // Spawn background task to handle outbound notifications.
        tokio::spawn(telegram_worker(bot, config, receiver));

        Self { sender }
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&self, event: Event) {
        if self.sender.send(event).is_err() {
            warn!("Telegram notifier channel closed");
        }
    }
}

/// Background worker that sends Telegram messages.
async fn telegram_worker(
    bot: Bot,
    config: TelegramConfig,
    mut receiver: mpsc::UnboundedReceiver<Event>,
) {
    let chat_id = ChatId(config.chat_id);

    info!(chat_id = config.chat_id, "Telegram notifier started");

    while let Some(event) = receiver.recv().await {
        let text = format_event_message(&event);

        if let Err(e) = bot
            .send_message(chat_id, &text)
            .parse_mode(ParseMode::MarkdownV2)
            .await
        {
            error!(error = %e, "Failed to send Telegram message");
        }
    }

    warn!("Telegram notifier worker shutting down");
}
