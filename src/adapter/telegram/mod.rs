//! Telegram surface: outbound notifications and the operator conversation.
//!
//! Requires the `telegram` feature.

pub mod command;
pub mod flow;
pub mod format;
pub mod notifier;

pub use flow::{command_listener, TelegramFlow};
pub use notifier::{TelegramConfig, TelegramNotifier};
