//! Capwatch - market-cap watchlist monitoring for freshly launched tokens.
//!
//! Tokens are registered over a Telegram conversation, persisted in SQLite,
//! and polled against the DexScreener API in the background. Each watch
//! fires one-shot notifications: once when it is first observed, once when
//! its market cap enters the configured buy zone, and once per gain
//! multiple crossed relative to the cap it was anchored at.
//!
//! # Architecture
//!
//! Ports-and-adapters:
//!
//! - [`domain`] - Pure types and the threshold engine
//! - [`port`] - Traits at the seams: store, quote source, notifier
//! - [`adapter`] - SQLite store, DexScreener client, Telegram surface
//! - [`app`] - Configuration, wiring and the background scanner
//!
//! # Features
//!
//! - `telegram` (default) - Enable the Telegram notifier and command surface

pub mod adapter;
pub mod app;
pub mod domain;
pub mod error;
pub mod port;
