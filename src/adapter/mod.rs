//! Implementations of ports (hexagonal adapters).

pub mod dexscreener;
pub mod sqlite;
#[cfg(feature = "telegram")]
pub mod telegram;
