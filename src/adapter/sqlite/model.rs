//! Database model types for Diesel ORM.

use diesel::prelude::*;

use super::schema::token_watches;

/// Database row for a token watch (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = token_watches)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WatchRow {
    pub id: i32,
    pub name: String,
    pub contract_address: String,
    pub chain: String,
    pub liquidity_locked: bool,
    pub ownership_renounced: bool,
    pub liquidity_burned: bool,
    pub buy_tax: f64,
    pub sell_tax: f64,
    pub transfer_tax: f64,
    pub zone_low: f64,
    pub zone_high: f64,
    pub initial_market_cap: Option<f64>,
    pub notified_at: Option<String>,
    pub last_notified_multiple: i32,
    pub created_at: String,
}

/// Database row for a token watch (insertable; the id and alerting
/// bookkeeping columns take their defaults).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = token_watches)]
pub struct NewWatchRow {
    pub name: String,
    pub contract_address: String,
    pub chain: String,
    pub liquidity_locked: bool,
    pub ownership_renounced: bool,
    pub liquidity_burned: bool,
    pub buy_tax: f64,
    pub sell_tax: f64,
    pub transfer_tax: f64,
    pub zone_low: f64,
    pub zone_high: f64,
    pub created_at: String,
}
