//! SQLite watch store implementation.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use super::model::{NewWatchRow, WatchRow};
use super::schema::token_watches;
use super::DbPool;
use crate::domain::{
    BuyZone, LiquidityFlags, NewTokenWatch, TaxRates, TokenWatch, WatchField, WatchId,
};
use crate::error::{Error, Result};
use crate::port::WatchStore;

/// SQLite-backed watch store.
///
/// The one-shot and monotonicity rules of the alerting state machine are
/// enforced here as guarded updates, so a replayed scan cycle cannot
/// re-apply an already-applied transition.
pub struct SqliteWatchStore {
    /// Database connection pool.
    pool: DbPool,
}

impl SqliteWatchStore {
    /// Create a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>> {
        self.pool.get().map_err(|e| Error::Connection(e.to_string()))
    }

    fn to_new_row(watch: &NewTokenWatch, created_at: DateTime<Utc>) -> Result<NewWatchRow> {
        Ok(NewWatchRow {
            name: watch.name.clone(),
            contract_address: watch.contract_address.clone(),
            chain: watch.chain.clone(),
            liquidity_locked: watch.liquidity.locked,
            ownership_renounced: watch.liquidity.ownership_renounced,
            liquidity_burned: watch.liquidity.burned,
            buy_tax: to_f64(watch.taxes.buy)?,
            sell_tax: to_f64(watch.taxes.sell)?,
            transfer_tax: to_f64(watch.taxes.transfer)?,
            zone_low: to_f64(watch.buy_zone.low())?,
            zone_high: to_f64(watch.buy_zone.high())?,
            created_at: created_at.to_rfc3339(),
        })
    }

    fn from_row(row: WatchRow) -> Result<TokenWatch> {
        let notified_at = row
            .notified_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;
        let created_at = parse_timestamp(&row.created_at)?;
        let last_notified_multiple = u32::try_from(row.last_notified_multiple)
            .map_err(|_| Error::Parse("negative last_notified_multiple".into()))?;

        Ok(TokenWatch {
            id: row.id,
            name: row.name,
            contract_address: row.contract_address,
            chain: row.chain,
            liquidity: LiquidityFlags {
                locked: row.liquidity_locked,
                ownership_renounced: row.ownership_renounced,
                burned: row.liquidity_burned,
            },
            taxes: TaxRates::new(
                from_f64(row.buy_tax)?,
                from_f64(row.sell_tax)?,
                from_f64(row.transfer_tax)?,
            )?,
            buy_zone: BuyZone::new(from_f64(row.zone_low)?, from_f64(row.zone_high)?)?,
            initial_market_cap: row.initial_market_cap.map(from_f64).transpose()?,
            notified_at,
            last_notified_multiple,
            created_at,
        })
    }
}

fn to_f64(value: Decimal) -> Result<f64> {
    value
        .to_f64()
        .ok_or_else(|| Error::Parse(format!("decimal {value} is not representable as f64")))
}

fn from_f64(value: f64) -> Result<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| Error::Parse(format!("stored value {value} is not a valid decimal")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Parse(e.to_string()))
}

impl WatchStore for SqliteWatchStore {
    async fn insert(&self, watch: &NewTokenWatch) -> Result<TokenWatch> {
        let row = Self::to_new_row(watch, Utc::now())?;
        let mut conn = self.conn()?;

        diesel::insert_into(token_watches::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        let inserted: WatchRow = token_watches::table
            .filter(token_watches::contract_address.eq(&watch.contract_address))
            .first(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Self::from_row(inserted)
    }

    async fn get(&self, id: WatchId) -> Result<Option<TokenWatch>> {
        let mut conn = self.conn()?;

        let row: Option<WatchRow> = token_watches::table
            .find(id)
            .first(&mut conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        row.map(Self::from_row).transpose()
    }

    async fn list_all(&self) -> Result<Vec<TokenWatch>> {
        let mut conn = self.conn()?;

        let rows: Vec<WatchRow> = token_watches::table
            .order(token_watches::id.asc())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        rows.into_iter().map(Self::from_row).collect()
    }

    async fn list_unnotified(&self) -> Result<Vec<TokenWatch>> {
        let mut conn = self.conn()?;

        let rows: Vec<WatchRow> = token_watches::table
            .filter(token_watches::notified_at.is_null())
            .order(token_watches::id.asc())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        rows.into_iter().map(Self::from_row).collect()
    }

    async fn mark_notified(&self, id: WatchId, at: DateTime<Utc>) -> Result<()> {
        let mut conn = self.conn()?;

        diesel::update(
            token_watches::table
                .find(id)
                .filter(token_watches::notified_at.is_null()),
        )
        .set(token_watches::notified_at.eq(at.to_rfc3339()))
        .execute(&mut conn)
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn anchor(&self, id: WatchId, market_cap: Decimal, at: DateTime<Utc>) -> Result<()> {
        let mut conn = self.conn()?;

        diesel::update(
            token_watches::table
                .find(id)
                .filter(token_watches::initial_market_cap.is_null()),
        )
        .set((
            token_watches::initial_market_cap.eq(Some(to_f64(market_cap)?)),
            token_watches::notified_at.eq(at.to_rfc3339()),
        ))
        .execute(&mut conn)
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn set_last_multiple(&self, id: WatchId, multiple: u32) -> Result<()> {
        let mut conn = self.conn()?;
        let multiple = i32::try_from(multiple)
            .map_err(|_| Error::Parse(format!("multiple {multiple} exceeds storage range")))?;

        diesel::update(
            token_watches::table
                .find(id)
                .filter(token_watches::last_notified_multiple.lt(multiple)),
        )
        .set(token_watches::last_notified_multiple.eq(multiple))
        .execute(&mut conn)
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn update_field(&self, id: WatchId, field: &WatchField) -> Result<()> {
        let mut conn = self.conn()?;
        let target = token_watches::table.find(id);

        let updated = match field {
            WatchField::Name(v) => diesel::update(target)
                .set(token_watches::name.eq(v))
                .execute(&mut conn),
            WatchField::Chain(v) => diesel::update(target)
                .set(token_watches::chain.eq(v))
                .execute(&mut conn),
            WatchField::LiquidityLocked(v) => diesel::update(target)
                .set(token_watches::liquidity_locked.eq(v))
                .execute(&mut conn),
            WatchField::OwnershipRenounced(v) => diesel::update(target)
                .set(token_watches::ownership_renounced.eq(v))
                .execute(&mut conn),
            WatchField::LiquidityBurned(v) => diesel::update(target)
                .set(token_watches::liquidity_burned.eq(v))
                .execute(&mut conn),
            WatchField::BuyTax(v) => diesel::update(target)
                .set(token_watches::buy_tax.eq(to_f64(*v)?))
                .execute(&mut conn),
            WatchField::SellTax(v) => diesel::update(target)
                .set(token_watches::sell_tax.eq(to_f64(*v)?))
                .execute(&mut conn),
            WatchField::TransferTax(v) => diesel::update(target)
                .set(token_watches::transfer_tax.eq(to_f64(*v)?))
                .execute(&mut conn),
            WatchField::ZoneLow(v) => diesel::update(target)
                .set(token_watches::zone_low.eq(to_f64(*v)?))
                .execute(&mut conn),
            WatchField::ZoneHigh(v) => diesel::update(target)
                .set(token_watches::zone_high.eq(to_f64(*v)?))
                .execute(&mut conn),
        }
        .map_err(|e| Error::Database(e.to_string()))?;

        if updated == 0 {
            return Err(Error::Database(format!("no watch with id {id}")));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::sqlite::{create_pool, run_migrations};
    use rust_decimal_macros::dec;

    fn setup_test_db() -> DbPool {
        let pool = create_pool(":memory:").expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        pool
    }

    fn new_watch(contract: &str) -> NewTokenWatch {
        NewTokenWatch {
            name: format!("TOKEN-{contract}"),
            contract_address: contract.to_string(),
            chain: "BSC".into(),
            liquidity: LiquidityFlags {
                locked: true,
                ownership_renounced: false,
                burned: true,
            },
            taxes: TaxRates::new(dec!(2.5), dec!(3), dec!(0)).unwrap(),
            buy_zone: BuyZone::new(dec!(900), dec!(1100)).unwrap(),
        }
    }

    // -------------------------------------------------------------------------
    // Insert and read back
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn insert_roundtrip() {
        let store = SqliteWatchStore::new(setup_test_db());

        let inserted = store.insert(&new_watch("0xabc")).await.unwrap();

        assert_eq!(inserted.contract_address, "0xabc");
        assert_eq!(inserted.taxes.buy, dec!(2.5));
        assert_eq!(inserted.buy_zone.low(), dec!(900));
        assert!(inserted.notified_at.is_none());
        assert!(inserted.initial_market_cap.is_none());
        assert_eq!(inserted.last_notified_multiple, 1);

        let loaded = store.get(inserted.id).await.unwrap().unwrap();
        assert_eq!(loaded, inserted);
    }

    #[tokio::test]
    async fn duplicate_contract_address_is_rejected() {
        let store = SqliteWatchStore::new(setup_test_db());

        store.insert(&new_watch("0xabc")).await.unwrap();
        let result = store.insert(&new_watch("0xabc")).await;

        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[tokio::test]
    async fn get_nonexistent_returns_none() {
        let store = SqliteWatchStore::new(setup_test_db());
        assert!(store.get(999).await.unwrap().is_none());
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn list_unnotified_excludes_announced_watches() {
        let store = SqliteWatchStore::new(setup_test_db());

        let a = store.insert(&new_watch("0xaaa")).await.unwrap();
        let b = store.insert(&new_watch("0xbbb")).await.unwrap();

        store.mark_notified(a.id, Utc::now()).await.unwrap();

        let unnotified = store.list_unnotified().await.unwrap();
        assert_eq!(unnotified.len(), 1);
        assert_eq!(unnotified[0].id, b.id);

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    // -------------------------------------------------------------------------
    // Guarded bookkeeping updates
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn mark_notified_applies_once() {
        let store = SqliteWatchStore::new(setup_test_db());
        let watch = store.insert(&new_watch("0xabc")).await.unwrap();

        let first = Utc::now();
        store.mark_notified(watch.id, first).await.unwrap();
        let after_first = store.get(watch.id).await.unwrap().unwrap();
        assert!(after_first.notified_at.is_some());

        // A later call must not move the timestamp.
        let second = first + chrono::Duration::hours(1);
        store.mark_notified(watch.id, second).await.unwrap();
        let after_second = store.get(watch.id).await.unwrap().unwrap();
        assert_eq!(after_second.notified_at, after_first.notified_at);
    }

    #[tokio::test]
    async fn anchor_is_one_shot() {
        let store = SqliteWatchStore::new(setup_test_db());
        let watch = store.insert(&new_watch("0xabc")).await.unwrap();

        store.anchor(watch.id, dec!(950), Utc::now()).await.unwrap();
        let anchored = store.get(watch.id).await.unwrap().unwrap();
        assert_eq!(anchored.initial_market_cap, Some(dec!(950)));
        assert!(anchored.notified_at.is_some());

        // Second anchor attempt is a no-op.
        store
            .anchor(watch.id, dec!(2000), Utc::now())
            .await
            .unwrap();
        let still = store.get(watch.id).await.unwrap().unwrap();
        assert_eq!(still.initial_market_cap, Some(dec!(950)));
    }

    #[tokio::test]
    async fn last_multiple_never_regresses() {
        let store = SqliteWatchStore::new(setup_test_db());
        let watch = store.insert(&new_watch("0xabc")).await.unwrap();

        store.set_last_multiple(watch.id, 10).await.unwrap();
        assert_eq!(
            store
                .get(watch.id)
                .await
                .unwrap()
                .unwrap()
                .last_notified_multiple,
            10
        );

        // Lower value is ignored.
        store.set_last_multiple(watch.id, 5).await.unwrap();
        assert_eq!(
            store
                .get(watch.id)
                .await
                .unwrap()
                .unwrap()
                .last_notified_multiple,
            10
        );

        // Higher value advances.
        store.set_last_multiple(watch.id, 15).await.unwrap();
        assert_eq!(
            store
                .get(watch.id)
                .await
                .unwrap()
                .unwrap()
                .last_notified_multiple,
            15
        );
    }

    // -------------------------------------------------------------------------
    // Edit flow updates
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn update_field_replaces_single_fields() {
        let store = SqliteWatchStore::new(setup_test_db());
        let watch = store.insert(&new_watch("0xabc")).await.unwrap();

        store
            .update_field(watch.id, &WatchField::Name("RENAMED".into()))
            .await
            .unwrap();
        store
            .update_field(watch.id, &WatchField::SellTax(dec!(5)))
            .await
            .unwrap();
        store
            .update_field(watch.id, &WatchField::LiquidityLocked(false))
            .await
            .unwrap();
        store
            .update_field(watch.id, &WatchField::ZoneHigh(dec!(1500)))
            .await
            .unwrap();

        let loaded = store.get(watch.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "RENAMED");
        assert_eq!(loaded.taxes.sell, dec!(5));
        assert!(!loaded.liquidity.locked);
        assert_eq!(loaded.buy_zone.high(), dec!(1500));
        // Untouched fields survive.
        assert_eq!(loaded.taxes.buy, dec!(2.5));
        assert_eq!(loaded.buy_zone.low(), dec!(900));
    }

    #[tokio::test]
    async fn update_field_on_missing_watch_errors() {
        let store = SqliteWatchStore::new(setup_test_db());

        let result = store
            .update_field(42, &WatchField::Chain("Ethereum".into()))
            .await;

        assert!(matches!(result, Err(Error::Database(_))));
    }
}
