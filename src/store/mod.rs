use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::errors::InventoryError;
use crate::models::alert::StockAlert;
use crate::models::forecast::DemandForecast;
use crate::models::item::{Item, ItemCondition};
use crate::models::level::InventoryLevel;
use crate::models::location::LocationKey;
use crate::models::transaction::InventoryTransaction;

/// Join key for levels: one row per (item, location).
pub type LevelKey = (Uuid, LocationKey);

/// Scope key for stored forecast batches: (item, optional property).
pub type ForecastKey = (Uuid, Option<Uuid>);

/// In-memory tables for the inventory core.
///
/// Rows that must mutate under a single logical owner (levels, transactions)
/// are held behind a per-row `tokio::sync::Mutex`; everything else lives in
/// plain `DashMap` entries mutated through the shard lock. Persistence
/// technology is out of scope for the core, so this store is the seam a
/// durable backend would replace.
#[derive(Debug, Default)]
pub struct InventoryStore {
    items: DashMap<Uuid, Item>,
    sku_index: DashMap<String, Uuid>,
    barcode_index: DashMap<String, Uuid>,
    levels: DashMap<LevelKey, Arc<Mutex<InventoryLevel>>>,
    level_ids: DashMap<Uuid, LevelKey>,
    transactions: DashMap<Uuid, Arc<Mutex<InventoryTransaction>>>,
    /// At most one open alert per level; this index is the single owner of
    /// that invariant.
    open_alerts: DashMap<Uuid, StockAlert>,
    resolved_alerts: DashMap<Uuid, StockAlert>,
    forecasts: DashMap<ForecastKey, Vec<DemandForecast>>,
}

impl InventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- items ----

    /// Registers a catalog item, enforcing global SKU and barcode uniqueness
    /// before anything is inserted.
    pub fn insert_item(&self, item: Item) -> Result<(), InventoryError> {
        if item.sku.trim().is_empty() || item.barcode.trim().is_empty() {
            return Err(InventoryError::validation("sku and barcode are required"));
        }
        match self.sku_index.entry(item.sku.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(InventoryError::validation(format!(
                    "sku {} already exists",
                    item.sku
                )));
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(item.id);
            }
        }
        match self.barcode_index.entry(item.barcode.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                self.sku_index.remove(&item.sku);
                return Err(InventoryError::validation(format!(
                    "barcode {} already exists",
                    item.barcode
                )));
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(item.id);
            }
        }
        self.items.insert(item.id, item);
        Ok(())
    }

    pub fn get_item(&self, item_id: Uuid) -> Option<Item> {
        self.items.get(&item_id).map(|entry| entry.clone())
    }

    pub fn update_item_condition(
        &self,
        item_id: Uuid,
        condition: ItemCondition,
    ) -> Result<(), InventoryError> {
        let mut item = self
            .items
            .get_mut(&item_id)
            .ok_or_else(|| InventoryError::not_found(format!("item {item_id}")))?;
        item.condition = condition;
        item.updated_at = Utc::now();
        Ok(())
    }

    // ---- levels ----

    pub fn level_handle(&self, key: &LevelKey) -> Option<Arc<Mutex<InventoryLevel>>> {
        self.levels.get(key).map(|entry| entry.clone())
    }

    pub fn level_handle_by_id(&self, level_id: Uuid) -> Option<Arc<Mutex<InventoryLevel>>> {
        let key = self.level_ids.get(&level_id).map(|entry| *entry)?;
        self.level_handle(&key)
    }

    /// Returns the level for (item, location), lazily creating a zero-quantity
    /// row seeded from the item's defaults.
    pub fn level_handle_or_create(
        &self,
        item: &Item,
        location: LocationKey,
    ) -> Arc<Mutex<InventoryLevel>> {
        let key = (item.id, location);
        let handle = self
            .levels
            .entry(key)
            .or_insert_with(|| {
                let level = InventoryLevel::new(item, location);
                self.level_ids.insert(level.id, key);
                Arc::new(Mutex::new(level))
            })
            .clone();
        handle
    }

    /// Snapshot of every level handle, for scans that must not hold the map
    /// open across awaits.
    pub fn level_handles(&self) -> Vec<Arc<Mutex<InventoryLevel>>> {
        self.levels.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Locks two levels in a fixed global order (by level key) so that
    /// concurrent transfers between the same pair cannot deadlock. Guards are
    /// returned in (first, second) argument order regardless of lock order.
    pub async fn lock_level_pair<'a>(
        first_key: &LevelKey,
        first: &'a Arc<Mutex<InventoryLevel>>,
        second_key: &LevelKey,
        second: &'a Arc<Mutex<InventoryLevel>>,
    ) -> (
        MutexGuard<'a, InventoryLevel>,
        MutexGuard<'a, InventoryLevel>,
    ) {
        if first_key <= second_key {
            let a = first.lock().await;
            let b = second.lock().await;
            (a, b)
        } else {
            let b = second.lock().await;
            let a = first.lock().await;
            (a, b)
        }
    }

    // ---- transactions ----

    pub fn insert_transaction(&self, transaction: InventoryTransaction) -> Uuid {
        let id = transaction.id;
        self.transactions.insert(id, Arc::new(Mutex::new(transaction)));
        id
    }

    pub fn transaction_handle(&self, id: Uuid) -> Option<Arc<Mutex<InventoryTransaction>>> {
        self.transactions.get(&id).map(|entry| entry.clone())
    }

    pub fn transaction_handles(&self) -> Vec<Arc<Mutex<InventoryTransaction>>> {
        self.transactions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    // ---- alerts ----

    pub fn open_alert(&self, level_id: Uuid) -> Option<StockAlert> {
        self.open_alerts.get(&level_id).map(|entry| entry.clone())
    }

    /// Records an open alert for a level, replacing any existing open row so
    /// the at-most-one invariant holds.
    pub fn record_open_alert(&self, alert: StockAlert) {
        self.open_alerts.insert(alert.level_id, alert);
    }

    /// Closes the open alert for a level, if any, and archives it.
    pub fn resolve_alert(&self, level_id: Uuid, resolved_at: DateTime<Utc>) -> Option<StockAlert> {
        let (_, mut alert) = self.open_alerts.remove(&level_id)?;
        alert.resolved_at = Some(resolved_at);
        self.resolved_alerts.insert(alert.id, alert.clone());
        Some(alert)
    }

    pub fn open_alert_count(&self) -> usize {
        self.open_alerts.len()
    }

    // ---- forecasts ----

    /// Replaces stale forecasts for a scope: rows generated before `cutoff`
    /// are purged, then the new batch is appended. The delete-then-insert is
    /// atomic with respect to readers of this scope.
    pub fn store_forecasts(
        &self,
        key: ForecastKey,
        cutoff: DateTime<Utc>,
        batch: Vec<DemandForecast>,
    ) {
        let mut entry = self.forecasts.entry(key).or_default();
        entry.retain(|forecast| forecast.generated_at >= cutoff);
        entry.extend(batch);
    }

    /// The most recent stored batch for a scope: rows sharing the newest
    /// `generated_at`, ordered by forecast date. Empty when the scope has no
    /// forecast history.
    pub fn latest_forecasts(&self, key: &ForecastKey) -> Vec<DemandForecast> {
        let Some(entry) = self.forecasts.get(key) else {
            return Vec::new();
        };
        let Some(newest) = entry.iter().map(|f| f.generated_at).max() else {
            return Vec::new();
        };
        let mut batch: Vec<DemandForecast> = entry
            .iter()
            .filter(|f| f.generated_at == newest)
            .cloned()
            .collect();
        batch.sort_by_key(|f| f.forecast_date);
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::item::Item;

    #[test]
    fn duplicate_sku_and_barcode_are_rejected() {
        let store = InventoryStore::new();
        store
            .insert_item(Item::new("SKU-1", "BC-1", "Sofa"))
            .unwrap();
        assert!(store.insert_item(Item::new("SKU-1", "BC-2", "Chair")).is_err());
        assert!(store.insert_item(Item::new("SKU-2", "BC-1", "Chair")).is_err());
        // Failed inserts must not claim either index.
        assert!(store.insert_item(Item::new("SKU-2", "BC-2", "Chair")).is_ok());
    }

    #[tokio::test]
    async fn level_creation_is_idempotent_per_key() {
        let store = InventoryStore::new();
        let item = Item::new("SKU-1", "BC-1", "Sofa");
        store.insert_item(item.clone()).unwrap();
        let loc = LocationKey::property(Uuid::new_v4());
        let first = store.level_handle_or_create(&item, loc);
        let second = store.level_handle_or_create(&item, loc);
        assert!(Arc::ptr_eq(&first, &second));
        let id = first.lock().await.id;
        assert!(store.level_handle_by_id(id).is_some());
    }

    #[test]
    fn latest_forecasts_picks_newest_batch() {
        use crate::models::forecast::DemandForecast;
        use chrono::{Duration, NaiveDate};

        let store = InventoryStore::new();
        let item_id = Uuid::new_v4();
        let key = (item_id, None);
        let now = Utc::now();

        let row = |date: NaiveDate, generated_at| DemandForecast {
            id: Uuid::new_v4(),
            item_id,
            property_id: None,
            forecast_date: date,
            predicted_demand: 1.0,
            lower_bound: 0.7,
            upper_bound: 1.3,
            confidence: 0.9,
            model_version: "m1".into(),
            generated_at,
        };

        let d1 = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
        let old_run = now - Duration::days(2);
        store.store_forecasts(key, now - Duration::days(7), vec![row(d1, old_run)]);
        store.store_forecasts(key, now - Duration::days(7), vec![row(d1, now)]);

        let latest = store.latest_forecasts(&key);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].generated_at, now);
    }
}
