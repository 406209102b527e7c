use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::InventoryError;
use crate::events::{Event, EventSender};
use crate::models::alert::StockAlert;
use crate::models::item::Item;
use crate::models::level::InventoryLevel;
use crate::models::location::LocationKey;
use crate::models::transaction::InventoryTransaction;
use crate::services::alerts::{self, AlertPolicy};
use crate::store::InventoryStore;

/// Owns quantity state per (item, location): on-hand, reserved, available,
/// thresholds and the derived alert level.
///
/// Every mutation of one level runs under that level's lock, so concurrent
/// adjust/reserve/release/cycle-count calls serialize and the non-negative
/// and reserved-within-on-hand invariants hold under contention.
#[derive(Clone)]
pub struct InventoryLevelService {
    store: Arc<InventoryStore>,
    policy: AlertPolicy,
    events: EventSender,
}

impl InventoryLevelService {
    pub fn new(store: Arc<InventoryStore>, policy: AlertPolicy, events: EventSender) -> Self {
        Self {
            store,
            policy,
            events,
        }
    }

    fn item(&self, item_id: Uuid) -> Result<Item, InventoryError> {
        self.store
            .get_item(item_id)
            .ok_or_else(|| InventoryError::not_found(format!("item {item_id}")))
    }

    /// Returns the level for (item, location), creating a zero-quantity row
    /// seeded with the item's default thresholds on first use.
    #[instrument(skip(self))]
    pub async fn get_or_create(
        &self,
        item_id: Uuid,
        location: LocationKey,
    ) -> Result<InventoryLevel, InventoryError> {
        let item = self.item(item_id)?;
        let handle = self.store.level_handle_or_create(&item, location);
        let level = handle.lock().await;
        Ok(level.clone())
    }

    /// Applies a signed delta to on-hand and records a completed ADJUST audit
    /// entry in the ledger. Level mutation and ledger entry happen inside one
    /// level-lock critical section: either both apply or neither does.
    #[instrument(skip(self))]
    pub async fn adjust(
        &self,
        item_id: Uuid,
        location: LocationKey,
        delta: i32,
        reason: &str,
    ) -> Result<InventoryLevel, InventoryError> {
        let item = self.item(item_id)?;
        let handle = self.store.level_handle_or_create(&item, location);
        let mut level = handle.lock().await;

        let previous = level.quantity_on_hand;
        level.apply_delta(delta)?;
        let new_on_hand = level.quantity_on_hand;

        self.store.insert_transaction(InventoryTransaction::completed_audit(
            item_id,
            location,
            delta,
            previous,
            new_on_hand,
            reason,
            None,
        ));
        self.refresh_alert(&mut level);

        info!(
            item_id = %item_id,
            delta,
            previous,
            new_on_hand,
            "Adjusted inventory level"
        );
        self.events.send(Event::LevelAdjusted {
            level_id: level.id,
            item_id,
            previous_on_hand: previous,
            new_on_hand,
            reason: reason.to_string(),
        });
        Ok(level.clone())
    }

    /// Earmarks quantity at a location without moving on-hand.
    #[instrument(skip(self))]
    pub async fn reserve(
        &self,
        item_id: Uuid,
        location: LocationKey,
        quantity: i32,
    ) -> Result<InventoryLevel, InventoryError> {
        if quantity < 0 {
            return Err(InventoryError::validation("reserve quantity must be non-negative"));
        }
        let item = self.item(item_id)?;
        let handle = self.store.level_handle_or_create(&item, location);
        let mut level = handle.lock().await;
        level.reserve(quantity)?;
        self.refresh_alert(&mut level);
        self.events.send(Event::InventoryReserved {
            level_id: level.id,
            item_id,
            quantity,
        });
        Ok(level.clone())
    }

    /// Returns earmarked quantity to the available pool.
    #[instrument(skip(self))]
    pub async fn release(
        &self,
        item_id: Uuid,
        location: LocationKey,
        quantity: i32,
    ) -> Result<InventoryLevel, InventoryError> {
        if quantity < 0 {
            return Err(InventoryError::validation("release quantity must be non-negative"));
        }
        let item = self.item(item_id)?;
        let handle = self.store.level_handle_or_create(&item, location);
        let mut level = handle.lock().await;
        level.release(quantity)?;
        self.refresh_alert(&mut level);
        self.events.send(Event::InventoryReleased {
            level_id: level.id,
            item_id,
            quantity,
        });
        Ok(level.clone())
    }

    /// Overwrites on-hand with a physically counted quantity; the only
    /// operation that bypasses delta semantics. A non-zero variance is
    /// recorded as a completed ADJUST audit entry.
    #[instrument(skip(self))]
    pub async fn cycle_count(
        &self,
        level_id: Uuid,
        counted_quantity: i32,
        counted_by: Uuid,
    ) -> Result<(InventoryLevel, i32), InventoryError> {
        if counted_quantity < 0 {
            return Err(InventoryError::validation("counted quantity must be non-negative"));
        }
        let handle = self
            .store
            .level_handle_by_id(level_id)
            .ok_or_else(|| InventoryError::not_found(format!("inventory level {level_id}")))?;
        let mut level = handle.lock().await;

        let previous = level.quantity_on_hand;
        let variance = level.set_counted(counted_quantity, counted_by);

        if counted_quantity < level.quantity_reserved {
            // Counted below the outstanding reservation: available goes
            // negative until reservations are released. Kept loud, not fixed
            // up.
            warn!(
                level_id = %level_id,
                counted_quantity,
                reserved = level.quantity_reserved,
                "Cycle count dropped on-hand below reserved quantity"
            );
        }

        if variance != 0 {
            self.store.insert_transaction(InventoryTransaction::completed_audit(
                level.item_id,
                level.location,
                variance,
                previous,
                counted_quantity,
                "cycle count variance",
                Some(counted_by),
            ));
        }
        self.refresh_alert(&mut level);

        info!(level_id = %level_id, counted_quantity, variance, "Cycle count applied");
        self.events.send(Event::CycleCounted {
            level_id,
            counted_quantity,
            variance,
            counted_by,
        });
        Ok((level.clone(), variance))
    }

    /// Sets per-level threshold overrides.
    #[instrument(skip(self))]
    pub async fn update_thresholds(
        &self,
        level_id: Uuid,
        min_quantity: Option<i32>,
        max_quantity: Option<i32>,
        reorder_point: Option<i32>,
    ) -> Result<InventoryLevel, InventoryError> {
        let handle = self
            .store
            .level_handle_by_id(level_id)
            .ok_or_else(|| InventoryError::not_found(format!("inventory level {level_id}")))?;
        let mut level = handle.lock().await;
        level.update_thresholds(min_quantity, max_quantity, reorder_point);
        self.refresh_alert(&mut level);
        Ok(level.clone())
    }

    // ---- effect entry points for the transaction ledger ----
    // These mutate a level on behalf of a driving ledger transaction and so
    // do not write a companion audit entry of their own.

    pub(crate) async fn apply_delta_effect(
        &self,
        item_id: Uuid,
        location: LocationKey,
        delta: i32,
    ) -> Result<(i32, i32), InventoryError> {
        let item = self.item(item_id)?;
        let handle = self.store.level_handle_or_create(&item, location);
        let mut level = handle.lock().await;
        let previous = level.quantity_on_hand;
        level.apply_delta(delta)?;
        self.refresh_alert(&mut level);
        Ok((previous, level.quantity_on_hand))
    }

    pub(crate) async fn apply_reserve_effect(
        &self,
        item_id: Uuid,
        location: LocationKey,
        quantity: i32,
    ) -> Result<(i32, i32), InventoryError> {
        let item = self.item(item_id)?;
        let handle = self.store.level_handle_or_create(&item, location);
        let mut level = handle.lock().await;
        let previous = level.quantity_on_hand;
        level.reserve(quantity)?;
        self.refresh_alert(&mut level);
        Ok((previous, level.quantity_on_hand))
    }

    pub(crate) async fn apply_release_effect(
        &self,
        item_id: Uuid,
        location: LocationKey,
        quantity: i32,
    ) -> Result<(i32, i32), InventoryError> {
        let item = self.item(item_id)?;
        let handle = self.store.level_handle_or_create(&item, location);
        let mut level = handle.lock().await;
        let previous = level.quantity_on_hand;
        level.release(quantity)?;
        self.refresh_alert(&mut level);
        Ok((previous, level.quantity_on_hand))
    }

    /// Recomputes the alert level and reconciles the open-alert index.
    ///
    /// Idempotent: a level that stays low-stock across repeated mutations
    /// keeps its single open alert (severity updated in place); a level that
    /// recovers gets its open alert resolved. Callers hold the level lock, so
    /// checks and writes against the index cannot interleave for one level.
    pub(crate) fn refresh_alert(&self, level: &mut InventoryLevel) {
        level.alert_level = alerts::evaluate(
            level.quantity_on_hand,
            level.reorder_point,
            level.max_quantity,
            &self.policy,
        );

        if level.alert_level.is_low_stock() {
            match self.store.open_alert(level.id) {
                Some(mut existing) => {
                    if existing.alert_level != level.alert_level {
                        existing.alert_level = level.alert_level;
                        existing.quantity_at_alert = level.quantity_on_hand;
                        self.store.record_open_alert(existing);
                    }
                }
                None => {
                    let alert = StockAlert::new(
                        level.item_id,
                        level.id,
                        level.alert_level,
                        level.quantity_on_hand,
                        format!(
                            "item {} at {} is {} ({} on hand)",
                            level.item_id,
                            level.location.path(None),
                            level.alert_level,
                            level.quantity_on_hand
                        ),
                    );
                    warn!(
                        level_id = %level.id,
                        item_id = %level.item_id,
                        alert_level = %level.alert_level,
                        on_hand = level.quantity_on_hand,
                        "Stock alert raised"
                    );
                    self.events.send(Event::StockAlertRaised {
                        alert_id: alert.id,
                        level_id: level.id,
                        item_id: level.item_id,
                        alert_level: level.alert_level,
                    });
                    self.store.record_open_alert(alert);
                }
            }
        } else if let Some(resolved) = self.store.resolve_alert(level.id, Utc::now()) {
            info!(level_id = %level.id, alert_id = %resolved.id, "Stock alert resolved");
            self.events.send(Event::StockAlertResolved {
                alert_id: resolved.id,
                level_id: level.id,
            });
        }
    }
}
