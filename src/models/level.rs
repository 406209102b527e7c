use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::InventoryError;
use crate::models::alert::AlertLevel;
use crate::models::item::Item;
use crate::models::location::LocationKey;

/// Quantity state for one (item, location) pair.
///
/// Invariants: `quantity_on_hand >= 0`, `quantity_reserved >= 0`,
/// `quantity_reserved <= quantity_on_hand`, and `quantity_available` is always
/// recomputed as on-hand minus reserved, never mutated independently. Created
/// lazily on first use and never physically deleted; a level that drains to
/// zero simply stays at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub id: Uuid,
    pub item_id: Uuid,
    pub location: LocationKey,
    pub quantity_on_hand: i32,
    pub quantity_reserved: i32,
    pub quantity_available: i32,
    pub min_quantity: Option<i32>,
    pub max_quantity: Option<i32>,
    pub reorder_point: Option<i32>,
    pub alert_level: AlertLevel,
    pub last_counted_at: Option<DateTime<Utc>>,
    pub last_counted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryLevel {
    /// Creates a fresh zero-quantity level seeded with the item's default
    /// thresholds.
    pub fn new(item: &Item, location: LocationKey) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            item_id: item.id,
            location,
            quantity_on_hand: 0,
            quantity_reserved: 0,
            quantity_available: 0,
            min_quantity: None,
            max_quantity: item.max_quantity,
            reorder_point: item.reorder_point,
            alert_level: AlertLevel::Normal,
            last_counted_at: None,
            last_counted_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a signed delta to on-hand. Rejects without mutating when the
    /// result would be negative.
    pub fn apply_delta(&mut self, delta: i32) -> Result<(), InventoryError> {
        let new_on_hand = self.quantity_on_hand + delta;
        if new_on_hand < 0 {
            return Err(InventoryError::InsufficientStock(format!(
                "on-hand {} cannot absorb delta {} for item {} at {}",
                self.quantity_on_hand,
                delta,
                self.item_id,
                self.location.path(None),
            )));
        }
        self.quantity_on_hand = new_on_hand;
        self.recalculate_available();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Earmarks quantity without moving on-hand.
    pub fn reserve(&mut self, quantity: i32) -> Result<(), InventoryError> {
        if quantity > self.quantity_available {
            return Err(InventoryError::InsufficientAvailable(format!(
                "requested {} but only {} available for item {} at {}",
                quantity,
                self.quantity_available,
                self.item_id,
                self.location.path(None),
            )));
        }
        self.quantity_reserved += quantity;
        self.recalculate_available();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Returns earmarked quantity to the available pool.
    pub fn release(&mut self, quantity: i32) -> Result<(), InventoryError> {
        if quantity > self.quantity_reserved {
            return Err(InventoryError::OverRelease(format!(
                "requested {} but only {} reserved for item {} at {}",
                quantity,
                self.quantity_reserved,
                self.item_id,
                self.location.path(None),
            )));
        }
        self.quantity_reserved -= quantity;
        self.recalculate_available();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Overwrites on-hand with a physically counted quantity and returns the
    /// variance (counted minus previous). The only operation that bypasses
    /// delta semantics. Reservations are left untouched.
    pub fn set_counted(&mut self, counted: i32, counted_by: Uuid) -> i32 {
        let variance = counted - self.quantity_on_hand;
        self.quantity_on_hand = counted;
        self.recalculate_available();
        let now = Utc::now();
        self.last_counted_at = Some(now);
        self.last_counted_by = Some(counted_by);
        self.updated_at = now;
        variance
    }

    pub fn update_thresholds(
        &mut self,
        min_quantity: Option<i32>,
        max_quantity: Option<i32>,
        reorder_point: Option<i32>,
    ) {
        self.min_quantity = min_quantity;
        self.max_quantity = max_quantity;
        self.reorder_point = reorder_point;
        self.updated_at = Utc::now();
    }

    pub fn needs_reorder(&self) -> bool {
        match self.reorder_point {
            Some(rp) => self.quantity_available <= rp,
            None => false,
        }
    }

    fn recalculate_available(&mut self) {
        self.quantity_available = self.quantity_on_hand - self.quantity_reserved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level() -> InventoryLevel {
        let item = Item::new("SKU-1", "BC-1", "Accent chair").with_thresholds(Some(12), None, None);
        InventoryLevel::new(&item, LocationKey::property(Uuid::new_v4()))
    }

    #[test]
    fn seeded_from_item_defaults() {
        let lvl = level();
        assert_eq!(lvl.quantity_on_hand, 0);
        assert_eq!(lvl.reorder_point, Some(12));
        assert_eq!(lvl.alert_level, AlertLevel::Normal);
    }

    #[test]
    fn rejected_delta_leaves_state_untouched() {
        let mut lvl = level();
        lvl.apply_delta(5).unwrap();
        let before = lvl.clone();
        let err = lvl.apply_delta(-6).unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientStock(_)));
        assert_eq!(lvl.quantity_on_hand, before.quantity_on_hand);
        assert_eq!(lvl.quantity_available, before.quantity_available);
    }

    #[test]
    fn reserve_release_round_trip() {
        let mut lvl = level();
        lvl.apply_delta(10).unwrap();
        lvl.reserve(4).unwrap();
        assert_eq!(lvl.quantity_reserved, 4);
        assert_eq!(lvl.quantity_available, 6);
        lvl.release(4).unwrap();
        assert_eq!(lvl.quantity_reserved, 0);
        assert_eq!(lvl.quantity_available, 10);
    }

    #[test]
    fn over_reserve_and_over_release_are_rejected() {
        let mut lvl = level();
        lvl.apply_delta(3).unwrap();
        assert!(matches!(
            lvl.reserve(4),
            Err(InventoryError::InsufficientAvailable(_))
        ));
        lvl.reserve(2).unwrap();
        assert!(matches!(lvl.release(3), Err(InventoryError::OverRelease(_))));
    }

    #[test]
    fn counted_overwrite_reports_variance() {
        let mut lvl = level();
        lvl.apply_delta(10).unwrap();
        let who = Uuid::new_v4();
        let variance = lvl.set_counted(7, who);
        assert_eq!(variance, -3);
        assert_eq!(lvl.quantity_on_hand, 7);
        assert_eq!(lvl.last_counted_by, Some(who));
    }
}
