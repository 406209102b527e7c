use proptest::prelude::*;
use uuid::Uuid;

use stagestock::config::AppConfig;
use stagestock::models::item::Item;
use stagestock::models::level::InventoryLevel;
use stagestock::models::location::LocationKey;
use stagestock::CoreServices;

fn core() -> CoreServices {
    let (services, _rx) = CoreServices::new(AppConfig::default(), None).unwrap();
    services
}

fn seeded_item(services: &CoreServices, reorder_point: Option<i32>) -> Item {
    let suffix = Uuid::new_v4();
    let item = Item::new(
        format!("SKU-{suffix}"),
        format!("BC-{suffix}"),
        "Accent chair",
    )
    .with_thresholds(reorder_point, None, None);
    services.store.insert_item(item.clone()).unwrap();
    item
}

proptest! {
    /// Any sequence of signed deltas, with the rejected ones discarded, keeps
    /// on-hand non-negative and available equal to on-hand minus reserved.
    #[test]
    fn delta_sequences_preserve_invariants(deltas in prop::collection::vec(-50i32..50, 1..40)) {
        let item = Item::new("SKU-P", "BC-P", "Lamp");
        let mut level = InventoryLevel::new(&item, LocationKey::property(Uuid::new_v4()));
        for delta in deltas {
            let _ = level.apply_delta(delta);
            prop_assert!(level.quantity_on_hand >= 0);
            prop_assert_eq!(
                level.quantity_available,
                level.quantity_on_hand - level.quantity_reserved
            );
        }
    }

    /// Interleaved reserves and releases never push reserved negative or
    /// above on-hand; rejected calls leave state untouched.
    #[test]
    fn reserve_release_sequences_stay_within_on_hand(
        on_hand in 0i32..100,
        ops in prop::collection::vec((any::<bool>(), 0i32..40), 1..40),
    ) {
        let item = Item::new("SKU-P", "BC-P", "Lamp");
        let mut level = InventoryLevel::new(&item, LocationKey::property(Uuid::new_v4()));
        level.apply_delta(on_hand).unwrap();
        for (is_reserve, quantity) in ops {
            let before = level.clone();
            let result = if is_reserve {
                level.reserve(quantity)
            } else {
                level.release(quantity)
            };
            if result.is_err() {
                prop_assert_eq!(&level, &before);
            }
            prop_assert!(level.quantity_reserved >= 0);
            prop_assert!(level.quantity_reserved <= level.quantity_on_hand);
            prop_assert_eq!(
                level.quantity_available,
                level.quantity_on_hand - level.quantity_reserved
            );
        }
    }
}

#[tokio::test]
async fn concurrent_consumption_never_oversells() {
    let services = core();
    let item = seeded_item(&services, None);
    let location = LocationKey::property(Uuid::new_v4());
    services
        .levels
        .adjust(item.id, location, 10, "initial receipt")
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let levels = services.levels.clone();
        let item_id = item.id;
        handles.push(tokio::spawn(async move {
            levels.adjust(item_id, location, -1, "staging pull").await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }
    assert_eq!(succeeded, 10);

    let level = services.levels.get_or_create(item.id, location).await.unwrap();
    assert_eq!(level.quantity_on_hand, 0);
}

#[tokio::test]
async fn low_stock_keeps_a_single_open_alert_until_recovery() {
    let services = core();
    let item = seeded_item(&services, Some(12));
    let location = LocationKey::property(Uuid::new_v4());

    services.levels.adjust(item.id, location, 24, "receipt").await.unwrap();
    assert_eq!(services.store.open_alert_count(), 0);

    // Two consecutive drops inside the low band must not stack alerts.
    services.levels.adjust(item.id, location, -19, "pull").await.unwrap();
    services.levels.adjust(item.id, location, -1, "pull").await.unwrap();
    assert_eq!(services.store.open_alert_count(), 1);

    // Dropping further into the critical band updates severity in place.
    services.levels.adjust(item.id, location, -3, "pull").await.unwrap();
    assert_eq!(services.store.open_alert_count(), 1);
    let level = services.levels.get_or_create(item.id, location).await.unwrap();
    let alert = services.store.open_alert(level.id).unwrap();
    assert_eq!(alert.alert_level, stagestock::models::alert::AlertLevel::Critical);

    // Restocking resolves the alert.
    services.levels.adjust(item.id, location, 23, "restock").await.unwrap();
    assert_eq!(services.store.open_alert_count(), 0);
    assert!(services.store.open_alert(level.id).is_none());
}

#[tokio::test]
async fn cycle_count_below_reservation_goes_negative_but_proceeds() {
    let services = core();
    let item = seeded_item(&services, None);
    let location = LocationKey::property(Uuid::new_v4());

    services.levels.adjust(item.id, location, 10, "receipt").await.unwrap();
    services.levels.reserve(item.id, location, 6).await.unwrap();
    let level = services.levels.get_or_create(item.id, location).await.unwrap();

    let (counted, variance) = services
        .levels
        .cycle_count(level.id, 4, Uuid::new_v4())
        .await
        .unwrap();
    assert_eq!(variance, -6);
    assert_eq!(counted.quantity_on_hand, 4);
    assert_eq!(counted.quantity_reserved, 6);
    assert_eq!(counted.quantity_available, -2);

    // Releasing the reservation brings available back above zero.
    services.levels.release(item.id, location, 6).await.unwrap();
    let level = services.levels.get_or_create(item.id, location).await.unwrap();
    assert_eq!(level.quantity_available, 4);
}
