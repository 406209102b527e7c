use uuid::Uuid;

use stagestock::config::AppConfig;
use stagestock::errors::InventoryError;
use stagestock::models::alert::AlertLevel;
use stagestock::models::item::{Item, ItemCondition};
use stagestock::models::location::LocationKey;
use stagestock::models::transaction::{NewTransaction, TransactionStatus, TransactionType};
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
        "Console table",
    )
    .with_thresholds(reorder_point, None, None);
    services.store.insert_item(item.clone()).unwrap();
    item
}

async fn on_hand(services: &CoreServices, item_id: Uuid, location: LocationKey) -> i32 {
    services
        .levels
        .get_or_create(item_id, location)
        .await
        .unwrap()
        .quantity_on_hand
}

#[tokio::test]
async fn approval_flow_from_pending_to_completed() {
    let services = core();
    let item = seeded_item(&services, None);
    let warehouse = LocationKey::property(Uuid::new_v4());

    let tx = services
        .transactions
        .create(
            NewTransaction::new(item.id, TransactionType::Receive, 8)
                .to_location(warehouse)
                .requiring_approval(),
        )
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(on_hand(&services, item.id, warehouse).await, 0);

    let approver = Uuid::new_v4();
    let tx = services.transactions.approve(tx.id, approver).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Approved);
    assert_eq!(tx.approved_by, Some(approver));

    let tx = services.transactions.process(tx.id).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Completed);
    assert_eq!(tx.previous_on_hand, Some(0));
    assert_eq!(tx.new_on_hand, Some(8));
    assert!(tx.processed_at.is_some());
    assert_eq!(on_hand(&services, item.id, warehouse).await, 8);
}

#[tokio::test]
async fn rejected_transactions_are_terminal() {
    let services = core();
    let item = seeded_item(&services, None);
    let warehouse = LocationKey::property(Uuid::new_v4());

    let tx = services
        .transactions
        .create(
            NewTransaction::new(item.id, TransactionType::Receive, 8)
                .to_location(warehouse)
                .requiring_approval(),
        )
        .await
        .unwrap();

    let rejected = services
        .transactions
        .reject(tx.id, Uuid::new_v4(), "wrong delivery")
        .await
        .unwrap();
    assert_eq!(rejected.status, TransactionStatus::Rejected);
    assert!(rejected.notes.unwrap().contains("wrong delivery"));

    assert!(matches!(
        services.transactions.approve(tx.id, Uuid::new_v4()).await,
        Err(InventoryError::NotPending(_))
    ));
    assert!(matches!(
        services.transactions.process(tx.id).await,
        Err(InventoryError::MustBeApproved(_))
    ));
    assert_eq!(on_hand(&services, item.id, warehouse).await, 0);
}

#[tokio::test]
async fn submit_auto_approves_and_processes() {
    let services = core();
    let item = seeded_item(&services, None);
    let warehouse = LocationKey::property(Uuid::new_v4());

    let tx = services
        .transactions
        .submit(NewTransaction::new(item.id, TransactionType::Receive, 5).to_location(warehouse))
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Completed);
    assert_eq!(on_hand(&services, item.id, warehouse).await, 5);
}

#[tokio::test]
async fn completed_transactions_cannot_be_reprocessed() {
    let services = core();
    let item = seeded_item(&services, None);
    let warehouse = LocationKey::property(Uuid::new_v4());

    let tx = services
        .transactions
        .submit(NewTransaction::new(item.id, TransactionType::Receive, 5).to_location(warehouse))
        .await
        .unwrap();

    assert!(matches!(
        services.transactions.process(tx.id).await,
        Err(InventoryError::AlreadyCompleted(_))
    ));
    // The level must not have absorbed the receipt twice.
    assert_eq!(on_hand(&services, item.id, warehouse).await, 5);
}

#[tokio::test]
async fn failed_transfer_cancels_and_touches_neither_level() {
    let services = core();
    let item = seeded_item(&services, None);
    let warehouse = LocationKey::property(Uuid::new_v4());
    let unit = LocationKey::resolve(Uuid::new_v4(), Some(Uuid::new_v4()), None).unwrap();

    services
        .transactions
        .submit(NewTransaction::new(item.id, TransactionType::Receive, 5).to_location(warehouse))
        .await
        .unwrap();

    let result = services
        .transactions
        .submit(
            NewTransaction::new(item.id, TransactionType::Transfer, 10)
                .from_location(warehouse)
                .to_location(unit),
        )
        .await;
    assert!(matches!(result, Err(InventoryError::InsufficientStock(_))));

    assert_eq!(on_hand(&services, item.id, warehouse).await, 5);
    assert_eq!(on_hand(&services, item.id, unit).await, 0);

    // The failed record stays in the ledger as CANCELLED with the failure in
    // its notes.
    let mut cancelled = 0;
    for handle in services.store.transaction_handles() {
        let tx = handle.lock().await;
        if tx.status == TransactionStatus::Cancelled {
            cancelled += 1;
            assert!(tx.notes.as_deref().unwrap().contains("processing failed"));
        }
    }
    assert_eq!(cancelled, 1);
}

#[tokio::test]
async fn successful_transfer_moves_both_legs() {
    let services = core();
    let item = seeded_item(&services, None);
    let warehouse = LocationKey::property(Uuid::new_v4());
    let unit = LocationKey::resolve(Uuid::new_v4(), Some(Uuid::new_v4()), None).unwrap();

    services
        .transactions
        .submit(NewTransaction::new(item.id, TransactionType::Receive, 12).to_location(warehouse))
        .await
        .unwrap();

    let tx = services
        .transactions
        .transfer_inventory(item.id, warehouse, unit, 7, Some("staging install".into()), None)
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Completed);
    assert_eq!(on_hand(&services, item.id, warehouse).await, 5);
    assert_eq!(on_hand(&services, item.id, unit).await, 7);
}

#[tokio::test]
async fn assign_reserves_and_unassign_releases() {
    let services = core();
    let item = seeded_item(&services, None);
    let warehouse = LocationKey::property(Uuid::new_v4());
    let design = Uuid::new_v4();

    services
        .transactions
        .submit(NewTransaction::new(item.id, TransactionType::Receive, 10).to_location(warehouse))
        .await
        .unwrap();

    services
        .transactions
        .submit(
            NewTransaction::new(item.id, TransactionType::Assign, 4)
                .from_location(warehouse)
                .with_staging_design(design),
        )
        .await
        .unwrap();
    let level = services.levels.get_or_create(item.id, warehouse).await.unwrap();
    assert_eq!(level.quantity_reserved, 4);
    assert_eq!(level.quantity_available, 6);

    services
        .transactions
        .submit(NewTransaction::new(item.id, TransactionType::Unassign, 4).to_location(warehouse))
        .await
        .unwrap();
    let level = services.levels.get_or_create(item.id, warehouse).await.unwrap();
    assert_eq!(level.quantity_reserved, 0);
    assert_eq!(level.quantity_available, 10);
}

#[tokio::test]
async fn damage_writes_off_stock_and_downgrades_condition() {
    let services = core();
    let item = seeded_item(&services, None);
    let warehouse = LocationKey::property(Uuid::new_v4());

    services
        .transactions
        .submit(NewTransaction::new(item.id, TransactionType::Receive, 3).to_location(warehouse))
        .await
        .unwrap();
    services
        .transactions
        .submit(
            NewTransaction::new(item.id, TransactionType::Damage, 1)
                .from_location(warehouse)
                .with_reason("water damage in transit"),
        )
        .await
        .unwrap();

    assert_eq!(on_hand(&services, item.id, warehouse).await, 2);
    let item = services.store.get_item(item.id).unwrap();
    assert_eq!(item.condition, ItemCondition::Damaged);
}

#[tokio::test]
async fn consumption_to_the_low_band_raises_a_low_alert() {
    // An item with reorder point 12 drawn down from 24 to 3 lands in the low
    // band, not critical: 3 is above the critical cutoff of 1.2.
    let services = core();
    let item = seeded_item(&services, Some(12));
    let warehouse = LocationKey::property(Uuid::new_v4());

    services
        .transactions
        .submit(NewTransaction::new(item.id, TransactionType::Receive, 24).to_location(warehouse))
        .await
        .unwrap();
    services
        .transactions
        .submit(NewTransaction::new(item.id, TransactionType::Consume, 21).from_location(warehouse))
        .await
        .unwrap();

    let level = services.levels.get_or_create(item.id, warehouse).await.unwrap();
    assert_eq!(level.quantity_on_hand, 3);
    assert_eq!(level.alert_level, AlertLevel::Low);
    let alert = services.store.open_alert(level.id).unwrap();
    assert_eq!(alert.alert_level, AlertLevel::Low);
}

#[tokio::test]
async fn creation_rejects_bad_location_contracts_and_unknown_items() {
    let services = core();
    let item = seeded_item(&services, None);
    let warehouse = LocationKey::property(Uuid::new_v4());

    // RECEIVE without a destination.
    assert!(matches!(
        services
            .transactions
            .create(NewTransaction::new(item.id, TransactionType::Receive, 1))
            .await,
        Err(InventoryError::ValidationError(_))
    ));

    // TRANSFER onto itself.
    assert!(matches!(
        services
            .transactions
            .create(
                NewTransaction::new(item.id, TransactionType::Transfer, 1)
                    .from_location(warehouse)
                    .to_location(warehouse)
            )
            .await,
        Err(InventoryError::ValidationError(_))
    ));

    // Unknown item.
    assert!(matches!(
        services
            .transactions
            .create(NewTransaction::new(Uuid::new_v4(), TransactionType::Receive, 1).to_location(warehouse))
            .await,
        Err(InventoryError::NotFound(_))
    ));
}
