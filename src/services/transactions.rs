use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::errors::InventoryError;
use crate::events::{Event, EventSender};
use crate::models::item::ItemCondition;
use crate::models::location::LocationKey;
use crate::models::transaction::{
    InventoryTransaction, NewTransaction, TransactionStatus, TransactionType,
};
use crate::services::levels::InventoryLevelService;
use crate::store::{InventoryStore, LevelKey};

/// The transaction ledger: records every inventory-affecting event, enforces
/// the status lifecycle, and drives the level engine through typed effects.
///
/// Lifecycle: PENDING --approve--> APPROVED --process--> COMPLETED;
/// PENDING --reject--> REJECTED; APPROVED --process fails--> CANCELLED with
/// the failure appended to notes. Each transaction row has its own lock, so a
/// status transition is atomic with respect to any concurrent processor of
/// the same id and a record can be processed at most once.
#[derive(Clone)]
pub struct TransactionService {
    store: Arc<InventoryStore>,
    levels: InventoryLevelService,
    events: EventSender,
}

impl TransactionService {
    pub fn new(
        store: Arc<InventoryStore>,
        levels: InventoryLevelService,
        events: EventSender,
    ) -> Self {
        Self {
            store,
            levels,
            events,
        }
    }

    /// Validates and records a transaction intent. No level effects happen
    /// here: a record comes back PENDING when approval is required, APPROVED
    /// otherwise, and `process` applies it as a separate, composable step.
    #[instrument(skip(self, input), fields(item_id = %input.item_id, transaction_type = %input.transaction_type))]
    pub async fn create(
        &self,
        input: NewTransaction,
    ) -> Result<InventoryTransaction, InventoryError> {
        input.validate()?;
        input.validate_location_contract()?;
        if self.store.get_item(input.item_id).is_none() {
            return Err(InventoryError::not_found(format!("item {}", input.item_id)));
        }

        let status = if input.requires_approval.unwrap_or(false) {
            TransactionStatus::Pending
        } else {
            TransactionStatus::Approved
        };
        let transaction = InventoryTransaction::from_input(&input, status);
        let id = self.store.insert_transaction(transaction.clone());

        info!(transaction_id = %id, status = %status, "Transaction created");
        self.events.send(Event::TransactionCreated(id));
        Ok(transaction)
    }

    /// Moves a pending transaction to APPROVED.
    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        id: Uuid,
        approved_by: Uuid,
    ) -> Result<InventoryTransaction, InventoryError> {
        let handle = self
            .store
            .transaction_handle(id)
            .ok_or(InventoryError::TransactionNotFound(id))?;
        let mut transaction = handle.lock().await;
        if transaction.status != TransactionStatus::Pending {
            return Err(InventoryError::NotPending(id));
        }
        transaction.status = TransactionStatus::Approved;
        transaction.approved_by = Some(approved_by);
        transaction.updated_at = Utc::now();
        self.events.send(Event::TransactionApproved(id));
        Ok(transaction.clone())
    }

    /// Moves a pending transaction to REJECTED (terminal).
    #[instrument(skip(self))]
    pub async fn reject(
        &self,
        id: Uuid,
        rejected_by: Uuid,
        reason: &str,
    ) -> Result<InventoryTransaction, InventoryError> {
        let handle = self
            .store
            .transaction_handle(id)
            .ok_or(InventoryError::TransactionNotFound(id))?;
        let mut transaction = handle.lock().await;
        if transaction.status != TransactionStatus::Pending {
            return Err(InventoryError::NotPending(id));
        }
        transaction.status = TransactionStatus::Rejected;
        transaction.append_note(&format!("rejected by {rejected_by}: {reason}"));
        self.events.send(Event::TransactionRejected(id));
        Ok(transaction.clone())
    }

    /// Applies an approved transaction's effects to the level engine.
    ///
    /// Only APPROVED records may be processed; a COMPLETED record fails with
    /// `AlreadyCompleted` and its levels stay untouched. A handler failure
    /// moves the record to CANCELLED with the error appended to its notes —
    /// terminal and auditable, never silently retried.
    #[instrument(skip(self))]
    pub async fn process(&self, id: Uuid) -> Result<InventoryTransaction, InventoryError> {
        let handle = self
            .store
            .transaction_handle(id)
            .ok_or(InventoryError::TransactionNotFound(id))?;
        let mut transaction = handle.lock().await;

        match transaction.status {
            TransactionStatus::Approved => {}
            TransactionStatus::Completed => return Err(InventoryError::AlreadyCompleted(id)),
            _ => return Err(InventoryError::MustBeApproved(id)),
        }

        let snapshot = transaction.clone();
        match self.apply_effects(&snapshot).await {
            Ok((previous_on_hand, new_on_hand)) => {
                let now = Utc::now();
                transaction.status = TransactionStatus::Completed;
                transaction.previous_on_hand = Some(previous_on_hand);
                transaction.new_on_hand = Some(new_on_hand);
                transaction.processed_at = Some(now);
                transaction.updated_at = now;
                info!(transaction_id = %id, "Transaction completed");
                self.events.send(Event::TransactionCompleted(id));
                Ok(transaction.clone())
            }
            Err(e) => {
                transaction.status = TransactionStatus::Cancelled;
                transaction.append_note(&format!("processing failed: {e}"));
                error!(transaction_id = %id, error = %e, "Transaction cancelled");
                self.events.send(Event::TransactionCancelled {
                    transaction_id: id,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Creates a transaction and, when it auto-approves, processes it in the
    /// same call. The two steps stay independently invokable; this is just
    /// their composition.
    pub async fn submit(
        &self,
        input: NewTransaction,
    ) -> Result<InventoryTransaction, InventoryError> {
        let transaction = self.create(input).await?;
        if transaction.status == TransactionStatus::Approved {
            self.process(transaction.id).await
        } else {
            Ok(transaction)
        }
    }

    /// Convenience transfer: fails fast with `InsufficientStock` when the
    /// source cannot cover the quantity, before any record is created, then
    /// submits an auto-approved TRANSFER.
    #[instrument(skip(self))]
    pub async fn transfer_inventory(
        &self,
        item_id: Uuid,
        from: LocationKey,
        to: LocationKey,
        quantity: i32,
        reason: Option<String>,
        created_by: Option<Uuid>,
    ) -> Result<InventoryTransaction, InventoryError> {
        let available = match self.store.level_handle(&(item_id, from)) {
            Some(handle) => handle.lock().await.quantity_available,
            None => 0,
        };
        if available < quantity {
            return Err(InventoryError::InsufficientStock(format!(
                "only {} available at {} for item {}, requested {}",
                available,
                from.path(None),
                item_id,
                quantity
            )));
        }

        let mut input = NewTransaction::new(item_id, TransactionType::Transfer, quantity)
            .from_location(from)
            .to_location(to);
        input.reason = reason;
        input.created_by = created_by;
        self.submit(input).await
    }

    /// Completed CONSUME quantities per day for an item, optionally scoped to
    /// consumption out of one property, from `since` onward. Feed for the
    /// forecaster; sparse (missing days are absent, not zero).
    pub async fn consume_history(
        &self,
        item_id: Uuid,
        property_id: Option<Uuid>,
        since: DateTime<Utc>,
    ) -> Vec<(NaiveDate, i64)> {
        let mut history = Vec::new();
        for handle in self.store.transaction_handles() {
            let transaction = handle.lock().await;
            if transaction.item_id != item_id
                || transaction.transaction_type != TransactionType::Consume
                || transaction.status != TransactionStatus::Completed
            {
                continue;
            }
            if let Some(property_id) = property_id {
                if transaction.source.map(|s| s.property_id) != Some(property_id) {
                    continue;
                }
            }
            let Some(processed_at) = transaction.processed_at else {
                continue;
            };
            if processed_at < since {
                continue;
            }
            history.push((processed_at.date_naive(), i64::from(transaction.quantity)));
        }
        history
    }

    /// Dispatches a transaction to its typed effect handler. Returns the
    /// (previous, new) on-hand snapshot of the primary affected level.
    async fn apply_effects(
        &self,
        transaction: &InventoryTransaction,
    ) -> Result<(i32, i32), InventoryError> {
        let quantity = transaction.quantity;
        let item_id = transaction.item_id;
        match transaction.transaction_type {
            TransactionType::Receive => {
                let to = require_location(transaction.destination, "destination")?;
                self.levels.apply_delta_effect(item_id, to, quantity).await
            }
            TransactionType::Consume => {
                let from = require_location(transaction.source, "source")?;
                self.levels.apply_delta_effect(item_id, from, -quantity).await
            }
            TransactionType::Transfer => self.apply_transfer(transaction).await,
            TransactionType::Adjust => {
                if let Some(to) = transaction.destination {
                    self.levels.apply_delta_effect(item_id, to, quantity).await
                } else {
                    let from = require_location(transaction.source, "source")?;
                    self.levels.apply_delta_effect(item_id, from, -quantity).await
                }
            }
            TransactionType::Damage => {
                let from = require_location(transaction.source, "source")?;
                let snapshot = self.levels.apply_delta_effect(item_id, from, -quantity).await?;
                self.store
                    .update_item_condition(item_id, ItemCondition::Damaged)?;
                Ok(snapshot)
            }
            TransactionType::Dispose => {
                let from = require_location(transaction.source, "source")?;
                self.levels.apply_delta_effect(item_id, from, -quantity).await
            }
            TransactionType::Assign => {
                let from = require_location(transaction.source, "source")?;
                self.levels.apply_reserve_effect(item_id, from, quantity).await
            }
            TransactionType::Unassign => {
                let to = require_location(transaction.destination, "destination")?;
                self.levels.apply_release_effect(item_id, to, quantity).await
            }
        }
    }

    /// Transfer effect: both level locks are taken in the fixed global order
    /// and both legs are validated before either is mutated, so the ledger
    /// can never record a transfer that debited the source without crediting
    /// the destination.
    async fn apply_transfer(
        &self,
        transaction: &InventoryTransaction,
    ) -> Result<(i32, i32), InventoryError> {
        let from = require_location(transaction.source, "source")?;
        let to = require_location(transaction.destination, "destination")?;
        let item = self
            .store
            .get_item(transaction.item_id)
            .ok_or_else(|| InventoryError::not_found(format!("item {}", transaction.item_id)))?;

        let source_key: LevelKey = (transaction.item_id, from);
        let destination_key: LevelKey = (transaction.item_id, to);
        let source_handle = self.store.level_handle_or_create(&item, from);
        let destination_handle = self.store.level_handle_or_create(&item, to);

        let (mut source, mut destination) = InventoryStore::lock_level_pair(
            &source_key,
            &source_handle,
            &destination_key,
            &destination_handle,
        )
        .await;

        if source.quantity_on_hand < transaction.quantity {
            return Err(InventoryError::InsufficientStock(format!(
                "on-hand {} at {} cannot cover transfer of {}",
                source.quantity_on_hand,
                from.path(None),
                transaction.quantity
            )));
        }

        let previous = source.quantity_on_hand;
        source.apply_delta(-transaction.quantity)?;
        destination.apply_delta(transaction.quantity)?;
        self.levels.refresh_alert(&mut source);
        self.levels.refresh_alert(&mut destination);
        Ok((previous, source.quantity_on_hand))
    }
}

fn require_location(
    location: Option<LocationKey>,
    side: &str,
) -> Result<LocationKey, InventoryError> {
    location.ok_or_else(|| {
        InventoryError::InternalError(format!(
            "transaction is missing its {side} location despite creation-time validation"
        ))
    })
}
