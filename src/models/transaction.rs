use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::errors::InventoryError;
use crate::models::location::LocationKey;

/// Kinds of inventory-affecting events the ledger records.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Receive,
    Consume,
    Transfer,
    Adjust,
    Damage,
    Dispose,
    Assign,
    Unassign,
}

/// Transaction lifecycle. `Rejected` and `Cancelled` are terminal; a record
/// that reaches `Completed` is immutable and can never be processed again.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Rejected
                | TransactionStatus::Completed
                | TransactionStatus::Cancelled
        )
    }
}

/// Input for creating a ledger transaction.
///
/// `quantity` is always a non-negative magnitude; direction comes from the
/// type and from which of `source`/`destination` is populated. A missing
/// `requires_approval` flag defaults to auto-approval.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct NewTransaction {
    pub item_id: Uuid,
    pub transaction_type: TransactionType,
    #[validate(range(min = 0))]
    pub quantity: i32,
    pub source: Option<LocationKey>,
    pub destination: Option<LocationKey>,
    pub unit_cost: Option<Decimal>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub staging_design_id: Option<Uuid>,
    pub requires_approval: Option<bool>,
    pub created_by: Option<Uuid>,
}

impl NewTransaction {
    pub fn new(item_id: Uuid, transaction_type: TransactionType, quantity: i32) -> Self {
        Self {
            item_id,
            transaction_type,
            quantity,
            source: None,
            destination: None,
            unit_cost: None,
            reason: None,
            notes: None,
            staging_design_id: None,
            requires_approval: None,
            created_by: None,
        }
    }

    pub fn from_location(mut self, source: LocationKey) -> Self {
        self.source = Some(source);
        self
    }

    pub fn to_location(mut self, destination: LocationKey) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_staging_design(mut self, staging_design_id: Uuid) -> Self {
        self.staging_design_id = Some(staging_design_id);
        self
    }

    pub fn requiring_approval(mut self) -> Self {
        self.requires_approval = Some(true);
        self
    }

    /// Per-type validation of which location sides must be present. Runs at
    /// creation time, before any mutation.
    pub fn validate_location_contract(&self) -> Result<(), InventoryError> {
        let type_name = self.transaction_type;
        match self.transaction_type {
            TransactionType::Receive | TransactionType::Unassign => {
                if self.destination.is_none() {
                    return Err(InventoryError::validation(format!(
                        "{type_name} transaction requires a destination location"
                    )));
                }
            }
            TransactionType::Consume | TransactionType::Damage | TransactionType::Dispose => {
                if self.source.is_none() {
                    return Err(InventoryError::validation(format!(
                        "{type_name} transaction requires a source location"
                    )));
                }
            }
            TransactionType::Transfer => {
                match (self.source, self.destination) {
                    (Some(source), Some(destination)) if source == destination => {
                        return Err(InventoryError::validation(
                            "TRANSFER source and destination must differ",
                        ));
                    }
                    (Some(_), Some(_)) => {}
                    _ => {
                        return Err(InventoryError::validation(
                            "TRANSFER transaction requires both source and destination locations",
                        ));
                    }
                }
            }
            TransactionType::Adjust => {
                if self.source.is_some() == self.destination.is_some() {
                    return Err(InventoryError::validation(
                        "ADJUST transaction requires exactly one of source or destination",
                    ));
                }
            }
            TransactionType::Assign => {
                if self.source.is_none() {
                    return Err(InventoryError::validation(
                        "ASSIGN transaction requires a source location",
                    ));
                }
                if self.staging_design_id.is_none() {
                    return Err(InventoryError::validation(
                        "ASSIGN transaction requires a staging design reference",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// A ledger record of one inventory-affecting event. Immutable once
/// completed; failed processing is captured as `Cancelled` with the error
/// appended to `notes` so the record stays auditable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: Uuid,
    pub item_id: Uuid,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub quantity: i32,
    pub source: Option<LocationKey>,
    pub destination: Option<LocationKey>,
    pub unit_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub staging_design_id: Option<Uuid>,
    /// On-hand snapshots of the primary affected level, for audit.
    pub previous_on_hand: Option<i32>,
    pub new_on_hand: Option<i32>,
    pub created_by: Option<Uuid>,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl InventoryTransaction {
    pub fn from_input(input: &NewTransaction, status: TransactionStatus) -> Self {
        let now = Utc::now();
        let total_cost = input
            .unit_cost
            .map(|cost| cost * Decimal::from(input.quantity));
        Self {
            id: Uuid::new_v4(),
            item_id: input.item_id,
            transaction_type: input.transaction_type,
            status,
            quantity: input.quantity,
            source: input.source,
            destination: input.destination,
            unit_cost: input.unit_cost,
            total_cost,
            reason: input.reason.clone(),
            notes: input.notes.clone(),
            staging_design_id: input.staging_design_id,
            previous_on_hand: None,
            new_on_hand: None,
            created_by: input.created_by,
            approved_by: None,
            created_at: now,
            updated_at: now,
            processed_at: None,
        }
    }

    /// Builds an already-completed audit entry, used for the companion record
    /// of direct level adjustments and cycle-count variances.
    pub fn completed_audit(
        item_id: Uuid,
        location: LocationKey,
        signed_delta: i32,
        previous_on_hand: i32,
        new_on_hand: i32,
        reason: impl Into<String>,
        created_by: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        let (source, destination) = if signed_delta < 0 {
            (Some(location), None)
        } else {
            (None, Some(location))
        };
        Self {
            id: Uuid::new_v4(),
            item_id,
            transaction_type: TransactionType::Adjust,
            status: TransactionStatus::Completed,
            quantity: signed_delta.abs(),
            source,
            destination,
            unit_cost: None,
            total_cost: None,
            reason: Some(reason.into()),
            notes: None,
            staging_design_id: None,
            previous_on_hand: Some(previous_on_hand),
            new_on_hand: Some(new_on_hand),
            created_by,
            approved_by: None,
            created_at: now,
            updated_at: now,
            processed_at: Some(now),
        }
    }

    pub fn append_note(&mut self, text: &str) {
        match &mut self.notes {
            Some(notes) => {
                notes.push('\n');
                notes.push_str(text);
            }
            None => self.notes = Some(text.to_string()),
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_contract_per_type() {
        let item = Uuid::new_v4();
        let loc = LocationKey::property(Uuid::new_v4());

        let receive = NewTransaction::new(item, TransactionType::Receive, 5);
        assert!(receive.validate_location_contract().is_err());
        assert!(receive
            .clone()
            .to_location(loc)
            .validate_location_contract()
            .is_ok());

        let transfer = NewTransaction::new(item, TransactionType::Transfer, 5).from_location(loc);
        assert!(transfer.validate_location_contract().is_err());

        let adjust_both = NewTransaction::new(item, TransactionType::Adjust, 5)
            .from_location(loc)
            .to_location(loc);
        assert!(adjust_both.validate_location_contract().is_err());

        let assign = NewTransaction::new(item, TransactionType::Assign, 2).from_location(loc);
        assert!(assign.validate_location_contract().is_err());
        assert!(assign
            .with_staging_design(Uuid::new_v4())
            .validate_location_contract()
            .is_ok());
    }

    #[test]
    fn negative_quantity_fails_validation() {
        let mut input = NewTransaction::new(Uuid::new_v4(), TransactionType::Receive, 5);
        input.quantity = -1;
        assert!(validator::Validate::validate(&input).is_err());
    }

    #[test]
    fn audit_entry_side_follows_sign() {
        let loc = LocationKey::property(Uuid::new_v4());
        let debit =
            InventoryTransaction::completed_audit(Uuid::new_v4(), loc, -3, 10, 7, "shrinkage", None);
        assert!(debit.source.is_some() && debit.destination.is_none());
        assert_eq!(debit.quantity, 3);

        let credit =
            InventoryTransaction::completed_audit(Uuid::new_v4(), loc, 3, 7, 10, "found", None);
        assert!(credit.destination.is_some() && credit.source.is_none());
    }
}
