use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a catalog item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Active,
    Inactive,
}

/// Physical condition of a catalog item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemCondition {
    New,
    Good,
    Fair,
    Damaged,
}

/// Catalog item. Created by catalog management (out of scope here); the level
/// engine reads its default thresholds and the forecaster its category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub sku: String,
    pub barcode: String,
    pub name: String,
    pub category: Option<String>,
    pub purchase_cost: Option<Decimal>,
    pub current_value: Option<Decimal>,
    /// Annual straight-line depreciation rate, as a fraction of purchase cost.
    pub depreciation_rate: Option<Decimal>,
    pub reorder_point: Option<i32>,
    pub reorder_quantity: Option<i32>,
    pub max_quantity: Option<i32>,
    pub status: ItemStatus,
    pub condition: ItemCondition,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn new(sku: impl Into<String>, barcode: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            sku: sku.into(),
            barcode: barcode.into(),
            name: name.into(),
            category: None,
            purchase_cost: None,
            current_value: None,
            depreciation_rate: None,
            reorder_point: None,
            reorder_quantity: None,
            max_quantity: None,
            status: ItemStatus::Active,
            condition: ItemCondition::New,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_thresholds(
        mut self,
        reorder_point: Option<i32>,
        reorder_quantity: Option<i32>,
        max_quantity: Option<i32>,
    ) -> Self {
        self.reorder_point = reorder_point;
        self.reorder_quantity = reorder_quantity;
        self.max_quantity = max_quantity;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == ItemStatus::Active
    }
}
