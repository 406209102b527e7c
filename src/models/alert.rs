use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stock alert severity for an inventory level.
///
/// Recomputed from scratch on every level mutation; there is no transition
/// table and no hysteresis.
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
pub enum AlertLevel {
    Normal,
    Low,
    Critical,
    High,
    Overstock,
}

impl AlertLevel {
    /// Low-stock severities are the ones that open a [`StockAlert`].
    pub fn is_low_stock(&self) -> bool {
        matches!(self, AlertLevel::Low | AlertLevel::Critical)
    }
}

/// An open or resolved low-stock alert. At most one open alert exists per
/// (item, level) pair at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAlert {
    pub id: Uuid,
    pub item_id: Uuid,
    pub level_id: Uuid,
    pub alert_level: AlertLevel,
    pub quantity_at_alert: i32,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl StockAlert {
    pub fn new(
        item_id: Uuid,
        level_id: Uuid,
        alert_level: AlertLevel,
        quantity_at_alert: i32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id,
            level_id,
            alert_level,
            quantity_at_alert,
            message: message.into(),
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}
