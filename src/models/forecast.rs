use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::location::LocationKey;

/// Model-version marker stamped on forecasts produced by the deterministic
/// moving-average fallback.
pub const FALLBACK_MODEL_VERSION: &str = "moving-average-fallback";

/// One stored day of predicted demand for an item, optionally scoped to a
/// property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandForecast {
    pub id: Uuid,
    pub item_id: Uuid,
    pub property_id: Option<Uuid>,
    pub forecast_date: NaiveDate,
    pub predicted_demand: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence: f64,
    pub model_version: String,
    pub generated_at: DateTime<Utc>,
}

/// Request payload for the external prediction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    pub history: Vec<HistoryPoint>,
    pub horizon_days: u32,
}

/// One day of observed consumption in the prediction request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub quantity: f64,
}

/// Response payload from the external prediction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    pub forecasts: Vec<PredictionPoint>,
    pub model_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionPoint {
    pub date: NaiveDate,
    pub predicted_demand: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence: f64,
}

/// Result of a forecast run: the persisted curve plus the derived reorder
/// figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastOutcome {
    pub item_id: Uuid,
    pub property_id: Option<Uuid>,
    pub forecasts: Vec<DemandForecast>,
    pub average_daily_demand: f64,
    pub safety_stock: i64,
    pub recommended_order_quantity: i64,
    pub model_version: String,
}

/// A level flagged for replenishment, ordered by proximity to stockout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRecommendation {
    pub level_id: Uuid,
    pub item_id: Uuid,
    pub location: LocationKey,
    pub quantity_available: i32,
    pub next_seven_days_demand: f64,
    pub reorder_level: f64,
    /// Estimated days until stockout at the forecast consumption rate;
    /// infinite when the forecast predicts no demand.
    pub days_of_stock: f64,
}
