use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::ForecastConfig;
use crate::errors::InventoryError;
use crate::events::{Event, EventSender};
use crate::models::forecast::{
    DemandForecast, ForecastOutcome, HistoryPoint, PredictionPoint, PredictionRequest,
    PredictionResponse, ReorderRecommendation, FALLBACK_MODEL_VERSION,
};
use crate::services::transactions::TransactionService;
use crate::store::{ForecastKey, InventoryStore};

/// Contract with the external prediction engine. The engine's internals are a
/// black box; only this request/response shape and the fallback behavior on
/// its failure are part of the core.
#[async_trait]
pub trait DemandPredictor: Send + Sync {
    async fn predict(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResponse, InventoryError>;
}

/// HTTP client for the prediction service. Calls are bounded by the
/// configured timeout and never run while any level lock is held.
pub struct HttpPredictor {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPredictor {
    pub fn new(base_url: impl Into<String>, timeout: StdDuration) -> Result<Self, InventoryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InventoryError::ConfigError(format!("prediction client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl DemandPredictor for HttpPredictor {
    async fn predict(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResponse, InventoryError> {
        let url = format!("{}/forecast", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| InventoryError::external(format!("prediction request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(InventoryError::external(format!(
                "prediction service returned {}",
                response.status()
            )));
        }
        response
            .json::<PredictionResponse>()
            .await
            .map_err(|e| InventoryError::external(format!("prediction response malformed: {e}")))
    }
}

/// Turns ledger history into a demand curve and feeds reorder recommendations
/// back to callers. Read-heavy: the only write is the stored forecast batch.
#[derive(Clone)]
pub struct ForecastingService {
    store: Arc<InventoryStore>,
    transactions: TransactionService,
    predictor: Arc<dyn DemandPredictor>,
    config: ForecastConfig,
    events: EventSender,
}

impl ForecastingService {
    pub fn new(
        store: Arc<InventoryStore>,
        transactions: TransactionService,
        predictor: Arc<dyn DemandPredictor>,
        config: ForecastConfig,
        events: EventSender,
    ) -> Self {
        Self {
            store,
            transactions,
            predictor,
            config,
            events,
        }
    }

    /// Forecasts daily demand for an item, optionally scoped to one property.
    ///
    /// Pulls completed CONSUME history for the trailing window, densifies it
    /// (missing days are zero), delegates to the external predictor, and on
    /// any failure of that call degrades to the deterministic moving-average
    /// fallback. The resulting batch replaces stored forecasts older than the
    /// retention window for the same scope.
    #[instrument(skip(self))]
    pub async fn forecast_demand(
        &self,
        item_id: Uuid,
        property_id: Option<Uuid>,
        period_days: Option<u32>,
    ) -> Result<ForecastOutcome, InventoryError> {
        let horizon_days = period_days.unwrap_or(self.config.default_horizon_days);
        if horizon_days == 0 {
            return Err(InventoryError::validation("forecast horizon must be at least one day"));
        }
        if self.store.get_item(item_id).is_none() {
            return Err(InventoryError::not_found(format!("item {item_id}")));
        }

        let now = Utc::now();
        let since = now - Duration::days(self.config.history_window_days);
        let raw = self
            .transactions
            .consume_history(item_id, property_id, since)
            .await;

        let mut per_day: BTreeMap<chrono::NaiveDate, f64> = BTreeMap::new();
        for (date, quantity) in raw {
            *per_day.entry(date).or_insert(0.0) += quantity as f64;
        }
        if per_day.len() < self.config.min_history_days {
            return Err(InventoryError::InsufficientHistory(format!(
                "{} distinct consumption days for item {item_id}, need at least {}",
                per_day.len(),
                self.config.min_history_days
            )));
        }

        // Dense daily series over the full trailing window, zero-filled.
        let mut history = Vec::new();
        let mut day = since.date_naive();
        let today = now.date_naive();
        while day <= today {
            history.push(HistoryPoint {
                date: day,
                quantity: per_day.get(&day).copied().unwrap_or(0.0),
            });
            day += Duration::days(1);
        }

        let request = PredictionRequest {
            history,
            horizon_days,
        };
        let response = match self.predictor.predict(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(item_id = %item_id, error = %e, "Prediction service failed, using moving-average fallback");
                moving_average_fallback(&request, self.config.fallback_window_days)
            }
        };

        let batch: Vec<DemandForecast> = response
            .forecasts
            .iter()
            .map(|point| DemandForecast {
                id: Uuid::new_v4(),
                item_id,
                property_id,
                forecast_date: point.date,
                predicted_demand: point.predicted_demand,
                lower_bound: point.lower_bound,
                upper_bound: point.upper_bound,
                confidence: point.confidence,
                model_version: response.model_version.clone(),
                generated_at: now,
            })
            .collect();

        let key: ForecastKey = (item_id, property_id);
        let cutoff = now - Duration::days(self.config.retention_days);
        self.store.store_forecasts(key, cutoff, batch.clone());

        let daily: Vec<f64> = batch.iter().map(|f| f.predicted_demand).collect();
        let average_daily_demand = mean(&daily);
        let safety_stock = (self.config.service_level_z * stddev(&daily)).ceil() as i64;
        let recommended_order_quantity =
            (average_daily_demand * f64::from(self.config.lead_time_days)).ceil() as i64
                + safety_stock;

        info!(
            item_id = %item_id,
            horizon_days,
            model_version = %response.model_version,
            average_daily_demand,
            safety_stock,
            "Demand forecast generated"
        );
        self.events.send(Event::ForecastGenerated {
            item_id,
            property_id,
            horizon_days,
            model_version: response.model_version.clone(),
            generated_at: now,
        });

        Ok(ForecastOutcome {
            item_id,
            property_id,
            forecasts: batch,
            average_daily_demand,
            safety_stock,
            recommended_order_quantity,
            model_version: response.model_version,
        })
    }

    /// Flags levels whose available quantity cannot cover the next seven
    /// forecast days plus half the reorder-point buffer, ordered so the
    /// levels closest to stockout surface first. Levels with no stored
    /// forecast are skipped, not treated as zero-demand.
    #[instrument(skip(self))]
    pub async fn get_reorder_recommendations(
        &self,
        property_id: Option<Uuid>,
    ) -> Result<Vec<ReorderRecommendation>, InventoryError> {
        let mut recommendations = Vec::new();

        for handle in self.store.level_handles() {
            let level = handle.lock().await.clone();
            if let Some(property_id) = property_id {
                if level.location.property_id != property_id {
                    continue;
                }
            }

            // Property-scoped batch first, then the property-agnostic one.
            let scoped: ForecastKey = (level.item_id, Some(level.location.property_id));
            let mut batch = self.store.latest_forecasts(&scoped);
            if batch.is_empty() {
                batch = self.store.latest_forecasts(&(level.item_id, None));
            }
            if batch.is_empty() {
                continue;
            }

            let next_seven_days_demand: f64 = batch
                .iter()
                .take(7)
                .map(|f| f.predicted_demand)
                .sum();
            let reorder_point = f64::from(level.reorder_point.unwrap_or(0));
            let reorder_level = next_seven_days_demand.ceil() + 0.5 * reorder_point;
            if f64::from(level.quantity_available) >= reorder_level {
                continue;
            }

            let daily_rate = next_seven_days_demand / 7.0;
            let days_of_stock = if daily_rate > 0.0 {
                f64::from(level.quantity_available) / daily_rate
            } else {
                f64::INFINITY
            };

            recommendations.push(ReorderRecommendation {
                level_id: level.id,
                item_id: level.item_id,
                location: level.location,
                quantity_available: level.quantity_available,
                next_seven_days_demand,
                reorder_level,
                days_of_stock,
            });
        }

        recommendations.sort_by(|a, b| {
            a.days_of_stock
                .partial_cmp(&b.days_of_stock)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(recommendations)
    }
}

/// Deterministic, side-effect-free fallback forecast: the mean of the last
/// `window` history days, projected flat across the horizon with a fixed
/// ±30% band and a fixed 0.6 confidence.
fn moving_average_fallback(request: &PredictionRequest, window: usize) -> PredictionResponse {
    let tail_start = request.history.len().saturating_sub(window);
    let tail = &request.history[tail_start..];
    let quantities: Vec<f64> = tail.iter().map(|p| p.quantity).collect();
    let average = mean(&quantities);

    let last_date = request
        .history
        .last()
        .map(|p| p.date)
        .unwrap_or_else(|| Utc::now().date_naive());

    let forecasts = (1..=request.horizon_days)
        .map(|offset| PredictionPoint {
            date: last_date + Duration::days(i64::from(offset)),
            predicted_demand: average,
            lower_bound: (average * 0.7).max(0.0),
            upper_bound: average * 1.3,
            confidence: 0.6,
        })
        .collect();

    PredictionResponse {
        forecasts,
        model_version: FALLBACK_MODEL_VERSION.to_string(),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
