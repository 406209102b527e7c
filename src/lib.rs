//! Stagestock Core
//!
//! Inventory engine for property staging operations: per-location stock
//! levels, a transaction ledger with approval flow, threshold-driven stock
//! alerts, and demand forecasting with reorder recommendations.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::errors::InventoryError;
use crate::events::{Event, EventSender};
use crate::services::alerts::AlertPolicy;
use crate::services::forecasting::{DemandPredictor, ForecastingService, HttpPredictor};
use crate::services::levels::InventoryLevelService;
use crate::services::transactions::TransactionService;
use crate::store::InventoryStore;

/// Wired-up service graph over one shared in-memory store.
///
/// Construction returns the telemetry receiver alongside the services; the
/// caller decides where to drain it (typically by spawning
/// [`events::process_events`]).
#[derive(Clone)]
pub struct CoreServices {
    pub store: Arc<InventoryStore>,
    pub config: AppConfig,
    pub levels: InventoryLevelService,
    pub transactions: TransactionService,
    pub forecasting: ForecastingService,
    pub event_sender: EventSender,
}

impl CoreServices {
    /// Builds the service graph. When `predictor` is `None` one is derived
    /// from the configuration: an HTTP client if `predictor_url` is set,
    /// otherwise the forecaster runs on its moving-average fallback alone.
    pub fn new(
        config: AppConfig,
        predictor: Option<Arc<dyn DemandPredictor>>,
    ) -> Result<(Self, mpsc::Receiver<Event>), InventoryError> {
        let (event_sender, event_rx) = events::channel(config.event_buffer_size);
        let store = Arc::new(InventoryStore::new());

        let policy = AlertPolicy::from_config(&config.alerts);
        let levels = InventoryLevelService::new(store.clone(), policy, event_sender.clone());
        let transactions =
            TransactionService::new(store.clone(), levels.clone(), event_sender.clone());

        let predictor = match predictor {
            Some(predictor) => predictor,
            None => match &config.forecast.predictor_url {
                Some(url) => Arc::new(HttpPredictor::new(
                    url.clone(),
                    Duration::from_secs(config.forecast.predictor_timeout_secs),
                )?) as Arc<dyn DemandPredictor>,
                None => Arc::new(UnavailablePredictor) as Arc<dyn DemandPredictor>,
            },
        };
        let forecasting = ForecastingService::new(
            store.clone(),
            transactions.clone(),
            predictor,
            config.forecast.clone(),
            event_sender.clone(),
        );

        Ok((
            Self {
                store,
                config,
                levels,
                transactions,
                forecasting,
                event_sender,
            },
            event_rx,
        ))
    }
}

/// Stand-in predictor when no prediction service is configured; every call
/// fails so the forecaster degrades to its fallback.
struct UnavailablePredictor;

#[async_trait::async_trait]
impl DemandPredictor for UnavailablePredictor {
    async fn predict(
        &self,
        _request: &crate::models::forecast::PredictionRequest,
    ) -> Result<crate::models::forecast::PredictionResponse, InventoryError> {
        Err(InventoryError::external("no prediction service configured"))
    }
}

/// Installs the global tracing subscriber. `log_level` seeds the filter when
/// `RUST_LOG` is unset.
pub fn init_tracing(log_level: &str, log_json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}
