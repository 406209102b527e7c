use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use validator::Validate;

const CONFIG_DIR: &str = "config";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";

const DEFAULT_CRITICAL_MULTIPLIER: f64 = 0.10;
const DEFAULT_LOW_MULTIPLIER: f64 = 0.50;
const DEFAULT_HIGH_MULTIPLIER: f64 = 1.50;
const DEFAULT_OVERSTOCK_MULTIPLIER: f64 = 2.00;

const DEFAULT_HISTORY_WINDOW_DAYS: i64 = 90;
const DEFAULT_MIN_HISTORY_DAYS: usize = 7;
const DEFAULT_FALLBACK_WINDOW_DAYS: usize = 14;
const DEFAULT_LEAD_TIME_DAYS: u32 = 7;
const DEFAULT_RETENTION_DAYS: i64 = 7;
const DEFAULT_HORIZON_DAYS: u32 = 30;
const DEFAULT_SERVICE_LEVEL_Z: f64 = 1.65;
const DEFAULT_PREDICTOR_TIMEOUT_SECS: u64 = 10;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 1024;

/// Stock alert threshold multipliers, relative to a level's reorder point
/// (critical/low) or maximum quantity (high/overstock).
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AlertConfig {
    #[serde(default = "default_critical_multiplier")]
    #[validate(range(min = 0.0))]
    pub critical_multiplier: f64,

    #[serde(default = "default_low_multiplier")]
    #[validate(range(min = 0.0))]
    pub low_multiplier: f64,

    #[serde(default = "default_high_multiplier")]
    #[validate(range(min = 1.0))]
    pub high_multiplier: f64,

    #[serde(default = "default_overstock_multiplier")]
    #[validate(range(min = 1.0))]
    pub overstock_multiplier: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            critical_multiplier: DEFAULT_CRITICAL_MULTIPLIER,
            low_multiplier: DEFAULT_LOW_MULTIPLIER,
            high_multiplier: DEFAULT_HIGH_MULTIPLIER,
            overstock_multiplier: DEFAULT_OVERSTOCK_MULTIPLIER,
        }
    }
}

/// Demand forecasting tunables.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ForecastConfig {
    /// Trailing window of consumption history fed to the predictor.
    #[serde(default = "default_history_window_days")]
    #[validate(range(min = 1))]
    pub history_window_days: i64,

    /// Minimum number of distinct consumption days required to forecast.
    #[serde(default = "default_min_history_days")]
    pub min_history_days: usize,

    /// Window for the moving-average fallback forecast.
    #[serde(default = "default_fallback_window_days")]
    pub fallback_window_days: usize,

    /// Days between placing and receiving a reorder.
    #[serde(default = "default_lead_time_days")]
    pub lead_time_days: u32,

    /// Stored forecasts older than this are purged on regeneration.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// Forecast horizon when the caller does not specify one.
    #[serde(default = "default_horizon_days")]
    pub default_horizon_days: u32,

    /// Z-score used for safety stock (1.65 ~ 95% service level).
    #[serde(default = "default_service_level_z")]
    #[validate(range(min = 0.0))]
    pub service_level_z: f64,

    /// Base URL of the external prediction service; absent means the
    /// moving-average fallback is the only model in play.
    #[serde(default)]
    pub predictor_url: Option<String>,

    /// Bounded timeout for the prediction call.
    #[serde(default = "default_predictor_timeout_secs")]
    pub predictor_timeout_secs: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            history_window_days: DEFAULT_HISTORY_WINDOW_DAYS,
            min_history_days: DEFAULT_MIN_HISTORY_DAYS,
            fallback_window_days: DEFAULT_FALLBACK_WINDOW_DAYS,
            lead_time_days: DEFAULT_LEAD_TIME_DAYS,
            retention_days: DEFAULT_RETENTION_DAYS,
            default_horizon_days: DEFAULT_HORIZON_DAYS,
            service_level_z: DEFAULT_SERVICE_LEVEL_Z,
            predictor_url: None,
            predictor_timeout_secs: DEFAULT_PREDICTOR_TIMEOUT_SECS,
        }
    }
}

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    #[serde(default)]
    #[validate]
    pub alerts: AlertConfig,

    #[serde(default)]
    #[validate]
    pub forecast: ForecastConfig,

    /// Capacity of the telemetry event channel; events beyond it are dropped,
    /// never queued against the operation path.
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENV.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_json: false,
            alerts: AlertConfig::default(),
            forecast: ForecastConfig::default(),
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
        }
    }
}

impl AppConfig {
    /// Loads configuration from `config/default`, an environment-specific
    /// overlay, and `STAGESTOCK_`-prefixed environment variables, in that
    /// order of precedence.
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("STAGESTOCK_ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.to_string());

        let config = Config::builder()
            .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
            .add_source(
                File::with_name(&format!("{}/{}", CONFIG_DIR, environment)).required(false),
            )
            .add_source(Environment::with_prefix("STAGESTOCK").separator("__"))
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(app_config)
    }
}

fn default_critical_multiplier() -> f64 {
    DEFAULT_CRITICAL_MULTIPLIER
}
fn default_low_multiplier() -> f64 {
    DEFAULT_LOW_MULTIPLIER
}
fn default_high_multiplier() -> f64 {
    DEFAULT_HIGH_MULTIPLIER
}
fn default_overstock_multiplier() -> f64 {
    DEFAULT_OVERSTOCK_MULTIPLIER
}
fn default_history_window_days() -> i64 {
    DEFAULT_HISTORY_WINDOW_DAYS
}
fn default_min_history_days() -> usize {
    DEFAULT_MIN_HISTORY_DAYS
}
fn default_fallback_window_days() -> usize {
    DEFAULT_FALLBACK_WINDOW_DAYS
}
fn default_lead_time_days() -> u32 {
    DEFAULT_LEAD_TIME_DAYS
}
fn default_retention_days() -> i64 {
    DEFAULT_RETENTION_DAYS
}
fn default_horizon_days() -> u32 {
    DEFAULT_HORIZON_DAYS
}
fn default_service_level_z() -> f64 {
    DEFAULT_SERVICE_LEVEL_Z
}
fn default_predictor_timeout_secs() -> u64 {
    DEFAULT_PREDICTOR_TIMEOUT_SECS
}
fn default_event_buffer_size() -> usize {
    DEFAULT_EVENT_BUFFER_SIZE
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.alerts.critical_multiplier, 0.10);
        assert_eq!(cfg.alerts.low_multiplier, 0.50);
        assert_eq!(cfg.forecast.lead_time_days, 7);
        assert_eq!(cfg.forecast.min_history_days, 7);
    }
}
