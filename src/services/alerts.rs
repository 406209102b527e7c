use crate::config::AlertConfig;
use crate::models::alert::AlertLevel;

/// Threshold multipliers for deriving an alert level. Critical and low are
/// relative to the reorder point; high and overstock to the max quantity.
#[derive(Debug, Clone)]
pub struct AlertPolicy {
    pub critical_multiplier: f64,
    pub low_multiplier: f64,
    pub high_multiplier: f64,
    pub overstock_multiplier: f64,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self::from_config(&AlertConfig::default())
    }
}

impl AlertPolicy {
    pub fn from_config(config: &AlertConfig) -> Self {
        Self {
            critical_multiplier: config.critical_multiplier,
            low_multiplier: config.low_multiplier,
            high_multiplier: config.high_multiplier,
            overstock_multiplier: config.overstock_multiplier,
        }
    }
}

/// Derives the alert level for a quantity against its thresholds.
///
/// The reorder-point checks run first and win: a quantity can never be
/// reported critical and overstocked at once. An absent or zero reorder point
/// means there is nothing to evaluate against, so the result is `Normal`
/// regardless of max quantity.
pub fn evaluate(
    quantity: i32,
    reorder_point: Option<i32>,
    max_quantity: Option<i32>,
    policy: &AlertPolicy,
) -> AlertLevel {
    let Some(reorder_point) = reorder_point.filter(|rp| *rp > 0) else {
        return AlertLevel::Normal;
    };

    let quantity = f64::from(quantity);
    let reorder_point = f64::from(reorder_point);

    if quantity <= reorder_point * policy.critical_multiplier {
        return AlertLevel::Critical;
    }
    if quantity <= reorder_point * policy.low_multiplier {
        return AlertLevel::Low;
    }

    if let Some(max_quantity) = max_quantity.filter(|max| *max > 0) {
        let max_quantity = f64::from(max_quantity);
        if quantity >= max_quantity * policy.overstock_multiplier {
            return AlertLevel::Overstock;
        }
        if quantity >= max_quantity * policy.high_multiplier {
            return AlertLevel::High;
        }
    }

    AlertLevel::Normal
}
