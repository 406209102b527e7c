pub mod alert;
pub mod forecast;
pub mod item;
pub mod level;
pub mod location;
pub mod transaction;

pub use alert::{AlertLevel, StockAlert};
pub use forecast::{
    DemandForecast, ForecastOutcome, HistoryPoint, PredictionPoint, PredictionRequest,
    PredictionResponse, ReorderRecommendation,
};
pub use item::{Item, ItemCondition, ItemStatus};
pub use level::InventoryLevel;
pub use location::LocationKey;
pub use transaction::{InventoryTransaction, NewTransaction, TransactionStatus, TransactionType};
