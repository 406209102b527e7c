pub mod alerts;
pub mod forecasting;
pub mod levels;
pub mod transactions;
