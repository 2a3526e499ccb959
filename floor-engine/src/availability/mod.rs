//! 桌台可用性预测

pub mod predictor;

pub use predictor::{AvailabilityCheck, AvailabilityPredictor, average_dining_minutes};
