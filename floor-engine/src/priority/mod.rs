//! 服务优先级
//!
//! 为进行中的订单计算 0-100 的服务优先级分数和等级，用于引导服务员注意力。

pub mod config;
pub mod scorer;

pub use config::{KeywordCategory, PriorityConfig, PriorityWeights, WaitThresholds};
pub use scorer::{PriorityFactors, PriorityLevel, PriorityScore, PriorityScorer};
