//! 工具模块 - 通用工具函数和类型
//!
//! # 内容
//!
//! - [`AppError`] - 应用错误类型
//! - 日志初始化
//! - 分数取整

pub mod error;
pub mod logger;

pub use error::{AppError, AppResult};

use rust_decimal::prelude::*;

/// Round to 2 decimal places, half away from zero
pub fn round2(value: f64) -> f64 {
    Decimal::from_f64(value)
        .unwrap_or_default()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(0.8349), 0.83);
        assert_eq!(round2(1.0), 1.0);
        assert_eq!(round2(f64::NAN), 0.0);
    }
}
