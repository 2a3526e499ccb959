use std::time::Duration;

use crate::priority::PriorityConfig;
use crate::recommendation::ranker::{DEFAULT_LIMIT, DEFAULT_MAX_WAIT_MINUTES};
use crate::utils::{AppError, AppResult};

/// 引擎配置 - 由组合层 (楼面应用) 构建
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | 控制台输出 JSON |
/// | LOG_DIR | (无) | 设置后写入滚动日志文件 |
/// | SYNC_CLEANUP_INTERVAL_SECS | 3600 | 同步总线清理周期(秒) |
/// | SYNC_MAX_AGE_MS | 3600000 | 待处理事件保留时长(毫秒) |
/// | RECOMMENDATION_LIMIT | 5 | 推荐结果数量上限 |
/// | DEFAULT_MAX_WAIT_MINUTES | 15 | 默认可接受等待(分钟) |
/// | SPECIAL_NEEDS_KEYWORDS_PATH | (无) | 特殊需求关键字表 JSON |
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    /// 同步总线清理周期
    pub cleanup_interval: Duration,
    /// 待处理事件和 last_sync_time 的保留时长 (毫秒)
    pub sync_max_age_ms: i64,
    pub recommendation_limit: usize,
    pub default_max_wait_minutes: i64,
    pub special_needs_keywords_path: Option<String>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 未设置的项使用默认值；设置了但无法解析的项返回错误。
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_json: parse_env("LOG_JSON")?.unwrap_or(defaults.log_json),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            cleanup_interval: parse_env::<u64>("SYNC_CLEANUP_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
            sync_max_age_ms: parse_env("SYNC_MAX_AGE_MS")?.unwrap_or(defaults.sync_max_age_ms),
            recommendation_limit: parse_env("RECOMMENDATION_LIMIT")?
                .unwrap_or(defaults.recommendation_limit),
            default_max_wait_minutes: parse_env("DEFAULT_MAX_WAIT_MINUTES")?
                .unwrap_or(defaults.default_max_wait_minutes),
            special_needs_keywords_path: std::env::var("SPECIAL_NEEDS_KEYWORDS_PATH")
                .ok()
                .filter(|p| !p.is_empty()),
        })
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(cleanup_interval: Duration, sync_max_age_ms: i64) -> Self {
        Self {
            cleanup_interval,
            sync_max_age_ms,
            ..Self::default()
        }
    }

    /// 构建优先级配置 (含可选的关键字表文件)
    pub fn priority_config(&self) -> AppResult<PriorityConfig> {
        let mut config = PriorityConfig::default();
        if let Some(path) = &self.special_needs_keywords_path {
            config.load_keywords(path)?;
        }
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.cleanup_interval.is_zero() {
            return Err(AppError::config("SYNC_CLEANUP_INTERVAL_SECS must be > 0"));
        }
        if self.sync_max_age_ms <= 0 {
            return Err(AppError::config("SYNC_MAX_AGE_MS must be > 0"));
        }
        if self.recommendation_limit == 0 {
            return Err(AppError::config("RECOMMENDATION_LIMIT must be > 0"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            log_json: false,
            log_dir: None,
            cleanup_interval: Duration::from_secs(3600),
            sync_max_age_ms: 60 * 60 * 1000,
            recommendation_limit: DEFAULT_LIMIT,
            default_max_wait_minutes: DEFAULT_MAX_WAIT_MINUTES,
            special_needs_keywords_path: None,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> AppResult<Option<T>> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AppError::config(format!("{key}={raw} is not valid"))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cleanup_interval, Duration::from_secs(3600));
        assert_eq!(config.recommendation_limit, 5);
    }

    #[test]
    fn test_with_overrides() {
        let config = Config::with_overrides(Duration::from_millis(10), 1_000);
        assert_eq!(config.sync_max_age_ms, 1_000);
        assert_eq!(config.default_max_wait_minutes, 15);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = Config::with_overrides(Duration::ZERO, 1_000);
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_priority_config_with_missing_keyword_file() {
        let config = Config {
            special_needs_keywords_path: Some("/nonexistent/kw.json".into()),
            ..Config::default()
        };
        assert!(config.priority_config().is_err());
    }
}
