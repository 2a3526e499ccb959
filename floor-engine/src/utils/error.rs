//! 统一错误处理
//!
//! 引擎核心操作 (发布、评分、预测、推荐) 对普通输入不返回错误，
//! 缺失数据一律降级为保守默认值。[`AppError`] 只覆盖配置加载和日志初始化。

use std::path::PathBuf;

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid configuration: {0}")]
    /// 配置项无法解析
    Config(String),

    #[error("Validation failed: {0}")]
    /// 数据校验失败 (如关键字表为空)
    Validation(String),

    #[error("Failed to read {path}: {source}")]
    /// 文件读取失败
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON: {0}")]
    /// JSON 解析失败
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// 应用结果类型
pub type AppResult<T> = Result<T, AppError>;
