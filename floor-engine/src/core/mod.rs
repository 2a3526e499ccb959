//! 核心模块 - 引擎配置、组合根和后台任务
//!
//! # 模块结构
//!
//! - [`Config`] - 引擎配置
//! - [`FloorEngine`] - 组件组合根
//! - [`BackgroundTasks`] - 后台任务管理

pub mod config;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use state::FloorEngine;
pub use tasks::{BackgroundTasks, DEFAULT_SHUTDOWN_GRACE, TaskKind};
