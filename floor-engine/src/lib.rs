//! Crab Floor Engine - 楼面运营协调核心
//!
//! # 架构概述
//!
//! 进程内的协调与计算层，不直接访问存储或网络：
//!
//! - **状态同步** (`message`): 汇聚点单终端、后厨显示、楼面管理三方的桌台状态变更并分发
//! - **服务优先级** (`priority`): 订单 0-100 优先级评分与等级
//! - **可用性预测** (`availability`): 桌台空出时间估算、预订冲突检查
//! - **智能推荐** (`recommendation`): 为新客人排序候选桌台
//!
//! # 模块结构
//!
//! ```text
//! floor-engine/src/
//! ├── core/            # 配置、组合根、后台任务
//! ├── message/         # 状态同步总线
//! ├── priority/        # 优先级评分
//! ├── availability/    # 可用性预测
//! ├── recommendation/  # 桌台推荐
//! └── utils/           # 错误、日志、取整
//! ```

pub mod availability;
pub mod core;
pub mod message;
pub mod priority;
pub mod recommendation;
pub mod utils;

// Re-export 公共类型
pub use availability::{AvailabilityCheck, AvailabilityPredictor};
pub use core::{Config, FloorEngine};
pub use message::{StatusSyncBus, StatusUpdateEvent, Subscription, SubscriptionFilter, UpdateSource};
pub use priority::{PriorityLevel, PriorityScore, PriorityScorer};
pub use recommendation::{RecommendationRanker, RecommendationResult, SeatingPreferences, Suitability};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};
