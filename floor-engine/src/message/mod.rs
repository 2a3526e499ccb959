//! 桌台状态同步
//!
//! 点单终端、后厨显示和楼面管理三个来源通过 [`StatusSyncBus`] 上报桌台状态变更，
//! 楼面视图等消费者通过 `subscribe` (同步回调) 或 `watch` (异步广播) 接收。

pub mod bus;

pub use bus::{CleanupStats, StatusListener, StatusSyncBus, Subscription};
pub use shared::message::{StatusUpdateEvent, SubscriptionFilter, UpdateSource};
