//! 桌台状态同步总线
//!
//! # 架构
//!
//! ```text
//!  OrderEntry ──┐
//!  KDS ─────────┼──▶ publish() ──┬──▶ pending_updates[table_id]  (FIFO)
//!  Floor ───────┘                ├──▶ last_sync_time[table_id]
//!                                ├──▶ listeners (filter, 注册顺序, 同步调用)
//!                                └──▶ watch() broadcast (异步消费者)
//! ```
//!
//! # 并发模型
//!
//! `publish` 通过可重入锁串行化 (single writer)，保证同一桌台的事件按发布顺序
//! 写入日志并投递给监听器。监听器在状态锁之外调用，因此监听器内部可以再次发布
//! 或订阅。`cleanup` 只持有状态锁，与自身天然互斥。

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};
use serde_json::Value;
use shared::message::{StatusUpdateEvent, SubscriptionFilter, UpdateSource};
use shared::models::{DiningTable, TableStatus};
use shared::util::now_millis;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Default capacity of the async watch channel
const WATCH_CHANNEL_CAPACITY: usize = 1024;

/// 监听器回调
///
/// 返回的错误会被记录日志，不会中断其它监听器，也不会传给 `publish` 的调用方。
pub type StatusListener = Arc<dyn Fn(&StatusUpdateEvent) -> anyhow::Result<()> + Send + Sync>;

struct ListenerEntry {
    handle: u64,
    listener_id: String,
    callback: StatusListener,
    filter: Option<SubscriptionFilter>,
}

impl ListenerEntry {
    fn accepts(&self, event: &StatusUpdateEvent) -> bool {
        self.filter.as_ref().is_none_or(|f| f.matches(event))
    }
}

#[derive(Default)]
struct BusState {
    /// 注册顺序即投递顺序
    listeners: Vec<ListenerEntry>,
    pending_updates: HashMap<String, Vec<StatusUpdateEvent>>,
    last_sync_time: HashMap<String, i64>,
    /// 每个桌台最近一次已知状态 (来自发布的事件或楼面快照)
    known_status: HashMap<String, TableStatus>,
}

struct BusInner {
    state: Mutex<BusState>,
    publish_lock: ReentrantMutex<()>,
    next_handle: AtomicU64,
    watch_tx: broadcast::Sender<Arc<StatusUpdateEvent>>,
}

/// Result of one [`StatusSyncBus::cleanup`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupStats {
    /// Pending events dropped
    pub removed_events: usize,
    /// Tables whose last-sync entry was dropped
    pub removed_tables: usize,
}

/// 状态同步总线
///
/// 由组合层显式创建并持有 (不是全局单例)。克隆共享同一份内部状态。
///
/// # 职责
///
/// - 三个来源的状态变更入口 (`update_from_*`)
/// - 每桌待处理事件日志 (`get_pending_updates` / `clear_pending_updates`)
/// - 监听器注册与过滤投递 (`subscribe`)
/// - 过期数据清理 (`cleanup`)
#[derive(Clone)]
pub struct StatusSyncBus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for StatusSyncBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("StatusSyncBus")
            .field("listeners", &state.listeners.len())
            .field("tables", &state.pending_updates.len())
            .finish()
    }
}

impl StatusSyncBus {
    /// 创建默认容量的总线
    pub fn new() -> Self {
        Self::with_capacity(WATCH_CHANNEL_CAPACITY)
    }

    /// 创建指定 watch 通道容量的总线
    pub fn with_capacity(capacity: usize) -> Self {
        let (watch_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(BusInner {
                state: Mutex::new(BusState::default()),
                publish_lock: ReentrantMutex::new(()),
                next_handle: AtomicU64::new(1),
                watch_tx,
            }),
        }
    }

    /// 注册监听器
    ///
    /// 相同 `listener_id` 重复订阅不会替换之前的注册，每次都会新增一个监听器。
    /// 返回的 [`Subscription`] 只能移除本次注册；丢弃它不会自动退订。
    pub fn subscribe<F>(
        &self,
        listener_id: impl Into<String>,
        callback: F,
        filter: Option<SubscriptionFilter>,
    ) -> Subscription
    where
        F: Fn(&StatusUpdateEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let listener_id = listener_id.into();
        let handle = self.inner.next_handle.fetch_add(1, Ordering::Relaxed);

        self.inner.state.lock().listeners.push(ListenerEntry {
            handle,
            listener_id: listener_id.clone(),
            callback: Arc::new(callback),
            filter,
        });
        tracing::debug!(listener_id = %listener_id, handle, "Status listener subscribed");

        Subscription {
            handle,
            listener_id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// 订阅异步广播 (所有事件，无过滤)
    ///
    /// 慢消费者会收到 `Lagged`，不影响 `publish`。
    pub fn watch(&self) -> broadcast::Receiver<Arc<StatusUpdateEvent>> {
        self.inner.watch_tx.subscribe()
    }

    /// 发布事件
    ///
    /// 追加到该桌台的待处理日志，更新 last_sync_time，然后按注册顺序同步调用
    /// 所有匹配的监听器。返回被调用的监听器数量。
    pub fn publish(&self, event: StatusUpdateEvent) -> usize {
        let _serial = self.inner.publish_lock.lock();

        let targets: Vec<(String, StatusListener)> = {
            let mut state = self.inner.state.lock();

            if let Some(previous) = event.previous_status
                && !previous.is_expected_transition(event.new_status)
            {
                tracing::debug!(
                    table_id = %event.table_id,
                    from = %previous,
                    to = %event.new_status,
                    source = %event.source,
                    "Unusual table status transition accepted"
                );
            }

            state
                .pending_updates
                .entry(event.table_id.clone())
                .or_default()
                .push(event.clone());
            state
                .last_sync_time
                .insert(event.table_id.clone(), event.timestamp);
            state
                .known_status
                .insert(event.table_id.clone(), event.new_status);

            // Broadcast in log order, before any listener can publish a nested event.
            // No receivers is fine
            let _ = self.inner.watch_tx.send(Arc::new(event.clone()));

            state
                .listeners
                .iter()
                .filter(|entry| entry.accepts(&event))
                .map(|entry| (entry.listener_id.clone(), Arc::clone(&entry.callback)))
                .collect()
        };

        crate::status_log!(&event);

        let delivered = targets.len();
        for (listener_id, callback) in targets {
            notify_listener(&listener_id, &callback, &event);
        }

        delivered
    }

    /// 点单终端上报的状态变更
    pub fn update_from_order_entry(
        &self,
        order_id: &str,
        table_id: &str,
        new_status: TableStatus,
        metadata: Option<HashMap<String, Value>>,
    ) -> usize {
        self.update_from(UpdateSource::OrderEntry, order_id, table_id, new_status, metadata)
    }

    /// 后厨显示上报的状态变更
    pub fn update_from_kitchen_display(
        &self,
        order_id: &str,
        table_id: &str,
        new_status: TableStatus,
        metadata: Option<HashMap<String, Value>>,
    ) -> usize {
        self.update_from(
            UpdateSource::KitchenDisplay,
            order_id,
            table_id,
            new_status,
            metadata,
        )
    }

    /// 楼面管理上报的状态变更
    pub fn update_from_floor_management(
        &self,
        order_id: &str,
        table_id: &str,
        new_status: TableStatus,
        metadata: Option<HashMap<String, Value>>,
    ) -> usize {
        self.update_from(
            UpdateSource::FloorManagement,
            order_id,
            table_id,
            new_status,
            metadata,
        )
    }

    /// 通用入口：以当前已知状态作为 previous_status 构建事件并发布
    pub fn update_from(
        &self,
        source: UpdateSource,
        order_id: &str,
        table_id: &str,
        new_status: TableStatus,
        metadata: Option<HashMap<String, Value>>,
    ) -> usize {
        self.update_from_at(source, order_id, table_id, new_status, metadata, now_millis())
    }

    /// [`update_from`](Self::update_from) with an explicit event timestamp
    pub fn update_from_at(
        &self,
        source: UpdateSource,
        order_id: &str,
        table_id: &str,
        new_status: TableStatus,
        metadata: Option<HashMap<String, Value>>,
        now: i64,
    ) -> usize {
        // Hold the serial lock so the looked-up status is still current when published
        let _serial = self.inner.publish_lock.lock();

        let previous = self.known_status(table_id);
        let mut event =
            StatusUpdateEvent::new(order_id, table_id, previous, new_status, source, now);
        if let Some(metadata) = metadata {
            event = event.with_metadata(metadata);
        }
        self.publish(event)
    }

    /// 用楼面快照初始化/刷新已知状态
    pub fn sync_tables(&self, tables: &[DiningTable]) {
        let mut state = self.inner.state.lock();
        for table in tables {
            state.known_status.insert(table.id.clone(), table.status);
        }
    }

    /// 桌台最近一次已知状态
    pub fn known_status(&self, table_id: &str) -> Option<TableStatus> {
        self.inner.state.lock().known_status.get(table_id).copied()
    }

    /// 桌台待处理事件 (按发布顺序)；未知桌台返回空列表
    pub fn get_pending_updates(&self, table_id: &str) -> Vec<StatusUpdateEvent> {
        self.inner
            .state
            .lock()
            .pending_updates
            .get(table_id)
            .cloned()
            .unwrap_or_default()
    }

    /// 清空桌台待处理事件
    pub fn clear_pending_updates(&self, table_id: &str) {
        self.inner.state.lock().pending_updates.remove(table_id);
    }

    /// 最近一次同步时间 (Unix millis)
    pub fn last_sync_time(&self, table_id: &str) -> Option<i64> {
        self.inner.state.lock().last_sync_time.get(table_id).copied()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.state.lock().listeners.len()
    }

    /// 清理早于 `max_age_ms` 的 last_sync_time 和待处理事件
    pub fn cleanup(&self, max_age_ms: i64) -> CleanupStats {
        self.cleanup_at(max_age_ms, now_millis())
    }

    /// [`cleanup`](Self::cleanup) with an explicit clock
    pub fn cleanup_at(&self, max_age_ms: i64, now: i64) -> CleanupStats {
        let cutoff = now - max_age_ms;
        let mut stats = CleanupStats::default();
        let mut state = self.inner.state.lock();

        let before = state.last_sync_time.len();
        state.last_sync_time.retain(|_, ts| *ts >= cutoff);
        stats.removed_tables = before - state.last_sync_time.len();

        state.pending_updates.retain(|_, log| {
            let before = log.len();
            log.retain(|event| event.timestamp >= cutoff);
            stats.removed_events += before - log.len();
            !log.is_empty()
        });

        if stats.removed_events > 0 || stats.removed_tables > 0 {
            tracing::debug!(
                removed_events = stats.removed_events,
                removed_tables = stats.removed_tables,
                "Status sync cleanup"
            );
        }
        stats
    }

    /// 定时清理循环，直到 `shutdown` 被取消
    pub async fn run_periodic_cleanup(
        self,
        interval: Duration,
        max_age_ms: i64,
        shutdown: CancellationToken,
    ) {
        tracing::info!(
            interval_secs = interval.as_secs(),
            max_age_ms,
            "Status sync cleanup started"
        );
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Status sync cleanup stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.cleanup(max_age_ms);
                }
            }
        }
    }

    fn remove_listener(inner: &BusInner, handle: u64) -> bool {
        let mut state = inner.state.lock();
        let before = state.listeners.len();
        state.listeners.retain(|entry| entry.handle != handle);
        before != state.listeners.len()
    }
}

impl Default for StatusSyncBus {
    fn default() -> Self {
        Self::new()
    }
}

/// 调用单个监听器；错误和 panic 都只记录日志
fn notify_listener(listener_id: &str, callback: &StatusListener, event: &StatusUpdateEvent) {
    match std::panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!(
                listener_id = %listener_id,
                table_id = %event.table_id,
                error = %e,
                "Status listener failed"
            );
        }
        Err(panic_info) => {
            let panic_msg: String = if let Some(s) = panic_info.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            tracing::error!(
                listener_id = %listener_id,
                table_id = %event.table_id,
                panic = %panic_msg,
                "Status listener panicked"
            );
        }
    }
}

/// 订阅句柄
#[must_use = "dropping a Subscription keeps the listener registered; call unsubscribe() to remove it"]
#[derive(Debug)]
pub struct Subscription {
    handle: u64,
    listener_id: String,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn listener_id(&self) -> &str {
        &self.listener_id
    }

    /// 移除本次注册的监听器；返回是否确实移除
    pub fn unsubscribe(self) -> bool {
        let Some(inner) = self.bus.upgrade() else {
            return false;
        };
        let removed = StatusSyncBus::remove_listener(&inner, self.handle);
        if removed {
            tracing::debug!(listener_id = %self.listener_id, handle = self.handle, "Status listener unsubscribed");
        }
        removed
    }
}
