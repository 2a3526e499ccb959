use std::sync::Arc;

use shared::message::StatusUpdateEvent;
use shared::models::{DiningTable, ServiceOrder};
use tokio::sync::broadcast::error::RecvError;

use crate::availability::AvailabilityPredictor;
use crate::core::Config;
use crate::core::tasks::{BackgroundTasks, DEFAULT_SHUTDOWN_GRACE, TaskKind};
use crate::message::StatusSyncBus;
use crate::priority::{PriorityScore, PriorityScorer};
use crate::recommendation::{RecommendationRanker, RecommendationResult, SeatingPreferences};
use crate::utils::AppResult;

/// 楼面引擎 - 持有同步总线、评分器、预测器和推荐器
///
/// 组合层显式创建并持有，没有全局单例。四个组件彼此不直接调用，
/// 只有推荐器依赖预测器的桌台快照。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | bus | StatusSyncBus | 桌台状态同步总线 |
/// | scorer | Arc<PriorityScorer> | 服务优先级评分 |
/// | predictor | Arc<AvailabilityPredictor> | 可用性预测 (持有桌台快照) |
/// | ranker | RecommendationRanker | 桌台推荐 |
#[derive(Debug)]
pub struct FloorEngine {
    config: Config,
    bus: StatusSyncBus,
    scorer: Arc<PriorityScorer>,
    predictor: Arc<AvailabilityPredictor>,
    ranker: RecommendationRanker,
    tasks: Option<BackgroundTasks>,
    cleanup_started: bool,
}

impl FloorEngine {
    /// 按配置初始化所有组件
    pub fn initialize(config: Config) -> AppResult<Self> {
        config.validate()?;
        let priority_config = config.priority_config()?;
        priority_config.validate()?;

        let predictor = Arc::new(AvailabilityPredictor::default());
        let ranker = RecommendationRanker::new(Arc::clone(&predictor))
            .with_limit(config.recommendation_limit)
            .with_default_max_wait(config.default_max_wait_minutes);

        tracing::info!(
            cleanup_interval_secs = config.cleanup_interval.as_secs(),
            sync_max_age_ms = config.sync_max_age_ms,
            keyword_categories = priority_config.special_needs.len(),
            "Floor engine initialized"
        );

        Ok(Self {
            bus: StatusSyncBus::new(),
            scorer: Arc::new(PriorityScorer::new(priority_config)),
            predictor,
            ranker,
            tasks: None,
            cleanup_started: false,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bus(&self) -> &StatusSyncBus {
        &self.bus
    }

    pub fn scorer(&self) -> &Arc<PriorityScorer> {
        &self.scorer
    }

    pub fn predictor(&self) -> &Arc<AvailabilityPredictor> {
        &self.predictor
    }

    pub fn ranker(&self) -> &RecommendationRanker {
        &self.ranker
    }

    /// 用楼面管理的最新快照替换桌台数据，并刷新总线的已知状态
    pub fn refresh_tables(&self, tables: Vec<DiningTable>) {
        self.bus.sync_tables(&tables);
        self.predictor.update_tables(tables);
    }

    /// 对当前快照中的订单批量评分
    pub fn score_orders(&self, orders: &[ServiceOrder]) -> Vec<PriorityScore> {
        let tables = self.predictor.tables();
        self.scorer.calculate_batch_priority(orders, &tables)
    }

    pub fn recommend(&self, party_size: u32, preferences: &SeatingPreferences) -> RecommendationResult {
        self.ranker.get_smart_recommendations(party_size, preferences)
    }

    /// 启动后台任务 (同步总线定时清理)；重复调用无效
    pub fn start_background_tasks(&mut self) {
        if self.cleanup_started {
            return;
        }
        self.cleanup_started = true;
        let tasks = self.tasks.get_or_insert_with(BackgroundTasks::new);
        let bus = self.bus.clone();
        let interval = self.config.cleanup_interval;
        let max_age_ms = self.config.sync_max_age_ms;

        tasks.spawn("status_sync_cleanup", TaskKind::Periodic, move |token| {
            bus.run_periodic_cleanup(interval, max_age_ms, token)
        });
        tracing::info!(
            periodic = tasks.count(TaskKind::Periodic),
            listeners = tasks.count(TaskKind::Listener),
            "Floor engine background tasks started"
        );
    }

    /// 注册异步状态消费者 (例如推送到前端)，随引擎 shutdown 停止
    ///
    /// 消费者落后太多时跳过丢失的事件并记录警告。需要在 tokio 运行时内调用。
    pub fn spawn_watcher<F>(&mut self, name: &'static str, mut handler: F)
    where
        F: FnMut(Arc<StatusUpdateEvent>) + Send + 'static,
    {
        let mut rx = self.bus.watch();
        let tasks = self.tasks.get_or_insert_with(BackgroundTasks::new);
        tasks.spawn(name, TaskKind::Listener, move |token| async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(event) => handler(event),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(watcher = name, skipped, "Status watcher lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        });
    }

    /// 已提前退出的后台任务；为空表示健康
    pub fn stopped_tasks(&self) -> Vec<&'static str> {
        self.tasks
            .as_ref()
            .map(BackgroundTasks::finished)
            .unwrap_or_default()
    }

    /// 停止后台任务
    pub async fn shutdown(&mut self) {
        if let Some(tasks) = self.tasks.take() {
            tasks.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
        }
        self.cleanup_started = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::TableStatus;
    use std::time::Duration;

    #[test]
    fn test_refresh_tables_feeds_bus_and_predictor() {
        let engine = FloorEngine::initialize(Config::default()).unwrap();
        engine.refresh_tables(vec![
            DiningTable::new("A1", 2, "hall"),
            DiningTable::new("B1", 4, "hall").with_status(TableStatus::Dining),
        ]);

        assert_eq!(engine.bus().known_status("B1"), Some(TableStatus::Dining));
        assert_eq!(engine.predictor().tables().len(), 2);

        let result = engine.recommend(2, &SeatingPreferences::default());
        assert_eq!(result.recommendations[0].table.id, "A1");
    }

    #[test]
    fn test_initialize_rejects_invalid_config() {
        let config = Config {
            recommendation_limit: 0,
            ..Config::default()
        };
        assert!(FloorEngine::initialize(config).is_err());
    }

    #[tokio::test]
    async fn test_background_cleanup_runs_until_shutdown() {
        let mut engine =
            FloorEngine::initialize(Config::with_overrides(Duration::from_millis(10), 1)).unwrap();
        engine.bus().update_from_order_entry("o1", "A1", TableStatus::Seated, None);
        engine.start_background_tasks();
        engine.start_background_tasks();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(engine.bus().get_pending_updates("A1").is_empty());

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_watcher_follows_bus_until_shutdown() {
        let mut engine = FloorEngine::initialize(Config::default()).unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        engine.spawn_watcher("floor_push", move |event| {
            let _ = tx.send((event.table_id.clone(), event.new_status));
        });
        engine.start_background_tasks();

        engine.bus().update_from_floor_management("", "A1", TableStatus::Seated, None);
        engine.bus().update_from_order_entry("o1", "A1", TableStatus::Ordered, None);

        assert_eq!(rx.recv().await, Some(("A1".to_string(), TableStatus::Seated)));
        assert_eq!(rx.recv().await, Some(("A1".to_string(), TableStatus::Ordered)));
        assert!(engine.stopped_tasks().is_empty());

        engine.shutdown().await;
        // handler (and its sender) dropped with the task
        assert_eq!(rx.recv().await, None);
    }
}
