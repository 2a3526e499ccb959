//! 引擎后台任务
//!
//! 每个任务启动时拿到同一个 [`CancellationToken`]，`shutdown` 取消令牌后
//! 在限定时间内等待任务退出，超时的任务被 abort。
//!
//! - [`TaskKind::Periodic`] - 定时任务 (同步总线清理)
//! - [`TaskKind::Listener`] - `watch()` 事件消费者

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default grace period for [`BackgroundTasks::shutdown`]
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Periodic,
    Listener,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskKind::Periodic => "periodic",
            TaskKind::Listener => "listener",
        })
    }
}

struct TaskSlot {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// 后台任务集合
///
/// ```ignore
/// let mut tasks = BackgroundTasks::new();
/// tasks.spawn("status_sync_cleanup", TaskKind::Periodic, move |token| {
///     bus.run_periodic_cleanup(interval, max_age_ms, token)
/// });
/// tasks.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
/// ```
pub struct BackgroundTasks {
    slots: Vec<TaskSlot>,
    token: CancellationToken,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            token: CancellationToken::new(),
        }
    }

    /// 启动任务；`make` 收到共享的取消令牌
    ///
    /// panic 会被捕获并记录，不会影响其它任务。
    pub fn spawn<F, Fut>(&mut self, name: &'static str, kind: TaskKind, make: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        let task = make(token.clone());

        let handle = tokio::spawn(async move {
            if let Err(payload) = AssertUnwindSafe(task).catch_unwind().await {
                tracing::error!(
                    task = name,
                    kind = %kind,
                    panic = %panic_message(payload.as_ref()),
                    "Background task panicked"
                );
            } else if !token.is_cancelled() {
                tracing::warn!(task = name, kind = %kind, "Background task exited before shutdown");
            }
        });

        tracing::debug!(task = name, kind = %kind, "Background task started");
        self.slots.push(TaskSlot { name, kind, handle });
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// 指定类型的任务数量
    pub fn count(&self, kind: TaskKind) -> usize {
        self.slots.iter().filter(|slot| slot.kind == kind).count()
    }

    /// 已经结束 (退出或 panic) 的任务名
    pub fn finished(&self) -> Vec<&'static str> {
        self.slots
            .iter()
            .filter(|slot| slot.handle.is_finished())
            .map(|slot| slot.name)
            .collect()
    }

    /// 取消所有任务，每个任务最多等待 `grace`，超时则 abort
    pub async fn shutdown(self, grace: Duration) {
        self.token.cancel();

        for slot in self.slots {
            let abort = slot.handle.abort_handle();
            match tokio::time::timeout(grace, slot.handle).await {
                Ok(Ok(())) => tracing::debug!(task = slot.name, "Background task stopped"),
                Ok(Err(e)) => tracing::error!(task = slot.name, error = %e, "Background task join failed"),
                Err(_) => {
                    abort.abort();
                    tracing::warn!(task = slot.name, grace_ms = grace.as_millis() as u64, "Background task aborted after grace period");
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

impl fmt::Debug for BackgroundTasks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.slots.iter().map(|slot| slot.name).collect();
        f.debug_struct("BackgroundTasks")
            .field("tasks", &names)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}
