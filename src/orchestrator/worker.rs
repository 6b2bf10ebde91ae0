//! 任务轮询循环 - 编排层
//!
//! ## 职责
//!
//! 1. **启动**：读取会话快照并恢复到浏览器
//! 2. **轮询**：拉取待处理任务，队列为空时休眠
//! 3. **逐个处理**：按队列返回的顺序把任务交给会话驱动，不并发
//! 4. **结果上报**：成功上报回复，任何失败都上报 `failed`
//! 5. **节流**：每个任务之后固定停顿
//! 6. **持久化**：每批结束后写一次会话快照
//!
//! 任务级别的错误都在这里截住，不会让循环退出

use std::future::Future;

use anyhow::Result;
use futures::FutureExt;
use tracing::{error, info, warn};

use crate::clients::QueueClient;
use crate::config::Config;
use crate::infrastructure::ChatSurface;
use crate::models::{SnapshotStore, Task, TaskResult, TaskStatus};
use crate::utils::logging::{log_batch_complete, log_batch_start, print_final_stats};
use crate::workflow::{ChatSessionDriver, TaskCtx, TaskOutcome};

/// 单批处理结果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub completed: usize,
    pub failed: usize,
}

/// 累计统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub batches: u64,
    pub completed: usize,
    pub failed: usize,
}

/// 一次轮询的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// 队列为空（或拉取失败）
    Idle,
    Batch(BatchStats),
}

pub struct Worker<S: ChatSurface> {
    config: Config,
    queue: QueueClient,
    driver: ChatSessionDriver<S>,
    store: SnapshotStore,
    stats: WorkerStats,
}

impl<S: ChatSurface> Worker<S> {
    pub fn new(config: Config, queue: QueueClient, surface: S) -> Self {
        let driver = ChatSessionDriver::new(surface, &config);
        let store = SnapshotStore::new(config.session_file.clone());
        Self {
            config,
            queue,
            driver,
            store,
            stats: WorkerStats::default(),
        }
    }

    /// 创建 worker 并恢复上次保存的会话
    pub async fn initialize(config: Config, surface: S) -> Result<Self> {
        let queue = QueueClient::new(&config)?;
        let mut worker = Self::new(config, queue, surface);
        worker.restore_session().await;
        Ok(worker)
    }

    pub fn driver(&self) -> &ChatSessionDriver<S> {
        &self.driver
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats
    }

    /// 读取快照并导入浏览器，返回是否导入成功
    ///
    /// 没有快照或导入失败都只记录日志，以未登录状态继续
    pub async fn restore_session(&mut self) -> bool {
        let Some(snapshot) = self.store.load().await else {
            return false;
        };
        if snapshot.is_empty() {
            info!("📭 会话快照为空，使用全新会话");
            return false;
        }
        match self.driver.restore_session(&snapshot).await {
            Ok(()) => {
                info!("✓ 会话已恢复");
                true
            }
            Err(e) => {
                warn!("⚠️ 恢复会话失败: {:#}，以未登录状态继续", e);
                false
            }
        }
    }

    /// 轮询一次：拉取任务并处理整批
    pub async fn poll_once(&mut self) -> PollOutcome {
        info!("🔍 拉取待处理任务...");
        let tasks = self.queue.fetch_pending_tasks().await;
        if tasks.is_empty() {
            return PollOutcome::Idle;
        }
        PollOutcome::Batch(self.process_batch(tasks).await)
    }

    /// 按顺序处理一批任务，结束后保存会话快照
    pub async fn process_batch(&mut self, tasks: Vec<Task>) -> BatchStats {
        self.stats.batches += 1;
        let batch_num = self.stats.batches;
        let total = tasks.len();
        log_batch_start(batch_num, total);

        let mut batch = BatchStats::default();
        for (idx, task) in tasks.iter().enumerate() {
            let ctx = TaskCtx::new(task.id.clone(), batch_num, idx + 1, total);

            let result = self.process_task(task, &ctx).await;
            match result.status {
                TaskStatus::Completed => batch.completed += 1,
                TaskStatus::Failed => batch.failed += 1,
            }
            self.queue.post_result(&task.id, &result).await;

            // 不论成败都停顿一下，避免请求过快
            tokio::time::sleep(self.config.task_pacing).await;
        }

        self.persist_session().await;

        self.stats.completed += batch.completed;
        self.stats.failed += batch.failed;
        log_batch_complete(batch_num, batch.completed, total);
        batch
    }

    /// 处理单个任务，任何错误都转换成 failed
    async fn process_task(&mut self, task: &Task, ctx: &TaskCtx) -> TaskResult {
        match self.driver.run(task, ctx).await {
            Ok(TaskOutcome::Completed(reply)) => TaskResult::completed(reply),
            Ok(TaskOutcome::Skipped) => TaskResult::failed(),
            Err(e) => {
                error!("{} ❌ 处理失败: {:#}", ctx, e);
                TaskResult::failed()
            }
        }
    }

    async fn persist_session(&mut self) {
        let snapshot = match self.driver.capture_session().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("❌ 导出会话失败: {:#}", e);
                return;
            }
        };
        match self.store.save(&snapshot).await {
            Ok(()) => info!("💾 会话已保存到 {}", self.store.path().display()),
            Err(e) => error!("❌ {}", e),
        }
    }

    /// 持续轮询，直到 `shutdown` 完成
    ///
    /// 只在两批之间和空闲休眠时响应退出，不会打断正在处理的任务
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            if shutdown.as_mut().now_or_never().is_some() {
                break;
            }
            match self.poll_once().await {
                PollOutcome::Batch(_) => continue,
                PollOutcome::Idle => {
                    info!(
                        "💤 没有待处理任务，{:?} 后重试",
                        self.config.idle_interval
                    );
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(self.config.idle_interval) => {}
                    }
                }
            }
        }

        info!("🛑 收到退出信号，停止轮询");
        print_final_stats(self.stats.batches, self.stats.completed, self.stats.failed);
    }
}
