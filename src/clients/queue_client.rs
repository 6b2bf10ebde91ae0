//! 任务队列客户端
//!
//! 只有两个操作：拉取待处理任务、上报任务结果。两者都不会向调用方返回错误
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::QueueError;
use crate::models::{Task, TaskId, TaskResult};

pub struct QueueClient {
    http: Client,
    base_url: String,
}

impl QueueClient {
    /// 创建新的队列客户端
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        Self::with_base_url(&config.server_url, config.http_timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> reqwest::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 拉取待处理任务
    ///
    /// 网络错误、非 200 或响应无法解析时记录日志并返回空列表，
    /// 调用方无法区分"没有任务"和"拉取失败"
    pub async fn fetch_pending_tasks(&self) -> Vec<Task> {
        match self.try_fetch_pending_tasks().await {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!("⚠️ 拉取任务失败: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn try_fetch_pending_tasks(&self) -> Result<Vec<Task>, QueueError> {
        let endpoint = format!("{}/api/tasks/pending", self.base_url);
        let response = self
            .http
            .get(&endpoint)
            .send()
            .await
            .map_err(|source| QueueError::Request {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(QueueError::BadStatus { endpoint, status });
        }

        // 服务端返回的任务已被标记为处理中，逐个解析，一个坏元素不能拖垮整批
        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|source| QueueError::Decode {
                endpoint: endpoint.clone(),
                source,
            })?;
        let tasks: Vec<Task> = rows.into_iter().filter_map(decode_task).collect();
        debug!("拉取到 {} 个任务", tasks.len());
        Ok(tasks)
    }

    /// 上报任务结果
    ///
    /// 失败只记日志，不重试
    pub async fn post_result(&self, task_id: &TaskId, result: &TaskResult) {
        match self.try_post_result(task_id, result).await {
            Ok(()) => info!("[任务 #{}] ✓ 结果上报成功", task_id),
            Err(e) => error!("[任务 #{}] ❌ 结果上报失败: {}", task_id, e),
        }
    }

    pub async fn try_post_result(
        &self,
        task_id: &TaskId,
        result: &TaskResult,
    ) -> Result<(), QueueError> {
        let endpoint = format!("{}/api/tasks/{}/result", self.base_url, task_id);
        debug!("上报结果 Payload: {:?}", result);

        let response = self
            .http
            .post(&endpoint)
            .json(result)
            .send()
            .await
            .map_err(|source| QueueError::Request {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(QueueError::BadStatus { endpoint, status });
        }
        Ok(())
    }
}

/// 解析单个任务
///
/// 结构不对但 ID 可读时保留为无提示词任务，之后会上报 failed；连 ID 都读不出时丢弃
fn decode_task(row: Value) -> Option<Task> {
    let id = row
        .get("id")
        .and_then(|id| serde_json::from_value::<TaskId>(id.clone()).ok());

    match serde_json::from_value::<Task>(row) {
        Ok(task) => Some(task),
        Err(e) => match id {
            Some(id) => {
                warn!("[任务 #{}] ⚠️ 任务结构无法解析: {}，将上报失败", id, e);
                Some(Task::without_prompt(id))
            }
            None => {
                error!("❌ 丢弃无法识别的任务: {}", e);
                None
            }
        },
    }
}
