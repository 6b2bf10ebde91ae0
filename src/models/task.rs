use std::fmt;

use serde::{Deserialize, Serialize};

/// 任务 ID
///
/// 服务端给的是整数，但对 worker 来说只是一个不透明的标识，字符串和整数都接受
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Visitor;

        struct TaskIdVisitor;

        impl<'de> Visitor<'de> for TaskIdVisitor {
            type Value = TaskId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or an integer")
            }

            fn visit_str<E>(self, value: &str) -> Result<TaskId, E>
            where
                E: serde::de::Error,
            {
                Ok(TaskId(value.to_string()))
            }

            fn visit_u64<E>(self, value: u64) -> Result<TaskId, E>
            where
                E: serde::de::Error,
            {
                Ok(TaskId(value.to_string()))
            }

            fn visit_i64<E>(self, value: i64) -> Result<TaskId, E>
            where
                E: serde::de::Error,
            {
                Ok(TaskId(value.to_string()))
            }
        }

        deserializer.deserialize_any(TaskIdVisitor)
    }
}

/// 提示词
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Prompt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// 队列中的待处理任务
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt: Prompt,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
}

impl Task {
    /// 只剩 ID 可读的任务，按没有提示词处理
    pub fn without_prompt(id: TaskId) -> Self {
        Self {
            id,
            prompt: Prompt::default(),
            status: None,
            retry_count: None,
        }
    }

    /// 原样提交的提示词，缺失或只有空白时返回 None
    pub fn prompt_text(&self) -> Option<&str> {
        self.prompt
            .content
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 任务最终状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Completed,
    Failed,
}

/// 回复中的引用链接
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,
    pub title: String,
}

/// 回复正文是从哪条路径拿到的
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionPath {
    /// 点击复制按钮后读剪贴板
    Clipboard,
    /// 直接读最后一个回复块的可见文本
    VisibleText,
}

/// 一次提交-提取得到的原始回复
#[derive(Debug, Clone)]
pub struct RawReply {
    pub response_text: String,
    pub citations: Vec<Citation>,
    pub extraction: ExtractionPath,
}

/// 上报给队列的结果
///
/// 失败时只序列化出 `{"status":"failed"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_report: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
}

impl TaskResult {
    /// 评分和分析由服务端完成，这里只填占位值
    pub fn completed(reply: RawReply) -> Self {
        Self {
            status: TaskStatus::Completed,
            response_text: Some(reply.response_text),
            brand_score: Some(0.0),
            analysis_report: Some("{}".to_string()),
            citations: Some(reply.citations),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: TaskStatus::Failed,
            response_text: None,
            brand_score: None,
            analysis_report: None,
            citations: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_from_backend_row() {
        let task: Task = serde_json::from_value(json!({
            "id": 42,
            "prompt_id": 7,
            "status": "processing",
            "last_run": null,
            "retry_count": 0,
            "created_at": "2025-01-01T00:00:00Z",
            "prompt": { "id": 7, "content": "  推荐几款降噪耳机  ", "category": "default" }
        }))
        .unwrap();

        assert_eq!(task.id.as_str(), "42");
        assert_eq!(task.prompt_text(), Some("  推荐几款降噪耳机  "));
        assert_eq!(task.status.as_deref(), Some("processing"));
    }

    #[test]
    fn test_task_without_prompt_content() {
        let missing: Task = serde_json::from_value(json!({"id": "t1", "prompt": {}})).unwrap();
        assert_eq!(missing.prompt_text(), None);

        let no_prompt: Task = serde_json::from_value(json!({"id": "t2"})).unwrap();
        assert_eq!(no_prompt.prompt_text(), None);

        let blank: Task =
            serde_json::from_value(json!({"id": 3, "prompt": {"content": "   "}})).unwrap();
        assert_eq!(blank.prompt_text(), None);

        let null_prompt: Task =
            serde_json::from_value(json!({"id": 4, "prompt": null})).unwrap();
        assert_eq!(null_prompt.id.as_str(), "4");
        assert_eq!(null_prompt.prompt_text(), None);
    }

    #[test]
    fn test_failed_result_is_status_only() {
        let body = serde_json::to_value(TaskResult::failed()).unwrap();
        assert_eq!(body, json!({"status": "failed"}));
    }

    #[test]
    fn test_completed_result_placeholders() {
        let result = TaskResult::completed(RawReply {
            response_text: "回复".to_string(),
            citations: vec![Citation {
                url: "https://example.com/y".to_string(),
                title: "Example".to_string(),
            }],
            extraction: ExtractionPath::Clipboard,
        });

        let body = serde_json::to_value(&result).unwrap();
        assert_eq!(
            body,
            json!({
                "status": "completed",
                "response_text": "回复",
                "brand_score": 0.0,
                "analysis_report": "{}",
                "citations": [{"url": "https://example.com/y", "title": "Example"}]
            })
        );
    }
}
