//! 错误类型
//!
//! 每个边界一个错误枚举，应用层统一用 `anyhow` 向上传播

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// 任务队列错误
///
/// 只用于内部日志：对外 `fetch_pending_tasks` 仍然把失败当成"没有任务"
#[derive(Debug, Error)]
pub enum QueueError {
    /// 网络请求失败（连接、超时等）
    #[error("请求失败 ({endpoint}): {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 返回了非 200 状态码
    #[error("返回异常状态 ({endpoint}): {status}")]
    BadStatus { endpoint: String, status: StatusCode },
    /// 响应体无法解析
    #[error("响应解析失败 ({endpoint}): {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}

/// 会话快照读写错误
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("读取快照失败 ({}): {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("快照格式错误 ({}): {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("快照序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("写入快照失败 ({}): {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 聊天会话驱动错误
#[derive(Debug, Error)]
pub enum DriverError {
    /// 页面上找不到必需的控件
    #[error("找不到控件: {control}")]
    ControlNotFound { control: String },
    /// 页面上没有任何回复块
    #[error("页面上没有渲染出回复")]
    ReplyNotRendered,
    /// 剪贴板读到的内容为空
    #[error("剪贴板内容为空")]
    EmptyClipboard,
}

impl DriverError {
    pub fn control_not_found(control: impl Into<String>) -> Self {
        DriverError::ControlNotFound {
            control: control.into(),
        }
    }
}

/// 配置文件错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件失败 ({}): {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("配置文件解析失败 ({}): {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
