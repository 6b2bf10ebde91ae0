//! # Prompt Worker
//!
//! 轮询任务服务器上的待处理提示词，在 DeepSeek 网页聊天里逐个提交，
//! 取回回复正文和引用链接后上报结果
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `ChatSurface` - 驱动聊天页面所需的能力集合
//! - `ChromiumSurface` - 唯一的 page owner，用 CDP 和页面脚本实现这些能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单次交互
//! - `search_mode` - 联网搜索开关（三态）
//! - `CompletionWaiter` - 等待回复完成（固定 / 稳定检测）
//! - `ReplyExtractor` - 正文（剪贴板 → 页面文本）和引用链接
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个任务"的完整处理流程
//! - `TaskCtx` - 上下文封装（任务 ID + 批次位置）
//! - `ChatSessionDriver` - 流程编排（导航 → 开关 → 提交 → 等待 → 提取）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/worker` - 轮询、逐个处理、上报、节流、保存会话
//!
//! 另外：`clients/` 任务队列 HTTP 客户端，`models/` 数据模型和会话快照文件，
//! `browser/` 启动或连接浏览器

pub mod browser;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::open_chat_surface;
pub use clients::QueueClient;
pub use config::Config;
pub use error::{ConfigError, DriverError, QueueError, SnapshotError};
pub use infrastructure::{ChatSurface, ChromiumSurface, ControlLocator, Hyperlink};
pub use models::{Citation, RawReply, SessionSnapshot, SnapshotStore, Task, TaskId, TaskResult};
pub use orchestrator::{PollOutcome, Worker};
pub use workflow::{ChatSessionDriver, TaskCtx, TaskOutcome};
