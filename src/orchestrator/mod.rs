//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::Worker (轮询 + 逐个处理 Vec<Task>)
//!     ↓
//! workflow::ChatSessionDriver (处理单个 Task)
//!     ↓
//! services (能力层：search_mode / completion_waiter / reply_extractor)
//!     ↓
//! infrastructure (基础设施：ChatSurface / ChromiumSurface)
//! ```
//!
//! 只有编排层同时接触队列、会话驱动和快照文件

pub mod worker;

pub use worker::{BatchStats, PollOutcome, Worker, WorkerStats};
