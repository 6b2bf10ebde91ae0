//! 提示词处理流程 - 流程层
//!
//! 核心职责：定义"一个提示词"的完整交互流程
//!
//! 流程顺序：
//! 1. 导航到聊天页（每次都导航，相当于开新对话）
//! 2. 尽力打开联网搜索
//! 3. 填入提示词并发送
//! 4. 等待回复完成
//! 5. 提取正文（剪贴板 → 页面文本兜底）
//! 6. 提取引用链接

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::DriverError;
use crate::infrastructure::{ChatSurface, ControlLocator};
use crate::models::{RawReply, SessionSnapshot, Task};
use crate::services::{ensure_search_mode, CompletionWaiter, ReplyExtractor, SearchMode, Settled};
use crate::utils::logging::truncate_text;
use crate::workflow::task_ctx::TaskCtx;

/// 单个任务的处理结果
#[derive(Debug)]
pub enum TaskOutcome {
    /// 拿到了回复
    Completed(RawReply),
    /// 没有提示词，没有碰页面
    Skipped,
}

/// 聊天会话驱动
///
/// - 持有唯一的聊天页面，整个进程生命周期只有这一个会话
/// - 所有操作都要求 `&mut self`，同一时刻只有一个任务在驱动页面
/// - 任务内不重试，错误原样交给编排层
pub struct ChatSessionDriver<S: ChatSurface> {
    surface: S,
    chat_url: String,
    search_toggle_label: String,
    input: ControlLocator,
    send_button: ControlLocator,
    waiter: CompletionWaiter,
    extractor: ReplyExtractor,
}

impl<S: ChatSurface> ChatSessionDriver<S> {
    pub fn new(surface: S, config: &Config) -> Self {
        let selectors = &config.selectors;
        Self {
            surface,
            chat_url: config.chat_url.clone(),
            search_toggle_label: selectors.search_toggle_label.clone(),
            input: ControlLocator::role("textbox", selectors.input_label.clone()),
            send_button: ControlLocator::nth_role("button", selectors.send_button_index),
            waiter: CompletionWaiter::new(config),
            extractor: ReplyExtractor::new(config),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// 处理一个任务
    pub async fn run(&mut self, task: &Task, ctx: &TaskCtx) -> Result<TaskOutcome> {
        let Some(prompt) = task.prompt_text() else {
            warn!("{} ⚠️ 没有提示词内容，跳过", ctx);
            return Ok(TaskOutcome::Skipped);
        };

        info!("{} 📝 提示词: {}", ctx, truncate_text(prompt, 50));
        let reply = self.submit_prompt(prompt).await?;
        info!(
            "{} ✓ 回复 {} 字，引用 {} 条 ({:?})",
            ctx,
            reply.response_text.chars().count(),
            reply.citations.len(),
            reply.extraction
        );
        Ok(TaskOutcome::Completed(reply))
    }

    /// 提交一个提示词并取回回复
    pub async fn submit_prompt(&mut self, prompt: &str) -> Result<RawReply> {
        self.navigate().await?;

        match ensure_search_mode(&self.surface, &self.search_toggle_label).await {
            SearchMode::Enabled => debug!("已打开联网搜索"),
            SearchMode::AlreadyEnabled => debug!("联网搜索已是打开状态"),
            SearchMode::Absent => debug!("没有联网搜索开关，直接提交"),
        }

        self.submit(prompt).await?;

        if self.waiter.wait(&self.surface).await? == Settled::TimedOut {
            warn!("⚠️ 回复可能不完整");
        }

        let (response_text, extraction) = self.extractor.extract_text(&self.surface).await?;
        let citations = self.extractor.extract_citations(&self.surface).await?;

        Ok(RawReply {
            response_text,
            citations,
            extraction,
        })
    }

    /// 导航到聊天页，重复导航是安全的
    pub async fn navigate(&mut self) -> Result<()> {
        self.surface.navigate(&self.chat_url).await
    }

    async fn submit(&mut self, prompt: &str) -> Result<()> {
        let input = self
            .surface
            .find_control(&self.input)
            .await?
            .ok_or_else(|| DriverError::control_not_found("输入框"))?;
        self.surface
            .fill_text(&input, prompt)
            .await
            .context("填写提示词失败")?;

        let send = self
            .surface
            .find_control(&self.send_button)
            .await?
            .ok_or_else(|| DriverError::control_not_found("发送按钮"))?;
        self.surface.click(&send).await.context("点击发送失败")?;
        Ok(())
    }

    /// 把快照恢复到浏览器
    pub async fn restore_session(&mut self, snapshot: &SessionSnapshot) -> Result<()> {
        self.surface.import_state(snapshot).await
    }

    /// 导出当前会话状态
    pub async fn capture_session(&mut self) -> Result<SessionSnapshot> {
        self.surface.export_state().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fake_surface::{FakeState, FakeSurface};
    use crate::infrastructure::Hyperlink;
    use crate::models::{ExtractionPath, TaskId};
    use serde_json::json;

    fn driver(state: FakeState) -> ChatSessionDriver<FakeSurface> {
        ChatSessionDriver::new(FakeSurface::new(state), &Config::default())
    }

    fn ctx() -> TaskCtx {
        TaskCtx::new(TaskId::new("1"), 1, 1, 1)
    }

    fn task(value: serde_json::Value) -> Task {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_full_cycle_order() {
        let mut driver = driver(FakeState::default());

        let outcome = driver
            .run(&task(json!({"id": "1", "prompt": {"content": "hello"}})), &ctx())
            .await
            .unwrap();

        let TaskOutcome::Completed(reply) = outcome else {
            panic!("应该完成");
        };
        assert_eq!(reply.response_text, "复制的回复");
        assert_eq!(reply.extraction, ExtractionPath::Clipboard);
        assert_eq!(
            driver.surface().calls(),
            vec![
                "navigate:https://chat.deepseek.com/",
                "click:toggle",
                "fill:input:hello",
                "click:send",
                "wait:15000",
                "click:copy",
                "clipboard",
                "links",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_prompt_is_skipped_without_touching_page() {
        let mut driver = driver(FakeState::default());

        let outcome = driver
            .run(&task(json!({"id": "t1", "prompt": {}})), &ctx())
            .await
            .unwrap();

        assert!(matches!(outcome, TaskOutcome::Skipped));
        assert!(driver.surface().calls().is_empty());
    }

    #[tokio::test]
    async fn test_navigate_twice_is_harmless() {
        let mut driver = driver(FakeState::default());

        driver.navigate().await.unwrap();
        driver.navigate().await.unwrap();

        assert_eq!(driver.surface().count("navigate"), 2);
        assert_eq!(driver.surface().count("fill"), 0);
        assert_eq!(driver.surface().count("click"), 0);
    }

    #[tokio::test]
    async fn test_navigate_failure_propagates() {
        let mut driver = driver(FakeState {
            fail_navigate: true,
            ..Default::default()
        });

        assert!(driver.submit_prompt("hello").await.is_err());
        assert_eq!(driver.surface().count("fill"), 0);
    }

    #[tokio::test]
    async fn test_missing_input_fails_the_task() {
        let mut driver = driver(FakeState {
            has_input: false,
            ..Default::default()
        });

        let err = driver.submit_prompt("hello").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DriverError>(),
            Some(DriverError::ControlNotFound { .. })
        ));
        assert_eq!(driver.surface().count("wait"), 0);
    }

    #[tokio::test]
    async fn test_absent_toggle_still_submits() {
        let mut driver = driver(FakeState {
            toggle: None,
            ..Default::default()
        });

        driver.submit_prompt("hello").await.unwrap();
        assert_eq!(driver.surface().count("click:toggle"), 0);
        assert_eq!(driver.surface().count("click:send"), 1);
    }

    #[tokio::test]
    async fn test_clipboard_failure_still_completes() {
        let mut driver = driver(FakeState {
            clipboard: None,
            links: vec![
                Hyperlink {
                    href: "https://chat.deepseek.com/x".to_string(),
                    text: "x".to_string(),
                },
                Hyperlink {
                    href: "https://example.com/y".to_string(),
                    text: "y".to_string(),
                },
            ],
            ..Default::default()
        });

        let reply = driver.submit_prompt("hello").await.unwrap();

        assert_eq!(reply.response_text, "可见的回复");
        assert_eq!(reply.extraction, ExtractionPath::VisibleText);
        assert_eq!(reply.citations.len(), 1);
        assert_eq!(reply.citations[0].url, "https://example.com/y");
    }
}
