//! 等待回复完成 - 业务能力层
//!
//! 页面没有可靠的"生成完毕"信号，只能等：
//! - `Fixed`：固定等待一段时间
//! - `Stable`：轮询最后一个回复块，文本连续几次不变即视为完成，超时后照常继续

use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::{Config, SettleStrategy};
use crate::infrastructure::ChatSurface;

/// 轮询间隔下限，配成 0 时按这个值轮询
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct CompletionWaiter {
    strategy: SettleStrategy,
    settle: Duration,
    poll_interval: Duration,
    stable_rounds: u32,
    timeout: Duration,
    reply_selector: String,
}

/// 等待结束的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    /// 固定等待结束
    Elapsed,
    /// 回复内容已稳定
    Stable,
    /// 超时，内容可能还没生成完
    TimedOut,
}

impl CompletionWaiter {
    pub fn new(config: &Config) -> Self {
        Self {
            strategy: config.settle_strategy,
            settle: config.settle_duration,
            poll_interval: config.settle_poll_interval.max(MIN_POLL_INTERVAL),
            stable_rounds: config.settle_stable_rounds.max(1),
            timeout: config.settle_timeout,
            reply_selector: config.selectors.reply_selector.clone(),
        }
    }

    pub async fn wait<S: ChatSurface>(&self, surface: &S) -> Result<Settled> {
        match self.strategy {
            SettleStrategy::Fixed => {
                debug!("固定等待 {:?}", self.settle);
                surface.wait_fixed(self.settle).await;
                Ok(Settled::Elapsed)
            }
            SettleStrategy::Stable => self.wait_until_stable(surface).await,
        }
    }

    async fn wait_until_stable<S: ChatSurface>(&self, surface: &S) -> Result<Settled> {
        let started = Instant::now();
        let mut waited = Duration::ZERO;
        let mut last: Option<String> = None;
        let mut unchanged = 0;

        // 轮询次数和实际耗时任一到达超时即停止
        while waited < self.timeout && started.elapsed() < self.timeout {
            surface.wait_fixed(self.poll_interval).await;
            waited += self.poll_interval;

            let current = surface
                .read_visible_text(&self.reply_selector)
                .await?
                .filter(|t| !t.trim().is_empty());

            match (&current, &last) {
                (Some(now), Some(before)) if now == before => unchanged += 1,
                _ => unchanged = 0,
            }
            if unchanged >= self.stable_rounds {
                debug!("回复已稳定，等待了 {:?}", waited);
                return Ok(Settled::Stable);
            }
            last = current;
        }

        warn!("⚠️ 等待回复超时 ({:?})，按当前内容继续", self.timeout);
        Ok(Settled::TimedOut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fake_surface::{FakeState, FakeSurface};
    use std::collections::VecDeque;

    fn stable_config() -> Config {
        Config {
            settle_strategy: SettleStrategy::Stable,
            settle_poll_interval: Duration::from_millis(500),
            settle_stable_rounds: 2,
            settle_timeout: Duration::from_secs(10),
            ..Config::default()
        }
    }

    fn texts(items: &[Option<&str>]) -> VecDeque<Option<String>> {
        items.iter().map(|t| t.map(str::to_string)).collect()
    }

    #[tokio::test]
    async fn test_fixed_wait() {
        let surface = FakeSurface::default();
        let waiter = CompletionWaiter::new(&Config::default());

        assert_eq!(waiter.wait(&surface).await.unwrap(), Settled::Elapsed);
        assert_eq!(surface.calls(), vec!["wait:15000"]);
    }

    #[tokio::test]
    async fn test_stable_after_text_stops_growing() {
        let surface = FakeSurface::new(FakeState {
            reply_texts: texts(&[None, Some("你"), Some("你好"), Some("你好"), Some("你好")]),
            ..Default::default()
        });
        let waiter = CompletionWaiter::new(&stable_config());

        assert_eq!(waiter.wait(&surface).await.unwrap(), Settled::Stable);
        assert_eq!(surface.count("visible"), 5);
    }

    #[tokio::test]
    async fn test_stable_wait_times_out_softly() {
        let surface = FakeSurface::new(FakeState {
            reply_texts: texts(&[None]),
            ..Default::default()
        });
        let waiter = CompletionWaiter::new(&stable_config());

        assert_eq!(waiter.wait(&surface).await.unwrap(), Settled::TimedOut);
        // 10s / 500ms
        assert_eq!(surface.count("wait"), 20);
    }

    #[tokio::test]
    async fn test_zero_poll_interval_still_times_out() {
        let surface = FakeSurface::new(FakeState {
            reply_texts: texts(&[None]),
            ..Default::default()
        });
        let waiter = CompletionWaiter::new(&Config {
            settle_poll_interval: Duration::ZERO,
            settle_timeout: Duration::from_secs(1),
            ..stable_config()
        });

        let settled = tokio::time::timeout(Duration::from_secs(3), waiter.wait(&surface))
            .await
            .expect("等待应当在超时内结束")
            .unwrap();

        assert_eq!(settled, Settled::TimedOut);
        // 1s / 100ms
        assert_eq!(surface.count("wait"), 10);
        assert!(surface.calls().iter().all(|c| c != "wait:0"));
    }
}
