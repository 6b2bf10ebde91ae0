//! 测试用的聊天页面，记录每一次调用

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::infrastructure::chat_surface::{ChatSurface, ControlLocator, Hyperlink};
use crate::models::SessionSnapshot;

#[derive(Debug)]
pub struct FakeState {
    pub calls: Vec<String>,
    /// None 表示页面上没有联网搜索开关
    pub toggle: Option<bool>,
    pub has_input: bool,
    pub has_copy_button: bool,
    pub fail_navigate: bool,
    /// None 表示读剪贴板报错
    pub clipboard: Option<String>,
    /// 依次返回的回复块文本，最后一个会一直重复
    pub reply_texts: VecDeque<Option<String>>,
    pub links: Vec<Hyperlink>,
    pub snapshot: SessionSnapshot,
    pub imported: Vec<SessionSnapshot>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            toggle: Some(false),
            has_input: true,
            has_copy_button: true,
            fail_navigate: false,
            clipboard: Some("复制的回复".to_string()),
            reply_texts: VecDeque::from([Some("可见的回复".to_string())]),
            links: Vec::new(),
            snapshot: SessionSnapshot::default(),
            imported: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct FakeSurface {
    state: Mutex<FakeState>,
}

impl FakeSurface {
    pub fn new(state: FakeState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn calls(&self) -> Vec<String> {
        self.with(|s| s.calls.clone())
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.with(|s| s.calls.iter().filter(|c| c.starts_with(prefix)).count())
    }

    fn record(&self, call: impl Into<String>) {
        self.with(|s| s.calls.push(call.into()));
    }
}

#[async_trait]
impl ChatSurface for FakeSurface {
    type Control = String;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.record(format!("navigate:{}", url));
        if self.with(|s| s.fail_navigate) {
            bail!("net::ERR_CONNECTION_RESET");
        }
        Ok(())
    }

    async fn find_control(&self, locator: &ControlLocator) -> Result<Option<String>> {
        let found = self.with(|s| match locator {
            ControlLocator::Role { role, name: Some(_), .. } if role == "button" => {
                s.toggle.map(|_| "toggle")
            }
            ControlLocator::Role { role, .. } if role == "button" => Some("send"),
            ControlLocator::Role { .. } => s.has_input.then_some("input"),
            ControlLocator::Css { .. } => s.has_copy_button.then_some("copy"),
        });
        Ok(found.map(str::to_string))
    }

    async fn is_toggled_on(&self, _control: &String) -> Result<bool> {
        Ok(self.with(|s| s.toggle.unwrap_or(false)))
    }

    async fn fill_text(&self, control: &String, text: &str) -> Result<()> {
        self.record(format!("fill:{}:{}", control, text));
        Ok(())
    }

    async fn click(&self, control: &String) -> Result<()> {
        self.record(format!("click:{}", control));
        if control == "toggle" {
            self.with(|s| s.toggle = Some(true));
        }
        Ok(())
    }

    async fn wait_fixed(&self, duration: Duration) {
        self.record(format!("wait:{}", duration.as_millis()));
    }

    async fn read_clipboard(&self) -> Result<String> {
        self.record("clipboard");
        match self.with(|s| s.clipboard.clone()) {
            Some(text) => Ok(text),
            None => bail!("Read permission denied"),
        }
    }

    async fn read_visible_text(&self, _selector: &str) -> Result<Option<String>> {
        self.record("visible");
        Ok(self.with(|s| {
            if s.reply_texts.len() > 1 {
                s.reply_texts.pop_front().flatten()
            } else {
                s.reply_texts.front().cloned().flatten()
            }
        }))
    }

    async fn links(&self) -> Result<Vec<Hyperlink>> {
        self.record("links");
        Ok(self.with(|s| s.links.clone()))
    }

    async fn export_state(&self) -> Result<SessionSnapshot> {
        self.record("export");
        Ok(self.with(|s| s.snapshot.clone()))
    }

    async fn import_state(&self, snapshot: &SessionSnapshot) -> Result<()> {
        self.record("import");
        self.with(|s| s.imported.push(snapshot.clone()));
        Ok(())
    }
}
