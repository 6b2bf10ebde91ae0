//! 聊天页面能力 - 基础设施层
//!
//! 描述驱动一个聊天页面所需的全部能力，不认识 Task，不关心流程

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::models::SessionSnapshot;

/// 控件定位方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlLocator {
    /// 按 ARIA 角色定位，可选按可访问名称过滤，取第 `nth` 个匹配
    Role {
        role: String,
        name: Option<String>,
        nth: usize,
    },
    /// 按 CSS 选择器定位，取第 `nth` 个匹配
    Css { selector: String, nth: usize },
}

impl ControlLocator {
    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        ControlLocator::Role {
            role: role.into(),
            name: Some(name.into()),
            nth: 0,
        }
    }

    pub fn nth_role(role: impl Into<String>, nth: usize) -> Self {
        ControlLocator::Role {
            role: role.into(),
            name: None,
            nth,
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        ControlLocator::Css {
            selector: selector.into(),
            nth: 0,
        }
    }
}

/// 页面上的一个超链接
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Hyperlink {
    pub href: String,
    #[serde(default)]
    pub text: String,
}

/// 聊天页面能力
///
/// 同一时刻只能有一个使用者在驱动它
#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// 页面上控件的句柄
    type Control: Send + Sync;

    /// 导航到指定地址；已经在该地址时再次导航也是安全的
    async fn navigate(&self, url: &str) -> Result<()>;

    /// 查找控件，找不到返回 None
    async fn find_control(&self, locator: &ControlLocator) -> Result<Option<Self::Control>>;

    /// 开关类控件当前是否处于打开状态
    async fn is_toggled_on(&self, control: &Self::Control) -> Result<bool>;

    /// 清空并填入文本
    async fn fill_text(&self, control: &Self::Control, text: &str) -> Result<()>;

    async fn click(&self, control: &Self::Control) -> Result<()>;

    async fn wait_fixed(&self, duration: Duration);

    async fn read_clipboard(&self) -> Result<String>;

    /// 最后一个匹配元素的可见文本，没有匹配返回 None
    async fn read_visible_text(&self, selector: &str) -> Result<Option<String>>;

    /// 页面上所有超链接，按文档顺序
    async fn links(&self) -> Result<Vec<Hyperlink>>;

    /// 导出当前会话状态
    async fn export_state(&self) -> Result<SessionSnapshot>;

    /// 恢复会话状态
    async fn import_state(&self, snapshot: &SessionSnapshot) -> Result<()>;
}
